use std::sync::Arc;

use async_trait::async_trait;

use super::{
    ApiError, CheckoutApi, CreateOrderRequest, CreatedAttempt, CreatedOrder, OrderStatusUpdate, PaymentAttemptRequest,
    PaymentReady, PaymentReadyRequest,
};
use crate::backend::{Backend, BackendError};
use crate::domain::value_objects::OrderId;

impl From<BackendError> for ApiError {
    fn from(e: BackendError) -> Self { ApiError::Rejected(e.to_string()) }
}

/// In-process transport straight onto a [`Backend`], used by embedders and
/// tests that don't need a socket.
#[derive(Clone)]
pub struct LocalCheckoutApi {
    backend: Arc<Backend>,
}

impl LocalCheckoutApi {
    pub fn new(backend: Arc<Backend>) -> Self { Self { backend } }

    pub fn backend(&self) -> &Arc<Backend> { &self.backend }
}

#[async_trait]
impl CheckoutApi for LocalCheckoutApi {
    async fn create_order(&self, req: &CreateOrderRequest) -> Result<CreatedOrder, ApiError> {
        Ok(self.backend.create_order(req)?)
    }

    async fn invalidate_prior_attempts(&self, order_id: &OrderId) -> Result<(), ApiError> {
        self.backend.fail_payment_attempts(order_id)?;
        Ok(())
    }

    async fn create_payment_attempt(&self, req: &PaymentAttemptRequest) -> Result<CreatedAttempt, ApiError> {
        Ok(self.backend.create_payment_attempt(req)?)
    }

    async fn payment_ready(&self, req: &PaymentReadyRequest) -> Result<PaymentReady, ApiError> {
        Ok(self.backend.payment_ready(req)?)
    }

    async fn update_order_status(&self, req: &OrderStatusUpdate) -> Result<(), ApiError> {
        self.backend.update_order_status(req)?;
        Ok(())
    }

    async fn complete_payment(&self, order_id: &OrderId) -> Result<(), ApiError> {
        Ok(self.backend.complete_payment(order_id)?)
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<(), ApiError> {
        Ok(self.backend.cancel_order(order_id)?)
    }

    fn send_cancel_beacon(&self, order_id: &OrderId) {
        if let Err(e) = self.backend.cancel_order(order_id) {
            tracing::warn!(order_id = %order_id, error = %e, "Cancellation beacon failed");
        }
    }
}
