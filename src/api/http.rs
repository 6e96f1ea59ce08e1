use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::{
    paths, ApiError, CheckoutApi, CreateOrderRequest, CreatedAttempt, CreatedOrder, Empty, Envelope,
    OrderRef, OrderStatusUpdate, PaymentAttemptRequest, PaymentReady, PaymentReadyRequest,
};
use crate::config::CheckoutConfig;
use crate::domain::value_objects::OrderId;

/// JSON-over-HTTP client for the checkout backend.
#[derive(Clone)]
pub struct HttpCheckoutApi {
    client: Client,
    base: Url,
}

impl HttpCheckoutApi {
    pub fn new(base: Url, client: Client) -> Self { Self { client, base } }

    pub fn from_config(config: &CheckoutConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self::new(Url::parse(&config.backend_url)?, client))
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> { Ok(self.base.join(path)?) }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.client.post(self.endpoint(path)?).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(path, status = status.as_u16(), "Backend returned an error status");
            return Err(ApiError::Status { status: status.as_u16() });
        }
        Ok(response.json().await?)
    }

    async fn post_envelope<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_json::<B, Envelope<T>>(path, body).await?.into_result()
    }
}

#[async_trait]
impl CheckoutApi for HttpCheckoutApi {
    async fn create_order(&self, req: &CreateOrderRequest) -> Result<CreatedOrder, ApiError> {
        self.post_envelope(paths::CREATE_ORDER, req).await
    }

    async fn invalidate_prior_attempts(&self, order_id: &OrderId) -> Result<(), ApiError> {
        self.post_envelope::<_, Empty>(paths::FAIL_PAYMENT_ATTEMPTS, &OrderRef { order_id: order_id.clone() }).await?;
        Ok(())
    }

    async fn create_payment_attempt(&self, req: &PaymentAttemptRequest) -> Result<CreatedAttempt, ApiError> {
        self.post_envelope(paths::CREATE_PAYMENT_ATTEMPT, req).await
    }

    async fn payment_ready(&self, req: &PaymentReadyRequest) -> Result<PaymentReady, ApiError> {
        self.post_json(paths::PAYMENT_READY, req).await
    }

    async fn update_order_status(&self, req: &OrderStatusUpdate) -> Result<(), ApiError> {
        self.post_envelope::<_, Empty>(paths::UPDATE_ORDER_STATUS, req).await?;
        Ok(())
    }

    async fn complete_payment(&self, order_id: &OrderId) -> Result<(), ApiError> {
        self.post_envelope::<_, Empty>(paths::COMPLETE_PAYMENT, &OrderRef { order_id: order_id.clone() }).await?;
        Ok(())
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<(), ApiError> {
        self.post_envelope::<_, Empty>(paths::CANCEL_ORDER, &OrderRef { order_id: order_id.clone() }).await?;
        Ok(())
    }

    fn send_cancel_beacon(&self, order_id: &OrderId) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(order_id = %order_id, "No runtime available; cancellation beacon dropped");
            return;
        };
        let api = self.clone();
        let order_id = order_id.clone();
        runtime.spawn(async move {
            match api.cancel_order(&order_id).await {
                Ok(()) => tracing::info!(order_id = %order_id, "Abandoned order cancelled"),
                Err(e) => tracing::warn!(order_id = %order_id, error = %e, "Cancellation beacon failed"),
            }
        });
    }
}
