//! REST contract between the checkout core and the order/payment backend.

mod http;
mod local;

pub use http::HttpCheckoutApi;
pub use local::LocalCheckoutApi;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregates::{OrderStatus, PaymentMethod, PaymentStatus, ProductLine};
use crate::domain::value_objects::{Money, OrderId, PaymentId};

pub mod paths {
    pub const CREATE_ORDER: &str = "/api/order/create";
    pub const UPDATE_ORDER_STATUS: &str = "/api/order/update-status";
    pub const CANCEL_ORDER: &str = "/api/order/cancel";
    pub const CREATE_PAYMENT_ATTEMPT: &str = "/api/payment/attempt";
    pub const FAIL_PAYMENT_ATTEMPTS: &str = "/api/payment/fail";
    pub const COMPLETE_PAYMENT: &str = "/api/payment/complete";
    pub const PAYMENT_READY: &str = "/api/kakaopay/ready";
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("{0}")]
    Rejected(String),

    #[error("Response is missing {0}")]
    MissingField(&'static str),

    #[error("Invalid endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// `{ "success": bool, "message": string?, ...fields }`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self { Self { success: true, message: None, data } }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ApiError::Rejected(self.message.unwrap_or_else(|| "Request was rejected".to_string())))
        }
    }
}

impl<T: Default> Envelope<T> {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self { success: false, message: Some(message.into()), data: T::default() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub products: Vec<ProductLine>,
    pub order_id: String,
    pub order_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub id_for_admin: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAttemptRequest {
    pub order_id: OrderId,
    pub id_for_admin: String,
    pub payment_id: PaymentId,
    pub payment_method: PaymentMethod,
    pub payment_date: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAttempt {
    #[serde(default)]
    pub payment_id: Option<PaymentId>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReadyRequest {
    pub order_number: String,
    pub orderer_name: String,
    pub item_name: String,
    pub quantity: u32,
    pub total_amount: Money,
    pub payment_id: PaymentId,
}

/// Gateway-shaped response, not wrapped in an envelope.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PaymentReady {
    #[serde(default)]
    pub tid: Option<String>,
    #[serde(default)]
    pub next_redirect_pc_url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub order_id: OrderId,
    pub id_for_admin: String,
    pub status: OrderStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRef {
    pub order_id: OrderId,
}

#[async_trait]
pub trait CheckoutApi: Send + Sync {
    async fn create_order(&self, req: &CreateOrderRequest) -> Result<CreatedOrder, ApiError>;

    /// Fails every still-live attempt of the order; a no-op when none is live.
    async fn invalidate_prior_attempts(&self, order_id: &OrderId) -> Result<(), ApiError>;

    async fn create_payment_attempt(&self, req: &PaymentAttemptRequest) -> Result<CreatedAttempt, ApiError>;

    async fn payment_ready(&self, req: &PaymentReadyRequest) -> Result<PaymentReady, ApiError>;

    async fn update_order_status(&self, req: &OrderStatusUpdate) -> Result<(), ApiError>;

    async fn complete_payment(&self, order_id: &OrderId) -> Result<(), ApiError>;

    async fn cancel_order(&self, order_id: &OrderId) -> Result<(), ApiError>;

    /// Fire-and-forget cancellation that must outlive the caller. Never
    /// blocks and never reports failure.
    fn send_cancel_beacon(&self, order_id: &OrderId);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_decodes_flattened_fields() {
        let raw = json!({"success": true, "orderId": "OD1", "idForAdmin": "U1", "message": "created"});
        let env: Envelope<CreatedOrder> = serde_json::from_value(raw).unwrap();
        let created = env.into_result().unwrap();
        assert_eq!(created.order_id, Some(OrderId::new("OD1")));
        assert_eq!(created.id_for_admin.as_deref(), Some("U1"));
    }

    #[test]
    fn test_rejected_envelope_carries_message() {
        let env: Envelope<CreatedAttempt> = serde_json::from_value(json!({"success": false, "message": "Order not found"})).unwrap();
        match env.into_result() {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Order not found"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_attempt_request_wire_shape() {
        let req = PaymentAttemptRequest {
            order_id: OrderId::new("OD20250101000000"),
            id_for_admin: "U1".into(),
            payment_id: PaymentId::new("PM20250101000010"),
            payment_method: PaymentMethod::KakaoPay,
            payment_date: "2025-01-01T00:00:10".into(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["paymentMethod"], "KP");
        assert_eq!(value["paymentDate"], "2025-01-01T00:00:10");
        assert_eq!(serde_json::to_value(Envelope::ok(Empty {})).unwrap(), json!({"success": true}));
    }
}
