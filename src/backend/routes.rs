use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{Backend, BackendError};
use crate::api::{
    paths, CreateOrderRequest, CreatedAttempt, CreatedOrder, Empty, Envelope, OrderRef, OrderStatusUpdate,
    PaymentAttemptRequest, PaymentReadyRequest,
};
use crate::checkout::PopupMessage;

pub(super) const SANDBOX_PATH: &str = "/order/payment-sandbox";
const SUCCESS_PATH: &str = "/order/payment-success";
const CANCEL_PATH: &str = "/order/payment-cancel";
const FAIL_PATH: &str = "/order/payment-fail";

type AppState = Arc<Backend>;

pub fn router(backend: Arc<Backend>) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "bookstore-checkout"})) }))
        .route(paths::CREATE_ORDER, post(create_order))
        .route(paths::UPDATE_ORDER_STATUS, post(update_order_status))
        .route(paths::CANCEL_ORDER, post(cancel_order))
        .route(paths::CREATE_PAYMENT_ATTEMPT, post(create_payment_attempt))
        .route(paths::FAIL_PAYMENT_ATTEMPTS, post(fail_payment_attempts))
        .route(paths::COMPLETE_PAYMENT, post(complete_payment))
        .route(paths::PAYMENT_READY, post(payment_ready))
        .route(SANDBOX_PATH, get(payment_sandbox))
        .route(SUCCESS_PATH, get(|| async { callback_page(PopupMessage::Success, "Payment completed.") }))
        .route(CANCEL_PATH, get(|| async { callback_page(PopupMessage::Cancel, "Payment was cancelled.") }))
        .route(FAIL_PATH, get(|| async { callback_page(PopupMessage::Fail, "Payment failed.") }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(backend)
}

fn reply<T: Default>(result: Result<T, BackendError>) -> Json<Envelope<T>> {
    match result {
        Ok(data) => Json(Envelope::ok(data)),
        Err(e) => {
            tracing::warn!(error = %e, "Request rejected");
            Json(Envelope::rejected(e.to_string()))
        }
    }
}

async fn create_order(State(s): State<AppState>, Json(r): Json<CreateOrderRequest>) -> Json<Envelope<CreatedOrder>> {
    reply(s.create_order(&r)).map_message("Order created.")
}

async fn update_order_status(State(s): State<AppState>, Json(r): Json<OrderStatusUpdate>) -> Json<Envelope<Empty>> {
    reply(s.update_order_status(&r).map(|_| Empty {})).map_message("Order status updated.")
}

async fn cancel_order(State(s): State<AppState>, Json(r): Json<OrderRef>) -> Json<Envelope<Empty>> {
    reply(s.cancel_order(&r.order_id).map(|_| Empty {})).map_message("Order cancelled.")
}

async fn create_payment_attempt(State(s): State<AppState>, Json(r): Json<PaymentAttemptRequest>) -> Json<Envelope<CreatedAttempt>> {
    reply(s.create_payment_attempt(&r)).map_message("Payment attempt recorded.")
}

async fn fail_payment_attempts(State(s): State<AppState>, Json(r): Json<OrderRef>) -> Json<Envelope<Empty>> {
    reply(s.fail_payment_attempts(&r.order_id).map(|_| Empty {}))
}

async fn complete_payment(State(s): State<AppState>, Json(r): Json<OrderRef>) -> Json<Envelope<Empty>> {
    reply(s.complete_payment(&r.order_id).map(|_| Empty {})).map_message("Payment completed.")
}

async fn payment_ready(State(s): State<AppState>, Json(r): Json<PaymentReadyRequest>) -> Response {
    match s.payment_ready(&r) {
        Ok(ready) => Json(ready).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Payment ready failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({"error": e.to_string()}))).into_response()
        }
    }
}

trait MapMessage {
    fn map_message(self, message: &str) -> Self;
}

impl<T> MapMessage for Json<Envelope<T>> {
    /// Adds a confirmation message to successful replies only.
    fn map_message(self, message: &str) -> Self {
        let Json(envelope) = self;
        if envelope.success { Json(envelope.with_message(message)) } else { Json(envelope) }
    }
}

#[derive(Debug, Deserialize)]
struct SandboxParams {
    #[serde(rename = "paymentId")]
    payment_id: Option<String>,
    amount: Option<String>,
}

async fn payment_sandbox(Query(p): Query<SandboxParams>) -> Html<String> {
    let payment_id = html_escape(p.payment_id.as_deref().unwrap_or("-"));
    let amount = html_escape(p.amount.as_deref().unwrap_or("0"));
    Html(format!(
        "<!doctype html><html><head><title>Payment sandbox</title></head><body>\
         <h3>Sandbox payment {payment_id}</h3><p>Amount: {amount}</p>\
         <a href=\"{SUCCESS_PATH}\">Approve</a> <a href=\"{CANCEL_PATH}\">Cancel</a> <a href=\"{FAIL_PATH}\">Fail</a>\
         </body></html>"
    ))
}

/// Landing page of the gateway redirect: relays the outcome to the opener.
fn callback_page(message: PopupMessage, text: &str) -> Html<String> {
    let wire = message.wire();
    Html(format!(
        "<!doctype html><html><head><title>{text}</title></head><body><p>{text}</p>\
         <script>if (window.opener) {{ window.opener.postMessage('{wire}', '*'); }} window.close();</script>\
         </body></html>"
    ))
}

fn html_escape(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '&' => "&amp;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#39;".to_string(),
            c => c.to_string(),
        })
        .collect()
}
