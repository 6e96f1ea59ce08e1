//! In-memory reference backend implementing the order/payment contract.

mod routes;

pub use routes::router;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::api::{
    CreateOrderRequest, CreatedAttempt, CreatedOrder, OrderStatusUpdate, PaymentAttemptRequest, PaymentReady,
    PaymentReadyRequest,
};
use crate::config::BackendConfig;
use crate::domain::aggregates::{OrderRecord, OrderStatus, PaymentAttempt};
use crate::domain::value_objects::{Money, OrderId, PaymentId, Stamp};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Order has no products")]
    EmptyOrder,

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid redirect URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Default)]
struct Ledger {
    orders: HashMap<OrderId, OrderRecord>,
    attempts: Vec<PaymentAttempt>,
}

impl Ledger {
    fn order_for(&mut self, order_id: &OrderId, id_for_admin: &str) -> Result<&mut OrderRecord, BackendError> {
        self.orders
            .get_mut(order_id)
            .filter(|o| o.id_for_admin() == id_for_admin)
            .ok_or_else(|| BackendError::OrderNotFound(order_id.to_string()))
    }

    fn fail_live_attempts(&mut self, order_id: &OrderId) -> usize {
        self.attempts.iter_mut().filter(|a| a.order_id() == order_id).map(PaymentAttempt::fail).filter(|changed| *changed).count()
    }
}

pub struct Backend {
    config: BackendConfig,
    ledger: Mutex<Ledger>,
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, BackendError> {
    let value = value.trim();
    if value.is_empty() { Err(BackendError::MissingField(field)) } else { Ok(value) }
}

impl Backend {
    pub fn new(config: BackendConfig) -> Self { Self { config, ledger: Mutex::new(Ledger::default()) } }

    fn ledger(&self) -> MutexGuard<'_, Ledger> { self.ledger.lock().unwrap_or_else(PoisonError::into_inner) }

    pub fn create_order(&self, req: &CreateOrderRequest) -> Result<CreatedOrder, BackendError> {
        if req.products.is_empty() { return Err(BackendError::EmptyOrder); }
        let requested = required(&req.order_id, "orderId")?;
        Stamp::parse_iso(&req.order_date).ok_or_else(|| BackendError::InvalidDate(req.order_date.clone()))?;
        let id_for_admin = req
            .customer_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("guest-{}", Uuid::new_v4().simple()));

        // Line totals are taken as shown to the buyer; unit prices are rounded down.
        let product_total: Money = req.products.iter().map(|p| p.total_price).sum();
        let total_paid = product_total + self.config.shipping.fee_for(product_total);

        let mut ledger = self.ledger();
        let order_id = unique_id(requested, |candidate| ledger.orders.contains_key(&OrderId::new(candidate)), OrderId::new);
        ledger
            .orders
            .insert(order_id.clone(), OrderRecord::create(order_id.clone(), id_for_admin.clone(), total_paid));
        tracing::info!(order_id = %order_id, total_paid = %total_paid, "Order registered");
        Ok(CreatedOrder { order_id: Some(order_id), id_for_admin: Some(id_for_admin) })
    }

    pub fn update_order_status(&self, req: &OrderStatusUpdate) -> Result<bool, BackendError> {
        required(req.order_id.as_str(), "orderId")?;
        let id_for_admin = required(&req.id_for_admin, "idForAdmin")?;
        let mut ledger = self.ledger();
        let changed = ledger.order_for(&req.order_id, id_for_admin)?.set_status(req.status);
        if req.status == OrderStatus::OrderFailed {
            ledger.fail_live_attempts(&req.order_id);
        }
        tracing::info!(order_id = %req.order_id, status = %req.status, changed, "Order status updated");
        Ok(changed)
    }

    pub fn create_payment_attempt(&self, req: &PaymentAttemptRequest) -> Result<CreatedAttempt, BackendError> {
        required(req.order_id.as_str(), "orderId")?;
        let id_for_admin = required(&req.id_for_admin, "idForAdmin")?;
        let requested = required(req.payment_id.as_str(), "paymentId")?;
        let attempted_at = Stamp::parse_iso(&req.payment_date).ok_or_else(|| BackendError::InvalidDate(req.payment_date.clone()))?;

        let mut ledger = self.ledger();
        ledger.order_for(&req.order_id, id_for_admin)?;
        let superseded = ledger.fail_live_attempts(&req.order_id);
        let payment_id = unique_id(
            requested,
            |candidate| ledger.attempts.iter().any(|a| a.order_id() == &req.order_id && a.id().as_str() == candidate),
            PaymentId::new,
        );
        let attempt = PaymentAttempt::create(payment_id.clone(), req.order_id.clone(), req.payment_method, attempted_at);
        let status = attempt.status();
        ledger.attempts.push(attempt);
        tracing::info!(order_id = %req.order_id, payment_id = %payment_id, method = %req.payment_method, superseded, "Payment attempt recorded");
        Ok(CreatedAttempt { payment_id: Some(payment_id), payment_status: Some(status) })
    }

    pub fn fail_payment_attempts(&self, order_id: &OrderId) -> Result<usize, BackendError> {
        required(order_id.as_str(), "orderId")?;
        let failed = self.ledger().fail_live_attempts(order_id);
        tracing::info!(order_id = %order_id, failed, "Live payment attempts failed");
        Ok(failed)
    }

    pub fn complete_payment(&self, order_id: &OrderId) -> Result<(), BackendError> {
        let mut guard = self.ledger();
        let ledger = &mut *guard;
        let order = ledger.orders.get_mut(order_id).ok_or_else(|| BackendError::OrderNotFound(order_id.to_string()))?;
        let completed = ledger.attempts.iter_mut().filter(|a| a.order_id() == order_id).map(PaymentAttempt::complete).filter(|c| *c).count();
        order.set_status(OrderStatus::OrderCompleted);
        tracing::info!(order_id = %order_id, completed, "Payment completed");
        Ok(())
    }

    pub fn cancel_order(&self, order_id: &OrderId) -> Result<(), BackendError> {
        let mut ledger = self.ledger();
        let order = ledger.orders.get_mut(order_id).ok_or_else(|| BackendError::OrderNotFound(order_id.to_string()))?;
        if order.status() == OrderStatus::OrderCompleted {
            tracing::info!(order_id = %order_id, "Cancellation ignored for completed order");
            return Ok(());
        }
        order.abandon();
        let failed = ledger.fail_live_attempts(order_id);
        tracing::info!(order_id = %order_id, failed, "Order cancelled");
        Ok(())
    }

    /// Sandbox stand-in for the external gateway's ready call.
    pub fn payment_ready(&self, req: &PaymentReadyRequest) -> Result<PaymentReady, BackendError> {
        let mut url = Url::parse(&self.config.public_url)?.join(routes::SANDBOX_PATH)?;
        url.query_pairs_mut()
            .append_pair("partner_order_id", &req.order_number)
            .append_pair("paymentId", req.payment_id.as_str())
            .append_pair("amount", &req.total_amount.to_string());
        Ok(PaymentReady { tid: Some(format!("T{}", Uuid::now_v7().simple())), next_redirect_pc_url: Some(url.into()) })
    }

    pub fn order(&self, order_id: &OrderId) -> Option<OrderRecord> { self.ledger().orders.get(order_id).cloned() }

    pub fn attempts_for(&self, order_id: &OrderId) -> Vec<PaymentAttempt> {
        self.ledger().attempts.iter().filter(|a| a.order_id() == order_id).cloned().collect()
    }

    pub fn live_attempts(&self, order_id: &OrderId) -> usize { self.attempts_for(order_id).iter().filter(|a| a.is_live()).count() }
}

/// The requested id, or the first `<id>-<n>` not already taken.
fn unique_id<T>(requested: &str, taken: impl Fn(&str) -> bool, make: impl Fn(String) -> T) -> T {
    if !taken(requested) {
        return make(requested.to_string());
    }
    let mut n = 1u32;
    loop {
        let candidate = format!("{requested}-{n}");
        if !taken(&candidate) {
            return make(candidate);
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{PaymentMethod, PaymentStatus, ProductLine};

    fn line(price: i64, qty: u32) -> ProductLine {
        ProductLine {
            product_name: "Dune".into(),
            author: "Herbert".into(),
            quantity: qty,
            unit_price: Money::new(price),
            total_price: Money::new(price * i64::from(qty)),
            image: String::new(),
            isbn: "9780441013593".into(),
        }
    }

    fn order_req(id: &str) -> CreateOrderRequest {
        CreateOrderRequest { products: vec![line(9000, 2)], order_id: id.into(), order_date: "2025-01-01T10:00:00".into(), customer_id: Some("U1".into()) }
    }

    fn attempt_req(order_id: &OrderId, payment_id: &str) -> PaymentAttemptRequest {
        PaymentAttemptRequest {
            order_id: order_id.clone(),
            id_for_admin: "U1".into(),
            payment_id: PaymentId::new(payment_id),
            payment_method: PaymentMethod::BankTransfer,
            payment_date: "2025-01-01T10:00:05".into(),
        }
    }

    #[test]
    fn test_create_order_totals_and_collisions() {
        let backend = Backend::new(BackendConfig::default());
        let first = backend.create_order(&order_req("OD20250101100000")).unwrap();
        let second = backend.create_order(&order_req("OD20250101100000")).unwrap();
        assert_eq!(first.order_id.unwrap().as_str(), "OD20250101100000");
        let second_id = second.order_id.unwrap();
        assert_eq!(second_id.as_str(), "OD20250101100000-1");
        let order = backend.order(&second_id).unwrap();
        assert_eq!(order.total_paid(), Money::new(21000));
        assert_eq!(order.status(), OrderStatus::OrderRequested);
    }

    #[test]
    fn test_order_total_uses_displayed_line_totals() {
        let backend = Backend::new(BackendConfig::default());
        let mut req = order_req("OD1");
        req.products = vec![ProductLine { unit_price: Money::new(3333), total_price: Money::new(10000), quantity: 3, ..line(0, 3) }];
        let order_id = backend.create_order(&req).unwrap().order_id.unwrap();
        assert_eq!(backend.order(&order_id).unwrap().total_paid(), Money::new(13000));
    }

    #[test]
    fn test_create_order_rejects_empty_and_bad_date() {
        let backend = Backend::new(BackendConfig::default());
        let mut req = order_req("OD1");
        req.products.clear();
        assert!(matches!(backend.create_order(&req), Err(BackendError::EmptyOrder)));
        let mut req = order_req("OD1");
        req.order_date = "yesterday".into();
        assert!(matches!(backend.create_order(&req), Err(BackendError::InvalidDate(_))));
    }

    #[test]
    fn test_new_attempt_supersedes_live_one() {
        let backend = Backend::new(BackendConfig::default());
        let order_id = backend.create_order(&order_req("OD1")).unwrap().order_id.unwrap();
        backend.create_payment_attempt(&attempt_req(&order_id, "PM1")).unwrap();
        let second = backend.create_payment_attempt(&attempt_req(&order_id, "PM1")).unwrap();
        assert_eq!(second.payment_id.unwrap().as_str(), "PM1-1");
        let attempts = backend.attempts_for(&order_id);
        assert_eq!(attempts[0].status(), PaymentStatus::PaymentFailed);
        assert_eq!(attempts[1].status(), PaymentStatus::PaymentAttempt);
        assert_eq!(backend.live_attempts(&order_id), 1);
    }

    #[test]
    fn test_attempt_for_foreign_owner_is_rejected() {
        let backend = Backend::new(BackendConfig::default());
        let order_id = backend.create_order(&order_req("OD1")).unwrap().order_id.unwrap();
        let mut req = attempt_req(&order_id, "PM1");
        req.id_for_admin = "U2".into();
        assert!(matches!(backend.create_payment_attempt(&req), Err(BackendError::OrderNotFound(_))));
    }

    #[test]
    fn test_cancel_is_idempotent_and_spares_completed_orders() {
        let backend = Backend::new(BackendConfig::default());
        let order_id = backend.create_order(&order_req("OD1")).unwrap().order_id.unwrap();
        backend.create_payment_attempt(&attempt_req(&order_id, "PM1")).unwrap();
        backend.cancel_order(&order_id).unwrap();
        backend.cancel_order(&order_id).unwrap();
        assert_eq!(backend.order(&order_id).unwrap().status(), OrderStatus::OrderFailed);
        assert_eq!(backend.live_attempts(&order_id), 0);

        let done = backend.create_order(&order_req("OD2")).unwrap().order_id.unwrap();
        backend.create_payment_attempt(&attempt_req(&done, "PM2")).unwrap();
        backend.complete_payment(&done).unwrap();
        backend.cancel_order(&done).unwrap();
        assert_eq!(backend.order(&done).unwrap().status(), OrderStatus::OrderCompleted);
        assert_eq!(backend.attempts_for(&done)[0].status(), PaymentStatus::PaymentCompleted);
    }

    #[test]
    fn test_status_update_is_noop_when_repeated() {
        let backend = Backend::new(BackendConfig::default());
        let order_id = backend.create_order(&order_req("OD1")).unwrap().order_id.unwrap();
        let update = OrderStatusUpdate { order_id: order_id.clone(), id_for_admin: "U1".into(), status: OrderStatus::OrderCompleted };
        assert!(backend.update_order_status(&update).unwrap());
        assert!(!backend.update_order_status(&update).unwrap());
    }

    #[test]
    fn test_payment_ready_points_at_sandbox() {
        let backend = Backend::new(BackendConfig::default());
        let ready = backend
            .payment_ready(&PaymentReadyRequest {
                order_number: "OD1".into(),
                orderer_name: "Kim".into(),
                item_name: "Dune".into(),
                quantity: 1,
                total_amount: Money::new(21000),
                payment_id: PaymentId::new("PM1"),
            })
            .unwrap();
        let url = ready.next_redirect_pc_url.unwrap();
        assert!(url.starts_with("http://localhost:8083/order/payment-sandbox?"));
        assert!(url.contains("paymentId=PM1"));
    }
}
