//! Order and payment-attempt records as the server owns them

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::value_objects::{Money, OrderId, PaymentId, Stamp};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    OrderRequested,
    OrderFailed,
    OrderCompleted,
    PreparingProduct,
    Shipping,
    Delivered,
    CancelCompleted,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderRequested => "ORDER_REQUESTED",
            Self::OrderFailed => "ORDER_FAILED",
            Self::OrderCompleted => "ORDER_COMPLETED",
            Self::PreparingProduct => "PREPARING_PRODUCT",
            Self::Shipping => "SHIPPING",
            Self::Delivered => "DELIVERED",
            Self::CancelCompleted => "CANCEL_COMPLETED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// `ATTEMPTED → {COMPLETED | FAILED}`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    PaymentAttempt,
    PaymentFailed,
    PaymentCompleted,
}

impl PaymentStatus {
    pub fn is_live(&self) -> bool { *self == Self::PaymentAttempt }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Redirect-style external gateway opened in a popup.
    #[serde(rename = "KP")]
    KakaoPay,
    /// Informational popup; the buyer confirms the deposit manually.
    #[serde(rename = "AC")]
    BankTransfer,
}

impl PaymentMethod {
    pub fn code(&self) -> &'static str {
        match self { Self::KakaoPay => "KP", Self::BankTransfer => "AC" }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.code()) }
}

/// Server-side order record.
#[derive(Clone, Debug)]
pub struct OrderRecord {
    id: OrderId,
    id_for_admin: String,
    status: OrderStatus,
    total_paid: Money,
}

impl OrderRecord {
    pub fn create(id: OrderId, id_for_admin: impl Into<String>, total_paid: Money) -> Self {
        Self { id, id_for_admin: id_for_admin.into(), status: OrderStatus::OrderRequested, total_paid }
    }

    pub fn id(&self) -> &OrderId { &self.id }
    pub fn id_for_admin(&self) -> &str { &self.id_for_admin }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn total_paid(&self) -> Money { self.total_paid }

    /// Returns `false` when the order already had `status`.
    pub fn set_status(&mut self, status: OrderStatus) -> bool {
        if self.status == status { return false; }
        self.status = status;
        true
    }

    /// Abandonment never downgrades a completed order.
    pub fn abandon(&mut self) -> bool {
        match self.status {
            OrderStatus::OrderCompleted | OrderStatus::OrderFailed => false,
            _ => self.set_status(OrderStatus::OrderFailed),
        }
    }
}

/// Server-side payment attempt record.
#[derive(Clone, Debug)]
pub struct PaymentAttempt {
    id: PaymentId,
    order_id: OrderId,
    method: PaymentMethod,
    status: PaymentStatus,
    attempted_at: Stamp,
}

impl PaymentAttempt {
    pub fn create(id: PaymentId, order_id: OrderId, method: PaymentMethod, attempted_at: Stamp) -> Self {
        Self { id, order_id, method, status: PaymentStatus::PaymentAttempt, attempted_at }
    }

    pub fn id(&self) -> &PaymentId { &self.id }
    pub fn order_id(&self) -> &OrderId { &self.order_id }
    pub fn method(&self) -> PaymentMethod { self.method }
    pub fn status(&self) -> PaymentStatus { self.status }
    pub fn attempted_at(&self) -> Stamp { self.attempted_at }
    pub fn is_live(&self) -> bool { self.status.is_live() }

    pub fn fail(&mut self) -> bool { self.settle(PaymentStatus::PaymentFailed) }
    pub fn complete(&mut self) -> bool { self.settle(PaymentStatus::PaymentCompleted) }

    fn settle(&mut self, to: PaymentStatus) -> bool {
        if !self.is_live() { return false; }
        self.status = to;
        true
    }
}
