//! Domain events

use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::aggregates::PaymentMethod;
use crate::domain::value_objects::{OrderId, PaymentId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutEvent {
    OrderEntered { order_id: OrderId },
    PriorAttemptsInvalidated { order_id: OrderId, acknowledged: bool },
    AttemptCreated { order_id: OrderId, payment_id: PaymentId, method: PaymentMethod },
    PopupOpened { payment_id: PaymentId, method: PaymentMethod },
    AttemptEnded { payment_id: PaymentId, reason: AttemptEndReason },
    OrderCompleted { order_id: OrderId },
    AbandonmentCancelSent { order_id: OrderId },
}

/// Why a live attempt stopped without completing the order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptEndReason {
    Cancelled,
    Failed,
    PopupClosed,
    PopupBlocked,
    Rejected,
    GatewayUnavailable,
}

/// Shared, append-only buffer the checkout components raise events into.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<CheckoutEvent>>>);

impl EventLog {
    pub fn raise(&self, event: CheckoutEvent) {
        tracing::debug!(?event, "Checkout event");
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }

    pub fn take(&self) -> Vec<CheckoutEvent> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_drains() {
        let log = EventLog::default();
        log.raise(CheckoutEvent::OrderEntered { order_id: OrderId::new("OD1") });
        assert_eq!(log.clone().take().len(), 1);
        assert!(log.take().is_empty());
    }
}
