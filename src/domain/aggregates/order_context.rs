//! In-progress checkout identifiers, persisted across reloads

use std::sync::Arc;

use crate::domain::aggregates::summary::OrderSummary;
use crate::domain::value_objects::{OrderId, PaymentId, Stamp};
use crate::storage::{KeyValueStore, StoreError};

pub mod keys {
    pub const ORDER_ID: &str = "orderId";
    pub const ORDER_DATE: &str = "orderDate";
    pub const PAYMENT_ID: &str = "paymentId";
    pub const ID_FOR_ADMIN: &str = "idForAdmin";
    pub const ORDER_COMPLETED: &str = "orderCompleted";
    pub const ORDER_SUMMARY: &str = "orderSummary";

    pub const ALL: [&str; 6] = [ORDER_ID, ORDER_DATE, PAYMENT_ID, ID_FOR_ADMIN, ORDER_COMPLETED, ORDER_SUMMARY];
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderContext {
    pub order_id: Option<OrderId>,
    pub order_date: Option<String>,
    pub payment_id: Option<PaymentId>,
    pub id_for_admin: Option<String>,
    pub order_completed: bool,
}

impl OrderContext {
    /// Both identifiers the payment step needs, or `None`.
    pub fn payable(&self) -> Option<(&OrderId, &str)> {
        Some((self.order_id.as_ref()?, self.id_for_admin.as_deref()?))
    }

    pub fn is_cancellable(&self) -> bool { self.order_id.is_some() && !self.order_completed }
}

#[derive(Clone)]
pub struct OrderContextStore {
    store: Arc<dyn KeyValueStore>,
}

impl OrderContextStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self { Self { store } }

    /// Fresh entry into the checkout view: new provisional order id and date
    /// from one clock sample, everything from a previous order dropped.
    pub fn init_new_order(&self, stamp: &Stamp) -> Result<OrderContext, StoreError> {
        let order_id = OrderId::provisional(stamp);
        let order_date = stamp.iso();
        self.store.set(keys::ORDER_ID, order_id.as_str())?;
        self.store.set(keys::ORDER_DATE, &order_date)?;
        for key in [keys::ORDER_COMPLETED, keys::PAYMENT_ID, keys::ID_FOR_ADMIN, keys::ORDER_SUMMARY] {
            self.store.remove(key)?;
        }
        Ok(OrderContext { order_id: Some(order_id), order_date: Some(order_date), ..Default::default() })
    }

    pub fn load(&self) -> Result<OrderContext, StoreError> {
        Ok(OrderContext {
            order_id: self.store.get(keys::ORDER_ID)?.map(OrderId::new),
            order_date: self.store.get(keys::ORDER_DATE)?,
            payment_id: self.store.get(keys::PAYMENT_ID)?.map(PaymentId::new),
            id_for_admin: self.store.get(keys::ID_FOR_ADMIN)?,
            order_completed: self.store.get(keys::ORDER_COMPLETED)?.as_deref() == Some("true"),
        })
    }

    pub fn adopt_order_id(&self, order_id: &OrderId) -> Result<(), StoreError> { self.store.set(keys::ORDER_ID, order_id.as_str()) }
    pub fn set_payment_attempt(&self, payment_id: &PaymentId) -> Result<(), StoreError> { self.store.set(keys::PAYMENT_ID, payment_id.as_str()) }
    pub fn set_admin_ref(&self, id_for_admin: &str) -> Result<(), StoreError> { self.store.set(keys::ID_FOR_ADMIN, id_for_admin) }
    pub fn mark_completed(&self) -> Result<(), StoreError> { self.store.set(keys::ORDER_COMPLETED, "true") }

    pub fn save_summary(&self, summary: &OrderSummary) -> Result<(), StoreError> {
        self.store.set(keys::ORDER_SUMMARY, &serde_json::to_string(summary)?)
    }

    pub fn load_summary(&self) -> Result<Option<OrderSummary>, StoreError> {
        match self.store.get(keys::ORDER_SUMMARY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        for key in keys::ALL {
            self.store.remove(key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::NaiveDate;

    fn stamp(s: u32) -> Stamp { Stamp::new(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(12, 0, s).unwrap()) }

    #[test]
    fn test_init_new_order_clears_previous_attempt() {
        let ctx_store = OrderContextStore::new(Arc::new(MemoryStore::new()));
        ctx_store.init_new_order(&stamp(0)).unwrap();
        ctx_store.set_admin_ref("U7").unwrap();
        ctx_store.set_payment_attempt(&PaymentId::new("PM1")).unwrap();
        ctx_store.mark_completed().unwrap();

        let fresh = ctx_store.init_new_order(&stamp(9)).unwrap();
        assert_eq!(fresh.order_id.unwrap().as_str(), "OD20250601120009");
        let loaded = ctx_store.load().unwrap();
        assert_eq!(loaded.order_date.as_deref(), Some("2025-06-01T12:00:09"));
        assert_eq!(loaded.payment_id, None);
        assert_eq!(loaded.id_for_admin, None);
        assert!(!loaded.order_completed);
    }

    #[test]
    fn test_payable_needs_both_ids() {
        let ctx_store = OrderContextStore::new(Arc::new(MemoryStore::new()));
        ctx_store.init_new_order(&stamp(1)).unwrap();
        assert!(ctx_store.load().unwrap().payable().is_none());
        ctx_store.set_admin_ref("U7").unwrap();
        let ctx = ctx_store.load().unwrap();
        assert_eq!(ctx.payable().map(|(_, admin)| admin), Some("U7"));
        assert!(ctx.is_cancellable());
    }

    #[test]
    fn test_clear_removes_every_key() {
        let backing = Arc::new(MemoryStore::new());
        let ctx_store = OrderContextStore::new(backing.clone());
        ctx_store.init_new_order(&stamp(2)).unwrap();
        ctx_store.set_admin_ref("U7").unwrap();
        ctx_store.clear().unwrap();
        assert!(backing.is_empty());
        assert_eq!(ctx_store.load().unwrap(), OrderContext::default());
    }
}
