use std::sync::Arc;

use url::form_urlencoded;

use super::guard::AbandonmentGuard;
use super::host::PageHost;
use crate::api::{CheckoutApi, OrderStatusUpdate};
use crate::domain::aggregates::{OrderContextStore, OrderStatus};
use crate::domain::events::{CheckoutEvent, EventLog};
use crate::domain::value_objects::OrderId;

/// Where the browser goes once the order is done.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryRoute {
    pub path: String,
    pub order_id: OrderId,
    pub id_for_admin: String,
}

impl SummaryRoute {
    pub fn to_url(&self) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("orderId", self.order_id.as_str())
            .append_pair("idForAdmin", &self.id_for_admin)
            .finish();
        format!("{}?{}", self.path, query)
    }
}

pub struct CompletionHandler {
    api: Arc<dyn CheckoutApi>,
    store: OrderContextStore,
    guard: Arc<AbandonmentGuard>,
    host: Arc<dyn PageHost>,
    summary_path: String,
    events: EventLog,
}

impl CompletionHandler {
    pub fn new(
        api: Arc<dyn CheckoutApi>,
        store: OrderContextStore,
        guard: Arc<AbandonmentGuard>,
        host: Arc<dyn PageHost>,
        summary_path: impl Into<String>,
        events: EventLog,
    ) -> Self {
        Self { api, store, guard, host, summary_path: summary_path.into(), events }
    }

    /// Finalizes a successful payment. The server writes are best effort:
    /// a failure is logged and the user still reaches the summary view.
    pub async fn complete(&self, order_id: &OrderId, id_for_admin: &str) -> SummaryRoute {
        let update = OrderStatusUpdate { order_id: order_id.clone(), id_for_admin: id_for_admin.to_string(), status: OrderStatus::OrderCompleted };
        let status_written = match self.api.update_order_status(&update).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(order_id = %order_id, error = %e, "Failed to update order status");
                false
            }
        };
        // The payment record is settled even when the status write failed.
        let payment_written = match self.api.complete_payment(order_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(order_id = %order_id, error = %e, "Failed to complete payment");
                false
            }
        };
        if status_written && payment_written {
            tracing::info!(order_id = %order_id, "Order completed");
        }

        if let Err(e) = self.store.mark_completed() {
            tracing::error!(order_id = %order_id, error = %e, "Failed to persist completion marker");
        }
        self.guard.disarm_terminal();
        self.events.raise(CheckoutEvent::OrderCompleted { order_id: order_id.clone() });

        let route = SummaryRoute { path: self.summary_path.clone(), order_id: order_id.clone(), id_for_admin: id_for_admin.to_string() };
        self.host.navigate(&route.to_url());
        route
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_url_is_encoded() {
        let route = SummaryRoute { path: "/order/summary".into(), order_id: OrderId::new("OD20250601120000"), id_for_admin: "guest a&b".into() };
        assert_eq!(route.to_url(), "/order/summary?orderId=OD20250601120000&idForAdmin=guest+a%26b");
    }
}
