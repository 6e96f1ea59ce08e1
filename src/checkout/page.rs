use std::sync::Arc;

use super::coordinator::{AttemptOutcome, CoordinatorState, PaymentAttemptCoordinator};
use super::form::CheckoutForm;
use super::guard::{AbandonmentGuard, ExitDecision, ExitSignal, GuardState};
use super::host::{Clock, PageHost};
use super::popup::{MessageHub, PopupOpener};
use crate::api::{CheckoutApi, CreateOrderRequest};
use crate::config::CheckoutConfig;
use crate::domain::aggregates::{LineItemRow, OrderContext, OrderContextStore, OrderSummaryBuilder, PaymentMethod};
use crate::domain::events::{CheckoutEvent, EventLog};
use crate::domain::value_objects::OrderId;
use crate::storage::KeyValueStore;
use crate::Result;

/// Everything the checkout view talks to.
#[derive(Clone)]
pub struct CheckoutDeps {
    pub config: CheckoutConfig,
    pub api: Arc<dyn CheckoutApi>,
    pub store: Arc<dyn KeyValueStore>,
    pub host: Arc<dyn PageHost>,
    pub opener: Arc<dyn PopupOpener>,
    pub messages: MessageHub,
    pub clock: Arc<dyn Clock>,
}

/// One visit to the checkout view.
pub struct CheckoutPage {
    store: OrderContextStore,
    guard: Arc<AbandonmentGuard>,
    coordinator: PaymentAttemptCoordinator,
    events: EventLog,
}

impl CheckoutPage {
    fn wire(deps: CheckoutDeps) -> Self {
        let events = EventLog::default();
        let store = OrderContextStore::new(deps.store);
        let guard = Arc::new(AbandonmentGuard::new(store.clone(), deps.api.clone(), events.clone()));
        let coordinator = PaymentAttemptCoordinator::new(
            deps.config,
            deps.api,
            store.clone(),
            guard.clone(),
            deps.host,
            deps.opener,
            deps.messages,
            deps.clock,
            events.clone(),
        );
        Self { store, guard, coordinator, events }
    }

    /// Fresh entry: new order identity, server registration when there is
    /// something to order, and the summary snapshot.
    pub async fn enter(deps: CheckoutDeps, rows: &[LineItemRow], orderer_name: &str) -> Result<Self> {
        let stamp = deps.clock.now();
        let api = deps.api.clone();
        let builder = OrderSummaryBuilder::new(deps.config.shipping);
        let page = Self::wire(deps);

        page.store.init_new_order(&stamp)?;
        let mut order_id = OrderId::provisional(&stamp);
        if !rows.is_empty() {
            let request = CreateOrderRequest {
                products: OrderSummaryBuilder::product_lines(rows),
                order_id: order_id.to_string(),
                order_date: stamp.iso(),
                customer_id: None,
            };
            match api.create_order(&request).await {
                Ok(created) => {
                    if let Some(canonical) = created.order_id.filter(|c| *c != order_id) {
                        tracing::info!(provisional = %order_id, canonical = %canonical, "Adopting server order id");
                        page.store.adopt_order_id(&canonical)?;
                        order_id = canonical;
                    }
                    match created.id_for_admin {
                        Some(admin) => page.store.set_admin_ref(&admin)?,
                        None => tracing::warn!(order_id = %order_id, "Order created without an admin reference"),
                    }
                }
                Err(e) => tracing::warn!(order_id = %order_id, error = %e, "Order registration failed"),
            }
        }

        page.store.save_summary(&builder.build(order_id.as_str(), orderer_name, rows))?;
        tracing::info!(order_id = %order_id, lines = rows.len(), "Checkout entered");
        page.events.raise(CheckoutEvent::OrderEntered { order_id });
        Ok(page)
    }

    /// Reattaches to whatever context is already stored, e.g. after a reload.
    pub fn resume(deps: CheckoutDeps) -> Self { Self::wire(deps) }

    pub async fn pay(&self, form: &CheckoutForm, method: Option<PaymentMethod>) -> Result<AttemptOutcome> {
        self.coordinator.pay(form, method).await
    }

    pub fn exit_signal(&self, signal: ExitSignal) -> ExitDecision { self.guard.on_exit_signal(signal) }

    pub fn context(&self) -> Result<OrderContext> { Ok(self.store.load()?) }

    pub fn guard_state(&self) -> GuardState { self.guard.state() }

    pub fn payment_in_progress(&self) -> bool { self.guard.payment_in_progress() }

    pub fn coordinator_state(&self) -> CoordinatorState { self.coordinator.state() }

    pub fn take_events(&self) -> Vec<CheckoutEvent> { self.events.take() }
}

/// The order summary view drops the finished checkout's context on load.
pub struct SummaryPage;

impl SummaryPage {
    pub fn on_load(store: Arc<dyn KeyValueStore>) -> Result<()> {
        OrderContextStore::new(store).clear()?;
        tracing::debug!("Checkout context cleared");
        Ok(())
    }
}
