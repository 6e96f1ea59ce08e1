//! Drives one payment attempt from the pay button to a terminal outcome.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::completion::{CompletionHandler, SummaryRoute};
use super::form::CheckoutForm;
use super::guard::AbandonmentGuard;
use super::host::{Clock, PageHost};
use super::popup::{deposit_notice, MessageHub, PopupChannel, PopupContent, PopupOpener, PopupOutcome, PopupRequest};
use crate::api::{CheckoutApi, PaymentAttemptRequest, PaymentReadyRequest};
use crate::config::CheckoutConfig;
use crate::domain::aggregates::{OrderContextStore, PaymentMethod};
use crate::domain::events::{AttemptEndReason, CheckoutEvent, EventLog};
use crate::domain::value_objects::{OrderId, PaymentId};
use crate::{CheckoutError, Result};

const KAKAO_POPUP: (&str, u32, u32) = ("kakaoPayPopup", 500, 700);
const DEPOSIT_POPUP: (&str, u32, u32) = ("accountPopup", 400, 300);

const POPUP_BLOCKED: &str = "The payment window could not be opened. Please allow popups and try again.";
const MISSING_CONTEXT: &str = "Payment information is incomplete. Please reload the page and try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Validating,
    InvalidatingPrior,
    CreatingAttempt,
    OpeningPopup,
    Live,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Completed(SummaryRoute),
    /// The attempt ended without payment; the user may pay again.
    Retry(AttemptEndReason),
}

/// Resets the coordinator to `Idle` on every exit path except completion.
struct InFlight<'a> {
    state: &'a Mutex<CoordinatorState>,
    done: bool,
}

impl InFlight<'_> {
    fn enter(&self, next: CoordinatorState) { *lock(self.state) = next; }

    fn complete(mut self) {
        *lock(self.state) = CoordinatorState::Completed;
        self.done = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            *lock(self.state) = CoordinatorState::Idle;
        }
    }
}

fn lock(state: &Mutex<CoordinatorState>) -> MutexGuard<'_, CoordinatorState> { state.lock().unwrap_or_else(PoisonError::into_inner) }

pub struct PaymentAttemptCoordinator {
    config: CheckoutConfig,
    api: Arc<dyn CheckoutApi>,
    store: OrderContextStore,
    guard: Arc<AbandonmentGuard>,
    host: Arc<dyn PageHost>,
    opener: Arc<dyn PopupOpener>,
    messages: MessageHub,
    clock: Arc<dyn Clock>,
    completion: CompletionHandler,
    events: EventLog,
    state: Mutex<CoordinatorState>,
}

impl PaymentAttemptCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: CheckoutConfig,
        api: Arc<dyn CheckoutApi>,
        store: OrderContextStore,
        guard: Arc<AbandonmentGuard>,
        host: Arc<dyn PageHost>,
        opener: Arc<dyn PopupOpener>,
        messages: MessageHub,
        clock: Arc<dyn Clock>,
        events: EventLog,
    ) -> Self {
        let completion = CompletionHandler::new(api.clone(), store.clone(), guard.clone(), host.clone(), config.summary_path.clone(), events.clone());
        Self { config, api, store, guard, host, opener, messages, clock, completion, events, state: Mutex::new(CoordinatorState::Idle) }
    }

    pub fn state(&self) -> CoordinatorState { *lock(&self.state) }

    fn begin(&self) -> Result<InFlight<'_>> {
        let mut state = lock(&self.state);
        match *state {
            CoordinatorState::Idle => {
                *state = CoordinatorState::Validating;
                Ok(InFlight { state: &self.state, done: false })
            }
            CoordinatorState::Completed => Err(CheckoutError::AlreadyCompleted),
            _ => Err(CheckoutError::AttemptInProgress),
        }
    }

    /// Handles a pay click. A second click while an attempt is running is
    /// refused with [`CheckoutError::AttemptInProgress`].
    pub async fn pay(&self, form: &CheckoutForm, method: Option<PaymentMethod>) -> Result<AttemptOutcome> {
        let flight = self.begin()?;

        if let Err(field) = form.check() {
            self.host.alert(&field.message());
            self.host.focus(field);
            return Err(CheckoutError::Validation { field });
        }
        let Some(method) = method else {
            self.host.alert("Please choose a payment method.");
            return Err(CheckoutError::NoPaymentMethod);
        };
        let context = self.store.load()?;
        let Some((order_id, id_for_admin)) = context.payable().map(|(o, a)| (o.clone(), a.to_string())) else {
            self.host.alert(MISSING_CONTEXT);
            return Err(CheckoutError::MissingOrderContext);
        };

        flight.enter(CoordinatorState::InvalidatingPrior);
        let acknowledged = match self.api.invalidate_prior_attempts(&order_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(order_id = %order_id, error = %e, "Could not invalidate earlier payment attempts");
                false
            }
        };
        self.events.raise(CheckoutEvent::PriorAttemptsInvalidated { order_id: order_id.clone(), acknowledged });

        flight.enter(CoordinatorState::CreatingAttempt);
        let stamp = self.clock.now();
        let provisional = PaymentId::provisional(&stamp);
        self.store.set_payment_attempt(&provisional)?;
        self.guard.arm();

        let result = self.run_attempt(&flight, &order_id, &id_for_admin, method, provisional, stamp.iso()).await;
        match result {
            Ok(AttemptOutcome::Completed(_)) => flight.complete(),
            _ => self.guard.disarm_retry(),
        }
        result
    }

    async fn run_attempt(
        &self,
        flight: &InFlight<'_>,
        order_id: &OrderId,
        id_for_admin: &str,
        method: PaymentMethod,
        provisional: PaymentId,
        payment_date: String,
    ) -> Result<AttemptOutcome> {
        let request = PaymentAttemptRequest {
            order_id: order_id.clone(),
            id_for_admin: id_for_admin.to_string(),
            payment_id: provisional.clone(),
            payment_method: method,
            payment_date,
        };
        let payment_id = match self.api.create_payment_attempt(&request).await {
            Ok(created) => created.payment_id.unwrap_or(provisional),
            Err(e) => {
                tracing::error!(order_id = %order_id, error = %e, "Payment attempt rejected");
                self.host.alert(&format!("Could not save payment information: {e}"));
                self.events.raise(CheckoutEvent::AttemptEnded { payment_id: provisional, reason: AttemptEndReason::Rejected });
                return Err(CheckoutError::AttemptRejected(e.to_string()));
            }
        };
        if payment_id != request.payment_id {
            self.store.set_payment_attempt(&payment_id)?;
        }
        self.events.raise(CheckoutEvent::AttemptCreated { order_id: order_id.clone(), payment_id: payment_id.clone(), method });

        flight.enter(CoordinatorState::OpeningPopup);
        let (popup, grace) = match method {
            PaymentMethod::KakaoPay => {
                let url = match self.gateway_url(&payment_id).await {
                    Ok(url) => url,
                    Err(e) => {
                        self.host.alert(&format!("Could not start KakaoPay: {e}"));
                        self.events.raise(CheckoutEvent::AttemptEnded { payment_id, reason: AttemptEndReason::GatewayUnavailable });
                        return Err(e);
                    }
                };
                let (name, width, height) = KAKAO_POPUP;
                (PopupRequest::centered(name, PopupContent::Url(url), width, height, self.host.geometry()), self.config.popup.redirect_grace)
            }
            PaymentMethod::BankTransfer => {
                let (name, width, height) = DEPOSIT_POPUP;
                let notice = PopupContent::Document(deposit_notice(&self.config.deposit));
                (PopupRequest::centered(name, notice, width, height, self.host.geometry()), Duration::ZERO)
            }
        };

        let Some(channel) = PopupChannel::open(self.opener.as_ref(), &self.messages, &popup, self.config.popup, grace) else {
            return Err(self.popup_blocked(payment_id));
        };
        self.events.raise(CheckoutEvent::PopupOpened { payment_id: payment_id.clone(), method });
        flight.enter(CoordinatorState::Live);

        let (outcome, window) = channel.watch().await;
        let reason = match outcome {
            PopupOutcome::Succeeded => {
                let route = self.completion.complete(order_id, id_for_admin).await;
                if !window.is_closed() {
                    window.close();
                }
                return Ok(AttemptOutcome::Completed(route));
            }
            PopupOutcome::OpenFailed => return Err(self.popup_blocked(payment_id)),
            PopupOutcome::Cancelled => AttemptEndReason::Cancelled,
            PopupOutcome::Failed => AttemptEndReason::Failed,
            PopupOutcome::Closed => AttemptEndReason::PopupClosed,
        };
        tracing::info!(payment_id = %payment_id, ?reason, "Payment attempt ended without payment");
        self.events.raise(CheckoutEvent::AttemptEnded { payment_id, reason });
        Ok(AttemptOutcome::Retry(reason))
    }

    /// Prepares the gateway session from the stored order summary.
    async fn gateway_url(&self, payment_id: &PaymentId) -> Result<String> {
        let summary = self.store.load_summary()?.ok_or_else(|| CheckoutError::GatewayUnavailable("order summary is not available".into()))?;
        let request = PaymentReadyRequest {
            order_number: summary.order_number.clone(),
            orderer_name: summary.orderer_name.clone(),
            item_name: summary.item_name(),
            quantity: u32::try_from(summary.product_list.len()).unwrap_or(u32::MAX),
            total_amount: summary.final_amount,
            payment_id: payment_id.clone(),
        };
        let ready = self.api.payment_ready(&request).await.map_err(|e| CheckoutError::GatewayUnavailable(e.to_string()))?;
        ready.next_redirect_pc_url.ok_or_else(|| CheckoutError::GatewayUnavailable("no redirect URL returned".into()))
    }

    fn popup_blocked(&self, payment_id: PaymentId) -> CheckoutError {
        tracing::warn!(payment_id = %payment_id, "Payment popup blocked");
        self.host.alert(POPUP_BLOCKED);
        self.events.raise(CheckoutEvent::AttemptEnded { payment_id, reason: AttemptEndReason::PopupBlocked });
        CheckoutError::PopupBlocked
    }
}
