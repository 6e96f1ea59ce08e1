//! Cancels the server-side order when the user leaves checkout mid-flow.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::CheckoutApi;
use crate::domain::aggregates::OrderContextStore;
use crate::domain::events::{CheckoutEvent, EventLog};
use crate::domain::value_objects::OrderId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardState {
    Idle,
    /// A payment attempt is live; leaving is not abandonment.
    Armed,
    /// Attempt ended without success; exit handling is back on.
    DisarmedRetry,
    /// Order completed; exit handling is permanently off.
    DisarmedTerminal,
}

/// Ways the user can leave the checkout view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitSignal {
    BeforeUnload,
    Unload,
    PopState,
    LinkClick { payment_control: bool },
    FormSubmit,
}

impl ExitSignal {
    fn is_unload(&self) -> bool { matches!(self, Self::BeforeUnload | Self::Unload) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuppressReason {
    ListenersDetached,
    PaymentInProgress,
    AlreadySent,
    PaymentControl,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitDecision {
    Suppressed(SuppressReason),
    NothingToCancel,
    CancelSent { order_id: OrderId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Listeners {
    Attached,
    UnloadDetached,
    Stripped,
}

struct Flags {
    state: GuardState,
    listeners: Listeners,
    fail_sent: bool,
}

pub struct AbandonmentGuard {
    flags: Mutex<Flags>,
    store: OrderContextStore,
    api: Arc<dyn CheckoutApi>,
    events: EventLog,
}

impl AbandonmentGuard {
    pub fn new(store: OrderContextStore, api: Arc<dyn CheckoutApi>, events: EventLog) -> Self {
        Self {
            flags: Mutex::new(Flags { state: GuardState::Idle, listeners: Listeners::Attached, fail_sent: false }),
            store,
            api,
            events,
        }
    }

    fn flags(&self) -> MutexGuard<'_, Flags> { self.flags.lock().unwrap_or_else(PoisonError::into_inner) }

    pub fn state(&self) -> GuardState { self.flags().state }

    pub fn payment_in_progress(&self) -> bool { self.flags().state == GuardState::Armed }

    pub fn cancel_sent(&self) -> bool { self.flags().fail_sent }

    /// Whether `signal` would currently reach the guard at all.
    pub fn listens_to(&self, signal: ExitSignal) -> bool {
        match self.flags().listeners {
            Listeners::Attached => true,
            Listeners::UnloadDetached => !signal.is_unload(),
            Listeners::Stripped => false,
        }
    }

    /// Returns false once the order has completed.
    pub fn arm(&self) -> bool {
        let mut flags = self.flags();
        if flags.state == GuardState::DisarmedTerminal {
            return false;
        }
        flags.state = GuardState::Armed;
        flags.listeners = Listeners::UnloadDetached;
        true
    }

    pub fn disarm_retry(&self) {
        let mut flags = self.flags();
        if flags.state != GuardState::Armed {
            tracing::debug!(state = ?flags.state, "Guard not armed; nothing to disarm");
            return;
        }
        flags.state = GuardState::DisarmedRetry;
        flags.listeners = Listeners::Attached;
    }

    /// Latches the cancellation flag and strips every listener for good, in
    /// one step so no exit signal slips in between.
    pub fn disarm_terminal(&self) {
        let mut flags = self.flags();
        flags.fail_sent = true;
        flags.listeners = Listeners::Stripped;
        flags.state = GuardState::DisarmedTerminal;
    }

    /// Sends at most one cancellation for the lifetime of the guard, and
    /// never while an attempt is live or after completion.
    pub fn on_exit_signal(&self, signal: ExitSignal) -> ExitDecision {
        let order_id = {
            let mut flags = self.flags();
            let detached = match flags.listeners {
                Listeners::Attached => false,
                Listeners::UnloadDetached => signal.is_unload(),
                Listeners::Stripped => true,
            };
            if detached {
                return ExitDecision::Suppressed(SuppressReason::ListenersDetached);
            }
            if matches!(signal, ExitSignal::LinkClick { payment_control: true }) {
                return ExitDecision::Suppressed(SuppressReason::PaymentControl);
            }
            if flags.fail_sent {
                return ExitDecision::Suppressed(SuppressReason::AlreadySent);
            }
            if flags.state == GuardState::Armed {
                return ExitDecision::Suppressed(SuppressReason::PaymentInProgress);
            }
            let context = match self.store.load() {
                Ok(context) => context,
                Err(e) => {
                    tracing::warn!(error = %e, "Order context unreadable; not cancelling");
                    return ExitDecision::NothingToCancel;
                }
            };
            if !context.is_cancellable() {
                return ExitDecision::NothingToCancel;
            }
            let Some(order_id) = context.order_id else {
                return ExitDecision::NothingToCancel;
            };
            flags.fail_sent = true;
            order_id
        };

        tracing::info!(order_id = %order_id, ?signal, "Checkout abandoned; cancelling order");
        self.api.send_cancel_beacon(&order_id);
        self.events.raise(CheckoutEvent::AbandonmentCancelSent { order_id: order_id.clone() });
        ExitDecision::CancelSent { order_id }
    }
}
