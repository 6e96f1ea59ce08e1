//! Client-side checkout core: order context, exit guard, payment attempts
//! and the popup they run in.

mod completion;
mod coordinator;
mod form;
mod guard;
mod host;
mod page;
mod popup;

pub use completion::{CompletionHandler, SummaryRoute};
pub use coordinator::{AttemptOutcome, CoordinatorState, PaymentAttemptCoordinator};
pub use form::{CheckoutForm, FormField};
pub use guard::{AbandonmentGuard, ExitDecision, ExitSignal, GuardState, SuppressReason};
pub use host::{Clock, PageHost, SystemClock, WindowGeometry};
pub use page::{CheckoutDeps, CheckoutPage, SummaryPage};
pub use popup::{
    deposit_notice, MessageHub, PopupChannel, PopupContent, PopupMessage, PopupOpener, PopupOutcome, PopupRequest,
    PopupWindow, Subscription,
};
