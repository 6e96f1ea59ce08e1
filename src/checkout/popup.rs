//! Payment popup supervision: opening, message relay and close detection.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use super::host::WindowGeometry;
use crate::config::{DepositAccount, PopupTimings};

/// Outcome reported by the popup to its opener.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopupMessage {
    Success,
    Cancel,
    Fail,
}

impl PopupMessage {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "KAKAO_PAY_SUCCESS" | "KAKAO_PAY_SUMMARY" | "DEPOSIT_CONFIRMED" => Some(Self::Success),
            "KAKAO_PAY_CANCEL" => Some(Self::Cancel),
            "KAKAO_PAY_FAIL" => Some(Self::Fail),
            _ => None,
        }
    }

    pub fn wire(&self) -> &'static str {
        match self {
            Self::Success => "KAKAO_PAY_SUCCESS",
            Self::Cancel => "KAKAO_PAY_CANCEL",
            Self::Fail => "KAKAO_PAY_FAIL",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PopupContent {
    Url(String),
    /// Inline document written into a blank window.
    Document(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopupRequest {
    pub name: &'static str,
    pub content: PopupContent,
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
}

impl PopupRequest {
    pub fn centered(name: &'static str, content: PopupContent, width: u32, height: u32, host: WindowGeometry) -> Self {
        let (left, top) = host.centered(width, height);
        Self { name, content, width, height, left, top }
    }
}

pub trait PopupWindow: Send + Sync {
    fn is_closed(&self) -> bool;
    fn close(&self);
}

pub trait PopupOpener: Send + Sync {
    /// `None` when the window could not be created at all.
    fn open(&self, request: &PopupRequest) -> Option<Box<dyn PopupWindow>>;
}

#[derive(Default)]
struct HubSlot {
    next_id: u64,
    listener: Option<(u64, mpsc::UnboundedSender<String>)>,
}

/// Cross-window message bus of the checkout page. At most one listener is
/// registered at a time; subscribing replaces the previous one.
#[derive(Clone, Default)]
pub struct MessageHub {
    slot: Arc<Mutex<HubSlot>>,
}

impl MessageHub {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> MutexGuard<'_, HubSlot> { self.slot.lock().unwrap_or_else(PoisonError::into_inner) }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut slot = self.lock();
        slot.next_id += 1;
        let id = slot.next_id;
        slot.listener = Some((id, tx));
        Subscription { id, hub: self.clone(), rx }
    }

    /// Delivers to the current listener. Returns whether anyone was listening.
    pub fn post(&self, data: impl Into<String>) -> bool {
        match &self.lock().listener {
            Some((_, tx)) => tx.send(data.into()).is_ok(),
            None => false,
        }
    }

    pub fn has_listener(&self) -> bool { self.lock().listener.is_some() }
}

/// Registered listener; unregisters itself when dropped.
pub struct Subscription {
    id: u64,
    hub: MessageHub,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Subscription {
    /// `None` once a newer subscription has replaced this one.
    pub async fn recv(&mut self) -> Option<String> { self.rx.recv().await }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut slot = self.hub.lock();
        if matches!(slot.listener, Some((id, _)) if id == self.id) {
            slot.listener = None;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopupOutcome {
    Succeeded,
    Cancelled,
    Failed,
    /// Closed by the user without reporting anything.
    Closed,
    /// Closed before it could plausibly have been used.
    OpenFailed,
}

impl From<PopupMessage> for PopupOutcome {
    fn from(m: PopupMessage) -> Self {
        match m {
            PopupMessage::Success => Self::Succeeded,
            PopupMessage::Cancel => Self::Cancelled,
            PopupMessage::Fail => Self::Failed,
        }
    }
}

/// A live payment popup together with its message listener and close poll.
pub struct PopupChannel {
    window: Box<dyn PopupWindow>,
    subscription: Subscription,
    opened_at: Instant,
    grace: Duration,
    timings: PopupTimings,
}

impl PopupChannel {
    /// Subscribes before opening so nothing the popup posts is lost. `None`
    /// when the opener refuses or the window is already closed.
    pub fn open(opener: &dyn PopupOpener, hub: &MessageHub, request: &PopupRequest, timings: PopupTimings, grace: Duration) -> Option<Self> {
        let subscription = hub.subscribe();
        let window = opener.open(request)?;
        if window.is_closed() {
            tracing::warn!(popup = request.name, "Popup closed immediately after opening");
            return None;
        }
        tracing::debug!(popup = request.name, ?grace, "Popup opened");
        Some(Self { window, subscription, opened_at: Instant::now(), grace, timings })
    }

    /// Runs until the first recognised message or a detected close. The
    /// listener and the poll are both gone when this returns; the window
    /// handle is handed back so the caller can close it.
    pub async fn watch(self) -> (PopupOutcome, Box<dyn PopupWindow>) {
        let Self { window, mut subscription, opened_at, grace, timings } = self;
        let mut poll = tokio::time::interval_at(opened_at + grace, timings.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let outcome = loop {
            tokio::select! {
                biased;
                raw = subscription.recv() => match raw {
                    Some(raw) => match PopupMessage::parse(&raw) {
                        Some(message) => break PopupOutcome::from(message),
                        None => tracing::debug!(message = %raw, "Ignoring unrelated window message"),
                    },
                    None => {
                        tracing::warn!("Popup listener was replaced; treating popup as closed");
                        break PopupOutcome::Closed;
                    }
                },
                _ = poll.tick() => {
                    if window.is_closed() {
                        break if opened_at.elapsed() < timings.open_check_delay { PopupOutcome::OpenFailed } else { PopupOutcome::Closed };
                    }
                }
            }
        };
        drop(subscription);
        tracing::debug!(?outcome, "Popup watch finished");
        (outcome, window)
    }
}

/// Inline notice shown for bank-transfer payments. The confirm button reports
/// back to the opener and closes the window.
pub fn deposit_notice(account: &DepositAccount) -> String {
    format!(
        "<!doctype html><html><head><title>Deposit account</title></head>\
         <body style=\"font-family:sans-serif;padding:20px\">\
         <h3>Deposit account</h3>\
         <p>Bank: {bank}</p><p>Account: {number}</p>\
         <p>Please complete the transfer, then press confirm.</p>\
         <button onclick=\"if (window.opener) {{ window.opener.postMessage('DEPOSIT_CONFIRMED', '*'); }} window.close();\">Confirm</button>\
         </body></html>",
        bank = account.bank_name,
        number = account.account_number,
    )
}
