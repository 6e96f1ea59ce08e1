#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use bookstore_checkout::api::{
    ApiError, CheckoutApi, CreateOrderRequest, CreatedAttempt, CreatedOrder, LocalCheckoutApi, OrderStatusUpdate,
    PaymentAttemptRequest, PaymentReady, PaymentReadyRequest,
};
use bookstore_checkout::backend::Backend;
use bookstore_checkout::checkout::{
    CheckoutDeps, CheckoutForm, Clock, FormField, MessageHub, PageHost, PopupOpener, PopupRequest, PopupWindow,
};
use bookstore_checkout::config::{BackendConfig, CheckoutConfig};
use bookstore_checkout::domain::aggregates::LineItemRow;
use bookstore_checkout::domain::value_objects::{OrderId, Stamp};
use bookstore_checkout::storage::MemoryStore;

pub fn stamp(h: u32, m: u32, s: u32) -> Stamp {
    Stamp::new(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(h, m, s).unwrap())
}

pub struct ManualClock(Mutex<Stamp>);

impl ManualClock {
    pub fn starting_at(stamp: Stamp) -> Arc<Self> { Arc::new(Self(Mutex::new(stamp))) }

    pub fn advance(&self, secs: i64) {
        let mut now = self.0.lock().unwrap();
        *now = Stamp::new(now.at() + chrono::Duration::seconds(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Stamp { *self.0.lock().unwrap() }
}

#[derive(Default)]
pub struct RecordingHost {
    pub alerts: Mutex<Vec<String>>,
    pub focused: Mutex<Vec<FormField>>,
    pub navigations: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn alerts(&self) -> Vec<String> { self.alerts.lock().unwrap().clone() }
    pub fn focused(&self) -> Vec<FormField> { self.focused.lock().unwrap().clone() }
    pub fn navigations(&self) -> Vec<String> { self.navigations.lock().unwrap().clone() }
}

impl PageHost for RecordingHost {
    fn alert(&self, message: &str) { self.alerts.lock().unwrap().push(message.to_string()) }
    fn focus(&self, field: FormField) { self.focused.lock().unwrap().push(field) }
    fn navigate(&self, url: &str) { self.navigations.lock().unwrap().push(url.to_string()) }
}

#[derive(Clone, Default)]
pub struct FakeWindow(Arc<AtomicBool>);

impl FakeWindow {
    pub fn user_closes(&self) { self.0.store(true, Ordering::SeqCst) }
}

impl PopupWindow for FakeWindow {
    fn is_closed(&self) -> bool { self.0.load(Ordering::SeqCst) }
    fn close(&self) { self.0.store(true, Ordering::SeqCst) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Open,
    Refuse,
    ClosedAtOnce,
}

pub struct FakeOpener {
    pub mode: Mutex<OpenMode>,
    pub requests: Mutex<Vec<PopupRequest>>,
    pub windows: Mutex<Vec<FakeWindow>>,
}

impl FakeOpener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { mode: Mutex::new(OpenMode::Open), requests: Mutex::default(), windows: Mutex::default() })
    }

    pub fn set_mode(&self, mode: OpenMode) { *self.mode.lock().unwrap() = mode }
    pub fn requests(&self) -> Vec<PopupRequest> { self.requests.lock().unwrap().clone() }
    pub fn opened(&self) -> usize { self.windows.lock().unwrap().len() }
    pub fn last_window(&self) -> Option<FakeWindow> { self.windows.lock().unwrap().last().cloned() }

    /// Waits (in virtual time) until the `n`th popup has been opened.
    pub async fn wait_for(&self, n: usize) -> FakeWindow {
        loop {
            if self.opened() >= n {
                return self.windows.lock().unwrap()[n - 1].clone();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl PopupOpener for FakeOpener {
    fn open(&self, request: &PopupRequest) -> Option<Box<dyn PopupWindow>> {
        self.requests.lock().unwrap().push(request.clone());
        let window = FakeWindow::default();
        match *self.mode.lock().unwrap() {
            OpenMode::Refuse => return None,
            OpenMode::ClosedAtOnce => window.user_closes(),
            OpenMode::Open => {}
        }
        self.windows.lock().unwrap().push(window.clone());
        Some(Box::new(window))
    }
}

/// Local transport with switchable failures and call accounting.
pub struct FlakyApi {
    pub inner: LocalCheckoutApi,
    pub fail_invalidate: AtomicBool,
    pub fail_attempt: AtomicBool,
    pub fail_status_update: AtomicBool,
    pub fail_payment_complete: AtomicBool,
    pub create_order_calls: AtomicUsize,
    pub complete_payment_calls: AtomicUsize,
    pub beacons: Mutex<Vec<OrderId>>,
}

impl FlakyApi {
    pub fn new(backend: Arc<Backend>) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalCheckoutApi::new(backend),
            fail_invalidate: AtomicBool::new(false),
            fail_attempt: AtomicBool::new(false),
            fail_status_update: AtomicBool::new(false),
            fail_payment_complete: AtomicBool::new(false),
            create_order_calls: AtomicUsize::new(0),
            complete_payment_calls: AtomicUsize::new(0),
            beacons: Mutex::default(),
        })
    }

    pub fn beacons(&self) -> Vec<OrderId> { self.beacons.lock().unwrap().clone() }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), ApiError> {
        if flag.load(Ordering::SeqCst) { Err(ApiError::Rejected(format!("{what} unavailable"))) } else { Ok(()) }
    }
}

#[async_trait]
impl CheckoutApi for FlakyApi {
    async fn create_order(&self, req: &CreateOrderRequest) -> Result<CreatedOrder, ApiError> {
        self.create_order_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_order(req).await
    }

    async fn invalidate_prior_attempts(&self, order_id: &OrderId) -> Result<(), ApiError> {
        Self::check(&self.fail_invalidate, "invalidate")?;
        self.inner.invalidate_prior_attempts(order_id).await
    }

    async fn create_payment_attempt(&self, req: &PaymentAttemptRequest) -> Result<CreatedAttempt, ApiError> {
        Self::check(&self.fail_attempt, "attempt")?;
        self.inner.create_payment_attempt(req).await
    }

    async fn payment_ready(&self, req: &PaymentReadyRequest) -> Result<PaymentReady, ApiError> {
        self.inner.payment_ready(req).await
    }

    async fn update_order_status(&self, req: &OrderStatusUpdate) -> Result<(), ApiError> {
        Self::check(&self.fail_status_update, "status update")?;
        self.inner.update_order_status(req).await
    }

    async fn complete_payment(&self, order_id: &OrderId) -> Result<(), ApiError> {
        self.complete_payment_calls.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_payment_complete, "completion")?;
        self.inner.complete_payment(order_id).await
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<(), ApiError> { self.inner.cancel_order(order_id).await }

    fn send_cancel_beacon(&self, order_id: &OrderId) {
        self.beacons.lock().unwrap().push(order_id.clone());
        self.inner.send_cancel_beacon(order_id);
    }
}

pub struct Harness {
    pub backend: Arc<Backend>,
    pub api: Arc<FlakyApi>,
    pub store: Arc<MemoryStore>,
    pub host: Arc<RecordingHost>,
    pub opener: Arc<FakeOpener>,
    pub messages: MessageHub,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        let backend = Arc::new(Backend::new(BackendConfig::default()));
        Self {
            api: FlakyApi::new(backend.clone()),
            backend,
            store: Arc::new(MemoryStore::new()),
            host: Arc::new(RecordingHost::default()),
            opener: FakeOpener::new(),
            messages: MessageHub::new(),
            clock: ManualClock::starting_at(stamp(12, 0, 0)),
        }
    }

    pub fn deps(&self) -> CheckoutDeps {
        CheckoutDeps {
            config: CheckoutConfig::default(),
            api: self.api.clone(),
            store: self.store.clone(),
            host: self.host.clone(),
            opener: self.opener.clone(),
            messages: self.messages.clone(),
            clock: self.clock.clone(),
        }
    }
}

pub fn book(title: &str, qty: u32, line_total: i64) -> LineItemRow {
    LineItemRow {
        title: Some(title.to_string()),
        author: Some("Anonymous".to_string()),
        quantity_text: Some(format!("{qty}개")),
        price_text: Some(format!("{line_total}원")),
        image: Some(format!("/img/{title}.jpg")),
        isbn: Some("9788900000000".to_string()),
    }
}

pub fn filled_form() -> CheckoutForm {
    let mut form = CheckoutForm {
        orderer_name: "Kim Minji".into(),
        orderer_address: "12 Teheran-ro, Seoul".into(),
        orderer_phone: "010-1234-5678".into(),
        orderer_email: "minji@example.com".into(),
        agreed: true,
        ..Default::default()
    };
    form.copy_orderer_to_receiver();
    form
}
