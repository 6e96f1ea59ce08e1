//! Environment-driven configuration. Call `dotenvy::dotenv()` first to pick
//! up a local `.env`.

use std::str::FromStr;
use std::time::Duration;

use crate::domain::aggregates::ShippingPolicy;
use crate::domain::value_objects::Money;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparseable configuration value");
            default
        }),
        Err(_) => default,
    }
}

fn millis_or(key: &str, default_ms: u64) -> Duration { Duration::from_millis(env_or(key, default_ms)) }

/// Popup supervision timings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PopupTimings {
    /// How often `closed` is sampled once polling has started.
    pub poll_interval: Duration,
    /// Delay before polling starts for redirect flows, so the initial
    /// navigation is not read as a close.
    pub redirect_grace: Duration,
    /// A popup found closed this soon after opening counts as blocked.
    pub open_check_delay: Duration,
}

impl Default for PopupTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            redirect_grace: Duration::from_millis(3000),
            open_check_delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DepositAccount {
    pub bank_name: String,
    pub account_number: String,
}

impl Default for DepositAccount {
    fn default() -> Self { Self { bank_name: "Fastcampus Bank".to_string(), account_number: "123-456-7890".to_string() } }
}

#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    pub backend_url: String,
    pub http_timeout: Duration,
    pub popup: PopupTimings,
    pub shipping: ShippingPolicy,
    pub summary_path: String,
    pub deposit: DepositAccount,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8083".to_string(),
            http_timeout: Duration::from_millis(10_000),
            popup: PopupTimings::default(),
            shipping: ShippingPolicy::default(),
            summary_path: "/order/summary".to_string(),
            deposit: DepositAccount::default(),
        }
    }
}

impl CheckoutConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            backend_url: env_or("CHECKOUT_BACKEND_URL", d.backend_url),
            http_timeout: millis_or("CHECKOUT_HTTP_TIMEOUT_MS", 10_000),
            popup: PopupTimings {
                poll_interval: millis_or("POPUP_POLL_INTERVAL_MS", 100),
                redirect_grace: millis_or("POPUP_REDIRECT_GRACE_MS", 3000),
                open_check_delay: millis_or("POPUP_OPEN_CHECK_MS", 1000),
            },
            shipping: ShippingPolicy {
                free_threshold: Money::new(env_or("FREE_SHIPPING_THRESHOLD", d.shipping.free_threshold.amount())),
                flat_fee: Money::new(env_or("SHIPPING_FEE", d.shipping.flat_fee.amount())),
            },
            summary_path: env_or("ORDER_SUMMARY_PATH", d.summary_path),
            deposit: DepositAccount {
                bank_name: env_or("DEPOSIT_BANK", d.deposit.bank_name),
                account_number: env_or("DEPOSIT_ACCOUNT", d.deposit.account_number),
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub port: u16,
    /// Absolute origin used when building sandbox redirect URLs.
    pub public_url: String,
    pub shipping: ShippingPolicy,
}

impl Default for BackendConfig {
    fn default() -> Self { Self { port: 8083, public_url: "http://localhost:8083".to_string(), shipping: ShippingPolicy::default() } }
}

impl BackendConfig {
    pub fn from_env() -> Self {
        let port = env_or("PORT", 8083u16);
        Self {
            port,
            public_url: env_or("PUBLIC_URL", format!("http://localhost:{port}")),
            shipping: CheckoutConfig::from_env().shipping,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_observed_timings() {
        let cfg = CheckoutConfig::default();
        assert_eq!(cfg.popup.poll_interval, Duration::from_millis(100));
        assert_eq!(cfg.popup.redirect_grace, Duration::from_secs(3));
        assert_eq!(cfg.shipping.flat_fee, Money::new(3000));
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        std::env::set_var("BOOKSTORE_CHECKOUT_TEST_PORT", "not-a-port");
        assert_eq!(env_or("BOOKSTORE_CHECKOUT_TEST_PORT", 8083u16), 8083);
        std::env::set_var("BOOKSTORE_CHECKOUT_TEST_PORT", " 9000 ");
        assert_eq!(env_or("BOOKSTORE_CHECKOUT_TEST_PORT", 8083u16), 9000);
    }
}
