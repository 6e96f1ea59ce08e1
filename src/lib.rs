//! Bookstore checkout
//!
//! Client-side order and payment-attempt lifecycle for an online bookstore,
//! plus an in-memory reference backend speaking the same REST contract.
//!
//! ## Features
//! - Order context persisted across reloads
//! - Order summary and shipping fee derivation
//! - One live payment attempt at a time, in a supervised popup
//! - Abandonment detection that cancels the server-side order once

pub mod api;
pub mod backend;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod storage;

use thiserror::Error;

use crate::api::ApiError;
use crate::checkout::FormField;
use crate::storage::StoreError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Invalid field: {}", .field.label())]
    Validation { field: FormField },

    #[error("No payment method selected")]
    NoPaymentMethod,

    #[error("Order context is incomplete")]
    MissingOrderContext,

    #[error("A payment attempt is already in progress")]
    AttemptInProgress,

    #[error("Order is already completed")]
    AlreadyCompleted,

    #[error("Payment attempt rejected: {0}")]
    AttemptRejected(String),

    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Payment popup was blocked")]
    PopupBlocked,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
