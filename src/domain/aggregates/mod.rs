//! Aggregates module
pub mod order_context;
pub mod payment;
pub mod summary;

pub use order_context::{OrderContext, OrderContextStore};
pub use payment::{OrderRecord, OrderStatus, PaymentAttempt, PaymentMethod, PaymentStatus};
pub use summary::{LineItemRow, OrderSummary, OrderSummaryBuilder, ProductLine, ShippingPolicy};
