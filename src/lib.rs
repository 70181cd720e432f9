//! Storefront Cart
//!
//! Shopping-cart controller for a storefront page.
//!
//! ## Features
//! - Line-item merging with at most one line per product
//! - Stock-gated add and quantity updates
//! - Durable or session-scoped cart persistence
//! - Coupon discounts and free-shipping totals
//! - Checkout with final stock reconciliation and payment redirect
//! - HTML rendering of the cart view and transient notifications

pub mod config;
pub mod controller;
pub mod domain;
pub mod notify;
pub mod render;
pub mod services;
pub mod storage;
pub mod web;

use thiserror::Error;

pub use config::{CartConfig, StockFailurePolicy, StorageBackend};
pub use controller::{CartController, CheckoutOutcome, Services};
pub use domain::aggregates::{Cart, CouponState, DeliveryInfo, LineItem, OrderSnapshot, OrderTotals, ProductCandidate};
pub use domain::events::CartEvent;
pub use notify::{LogNotifier, Notifier, Severity, ToastBoard};
pub use storage::{FileStorage, MemoryStorage, Storage};

// =============================================================================
// Error Types
// =============================================================================

/// Everything a cart operation can fail with. Every variant leaves the cart
/// as it was before the operation started.
#[derive(Error, Debug)]
pub enum CartError {
    #[error("Invalid product data: {0}")]
    InvalidProduct(#[from] domain::aggregates::CandidateError),

    #[error("Insufficient stock for {name}. Available: {available}")]
    InsufficientStock { name: String, requested: u32, available: i64 },

    #[error("Insufficient stock for: {}", .products.join(", "))]
    StockUnavailable { products: Vec<String> },

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Please fill in the {field} field")]
    InvalidDelivery { field: &'static str },

    #[error("Enter a coupon code")]
    EmptyCoupon,

    #[error("A coupon is already applied")]
    CouponAlreadyApplied,

    #[error("{0}")]
    CouponRejected(String),

    #[error("Order amount is too large")]
    AmountOutOfRange,

    #[error("Checkout already in progress")]
    CheckoutInProgress,

    #[error("{0}")]
    PaymentLinkMissing(String),

    #[error("Storefront service error: {0}")]
    Service(#[from] ServiceError),
}

/// Transport-level failures talking to the storefront API.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Rejected(String),
}

/// Persistence failures. Callers log and swallow these.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
