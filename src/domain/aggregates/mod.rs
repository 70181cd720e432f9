//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{CandidateError, ProductCandidate};
pub use order::{CouponState, DeliveryInfo, OrderSnapshot, OrderTotals, ShippingPolicy};
pub use cart::{Cart, ItemNotFound, LineItem};
