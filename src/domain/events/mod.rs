//! Cart events, one per committed mutation.
use crate::domain::value_objects::{CouponCode, Money, ProductId, Quantity};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartEvent {
    ItemAdded { product_id: ProductId, added: Quantity, line_quantity: Quantity },
    ItemRemoved { product_id: ProductId },
    QuantityUpdated { product_id: ProductId, quantity: Quantity },
    CouponApplied { code: CouponCode, discount: Money },
    CheckedOut { order_id: String },
    Cleared,
}
