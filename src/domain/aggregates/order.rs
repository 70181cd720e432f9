//! Order-side types: delivery data, derived totals, the active coupon and the
//! snapshot kept after a completed checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::domain::aggregates::cart::{Cart, LineItem};
use crate::domain::value_objects::{CouponCode, Money};

/// Delivery form contents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct DeliveryInfo {
    #[validate(length(min = 1))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 20))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 2))]
    pub state: String,
    #[validate(length(min = 3, max = 12))]
    pub zip_code: String,
}

impl DeliveryInfo {
    /// Fields in the order they appear on the form.
    pub const FIELDS: [&'static str; 7] = ["full_name", "email", "phone", "address", "city", "state", "zip_code"];

    /// First field, in form order, that fails validation.
    pub fn first_invalid_field(&self) -> Option<&'static str> {
        let errors = self.validate().err()?;
        let failed = errors.field_errors();
        Self::FIELDS.into_iter().find(|field| failed.contains_key(field))
    }
}

/// Free-shipping threshold and flat fee below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub free_threshold: Money,
    pub flat_fee: Money,
}

impl ShippingPolicy {
    pub fn shipping_for(&self, subtotal: Money) -> Money {
        if subtotal >= self.free_threshold { Money::zero() } else { self.flat_fee }
    }
}

/// Derived totals; never persisted with the cart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping: Money,
    pub discount: Money,
    pub total: Money,
}

impl OrderTotals {
    pub fn compute(subtotal: Money, discount: Money, policy: &ShippingPolicy) -> Self {
        let shipping = policy.shipping_for(subtotal);
        let total = subtotal.add(shipping).saturating_sub(discount);
        Self { subtotal, shipping, discount, total }
    }

    pub fn for_cart(cart: &Cart, coupon: Option<&CouponState>, policy: &ShippingPolicy) -> Self {
        Self::compute(cart.subtotal(), coupon.map_or(Money::zero(), |c| c.discount), policy)
    }
}

/// The single coupon a session may hold. Lives in controller memory only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CouponState {
    pub code: CouponCode,
    pub discount: Money,
}

/// What a completed checkout leaves behind for the confirmation page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    pub items: Vec<LineItem>,
    pub delivery: DeliveryInfo,
    pub order_id: String,
    pub coupon_code: Option<CouponCode>,
    pub totals: OrderTotals,
    pub created_at: DateTime<Utc>,
}
