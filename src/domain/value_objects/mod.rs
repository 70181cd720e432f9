//! Value Objects for the cart model

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Product identifier, normalized to a trimmed non-empty string.
///
/// Ids reach the cart from page attributes, persisted blobs and server
/// payloads; the latter sometimes carry them as JSON numbers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(value: impl Into<String>) -> Result<Self, ProductIdError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(ProductIdError::Empty); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw { Text(String), Number(i64) }

        let raw = match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s,
            Raw::Number(n) => n.to_string(),
        };
        ProductId::new(raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductIdError { Empty }
impl std::error::Error for ProductIdError {}
impl fmt::Display for ProductIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "product id empty") }
}

/// Money value object.
///
/// Serialized as a plain JSON number so persisted carts and request bodies
/// stay readable by the storefront API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn zero() -> Self { Self(Decimal::ZERO) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }

    /// Arithmetic saturates at the `Decimal` range; use the `checked_*` forms
    /// to detect amounts that no longer fit.
    pub fn add(&self, other: Money) -> Money { Money(self.0.saturating_add(other.0)) }
    pub fn multiply(&self, qty: Quantity) -> Money { Money(self.0.saturating_mul(Decimal::from(qty.value()))) }
    pub fn checked_add(&self, other: Money) -> Option<Money> { self.0.checked_add(other.0).map(Money) }
    pub fn checked_multiply(&self, qty: Quantity) -> Option<Money> { self.0.checked_mul(Decimal::from(qty.value())).map(Money) }

    /// Subtracts `other`, flooring the result at zero.
    pub fn saturating_sub(&self, other: Money) -> Money { Money(self.0.saturating_sub(other.0).max(Decimal::ZERO)) }

    /// Parses a price string, accepting a comma as decimal separator (`"5,90"`).
    pub fn parse(raw: &str) -> Result<Self, MoneyError> {
        let normalized = raw.trim().replace(',', ".");
        let amount = Decimal::from_str(&normalized).map_err(|_| MoneyError::Malformed(raw.trim().to_string()))?;
        Ok(Self(amount))
    }

    /// Formats with two decimals behind `symbol`, e.g. `$ 5.90`.
    pub fn display(&self, symbol: &str) -> String { format!("{symbol} {:.2}", self.0) }
}

impl From<Decimal> for Money { fn from(amount: Decimal) -> Self { Self(amount) } }

#[derive(Debug, Clone, PartialEq, Eq)] pub enum MoneyError { Malformed(String) }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Malformed(raw) => write!(f, "malformed amount {raw:?}") }
    }
}

/// Line quantity; always at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: u32) -> Option<Self> { (value > 0).then_some(Self(value)) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0)) }

    /// Parses user input as a positive integer, reading the leading integer
    /// the way a browser's `parseInt` does (`"2.5"` is 2, `"3abc"` is 3).
    /// Zero, negatives and input without a leading integer yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let value = leading_integer(raw)?;
        u32::try_from(value.min(i64::from(u32::MAX))).ok().and_then(Self::new)
    }

    /// Parses an optional requested quantity: missing or unreadable means
    /// one, and anything else is floored to one.
    pub fn requested(raw: Option<&str>) -> Self {
        match raw.and_then(leading_integer) {
            Some(value) => Self(u32::try_from(value.clamp(1, i64::from(u32::MAX))).unwrap_or(u32::MAX)),
            None => Self::ONE,
        }
    }
}

/// Optional sign followed by decimal digits, after leading whitespace.
/// Digit runs too long for `i64` saturate.
fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let magnitude = rest[..digits].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

impl TryFrom<u32> for Quantity {
    type Error = String;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Quantity::new(value).ok_or_else(|| "quantity must be at least 1".to_string())
    }
}

impl From<Quantity> for u32 { fn from(q: Quantity) -> Self { q.0 } }

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Coupon code, trimmed and upper-cased.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponCode(String);

impl CouponCode {
    pub fn new(value: &str) -> Option<Self> {
        let value = value.trim().to_uppercase();
        (!value.is_empty()).then_some(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id() {
        assert_eq!(ProductId::new("  7 ").unwrap().as_str(), "7");
        assert_eq!(ProductId::new("   "), Err(ProductIdError::Empty));
        let from_number: ProductId = serde_json::from_str("42").unwrap();
        assert_eq!(from_number.as_str(), "42");
    }

    #[test]
    fn test_money_parse_comma_decimal() {
        assert_eq!(Money::parse("5,90").unwrap().amount(), Decimal::new(590, 2));
        assert_eq!(Money::parse(" 12.5 ").unwrap().amount(), Decimal::new(125, 1));
        assert!(Money::parse("abc").is_err());
        assert!(Money::parse("").is_err());
    }

    #[test]
    fn test_money_display_and_floor() {
        let m = Money::new(Decimal::new(59, 1));
        assert_eq!(m.display("$"), "$ 5.90");
        assert_eq!(m.saturating_sub(Money::new(Decimal::new(10, 0))), Money::zero());
    }

    #[test]
    fn test_quantity_parse() {
        assert_eq!(Quantity::parse("3").map(|q| q.value()), Some(3));
        assert_eq!(Quantity::parse("0"), None);
        assert_eq!(Quantity::parse("-1"), None);
        assert_eq!(Quantity::parse("x"), None);
        assert_eq!(Quantity::requested(None), Quantity::ONE);
        assert_eq!(Quantity::requested(Some("-4")), Quantity::ONE);
        assert_eq!(Quantity::requested(Some("5")).value(), 5);
        assert_eq!(Quantity::parse("2.5").map(|q| q.value()), Some(2));
        assert_eq!(Quantity::parse(" 3abc").map(|q| q.value()), Some(3));
        assert_eq!(Quantity::parse("+4").map(|q| q.value()), Some(4));
        assert_eq!(Quantity::parse("0.9"), None);
        assert_eq!(Quantity::parse("-2.5"), None);
        assert_eq!(Quantity::parse(".5"), None);
        assert_eq!(Quantity::parse("99999999999999999999").map(|q| q.value()), Some(u32::MAX));
        assert_eq!(Quantity::requested(Some("2.5")).value(), 2);
        assert_eq!(Quantity::requested(Some("abc")), Quantity::ONE);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }

    #[test]
    fn test_money_arithmetic_never_overflows() {
        let huge = Money::new(Decimal::MAX);
        let qty = Quantity::new(1_000_000_000).unwrap();
        assert_eq!(huge.checked_multiply(qty), None);
        assert_eq!(huge.checked_add(huge), None);
        assert_eq!(huge.multiply(qty), huge);
        assert_eq!(huge.add(huge), huge);
        let five = Money::new(Decimal::new(5, 0));
        assert_eq!(five.checked_multiply(Quantity::new(3).unwrap()), Some(Money::new(Decimal::new(15, 0))));
    }

    #[test]
    fn test_coupon_code() {
        assert_eq!(CouponCode::new(" save10 ").unwrap().as_str(), "SAVE10");
        assert!(CouponCode::new("  ").is_none());
    }
}
