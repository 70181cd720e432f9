//! Cart Aggregate

use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::value_objects::{Money, ProductId, Quantity};

/// One product entry in the cart with its quantity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub image_url: String,
    pub quantity: Quantity,
}

impl LineItem {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

/// Ordered line items, first-added first. Persisted as a bare JSON array.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn into_items(self) -> Vec<LineItem> { self.items }
    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn get(&self, id: &ProductId) -> Option<&LineItem> { self.items.iter().find(|i| &i.id == id) }

    /// Sum of quantities across all lines; what the header counters show.
    pub fn item_count(&self) -> u64 { self.items.iter().map(|i| u64::from(i.quantity.value())).sum() }

    pub fn subtotal(&self) -> Money {
        self.items.iter().fold(Money::zero(), |acc, i| acc.add(i.line_total()))
    }

    /// Subtotal, or `None` when it no longer fits the money range.
    pub fn checked_subtotal(&self) -> Option<Money> {
        self.items.iter().try_fold(Money::zero(), |acc, i| acc.checked_add(i.unit_price.checked_multiply(i.quantity)?))
    }

    /// Quantity the line for `item.id` would hold after merging `item` in.
    pub fn merged_quantity(&self, item: &LineItem) -> Quantity {
        match self.get(&item.id) {
            Some(existing) => existing.quantity.add(item.quantity),
            None => item.quantity,
        }
    }

    /// Merges into an existing line with the same id, otherwise appends.
    /// A merge keeps the existing line's name, price and image.
    pub fn add_item(&mut self, item: LineItem) -> &LineItem {
        match self.items.iter().position(|i| i.id == item.id) {
            Some(index) => {
                let existing = &mut self.items[index];
                existing.quantity = existing.quantity.add(item.quantity);
                &self.items[index]
            }
            None => {
                self.items.push(item);
                &self.items[self.items.len() - 1]
            }
        }
    }

    /// Overwrites the quantity in place; position is unchanged.
    pub fn set_quantity(&mut self, id: &ProductId, quantity: Quantity) -> Result<(), ItemNotFound> {
        let item = self.items.iter_mut().find(|i| &i.id == id).ok_or(ItemNotFound)?;
        item.quantity = quantity;
        Ok(())
    }

    pub fn remove_item(&mut self, id: &ProductId) -> Result<LineItem, ItemNotFound> {
        let index = self.items.iter().position(|i| &i.id == id).ok_or(ItemNotFound)?;
        Ok(self.items.remove(index))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("item not found in cart")]
pub struct ItemNotFound;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(id: &str, qty: u32) -> LineItem {
        LineItem {
            id: ProductId::new(id).unwrap(),
            name: format!("Product {id}"),
            unit_price: Money::new(Decimal::new(10, 0)),
            image_url: "/img.png".into(),
            quantity: Quantity::new(qty).unwrap(),
        }
    }

    #[test]
    fn test_distinct_ids_never_duplicate() {
        let mut cart = Cart::new();
        for id in ["a", "b", "a", "c", "b"] { cart.add_item(item(id, 1)); }
        assert_eq!(cart.len(), 3);
        let ids: Vec<_> = cart.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_merge_sums_quantities() {
        let mut cart = Cart::new();
        cart.add_item(item("7", 3));
        assert_eq!(cart.merged_quantity(&item("7", 2)).value(), 5);
        assert_eq!(cart.add_item(item("7", 2)).quantity.value(), 5);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.subtotal().amount(), Decimal::new(50, 0));
    }

    #[test]
    fn test_checked_subtotal_detects_overflow() {
        let mut cart = Cart::new();
        cart.add_item(item("a", 3));
        assert_eq!(cart.checked_subtotal(), Some(Money::new(Decimal::new(30, 0))));

        cart.add_item(LineItem { unit_price: Money::new(Decimal::MAX), ..item("b", 2) });
        assert_eq!(cart.checked_subtotal(), None);
        assert_eq!(cart.subtotal(), Money::new(Decimal::MAX));
    }

    #[test]
    fn test_set_quantity_keeps_position() {
        let mut cart = Cart::new();
        cart.add_item(item("a", 1));
        cart.add_item(item("b", 1));
        cart.set_quantity(&ProductId::new("a").unwrap(), Quantity::new(4).unwrap()).unwrap();
        assert_eq!(cart.items()[0].id.as_str(), "a");
        assert_eq!(cart.items()[0].quantity.value(), 4);
        assert_eq!(cart.set_quantity(&ProductId::new("z").unwrap(), Quantity::ONE), Err(ItemNotFound));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(item("a", 2));
        let before = cart.clone();
        assert_eq!(cart.remove_item(&ProductId::new("b").unwrap()), Err(ItemNotFound));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_persisted_shape_round_trips() {
        let mut cart = Cart::new();
        cart.add_item(item("b", 2));
        cart.add_item(item("a", 1));
        let json = serde_json::to_string(&cart).unwrap();
        assert!(json.starts_with(r#"[{"id":"b","name":"Product b","unitPrice":10"#));
        let back: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cart);
    }
}
