//! Product candidates: the untyped descriptor a page hands us when a
//! shopper clicks "add to cart".

use serde::Deserialize;
use thiserror::Error;
use crate::domain::aggregates::cart::LineItem;
use crate::domain::value_objects::{Money, ProductId, Quantity};

/// Raw product attributes as they arrive from the page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ProductCandidate {
    pub id: Option<String>,
    pub name: Option<String>,
    pub price: Option<String>,
    pub image: Option<String>,
    pub quantity: Option<String>,
}

impl ProductCandidate {
    pub fn new(id: &str, name: &str, price: &str) -> Self {
        Self { id: Some(id.into()), name: Some(name.into()), price: Some(price.into()), ..Self::default() }
    }

    pub fn with_quantity(mut self, quantity: &str) -> Self { self.quantity = Some(quantity.into()); self }
    pub fn with_image(mut self, image: &str) -> Self { self.image = Some(image.into()); self }

    /// Normalizes every field into a typed [`LineItem`]. Missing or blank
    /// images fall back to `placeholder_image`.
    pub fn parse(&self, placeholder_image: &str) -> Result<LineItem, CandidateError> {
        let id = ProductId::new(self.id.clone().unwrap_or_default()).map_err(|_| CandidateError::MissingId)?;

        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() { return Err(CandidateError::MissingName); }

        let raw_price = self.price.as_deref().unwrap_or_default();
        let unit_price = Money::parse(raw_price).map_err(|_| CandidateError::InvalidPrice(raw_price.trim().to_string()))?;
        if unit_price <= Money::zero() { return Err(CandidateError::InvalidPrice(raw_price.trim().to_string())); }

        let image_url = match self.image.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() && url != "undefined" => url.to_string(),
            _ => placeholder_image.to_string(),
        };

        Ok(LineItem { id, name: name.to_string(), unit_price, image_url, quantity: Quantity::requested(self.quantity.as_deref()) })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CandidateError {
    #[error("product id missing")]
    MissingId,
    #[error("product name missing")]
    MissingName,
    #[error("invalid price {0:?}")]
    InvalidPrice(String),
}
