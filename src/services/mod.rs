//! Remote storefront endpoints the cart depends on.

pub mod csrf;
pub mod http;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::{DeliveryInfo, LineItem};
use crate::domain::value_objects::{CouponCode, Money, ProductId, Quantity};
use crate::ServiceError;

pub use http::HttpStorefrontClient;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockStatus {
    pub available: bool,
    #[serde(default)]
    pub current_stock: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: String,
    pub available: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub valid: bool,
    #[serde(default)]
    pub results: Vec<ReconcileResult>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ReconcileReport {
    pub fn unavailable_names(&self) -> Vec<String> {
        self.results.iter().filter(|r| !r.available).map(|r| {
            if r.product_name.is_empty() { r.product_id.to_string() } else { r.product_name.clone() }
        }).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub items: Vec<LineItem>,
    pub delivery_info: DeliveryInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<CouponCode>,
    #[serde(skip)]
    pub idempotency_key: Uuid,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPreference {
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponVerdict {
    pub success: bool,
    #[serde(default)]
    pub discount_amount: Money,
    #[serde(default)]
    pub coupon_meta: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw { Text(String), Number(i64) }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

#[automock]
#[async_trait]
pub trait StockService: Send + Sync {
    /// Whether `quantity` units of the product can be sold right now.
    async fn check(&self, product_id: ProductId, quantity: Quantity) -> Result<StockStatus, ServiceError>;
}

#[automock]
#[async_trait]
pub trait CheckoutService: Send + Sync {
    /// Final stock verification for every line.
    async fn reconcile(&self, items: Vec<LineItem>, idempotency_key: Uuid) -> Result<ReconcileReport, ServiceError>;

    /// Requests the payment redirect for the order.
    async fn create_payment(&self, request: PaymentRequest) -> Result<PaymentPreference, ServiceError>;
}

#[automock]
#[async_trait]
pub trait CouponService: Send + Sync {
    async fn validate(&self, code: CouponCode, items: Vec<LineItem>) -> Result<CouponVerdict, ServiceError>;
}
