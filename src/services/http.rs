//! HTTP client for the storefront API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::aggregates::LineItem;
use crate::domain::value_objects::{CouponCode, ProductId, Quantity};
use crate::services::{
    csrf, CheckoutService, CouponService, CouponVerdict, PaymentPreference, PaymentRequest, ReconcileReport,
    StockService, StockStatus,
};
use crate::ServiceError;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// One client implements every remote seam the controller uses.
#[derive(Debug, Clone)]
pub struct HttpStorefrontClient {
    base_url: String,
    csrf_token: Option<String>,
    http: Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StockCheckRequest<'a> {
    product_id: &'a ProductId,
    quantity: Quantity,
}

#[derive(Serialize)]
struct ItemsRequest<'a> {
    items: &'a [LineItem],
}

#[derive(Serialize)]
struct CouponRequest<'a> {
    code: &'a CouponCode,
    items: &'a [LineItem],
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpStorefrontClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, csrf_token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            csrf_token,
            http: Client::new(),
        }
    }

    /// Posts `body` as JSON to `path` and decodes the JSON reply.
    ///
    /// # Errors
    ///
    /// Non-2xx replies carrying an `{"error": ...}` body become
    /// [`ServiceError::Rejected`]; any other failure status becomes
    /// [`ServiceError::Status`].
    async fn post<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        idempotency_key: Option<Uuid>,
    ) -> Result<R, ServiceError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "storefront request");

        let mut request = self.http.post(&url).json(body);
        if let Some(token) = &self.csrf_token {
            request = request.header(csrf::HEADER, token);
        }
        if let Some(key) = idempotency_key {
            request = request.header(IDEMPOTENCY_HEADER, key.to_string());
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(%url, %status, "storefront request failed");

            return Err(match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => ServiceError::Rejected(body.error),
                Err(_) => ServiceError::Status { status: status.as_u16(), body: text },
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl StockService for HttpStorefrontClient {
    async fn check(&self, product_id: ProductId, quantity: Quantity) -> Result<StockStatus, ServiceError> {
        self.post("/stock-check", &StockCheckRequest { product_id: &product_id, quantity }, None).await
    }
}

#[async_trait]
impl CheckoutService for HttpStorefrontClient {
    async fn reconcile(&self, items: Vec<LineItem>, idempotency_key: Uuid) -> Result<ReconcileReport, ServiceError> {
        self.post("/stock-reconcile", &ItemsRequest { items: &items }, Some(idempotency_key)).await
    }

    async fn create_payment(&self, request: PaymentRequest) -> Result<PaymentPreference, ServiceError> {
        self.post("/create-payment-preference", &request, Some(request.idempotency_key)).await
    }
}

#[async_trait]
impl CouponService for HttpStorefrontClient {
    async fn validate(&self, code: CouponCode, items: Vec<LineItem>) -> Result<CouponVerdict, ServiceError> {
        self.post("/apply-coupon", &CouponRequest { code: &code, items: &items }, None).await
    }
}
