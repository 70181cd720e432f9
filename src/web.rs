//! Storefront shell: serves the checkout page and turns form posts into
//! controller calls.

use axum::{
    extract::{Query, Request, State},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::controller::CartController;
use crate::domain::aggregates::{DeliveryInfo, OrderTotals, ProductCandidate};
use crate::notify::ToastBoard;
use crate::render::{self, PageModel};
use crate::CartError;

#[derive(Clone)]
pub struct AppState {
    pub cart: Arc<CartController>,
    pub toasts: Arc<ToastBoard>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-cart"})) }))
        .route("/", get(|| async { Redirect::to("/checkout") }))
        .route("/checkout", get(checkout_page).post(checkout))
        .route("/cart", get(cart_json))
        .route("/cart/count", get(cart_count))
        .route("/cart/add", post(add_item))
        .route("/cart/remove", post(remove_item))
        .route("/cart/quantity", post(update_quantity))
        .route("/cart/coupon", post(apply_coupon))
        .route("/cart/clear", post(clear_cart))
        .route("/order/last", get(last_order))
        .route("/toasts/dismiss", post(dismiss_toast))
        .layer(middleware::from_fn_with_state(state.clone(), publish_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Drains the cart events recorded while handling a request into the log.
async fn publish_events(State(s): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    for event in s.cart.take_events() {
        info!(target: "storefront::events", ?event, "cart event");
    }
    response
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams { pub invalid: Option<String> }

async fn checkout_page(State(s): State<AppState>, Query(p): Query<PageParams>) -> Html<String> {
    let cart = s.cart.cart().await;
    let coupon = s.cart.coupon();
    let toasts = s.toasts.active();
    let model = PageModel {
        items: cart.items(),
        totals: OrderTotals::for_cart(&cart, coupon.as_ref(), &s.cart.config().shipping),
        coupon: coupon.as_ref(),
        item_count: cart.item_count(),
        toasts: &toasts,
        invalid_field: p.invalid.as_deref(),
    };
    Html(render::checkout_page(&model, s.cart.config()))
}

async fn cart_json(State(s): State<AppState>) -> impl IntoResponse {
    let cart = s.cart.cart().await;
    let coupon = s.cart.coupon();
    let totals = OrderTotals::for_cart(&cart, coupon.as_ref(), &s.cart.config().shipping);
    Json(serde_json::json!({
        "items": cart.items(),
        "totals": totals,
        "coupon": coupon,
    }))
}

async fn cart_count(State(s): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({"count": s.cart.item_count().await}))
}

async fn add_item(State(s): State<AppState>, Form(candidate): Form<ProductCandidate>) -> Redirect {
    s.cart.add_item(candidate).await;
    Redirect::to("/checkout")
}

#[derive(Debug, Deserialize)]
pub struct ItemForm { pub id: String }

async fn remove_item(State(s): State<AppState>, Form(f): Form<ItemForm>) -> Redirect {
    s.cart.remove_item(&f.id).await;
    Redirect::to("/checkout")
}

#[derive(Debug, Deserialize)]
pub struct QuantityForm { pub id: String, #[serde(default)] pub quantity: String }

async fn update_quantity(State(s): State<AppState>, Form(f): Form<QuantityForm>) -> Redirect {
    s.cart.update_quantity(&f.id, &f.quantity).await;
    Redirect::to("/checkout")
}

#[derive(Debug, Deserialize)]
pub struct CouponForm { #[serde(default)] pub code: String }

async fn apply_coupon(State(s): State<AppState>, Form(f): Form<CouponForm>) -> Redirect {
    s.cart.apply_coupon(&f.code).await;
    Redirect::to("/checkout")
}

async fn clear_cart(State(s): State<AppState>) -> Redirect {
    s.cart.clear().await;
    Redirect::to("/checkout")
}

/// Sends the shopper to the payment page, or back to the form with the
/// offending field flagged.
async fn checkout(State(s): State<AppState>, Form(delivery): Form<DeliveryInfo>) -> Response {
    match s.cart.try_checkout(delivery).await {
        Ok(outcome) => Redirect::to(&outcome.redirect_url).into_response(),
        Err(e) => {
            s.cart.report(&e);
            match e {
                CartError::InvalidDelivery { field } => Redirect::to(&format!("/checkout?invalid={field}")).into_response(),
                _ => Redirect::to("/checkout").into_response(),
            }
        }
    }
}

async fn last_order(State(s): State<AppState>) -> impl IntoResponse {
    Json(s.cart.last_order().await)
}

#[derive(Debug, Deserialize)]
pub struct DismissForm { pub id: Uuid }

async fn dismiss_toast(State(s): State<AppState>, Form(f): Form<DismissForm>) -> Redirect {
    s.toasts.dismiss(f.id);
    Redirect::to("/checkout")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use std::time::Duration;
    use testresult::TestResult;
    use tower::ServiceExt;

    use crate::config::{CartConfig, StorageBackend};
    use crate::controller::Services;
    use crate::services::{MockCheckoutService, MockCouponService, MockStockService, PaymentPreference, ReconcileReport, StockStatus};
    use crate::storage::MemoryStorage;

    fn app(checkout: MockCheckoutService) -> (Router, AppState) {
        let mut stock = MockStockService::new();
        stock.expect_check().returning(|_, _| Ok(StockStatus { available: true, current_stock: 99 }));
        let toasts = Arc::new(ToastBoard::new(Duration::from_secs(60)));
        let services = Services { stock: Arc::new(stock), checkout: Arc::new(checkout), coupons: Arc::new(MockCouponService::new()) };
        let config = CartConfig { storage: StorageBackend::Memory, ..CartConfig::default() };
        let cart = Arc::new(CartController::new(config, Arc::new(MemoryStorage::default()), services, toasts.clone()));
        let state = AppState { cart, toasts };
        (router(state.clone()), state)
    }

    fn form(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn location(res: &Response) -> Option<&str> {
        res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok())
    }

    const DELIVERY: &str = "fullName=Ana+Souza&email=ana%40example.com&phone=11999998888&address=Rua+A&city=Campinas&state=SP&zipCode=13000-000";

    #[tokio::test]
    async fn test_add_then_render() -> TestResult {
        let (app, state) = app(MockCheckoutService::new());

        let res = app.clone().oneshot(form("/cart/add", "id=7&name=Soap&price=5%2C90&quantity=2")).await?;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(state.cart.item_count().await, 2);

        let res = app.clone().oneshot(Request::get("/cart/count").body(Body::empty())?).await?;
        let body = to_bytes(res.into_body(), usize::MAX).await?;
        assert_eq!(serde_json::from_slice::<serde_json::Value>(&body)?["count"], 2);

        let res = app.oneshot(Request::get("/checkout").body(Body::empty())?).await?;
        let html = String::from_utf8(to_bytes(res.into_body(), usize::MAX).await?.to_vec())?;
        assert!(html.contains("2x Soap added to cart"));
        assert!(html.contains("$ 11.80"));
        Ok(())
    }

    #[tokio::test]
    async fn test_events_do_not_accumulate_across_requests() -> TestResult {
        let (app, state) = app(MockCheckoutService::new());

        for _ in 0..50 {
            app.clone().oneshot(form("/cart/add", "id=7&name=Soap&price=3")).await?;
        }
        app.oneshot(form("/cart/clear", "")).await?;

        assert!(state.cart.take_events().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_quantity_zero_removes() -> TestResult {
        let (app, state) = app(MockCheckoutService::new());
        app.clone().oneshot(form("/cart/add", "id=7&name=Soap&price=3")).await?;

        app.oneshot(form("/cart/quantity", "id=7&quantity=0")).await?;

        assert_eq!(state.cart.item_count().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_delivery_redirects_to_field() -> TestResult {
        let mut checkout = MockCheckoutService::new();
        checkout.expect_reconcile().never();
        let (app, _) = app(checkout);
        app.clone().oneshot(form("/cart/add", "id=7&name=Soap&price=3")).await?;

        let res = app.oneshot(form("/checkout", "fullName=Ana&email=bad")).await?;

        assert_eq!(location(&res), Some("/checkout?invalid=email"));
        Ok(())
    }

    #[tokio::test]
    async fn test_dismiss_toast() -> TestResult {
        let (app, state) = app(MockCheckoutService::new());
        app.clone().oneshot(form("/cart/add", "id=7&name=Soap&price=3")).await?;
        let id = state.toasts.active()[0].id;

        app.oneshot(form("/toasts/dismiss", &format!("id={id}"))).await?;

        assert!(state.toasts.active().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_redirects_to_payment() -> TestResult {
        let mut checkout = MockCheckoutService::new();
        checkout.expect_reconcile().returning(|_, _| Ok(ReconcileReport { valid: true, results: vec![], message: None }));
        checkout.expect_create_payment()
            .returning(|_| Ok(PaymentPreference { redirect_url: Some("https://pay.test/p/9".into()), order_id: Some("9".into()), error: None }));
        let (app, state) = app(checkout);
        app.clone().oneshot(form("/cart/add", "id=7&name=Soap&price=3")).await?;

        let res = app.oneshot(form("/checkout", DELIVERY)).await?;

        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), Some("https://pay.test/p/9"));
        assert_eq!(state.cart.item_count().await, 0);
        assert_eq!(state.cart.last_order().await.map(|o| o.order_id), Some("9".to_string()));
        Ok(())
    }
}
