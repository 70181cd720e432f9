//! Cart controller.
//!
//! Owns the rules for mutating the persisted cart: every mutation is gated on
//! a stock check, merges never duplicate a product, and checkout only clears
//! the cart once the payment redirect is confirmed.
//!
//! Operations come in pairs. `try_*` returns the typed error; the plain form
//! logs it, surfaces it through the [`Notifier`] and returns whether anything
//! changed.

use axum::http::HeaderValue;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{CartConfig, StockFailurePolicy};
use crate::domain::aggregates::{Cart, CouponState, DeliveryInfo, LineItem, OrderSnapshot, OrderTotals, ProductCandidate};
use crate::domain::events::CartEvent;
use crate::domain::value_objects::{CouponCode, Money, ProductId, Quantity};
use crate::notify::{Notifier, Severity};
use crate::services::{CheckoutService, CouponService, PaymentRequest, StockService};
use crate::storage::{read_json, write_json, Storage};
use crate::{CartError, ServiceError};

/// Remote collaborators.
#[derive(Clone)]
pub struct Services {
    pub stock: Arc<dyn StockService>,
    pub checkout: Arc<dyn CheckoutService>,
    pub coupons: Arc<dyn CouponService>,
}

impl Services {
    /// Uses one client for every seam.
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: StockService + CheckoutService + CouponService + 'static,
    {
        Self { stock: client.clone(), checkout: client.clone(), coupons: client }
    }
}

/// Where the shopper goes after a successful checkout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutOutcome {
    pub redirect_url: String,
    pub order_id: String,
}

pub struct CartController {
    config: CartConfig,
    storage: Arc<dyn Storage>,
    services: Services,
    notifier: Arc<dyn Notifier>,
    coupon: Mutex<Option<CouponState>>,
    events: Mutex<Vec<CartEvent>>,
    checkout_in_flight: AtomicBool,
}

/// Releases the checkout flag on every exit path.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).ok().map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) { self.0.store(false, Ordering::Release); }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CartController {
    pub fn new(config: CartConfig, storage: Arc<dyn Storage>, services: Services, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            storage,
            services,
            notifier,
            coupon: Mutex::new(None),
            events: Mutex::new(Vec::new()),
            checkout_in_flight: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &CartConfig { &self.config }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Current cart. A missing blob is an empty cart; so is an unreadable one.
    pub async fn cart(&self) -> Cart {
        match read_json::<Cart>(self.storage.as_ref(), &self.config.cart_key).await {
            Ok(cart) => cart.unwrap_or_default(),
            Err(e) => {
                warn!(key = %self.config.cart_key, error = %e, "discarding unreadable cart");
                Cart::new()
            }
        }
    }

    pub async fn items(&self) -> Vec<LineItem> { self.cart().await.into_items() }

    pub async fn item_count(&self) -> u64 { self.cart().await.item_count() }

    pub fn coupon(&self) -> Option<CouponState> { locked(&self.coupon).clone() }

    pub async fn totals(&self) -> OrderTotals {
        OrderTotals::for_cart(&self.cart().await, self.coupon().as_ref(), &self.config.shipping)
    }

    pub async fn last_order(&self) -> Option<OrderSnapshot> {
        read_json(self.storage.as_ref(), &self.config.last_order_key)
            .await
            .map_err(|e| warn!(error = %e, "unreadable order snapshot"))
            .ok()
            .flatten()
    }

    pub fn take_events(&self) -> Vec<CartEvent> { std::mem::take(&mut *locked(&self.events)) }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    pub async fn add_item(&self, candidate: ProductCandidate) -> bool {
        self.try_add_item(candidate).await.map_err(|e| self.report(&e)).is_ok()
    }

    /// Adds a product, merging into an existing line. Stock is checked for
    /// the requested quantity and, when merging, again for the cumulative
    /// quantity. Returns the resulting line.
    pub async fn try_add_item(&self, candidate: ProductCandidate) -> Result<LineItem, CartError> {
        let item = candidate.parse(&self.config.placeholder_image).map_err(|e| {
            warn!(?candidate, error = %e, "rejected product candidate");
            e
        })?;

        self.ensure_stock(&item.id, &item.name, item.quantity).await?;

        let mut cart = self.cart().await;
        let merged = cart.merged_quantity(&item);
        if merged != item.quantity {
            self.ensure_stock(&item.id, &item.name, merged).await?;
        }

        let added = item.quantity;
        let name = item.name.clone();
        let line = cart.add_item(item).clone();
        if cart.checked_subtotal().is_none() {
            return Err(CartError::AmountOutOfRange);
        }
        self.save(&cart).await;

        debug!(product = %line.id, %added, line_quantity = %line.quantity, count = cart.item_count(), "item added");
        self.record(CartEvent::ItemAdded { product_id: line.id.clone(), added, line_quantity: line.quantity });
        self.notifier.notify(&format!("{added}x {name} added to cart"), Severity::Success);
        Ok(line)
    }

    /// Removes the line for `id`. Absent ids are a silent no-op.
    pub async fn remove_item(&self, id: &str) -> bool {
        let Ok(id) = ProductId::new(id) else { return false };
        let mut cart = self.cart().await;
        let Ok(removed) = cart.remove_item(&id) else { return false };

        self.save(&cart).await;
        debug!(product = %id, count = cart.item_count(), "item removed");
        self.record(CartEvent::ItemRemoved { product_id: id });
        self.notifier.notify(&format!("{} removed from cart", removed.name), Severity::Success);
        true
    }

    pub async fn update_quantity(&self, id: &str, quantity: &str) -> bool {
        self.try_update_quantity(id, quantity).await.unwrap_or_else(|e| {
            self.report(&e);
            false
        })
    }

    /// Sets an absolute quantity from the input's leading integer. Anything
    /// that does not read as a positive integer removes the line instead.
    pub async fn try_update_quantity(&self, id: &str, quantity: &str) -> Result<bool, CartError> {
        let Some(quantity) = Quantity::parse(quantity) else { return Ok(self.remove_item(id).await) };
        let Ok(id) = ProductId::new(id) else { return Ok(false) };

        let mut cart = self.cart().await;
        let Some(name) = cart.get(&id).map(|i| i.name.clone()) else { return Ok(false) };

        self.ensure_stock(&id, &name, quantity).await?;

        if cart.set_quantity(&id, quantity).is_err() {
            return Ok(false);
        }
        if cart.checked_subtotal().is_none() {
            return Err(CartError::AmountOutOfRange);
        }
        self.save(&cart).await;
        self.record(CartEvent::QuantityUpdated { product_id: id, quantity });
        Ok(true)
    }

    pub async fn apply_coupon(&self, code: &str) -> bool {
        self.try_apply_coupon(code).await.map_err(|e| self.report(&e)).is_ok()
    }

    /// Validates `code` with the coupon service and holds the discount for
    /// the rest of the session. Only one coupon may ever be applied.
    pub async fn try_apply_coupon(&self, code: &str) -> Result<CouponState, CartError> {
        if self.coupon().is_some() {
            return Err(CartError::CouponAlreadyApplied);
        }
        let cart = self.cart().await;
        if cart.is_empty() {
            return Err(CartError::EmptyCart);
        }
        let code = CouponCode::new(code).ok_or(CartError::EmptyCoupon)?;

        let verdict = self.services.coupons.validate(code.clone(), cart.into_items()).await.map_err(|e| match e {
            ServiceError::Rejected(msg) => CartError::CouponRejected(msg),
            other => CartError::Service(other),
        })?;

        if !verdict.success {
            return Err(CartError::CouponRejected(verdict.error.unwrap_or_else(|| "Invalid coupon".to_string())));
        }

        let state = CouponState { code, discount: verdict.discount_amount.max(Money::zero()) };
        {
            let mut slot = locked(&self.coupon);
            if slot.is_some() {
                return Err(CartError::CouponAlreadyApplied);
            }
            *slot = Some(state.clone());
        }

        info!(code = %state.code, discount = %state.discount.amount(), "coupon applied");
        self.record(CartEvent::CouponApplied { code: state.code.clone(), discount: state.discount });
        self.notifier.notify(&format!("Coupon {} applied", state.code), Severity::Success);
        Ok(state)
    }

    pub async fn checkout(&self, delivery: DeliveryInfo) -> Option<CheckoutOutcome> {
        self.try_checkout(delivery).await.map_err(|e| self.report(&e)).ok()
    }

    /// Re-verifies stock, obtains the payment redirect, then snapshots and
    /// clears the cart. Each step gates the next; the cart is untouched on
    /// any failure.
    pub async fn try_checkout(&self, delivery: DeliveryInfo) -> Result<CheckoutOutcome, CartError> {
        let cart = self.cart().await;
        if cart.is_empty() {
            return Err(CartError::EmptyCart);
        }
        if let Some(field) = delivery.first_invalid_field() {
            return Err(CartError::InvalidDelivery { field });
        }

        let _in_flight = InFlight::acquire(&self.checkout_in_flight).ok_or(CartError::CheckoutInProgress)?;
        let idempotency_key = Uuid::new_v4();
        let coupon = self.coupon();
        let totals = OrderTotals::for_cart(&cart, coupon.as_ref(), &self.config.shipping);
        info!(%idempotency_key, lines = cart.len(), "checkout started");

        let report = self.services.checkout.reconcile(cart.items().to_vec(), idempotency_key).await?;
        if !report.valid {
            let products = report.unavailable_names();
            if products.is_empty() {
                return Err(CartError::StockUnavailable {
                    products: vec![report.message.unwrap_or_else(|| "some products".to_string())],
                });
            }
            return Err(CartError::StockUnavailable { products });
        }

        let preference = self.services.checkout.create_payment(PaymentRequest {
            items: cart.items().to_vec(),
            delivery_info: delivery.clone(),
            coupon_code: coupon.as_ref().map(|c| c.code.clone()),
            idempotency_key,
        }).await?;

        let Some(redirect_url) = preference.redirect_url.filter(|u| !u.is_empty() && HeaderValue::from_str(u).is_ok()) else {
            return Err(CartError::PaymentLinkMissing(
                preference.error.unwrap_or_else(|| "Payment link was not generated".to_string()),
            ));
        };
        let order_id = preference.order_id.unwrap_or_else(|| Uuid::now_v7().to_string());

        let snapshot = OrderSnapshot {
            items: cart.into_items(),
            delivery,
            order_id: order_id.clone(),
            coupon_code: coupon.map(|c| c.code),
            totals,
            created_at: Utc::now(),
        };
        if let Err(e) = write_json(self.storage.as_ref(), &self.config.last_order_key, &snapshot).await {
            warn!(error = %e, "failed to persist order snapshot");
        }

        self.clear_state().await;
        info!(%order_id, "checkout complete, redirecting to payment");
        self.record(CartEvent::CheckedOut { order_id: order_id.clone() });
        Ok(CheckoutOutcome { redirect_url, order_id })
    }

    /// Empties the cart and forgets the coupon.
    pub async fn clear(&self) {
        self.clear_state().await;
        self.record(CartEvent::Cleared);
    }

    /// Logs `error` and shows it to the shopper.
    pub fn report(&self, error: &CartError) {
        match error {
            CartError::Service(e) => warn!(error = %e, "storefront service failure"),
            other => debug!(error = %other, "cart operation refused"),
        }
        self.notifier.notify(&error.to_string(), Severity::Error);
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    async fn ensure_stock(&self, id: &ProductId, name: &str, quantity: Quantity) -> Result<(), CartError> {
        match self.services.stock.check(id.clone(), quantity).await {
            Ok(status) if status.available => Ok(()),
            Ok(status) => Err(CartError::InsufficientStock {
                name: name.to_string(),
                requested: quantity.value(),
                available: status.current_stock,
            }),
            Err(e) => match self.config.stock_failure_policy {
                StockFailurePolicy::FailOpen => {
                    warn!(product = %id, error = %e, "stock check failed, assuming available");
                    Ok(())
                }
                StockFailurePolicy::FailClosed => Err(e.into()),
            },
        }
    }

    async fn save(&self, cart: &Cart) {
        if let Err(e) = write_json(self.storage.as_ref(), &self.config.cart_key, cart).await {
            warn!(key = %self.config.cart_key, error = %e, "failed to persist cart");
        }
    }

    async fn clear_state(&self) {
        if let Err(e) = self.storage.remove(&self.config.cart_key).await {
            warn!(error = %e, "failed to clear cart");
        }
        *locked(&self.coupon) = None;
    }

    fn record(&self, event: CartEvent) { locked(&self.events).push(event); }
}
