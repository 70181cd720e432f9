//! HTML rendering of cart state. Pure functions of their inputs; every
//! mutation goes back through the controller via form posts.

use std::fmt::Write as _;

use crate::config::CartConfig;
use crate::domain::aggregates::{CouponState, LineItem, OrderTotals};
use crate::notify::{Severity, Toast};

/// Everything the checkout page shows.
#[derive(Debug, Clone, Copy)]
pub struct PageModel<'a> {
    pub items: &'a [LineItem],
    pub totals: OrderTotals,
    pub coupon: Option<&'a CouponState>,
    pub item_count: u64,
    pub toasts: &'a [Toast],
    pub invalid_field: Option<&'a str>,
}

/// Delivery form rows: validation field, form name, label, input type.
const DELIVERY_FIELDS: [(&str, &str, &str, &str); 7] = [
    ("full_name", "fullName", "Full name", "text"),
    ("email", "email", "Email", "email"),
    ("phone", "phone", "Phone", "tel"),
    ("address", "address", "Address", "text"),
    ("city", "city", "City", "text"),
    ("state", "state", "State", "text"),
    ("zip_code", "zipCode", "ZIP code", "text"),
];

pub fn checkout_page(model: &PageModel<'_>, config: &CartConfig) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Checkout</title></head>
<body>
<header><a href="/checkout">Cart {counter}</a></header>
{toasts}
<main class="container">
<section id="cart-items">
{items}
</section>
<aside>
{totals}
{coupon}
<form method="post" action="/cart/clear"><button type="submit" class="btn btn-link">Empty cart</button></form>
</aside>
{delivery}
</main>
</body>
</html>
"#,
        counter = counter_badge(model.item_count),
        toasts = toasts(model.toasts),
        items = cart_items(model.items, config),
        totals = totals_block(&model.totals, &config.currency_symbol),
        coupon = coupon_form(model.coupon, &config.currency_symbol),
        delivery = delivery_form(model.invalid_field),
    )
}

/// One row per line, or the empty-state placeholder.
pub fn cart_items(items: &[LineItem], config: &CartConfig) -> String {
    if items.is_empty() {
        return r#"<div class="cart-empty text-center py-5">
<h5>Your cart is empty</h5>
<p class="text-muted">Add products to continue</p>
<a href="/" class="btn btn-primary">Continue shopping</a>
</div>"#
            .to_string();
    }

    let symbol = &config.currency_symbol;
    let placeholder = escape_html(&config.placeholder_image);
    let mut html = String::new();
    for item in items {
        let id = escape_html(item.id.as_str());
        let name = escape_html(&item.name);
        let qty = item.quantity.value();
        let _ = write!(
            html,
            r#"<div class="checkout-item" data-product-id="{id}">
<img src="{image}" alt="{name}" width="80" height="80" onerror="this.onerror=null;this.src='{placeholder}'">
<h6>{name}</h6>
<p class="text-muted">{unit} each</p>
<div class="quantity-stepper">
<form method="post" action="/cart/quantity"><input type="hidden" name="id" value="{id}"><input type="hidden" name="quantity" value="{minus}"><button type="submit">-</button></form>
<form method="post" action="/cart/quantity"><input type="hidden" name="id" value="{id}"><input type="number" name="quantity" value="{qty}" min="1" onchange="this.form.submit()"></form>
<form method="post" action="/cart/quantity"><input type="hidden" name="id" value="{id}"><input type="hidden" name="quantity" value="{plus}"><button type="submit">+</button></form>
</div>
<span class="line-total">{line_total}</span>
<form method="post" action="/cart/remove"><input type="hidden" name="id" value="{id}"><button type="submit" title="Remove product">Remove</button></form>
</div>
"#,
            image = escape_html(&item.image_url),
            unit = item.unit_price.display(symbol),
            minus = i64::from(qty) - 1,
            plus = i64::from(qty) + 1,
            line_total = item.line_total().display(symbol),
        );
    }
    html
}

pub fn totals_block(totals: &OrderTotals, symbol: &str) -> String {
    let shipping = if totals.shipping.is_zero() { "Free".to_string() } else { totals.shipping.display(symbol) };
    let discount = if totals.discount.is_zero() {
        String::new()
    } else {
        format!("<tr id=\"discount\"><th>Discount</th><td>- {}</td></tr>\n", totals.discount.display(symbol))
    };
    format!(
        "<table class=\"totals\">\n<tr id=\"subtotal\"><th>Subtotal</th><td>{}</td></tr>\n<tr id=\"shipping\"><th>Shipping</th><td>{shipping}</td></tr>\n{discount}<tr id=\"total\"><th>Total</th><td>{}</td></tr>\n</table>",
        totals.subtotal.display(symbol),
        totals.total.display(symbol),
    )
}

/// Item counter shown in every header; hidden when the cart is empty.
pub fn counter_badge(count: u64) -> String {
    let style = if count > 0 { "inline-block" } else { "none" };
    format!(r#"<span class="cart-counter badge" style="display: {style}">{count}</span>"#)
}

/// Coupon entry. Once a coupon is active the input is disabled for good.
pub fn coupon_form(coupon: Option<&CouponState>, symbol: &str) -> String {
    match coupon {
        Some(state) => format!(
            r#"<form class="coupon" method="post" action="/cart/coupon"><input type="text" name="code" value="{code}" disabled><button type="submit" disabled>Applied</button><small>{discount} off</small></form>"#,
            code = escape_html(state.code.as_str()),
            discount = state.discount.display(symbol),
        ),
        None => r#"<form class="coupon" method="post" action="/cart/coupon"><input type="text" name="code" placeholder="Coupon code"><button type="submit">Apply</button></form>"#.to_string(),
    }
}

/// Delivery form; the first invalid field is flagged and focused.
pub fn delivery_form(invalid_field: Option<&str>) -> String {
    let mut html = String::from("<form id=\"delivery-form\" method=\"post\" action=\"/checkout\">\n");
    for (field, name, label, kind) in DELIVERY_FIELDS {
        let invalid = invalid_field == Some(field);
        let class = if invalid { "form-control is-invalid" } else { "form-control" };
        let autofocus = if invalid { " autofocus" } else { "" };
        let _ = writeln!(
            html,
            r#"<label for="{name}">{label}</label><input id="{name}" name="{name}" type="{kind}" class="{class}" required{autofocus}>"#
        );
    }
    html.push_str("<button id=\"checkout-button\" type=\"submit\" class=\"btn btn-success\">Complete payment</button>\n</form>");
    html
}

pub fn toasts(toasts: &[Toast]) -> String {
    if toasts.is_empty() {
        return String::new();
    }
    let mut html = String::from("<div class=\"toast-container position-fixed top-0 end-0 p-3\">\n");
    for toast in toasts {
        let class = match toast.severity {
            Severity::Error => "danger",
            Severity::Success => "success",
            Severity::Info => "info",
        };
        let _ = writeln!(
            html,
            r#"<div class="toast show text-bg-{class}" role="alert">{}<form method="post" action="/toasts/dismiss"><input type="hidden" name="id" value="{}"><button type="submit" class="btn-close"></button></form></div>"#,
            escape_html(&toast.message),
            toast.id,
        );
    }
    html.push_str("</div>");
    html
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{CouponCode, Money, ProductId, Quantity};
    use rust_decimal::Decimal;
    use std::time::Instant;
    use uuid::Uuid;

    fn money(v: i64) -> Money { Money::new(Decimal::new(v, 0)) }

    fn item(name: &str, qty: u32) -> LineItem {
        LineItem {
            id: ProductId::new("7").unwrap(),
            name: name.into(),
            unit_price: Money::new(Decimal::new(590, 2)),
            image_url: "/soap.png".into(),
            quantity: Quantity::new(qty).unwrap(),
        }
    }

    #[test]
    fn test_empty_cart_placeholder() {
        let html = cart_items(&[], &CartConfig::default());
        assert!(html.contains("Your cart is empty"));
        assert!(!html.contains("checkout-item"));
    }

    #[test]
    fn test_item_row() {
        let html = cart_items(&[item("Soap", 3)], &CartConfig::default());
        assert!(html.contains("$ 5.90 each"));
        assert!(html.contains("$ 17.70"));
        assert!(html.contains(r#"name="quantity" value="2""#));
        assert!(html.contains(r#"name="quantity" value="4""#));
        assert!(html.contains("this.src='/static/img/no-image.png'"));
    }

    #[test]
    fn test_escapes_product_text() {
        let html = cart_items(&[item("<b>\"Soap\"</b>", 1)], &CartConfig::default());
        assert!(html.contains("&lt;b&gt;&quot;Soap&quot;&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_totals_block() {
        let without = totals_block(&OrderTotals::compute(money(120), Money::zero(), &CartConfig::default().shipping), "$");
        assert!(without.contains("<td>Free</td>"));
        assert!(!without.contains("Discount"));

        let with = totals_block(&OrderTotals::compute(money(50), money(10), &CartConfig::default().shipping), "$");
        assert!(with.contains("<td>$ 15.00</td>"));
        assert!(with.contains("<td>- $ 10.00</td>"));
        assert!(with.contains("<tr id=\"total\"><th>Total</th><td>$ 55.00</td></tr>"));
    }

    #[test]
    fn test_counter_badge_hidden_when_empty() {
        assert!(counter_badge(0).contains("display: none"));
        assert!(counter_badge(4).contains("display: inline-block\">4<"));
    }

    #[test]
    fn test_coupon_form_disabled_once_applied() {
        assert!(!coupon_form(None, "$").contains("disabled"));
        let state = CouponState { code: CouponCode::new("save10").unwrap(), discount: money(10) };
        let html = coupon_form(Some(&state), "$");
        assert!(html.contains(r#"value="SAVE10" disabled"#));
    }

    #[test]
    fn test_delivery_form_flags_invalid_field() {
        let html = delivery_form(Some("email"));
        assert!(html.contains(r#"name="email" type="email" class="form-control is-invalid" required autofocus"#));
        assert_eq!(html.matches("is-invalid").count(), 1);
    }

    #[test]
    fn test_page_composes_sections() {
        let toast = Toast { id: Uuid::new_v4(), message: "1x Soap added to cart".into(), severity: Severity::Success, expires_at: Instant::now() };
        let items = [item("Soap", 1)];
        let model = PageModel {
            items: &items,
            totals: OrderTotals::compute(money(6), Money::zero(), &CartConfig::default().shipping),
            coupon: None,
            item_count: 1,
            toasts: std::slice::from_ref(&toast),
            invalid_field: None,
        };
        let html = checkout_page(&model, &CartConfig::default());
        assert!(html.contains("text-bg-success"));
        assert!(html.contains("checkout-item"));
        assert!(html.contains("delivery-form"));
    }
}
