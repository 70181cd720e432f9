//! Runtime configuration, read from the environment (and `.env`).

use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::aggregates::ShippingPolicy;
use crate::domain::value_objects::Money;
use crate::services::csrf;

/// What to do when the stock-check endpoint cannot be reached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StockFailurePolicy {
    /// Block the mutation.
    #[default]
    FailClosed,
    /// Log and treat the product as available.
    FailOpen,
}

impl FromStr for StockFailurePolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "closed" | "fail-closed" => Ok(Self::FailClosed),
            "open" | "fail-open" => Ok(Self::FailOpen),
            other => Err(format!("unknown stock failure policy {other:?}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    /// Lives as long as the process, like a browser session store.
    Memory,
    /// One JSON file per key under the directory; survives restarts.
    File(PathBuf),
}

#[derive(Clone, Debug)]
pub struct CartConfig {
    pub api_base_url: String,
    pub csrf_token: Option<String>,
    pub storage: StorageBackend,
    pub cart_key: String,
    pub last_order_key: String,
    pub shipping: ShippingPolicy,
    pub currency_symbol: String,
    pub placeholder_image: String,
    pub notification_ttl: Duration,
    pub stock_failure_policy: StockFailurePolicy,
    pub port: u16,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".to_string(),
            csrf_token: None,
            storage: StorageBackend::File(PathBuf::from(".storefront")),
            cart_key: "storefront_cart".to_string(),
            last_order_key: "storefront_last_order".to_string(),
            shipping: ShippingPolicy {
                free_threshold: Money::new(Decimal::new(100, 0)),
                flat_fee: Money::new(Decimal::new(15, 0)),
            },
            currency_symbol: "$".to_string(),
            placeholder_image: "/static/img/no-image.png".to_string(),
            notification_ttl: Duration::from_secs(5),
            stock_failure_policy: StockFailurePolicy::FailClosed,
            port: 8083,
        }
    }
}

impl CartConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any variable source; unset variables keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let storage = match var("CART_STORAGE").as_deref().map(str::trim) {
            None | Some("file") => StorageBackend::File(var("CART_STORAGE_DIR").map_or_else(|| PathBuf::from(".storefront"), PathBuf::from)),
            Some("memory") => StorageBackend::Memory,
            Some(other) => return Err(ConfigError::Invalid { var: "CART_STORAGE", value: other.to_string() }),
        };

        Ok(Self {
            api_base_url: var("STOREFRONT_API_URL").map_or(defaults.api_base_url, |u| u.trim_end_matches('/').to_string()),
            csrf_token: var("CSRF_TOKEN").or_else(|| var("STOREFRONT_COOKIE").as_deref().and_then(csrf::from_cookie_header)),
            storage,
            cart_key: var("CART_KEY").unwrap_or(defaults.cart_key),
            last_order_key: var("LAST_ORDER_KEY").unwrap_or(defaults.last_order_key),
            shipping: ShippingPolicy {
                free_threshold: parse_money(&var, "FREE_SHIPPING_THRESHOLD", defaults.shipping.free_threshold)?,
                flat_fee: parse_money(&var, "FLAT_SHIPPING_FEE", defaults.shipping.flat_fee)?,
            },
            currency_symbol: var("CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),
            placeholder_image: var("PLACEHOLDER_IMAGE").unwrap_or(defaults.placeholder_image),
            notification_ttl: Duration::from_secs(parse(&var, "NOTIFICATION_TTL_SECS", 5u64)?),
            stock_failure_policy: parse(&var, "STOCK_FAILURE_POLICY", defaults.stock_failure_policy)?,
            port: parse(&var, "PORT", defaults.port)?,
        })
    }
}

fn parse<T: FromStr>(var: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match var(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { var: name, value }),
        None => Ok(default),
    }
}

fn parse_money(var: &impl Fn(&str) -> Option<String>, name: &'static str, default: Money) -> Result<Money, ConfigError> {
    match var(name) {
        Some(value) => Money::parse(&value).map_err(|_| ConfigError::Invalid { var: name, value }),
        None => Ok(default),
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = CartConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.stock_failure_policy, StockFailurePolicy::FailClosed);
        assert_eq!(config.storage, StorageBackend::File(PathBuf::from(".storefront")));
        assert_eq!(config.cart_key, "storefront_cart");
        assert_eq!(config.port, 8083);
    }

    #[test]
    fn test_overrides() {
        let config = CartConfig::from_lookup(lookup(&[
            ("STOREFRONT_API_URL", "https://shop.test/api/"),
            ("CART_STORAGE", "memory"),
            ("FREE_SHIPPING_THRESHOLD", "250,00"),
            ("STOCK_FAILURE_POLICY", "open"),
            ("NOTIFICATION_TTL_SECS", "3"),
        ])).unwrap();
        assert_eq!(config.api_base_url, "https://shop.test/api");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.shipping.free_threshold, Money::new(Decimal::new(250, 0)));
        assert_eq!(config.stock_failure_policy, StockFailurePolicy::FailOpen);
        assert_eq!(config.notification_ttl, Duration::from_secs(3));
    }

    #[test]
    fn test_csrf_token_falls_back_to_cookie() {
        let config = CartConfig::from_lookup(lookup(&[("STOREFRONT_COOKIE", "sessionid=1; csrftoken=c%3D1")])).unwrap();
        assert_eq!(config.csrf_token.as_deref(), Some("c=1"));

        let config = CartConfig::from_lookup(lookup(&[("CSRF_TOKEN", "explicit"), ("STOREFRONT_COOKIE", "csrftoken=x")])).unwrap();
        assert_eq!(config.csrf_token.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = CartConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(err, ConfigError::Invalid { var: "PORT", value: "eighty".into() });
        assert!(CartConfig::from_lookup(lookup(&[("STOCK_FAILURE_POLICY", "maybe")])).is_err());
        assert!(CartConfig::from_lookup(lookup(&[("CART_STORAGE", "redis")])).is_err());
    }
}
