//! Storefront Cart - local storefront shell around the cart controller

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_cart::services::HttpStorefrontClient;
use storefront_cart::web::{self, AppState};
use storefront_cart::{storage, CartConfig, CartController, Services, ToastBoard};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = CartConfig::from_env()?;
    let storage = storage::open(&config.storage);
    let client = Arc::new(HttpStorefrontClient::new(config.api_base_url.clone(), config.csrf_token.clone()));
    let toasts = Arc::new(ToastBoard::new(config.notification_ttl));
    let port = config.port;
    tracing::info!(api = %config.api_base_url, storage = ?config.storage, policy = ?config.stock_failure_policy, "cart configured");

    let cart = Arc::new(CartController::new(config, storage, Services::from_client(client), toasts.clone()));
    let app = web::router(AppState { cart, toasts });

    tracing::info!("Storefront cart listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
