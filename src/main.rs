//! Marketplace dev server - in-memory backend for local storefront work

use anyhow::Result;
use marketplace_client::dev_server::{self, DevState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let state = if std::env::var("DEV_SEED_ORDERS").map(|v| v != "0").unwrap_or(true) { DevState::seeded() } else { DevState::new() };
    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Marketplace dev server listening on 0.0.0.0:{}", port);
    dev_server::serve(listener, state).await?;
    Ok(())
}
