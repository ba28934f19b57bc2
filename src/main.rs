// =============================================================================
// Candle Calendar — Main Entry Point
// =============================================================================
//
// Serves daily / weekly / monthly OHLCV calendar views for a fixed set of
// spot symbols. Every request recomputes its view from raw daily klines
// fetched from the exchange; the service keeps no candle cache.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod binance;
mod indicators;
mod market_data;
mod runtime_config;
mod types;
mod view;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::binance::{BinanceClient, RateLimitTracker};
use crate::runtime_config::RuntimeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Candle Calendar — Starting Up                     ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = RuntimeConfig::load("calendar_config.json").unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env_overrides(|key| std::env::var(key).ok());

    info!(
        symbols = ?config.symbols,
        week_start = %config.week_start,
        upstream = %config.binance_base_url,
        "Configuration ready"
    );

    // ── 2. Upstream client ───────────────────────────────────────────────
    let rate_limit = Arc::new(RateLimitTracker::new());
    let client = BinanceClient::new(
        config.binance_base_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
        rate_limit.clone(),
    )?;

    // ── 3. Shared state ──────────────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, Arc::new(client), rate_limit));

    // ── 4. Start the API server ──────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        })
        .await
        .context("API server failed")?;

    info!("Candle Calendar stopped");
    Ok(())
}
