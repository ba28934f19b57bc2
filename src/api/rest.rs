// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/` and are read-only. Each calendar or
// panel request fetches the raw daily candles for the view's window and
// recomputes the derived view from scratch.
//
// CORS is configured permissively so the browser dashboard can be served
// from any origin.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::app_state::{AppState, ErrorRecord};
use crate::binance::rate_limit::RateLimitSnapshot;
use crate::types::Granularity;
use crate::view::{recompute, select, CalendarView, PanelSnapshot, ViewState};

type ApiError = (StatusCode, Json<serde_json::Value>);

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/symbols", get(symbols))
        .route("/api/v1/calendar", get(calendar))
        .route("/api/v1/panel", get(panel))
        .route("/api/v1/errors", get(errors))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

fn bad_request(message: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message.to_string() })),
    )
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
    uptime_secs: u64,
    rate_limit: RateLimitSnapshot,
    recent_errors: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.uptime_secs(),
        rate_limit: state.rate_limit.snapshot(),
        recent_errors: state.recent_errors.read().len(),
    })
}

async fn symbols(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config.symbols.clone())
}

async fn errors(State(state): State<Arc<AppState>>) -> Json<Vec<ErrorRecord>> {
    Json(state.recent_errors())
}

// =============================================================================
// Calendar views
// =============================================================================

#[derive(Debug, Deserialize)]
struct CalendarQuery {
    symbol: String,
    granularity: Granularity,
    year: i32,
    #[serde(default)]
    month: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PanelQuery {
    symbol: String,
    granularity: Granularity,
    year: i32,
    #[serde(default)]
    month: Option<u32>,
    date: NaiveDate,
}

/// Validate the view parameters, fetch the raw candles and recompute.
async fn load_view(
    state: &AppState,
    symbol: &str,
    granularity: Granularity,
    year: i32,
    month: Option<u32>,
) -> Result<CalendarView, ApiError> {
    if !state.config.is_supported_symbol(symbol) {
        return Err(bad_request(format!(
            "unsupported symbol '{}', expected one of {:?}",
            symbol, state.config.symbols
        )));
    }

    let view_state = ViewState::new(symbol, granularity, year, month).map_err(bad_request)?;
    let week_start = state.config.week_start;
    let window = view_state.fetch_window(week_start).map_err(bad_request)?;

    let raw = match state.source.daily_candles(&view_state.symbol, window).await {
        Ok(raw) => raw,
        Err(e) => {
            state.push_error(format!("{e:#}"), Some(view_state.symbol.clone()));
            return Err((
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": "Failed to fetch OHLCV data" })),
            ));
        }
    };

    Ok(recompute(&view_state, &raw, week_start))
}

async fn calendar(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CalendarQuery>,
) -> Result<Json<CalendarView>, ApiError> {
    let view = load_view(&state, &q.symbol, q.granularity, q.year, q.month).await?;
    info!(
        symbol = %view.symbol,
        granularity = %view.granularity,
        year = view.year,
        cells = view.candles.len(),
        "calendar view served"
    );
    Ok(Json(view))
}

async fn panel(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PanelQuery>,
) -> Result<Json<PanelSnapshot>, ApiError> {
    let view = load_view(&state, &q.symbol, q.granularity, q.year, q.month).await?;
    let snapshot =
        select(&view, q.date, &state.config.indicator_params()).map_err(bad_request)?;
    info!(
        symbol = %view.symbol,
        date = %q.date,
        has_candle = snapshot.candle.is_some(),
        "panel snapshot served"
    );
    Ok(Json(snapshot))
}
