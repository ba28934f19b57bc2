// =============================================================================
// Central Application State
// =============================================================================
//
// Shared across all request handlers via `Arc<AppState>`. Configuration is
// immutable after startup; the only mutable piece is the bounded log of
// recent upstream errors surfaced by the health endpoint.
//
// Thread safety:
//   - Atomic counters inside the rate-limit tracker.
//   - parking_lot::RwLock for the error log.
// =============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::warn;

use crate::binance::RateLimitTracker;
use crate::market_data::CandleSource;
use crate::runtime_config::RuntimeConfig;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// Symbol the failing request was for, if any.
    pub symbol: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

pub struct AppState {
    pub config: RuntimeConfig,
    pub source: Arc<dyn CandleSource>,
    pub rate_limit: Arc<RateLimitTracker>,
    pub recent_errors: RwLock<VecDeque<ErrorRecord>>,
    /// Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        config: RuntimeConfig,
        source: Arc<dyn CandleSource>,
        rate_limit: Arc<RateLimitTracker>,
    ) -> Self {
        Self {
            config,
            source,
            rate_limit,
            recent_errors: RwLock::new(VecDeque::with_capacity(MAX_RECENT_ERRORS)),
            start_time: std::time::Instant::now(),
        }
    }

    /// Record an upstream failure, evicting the oldest entry when full.
    pub fn push_error(&self, message: String, symbol: Option<String>) {
        warn!(symbol = ?symbol, error = %message, "upstream error recorded");
        let record = ErrorRecord {
            message,
            symbol,
            at: Utc::now().to_rfc3339(),
        };
        let mut errors = self.recent_errors.write();
        if errors.len() >= MAX_RECENT_ERRORS {
            errors.pop_front();
        }
        errors.push_back(record);
    }

    /// Recent errors, newest first.
    pub fn recent_errors(&self) -> Vec<ErrorRecord> {
        self.recent_errors.read().iter().rev().cloned().collect()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
