// =============================================================================
// Rate-Limit Tracker — monitors Binance request weight to avoid 429s
// =============================================================================
//
// Binance allows 1200 request weight per minute per IP; we hard-cap ourselves
// at 1000. The tracker reads `X-MBX-USED-WEIGHT-1M` after every response and
// keeps atomic counters that any task may query lock-free.
//
// The exchange only reports weight on responses, so a reading older than one
// minute is treated as expired rather than blocking forever.
// =============================================================================

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use serde::Serialize;
use tracing::{debug, warn};

/// Hard ceiling at which we refuse to send additional requests.
const WEIGHT_HARD_LIMIT: u32 = 1000;
/// Soft warning threshold.
const WEIGHT_WARN_THRESHOLD: u32 = 800;
/// Length of the exchange's weight window.
const WEIGHT_WINDOW_MS: i64 = 60_000;

/// Thread-safe rate-limit tracker backed by atomic counters.
pub struct RateLimitTracker {
    used_weight_1m: AtomicU32,
    /// Epoch millis of the last header reading.
    updated_at_ms: AtomicI64,
}

/// Snapshot of the current rate-limit state for the health endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RateLimitSnapshot {
    pub used_weight_1m: u32,
    pub hard_limit: u32,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            used_weight_1m: AtomicU32::new(0),
            updated_at_ms: AtomicI64::new(0),
        }
    }

    /// Update the weight counter from the response headers returned by
    /// Binance.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let Some(w) = headers
            .get("X-MBX-USED-WEIGHT-1M")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u32>().ok())
        else {
            return;
        };
        self.record_weight(w, now_ms());
    }

    fn record_weight(&self, weight: u32, at_ms: i64) {
        let prev = self.used_weight_1m.swap(weight, Ordering::Relaxed);
        self.updated_at_ms.store(at_ms, Ordering::Relaxed);

        if weight >= WEIGHT_WARN_THRESHOLD && prev < WEIGHT_WARN_THRESHOLD {
            warn!(
                used_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "rate-limit weight crossed warning threshold"
            );
        }
        debug!(used_weight_1m = weight, "rate-limit weight updated from header");
    }

    /// Current weight, or 0 once the last reading has aged out.
    pub fn used_weight_1m(&self) -> u32 {
        self.used_weight_at(now_ms())
    }

    fn used_weight_at(&self, at_ms: i64) -> u32 {
        let updated = self.updated_at_ms.load(Ordering::Relaxed);
        if at_ms - updated >= WEIGHT_WINDOW_MS {
            0
        } else {
            self.used_weight_1m.load(Ordering::Relaxed)
        }
    }

    /// Return `true` if we can afford to spend `weight` more request weight
    /// without exceeding the hard limit.
    pub fn can_send_request(&self, weight: u32) -> bool {
        let current = self.used_weight_1m();
        let allowed = current + weight <= WEIGHT_HARD_LIMIT;
        if !allowed {
            warn!(
                current_weight = current,
                requested_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "request blocked — would exceed rate-limit"
            );
        }
        allowed
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            used_weight_1m: self.used_weight_1m(),
            hard_limit: WEIGHT_HARD_LIMIT,
        }
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimitTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitTracker")
            .field("used_weight_1m", &self.used_weight_1m.load(Ordering::Relaxed))
            .field("updated_at_ms", &self.updated_at_ms.load(Ordering::Relaxed))
            .finish()
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn reads_weight_header() {
        let tracker = RateLimitTracker::new();
        let mut headers = HeaderMap::new();
        headers.insert("X-MBX-USED-WEIGHT-1M", HeaderValue::from_static("42"));
        tracker.update_from_headers(&headers);
        assert_eq!(tracker.used_weight_1m(), 42);
        assert_eq!(tracker.snapshot().used_weight_1m, 42);
    }

    #[test]
    fn ignores_missing_or_garbage_header() {
        let tracker = RateLimitTracker::new();
        let mut headers = HeaderMap::new();
        tracker.update_from_headers(&headers);
        headers.insert("X-MBX-USED-WEIGHT-1M", HeaderValue::from_static("lots"));
        tracker.update_from_headers(&headers);
        assert_eq!(tracker.used_weight_1m(), 0);
    }

    #[test]
    fn blocks_near_hard_limit() {
        let tracker = RateLimitTracker::new();
        tracker.record_weight(999, now_ms());
        assert!(tracker.can_send_request(1));
        assert!(!tracker.can_send_request(2));
    }

    #[test]
    fn stale_reading_expires() {
        let tracker = RateLimitTracker::new();
        tracker.record_weight(1000, 1_000);
        assert_eq!(tracker.used_weight_at(1_000 + WEIGHT_WINDOW_MS - 1), 1000);
        assert_eq!(tracker.used_weight_at(1_000 + WEIGHT_WINDOW_MS), 0);
    }
}
