// =============================================================================
// Runtime Configuration — service settings with env overrides
// =============================================================================
//
// All settings live in one JSON file. Every field carries
// `#[serde(default)]` so that adding new fields never breaks loading an older
// config file, and a missing file falls back to the defaults.
//
// Environment variables (optionally from `.env`) override the file:
//   CALENDAR_SYMBOLS     comma-separated symbol list
//   CALENDAR_BIND_ADDR   API listen address
//   CALENDAR_WEEK_START  "sunday" | "monday"
//   BINANCE_BASE_URL     upstream REST base URL
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::indicators::moving_average::DEFAULT_MA_PERIOD;
use crate::indicators::rsi::DEFAULT_RSI_PERIOD;
use crate::indicators::summary::{IndicatorParams, DEFAULT_HISTORY_LEN};
use crate::types::WeekStart;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec![
        "BTCUSDT".to_string(),
        "ETHUSDT".to_string(),
        "BNBUSDT".to_string(),
    ]
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_binance_base_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_history_len() -> usize {
    DEFAULT_HISTORY_LEN
}

fn default_ma_period() -> usize {
    DEFAULT_MA_PERIOD
}

fn default_rsi_period() -> usize {
    DEFAULT_RSI_PERIOD
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Symbols & calendar -------------------------------------------------

    /// Symbols the dashboard may request. Anything else is rejected.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    #[serde(default)]
    pub week_start: WeekStart,

    // --- Network ------------------------------------------------------------

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_binance_base_url")]
    pub binance_base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // --- Indicator panel ----------------------------------------------------

    /// Most recent entries kept in a history window.
    #[serde(default = "default_history_len")]
    pub history_len: usize,

    #[serde(default = "default_ma_period")]
    pub ma_period: usize,

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            week_start: WeekStart::default(),
            bind_addr: default_bind_addr(),
            binance_base_url: default_binance_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            history_len: default_history_len(),
            ma_period: default_ma_period(),
            rsi_period: default_rsi_period(),
        }
    }
}

impl RuntimeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;
        config.symbols = normalise_symbols(config.symbols.iter().map(String::as_str));

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            week_start = %config.week_start,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Apply overrides from `lookup` (normally `std::env::var`). Invalid
    /// values are logged and ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(syms) = lookup("CALENDAR_SYMBOLS") {
            let parsed = normalise_symbols(syms.split(','));
            if parsed.is_empty() {
                warn!("CALENDAR_SYMBOLS is empty, keeping configured symbols");
            } else {
                self.symbols = parsed;
            }
        }
        if let Some(addr) = lookup("CALENDAR_BIND_ADDR") {
            self.bind_addr = addr.trim().to_string();
        }
        if let Some(url) = lookup("BINANCE_BASE_URL") {
            self.binance_base_url = url.trim().to_string();
        }
        if let Some(ws) = lookup("CALENDAR_WEEK_START") {
            match ws.parse::<WeekStart>() {
                Ok(parsed) => self.week_start = parsed,
                Err(e) => warn!(error = %e, "ignoring CALENDAR_WEEK_START"),
            }
        }
    }

    pub fn is_supported_symbol(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s.eq_ignore_ascii_case(symbol.trim()))
    }

    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            history_len: self.history_len,
            ma_period: self.ma_period,
            rsi_period: self.rsi_period,
        }
    }
}

/// Trim, upper-case and de-duplicate symbols, dropping empty entries.
fn normalise_symbols<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in raw.map(|s| s.trim().to_uppercase()).filter(|s| !s.is_empty()) {
        if !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.symbols, vec!["BTCUSDT", "ETHUSDT", "BNBUSDT"]);
        assert_eq!(cfg.week_start, WeekStart::Sunday);
        assert_eq!(cfg.bind_addr, "0.0.0.0:5000");
        assert_eq!(cfg.history_len, 30);
        assert_eq!(cfg.ma_period, 20);
        assert_eq!(cfg.rsi_period, 14);
        assert_eq!(cfg.indicator_params(), IndicatorParams::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "week_start": "monday", "symbols": ["SOLUSDT"] }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.week_start, WeekStart::Monday);
        assert_eq!(cfg.symbols, vec!["SOLUSDT"]);
        assert_eq!(cfg.request_timeout_secs, 10);
        assert_eq!(cfg.binance_base_url, "https://api.binance.com");
    }

    #[test]
    fn load_normalises_symbols() {
        let path = std::env::temp_dir().join(format!(
            "candle_calendar_config_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "symbols": [" btcusdt", "BTCUSDT", "", "ethusdt"] }"#).unwrap();
        let cfg = RuntimeConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.symbols, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        assert!(RuntimeConfig::load("/definitely/not/here.json").is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = RuntimeConfig::default();
        cfg.apply_env_overrides(env(&[
            ("CALENDAR_SYMBOLS", "xrpusdt, solusdt,,"),
            ("CALENDAR_BIND_ADDR", "127.0.0.1:8080"),
            ("CALENDAR_WEEK_START", "Monday"),
            ("BINANCE_BASE_URL", "https://api.binance.us"),
        ]));
        assert_eq!(cfg.symbols, vec!["XRPUSDT", "SOLUSDT"]);
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080");
        assert_eq!(cfg.week_start, WeekStart::Monday);
        assert_eq!(cfg.binance_base_url, "https://api.binance.us");
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut cfg = RuntimeConfig::default();
        cfg.apply_env_overrides(env(&[
            ("CALENDAR_SYMBOLS", " , "),
            ("CALENDAR_WEEK_START", "friday"),
        ]));
        assert_eq!(cfg.symbols.len(), 3);
        assert_eq!(cfg.week_start, WeekStart::Sunday);
    }

    #[test]
    fn symbol_check_is_case_insensitive() {
        let cfg = RuntimeConfig::default();
        assert!(cfg.is_supported_symbol("ethusdt"));
        assert!(!cfg.is_supported_symbol("DOGEUSDT"));
    }
}
