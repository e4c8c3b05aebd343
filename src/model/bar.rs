use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One closed (or in-progress) OHLCV period as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Synthetic bar carrying only a close price (tests and warm-up).
    pub fn from_close(timestamp: NaiveDateTime, close: f64) -> Self {
        Self {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }
}

/// Latest quote for the in-progress period.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub is_market_open: bool,
}

/// Parse provider datetimes: `YYYY-MM-DD HH:MM:SS` for intraday intervals,
/// bare `YYYY-MM-DD` for daily and coarser.
pub fn parse_provider_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
