use serde::Deserialize;
use serde_json::Value;

use crate::error::FeedError;
use crate::model::bar::{parse_provider_datetime, Bar, Quote};

/// Twelve Data encodes every number as a string.
pub fn string_to_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    match v {
        Value::String(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("invalid number")),
        _ => Err(serde::de::Error::custom("invalid numeric value")),
    }
}

/// Missing volume (forex, indices) reads as zero.
pub fn optional_string_to_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    match v {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("invalid number")),
        Some(_) => Err(serde::de::Error::custom("invalid numeric value")),
    }
}

/// `{"status":"error","code":401,"message":"..."}` on any endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Reject provider error payloads before decoding the success shape.
pub fn check_status(body: &Value) -> Result<(), FeedError> {
    if body.get("status").and_then(Value::as_str) != Some("error") {
        return Ok(());
    }
    let err: ApiErrorBody = serde_json::from_value(body.clone())?;
    Err(FeedError::Upstream {
        code: err.code,
        message: err
            .message
            .unwrap_or_else(|| "provider returned status=error".to_string()),
    })
}

/// One element of `time_series.values` (newest first on the wire).
#[derive(Debug, Clone, Deserialize)]
pub struct RawBar {
    pub datetime: String,
    #[serde(deserialize_with = "string_to_f64")]
    pub open: f64,
    #[serde(deserialize_with = "string_to_f64")]
    pub high: f64,
    #[serde(deserialize_with = "string_to_f64")]
    pub low: f64,
    #[serde(deserialize_with = "string_to_f64")]
    pub close: f64,
    #[serde(default, deserialize_with = "optional_string_to_f64")]
    pub volume: f64,
}

impl RawBar {
    pub fn into_bar(self) -> Result<Bar, FeedError> {
        let timestamp = parse_provider_datetime(&self.datetime).ok_or_else(|| FeedError::Upstream {
            code: None,
            message: format!("unparseable datetime {:?}", self.datetime),
        })?;
        Ok(Bar {
            timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TimeSeriesResponse {
    #[serde(default)]
    pub values: Vec<RawBar>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteResponse {
    pub symbol: String,
    pub datetime: String,
    #[serde(deserialize_with = "string_to_f64")]
    pub close: f64,
    pub is_market_open: bool,
}

impl QuoteResponse {
    pub fn into_quote(self) -> Result<Quote, FeedError> {
        let timestamp = parse_provider_datetime(&self.datetime).ok_or_else(|| FeedError::Upstream {
            code: None,
            message: format!("unparseable datetime {:?}", self.datetime),
        })?;
        Ok(Quote {
            symbol: self.symbol,
            timestamp,
            close: self.close,
            is_market_open: self.is_market_open,
        })
    }
}
