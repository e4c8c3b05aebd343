use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::FeedError;
use crate::model::bar::{Bar, Quote};
use crate::session::{BarSource, QuoteFeed};

use super::types::{check_status, QuoteResponse, TimeSeriesResponse};

pub const DEFAULT_BASE_URL: &str = "https://twelve-data1.p.rapidapi.com";
pub const DEFAULT_RAPIDAPI_HOST: &str = "twelve-data1.p.rapidapi.com";

/// Twelve Data over RapidAPI.
#[derive(Debug, Clone)]
pub struct TwelveDataClient {
    http: reqwest::Client,
    base_url: String,
}

impl TwelveDataClient {
    pub fn new(base_url: &str, api_key: &str, api_host: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("X-RapidAPI-Key", HeaderValue::from_str(api_key)?);
        headers.insert("X-RapidAPI-Host", HeaderValue::from_str(api_host)?);
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("failed to build Twelve Data HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn compact_error_body(body: &str) -> String {
        let normalized = body.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.len() > 180 {
            let cut = (0..=180)
                .rev()
                .find(|i| normalized.is_char_boundary(*i))
                .unwrap_or(0);
            format!("{}...", &normalized[..cut])
        } else {
            normalized
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, FeedError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let resp = self.http.get(&url).query(query).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            if let Ok(v) = serde_json::from_str::<Value>(&body) {
                check_status(&v)?;
            }
            let message = format!("{} {}: {}", endpoint, status, Self::compact_error_body(&body));
            return Err(match status {
                StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT => FeedError::TransientNetwork(message),
                _ => FeedError::Upstream {
                    code: Some(status.as_u16() as i64),
                    message,
                },
            });
        }

        let v: Value = serde_json::from_str(&body)?;
        check_status(&v)?;
        Ok(serde_json::from_value(v)?)
    }

    fn base_query(symbol: &str, interval: &str) -> Vec<(&'static str, String)> {
        vec![
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("format", "json".to_string()),
        ]
    }

    /// `time_series`, returned newest first as the provider sends it.
    pub async fn time_series(
        &self,
        symbol: &str,
        interval: &str,
        outputsize: usize,
    ) -> Result<Vec<Bar>, FeedError> {
        let mut query = Self::base_query(symbol, interval);
        query.push(("outputsize", outputsize.to_string()));
        let resp: TimeSeriesResponse = self.get("time_series", &query).await?;
        let bars = resp
            .values
            .into_iter()
            .map(|raw| raw.into_bar())
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(symbol, interval, bars = bars.len(), "Fetched time series");
        Ok(bars)
    }

    pub async fn quote(&self, symbol: &str, interval: &str) -> Result<Quote, FeedError> {
        let resp: QuoteResponse = self
            .get("quote", &Self::base_query(symbol, interval))
            .await?;
        resp.into_quote()
    }
}

impl BarSource for TwelveDataClient {
    async fn fetch_recent_bars(
        &self,
        symbol: &str,
        interval: &str,
        count: usize,
    ) -> Result<Vec<Bar>, FeedError> {
        self.time_series(symbol, interval, count).await
    }
}

impl QuoteFeed for TwelveDataClient {
    async fn fetch_current_quote(&self, symbol: &str, interval: &str) -> Result<Quote, FeedError> {
        self.quote(symbol, interval).await
    }
}
