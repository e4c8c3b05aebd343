#![allow(async_fn_in_trait)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::error::FeedError;
use crate::model::bar::{Bar, Quote};
use crate::model::forecast::SettledForecast;
use crate::session::state::SessionSummary;

/// Historical bars for the window. Order of the returned bars is not
/// significant; the window re-orders them oldest first.
pub trait BarSource {
    async fn fetch_recent_bars(
        &self,
        symbol: &str,
        interval: &str,
        count: usize,
    ) -> Result<Vec<Bar>, FeedError>;
}

/// Live quote for the in-progress period.
pub trait QuoteFeed {
    async fn fetch_current_quote(&self, symbol: &str, interval: &str) -> Result<Quote, FeedError>;
}

/// Append-only sink for settled forecasts.
pub trait ForecastLog {
    fn append(&mut self, record: &SettledForecast) -> Result<()>;
}

/// Receives the end-of-session summary.
pub trait SummarySink {
    fn report(&self, summary: &SessionSummary) -> Result<()>;
}

/// Suspension between polls and between transient-failure retries.
pub trait Pacer {
    async fn wait(&mut self, period: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

impl Pacer for TokioPacer {
    async fn wait(&mut self, period: Duration) {
        // A zero period still yields to the runtime.
        tokio::time::sleep(period).await;
    }
}

impl<T: BarSource> BarSource for Arc<T> {
    async fn fetch_recent_bars(
        &self,
        symbol: &str,
        interval: &str,
        count: usize,
    ) -> Result<Vec<Bar>, FeedError> {
        (**self).fetch_recent_bars(symbol, interval, count).await
    }
}

impl<T: QuoteFeed> QuoteFeed for Arc<T> {
    async fn fetch_current_quote(&self, symbol: &str, interval: &str) -> Result<Quote, FeedError> {
        (**self).fetch_current_quote(symbol, interval).await
    }
}

impl<T: ForecastLog + ?Sized> ForecastLog for Box<T> {
    fn append(&mut self, record: &SettledForecast) -> Result<()> {
        (**self).append(record)
    }
}

impl<T: SummarySink + ?Sized> SummarySink for Box<T> {
    fn report(&self, summary: &SessionSummary) -> Result<()> {
        (**self).report(summary)
    }
}

impl<A: SummarySink, B: SummarySink> SummarySink for (A, B) {
    fn report(&self, summary: &SessionSummary) -> Result<()> {
        self.0.report(summary)?;
        self.1.report(summary)
    }
}

/// Reports to every sink; the first failure is returned after all have run.
impl<S: SummarySink> SummarySink for Vec<S> {
    fn report(&self, summary: &SessionSummary) -> Result<()> {
        let mut first_err = None;
        for sink in self {
            if let Err(e) = sink.report(summary) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Summary sink that discards the summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSummary;

impl SummarySink for NoSummary {
    fn report(&self, _summary: &SessionSummary) -> Result<()> {
        Ok(())
    }
}
