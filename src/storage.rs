//! JSON files on disk: the settled-forecast log, the bar archive and the
//! session summary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::FeedError;
use crate::model::bar::Bar;
use crate::model::forecast::SettledForecast;
use crate::session::{BarSource, ForecastLog, SessionSummary, SummarySink};

fn read_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let payload = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&payload).with_context(|| format!("failed to parse {}", path.display()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn forecast_log_path(log_dir: &Path, date: NaiveDate) -> PathBuf {
    log_dir.join(format!("log-{}.json", date.format("%Y-%m-%d")))
}

/// `FX/EURUSD` style symbols are flattened so they stay a single file name.
pub fn bar_archive_path(data_dir: &Path, symbol: &str, interval: &str) -> PathBuf {
    data_dir.join(format!("{}-{}.json", symbol.replace('/', "-"), interval))
}

pub fn summary_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("summary-{}.json", date.format("%Y-%m-%d")))
}

/// Daily JSON array of settled forecasts, most recent first.
#[derive(Debug, Clone)]
pub struct JsonForecastLog {
    path: PathBuf,
}

impl JsonForecastLog {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log named after the session date; all of a session's records land in
    /// one file even across midnight.
    pub fn open_in(log_dir: &Path, session_date: NaiveDate) -> Self {
        Self::at_path(forecast_log_path(log_dir, session_date))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<SettledForecast>> {
        read_json_array(&self.path)
    }
}

impl ForecastLog for JsonForecastLog {
    fn append(&mut self, record: &SettledForecast) -> Result<()> {
        let mut records = self.load()?;
        records.insert(0, record.clone());
        write_json(&self.path, &records)?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "Forecast log updated");
        Ok(())
    }
}

/// Decorates a bar source with an on-disk archive of everything it has
/// returned, newest first, bounded to `max_bars`.
#[derive(Debug, Clone)]
pub struct ArchivingBarSource<B> {
    inner: B,
    data_dir: PathBuf,
    max_bars: usize,
}

impl<B> ArchivingBarSource<B> {
    pub fn new(inner: B, data_dir: impl Into<PathBuf>, max_bars: usize) -> Self {
        Self {
            inner,
            data_dir: data_dir.into(),
            max_bars: max_bars.max(1),
        }
    }

    pub fn archive_path(&self, symbol: &str, interval: &str) -> PathBuf {
        bar_archive_path(&self.data_dir, symbol, interval)
    }

    pub fn load_archive(&self, symbol: &str, interval: &str) -> Result<Vec<Bar>> {
        read_json_array(&self.archive_path(symbol, interval))
    }

    /// Merge `bars` into the archive; a fresher bar replaces the stored one
    /// with the same timestamp.
    pub fn archive(&self, symbol: &str, interval: &str, bars: &[Bar]) -> Result<usize> {
        let path = self.archive_path(symbol, interval);
        let mut by_ts: BTreeMap<NaiveDateTime, Bar> = read_json_array::<Bar>(&path)?
            .into_iter()
            .map(|b| (b.timestamp, b))
            .collect();
        for bar in bars {
            by_ts.insert(bar.timestamp, bar.clone());
        }
        let newest_first: Vec<Bar> = by_ts.into_values().rev().take(self.max_bars).collect();
        write_json(&path, &newest_first)?;
        Ok(newest_first.len())
    }
}

impl<B: BarSource> BarSource for ArchivingBarSource<B> {
    async fn fetch_recent_bars(
        &self,
        symbol: &str,
        interval: &str,
        count: usize,
    ) -> Result<Vec<Bar>, FeedError> {
        let bars = self.inner.fetch_recent_bars(symbol, interval, count).await?;
        // Archive failures never fail the fetch.
        match self.archive(symbol, interval, &bars) {
            Ok(stored) => tracing::debug!(symbol, interval, stored, "Bar archive updated"),
            Err(e) => tracing::warn!(error = %format!("{:#}", e), "Bar archive write failed"),
        }
        Ok(bars)
    }
}

/// Writes the session summary as `summary-<date>.json`.
#[derive(Debug, Clone)]
pub struct JsonSummaryFile {
    dir: PathBuf,
}

impl JsonSummaryFile {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, summary: &SessionSummary) -> PathBuf {
        summary_path(&self.dir, summary.ended_at.date_naive())
    }
}

impl SummarySink for JsonSummaryFile {
    fn report(&self, summary: &SessionSummary) -> Result<()> {
        let path = self.path_for(summary);
        write_json(&path, summary)?;
        tracing::info!(path = %path.display(), "Session summary written");
        Ok(())
    }
}
