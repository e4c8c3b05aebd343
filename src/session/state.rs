use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::error::ModelError;
use crate::model::bar::Quote;
use crate::model::forecast::{AccuracyTally, ForecastErrorMetrics, ForecastRecord, SettledForecast};
use crate::model::series::RollingWindow;
use crate::predictor::ForecastModel;
use crate::regression::LinearParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Initializing,
    Polling,
    Updating,
    Settling,
    Terminated,
}

impl std::fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initializing => "initializing",
            Self::Polling => "polling",
            Self::Updating => "updating",
            Self::Settling => "settling",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Everything the loop mutates. Owned by the session and only touched
/// between suspension points.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub window: RollingWindow,
    pub pending: Option<ForecastRecord>,
    pub tally: AccuracyTally,
    pub metrics: ForecastErrorMetrics,
    pub phase: LoopPhase,
    pub cycles: u64,
    pub updates: u64,
    pub forecasts_issued: u64,
    pub consecutive_skips: u32,
    pub started_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(window_capacity: usize) -> Self {
        Self {
            window: RollingWindow::new(window_capacity),
            pending: None,
            tally: AccuracyTally::default(),
            metrics: ForecastErrorMetrics::default(),
            phase: LoopPhase::Initializing,
            cycles: 0,
            updates: 0,
            forecasts_issued: 0,
            consecutive_skips: 0,
            started_at: Utc::now(),
        }
    }
}

/// A new period has started, or nothing has been issued yet.
pub fn needs_update(state: &SessionState, quote: &Quote) -> bool {
    state.cycles == 0 || state.window.last_timestamp() != Some(quote.timestamp)
}

/// The window has closed a bar newer than the one the pending forecast was
/// issued against.
pub fn window_advanced(state: &SessionState) -> bool {
    let Some(pending) = &state.pending else {
        return true;
    };
    state
        .window
        .from_end(1)
        .map(|closed| closed.timestamp > pending.previous_timestamp)
        .unwrap_or(false)
}

/// Forecast the in-progress period from the closed bars that precede it.
/// The newest bar in the window is the in-progress one and is not used.
pub fn issue_forecast(
    model: &ForecastModel,
    window: &RollingWindow,
    forecast_timestamp: NaiveDateTime,
) -> Result<ForecastRecord, ModelError> {
    let n = model.input_len();
    let series = window.snapshot();
    let needed = (n + 1).max(2);
    if series.len() < needed {
        return Err(ModelError::InsufficientData {
            needed,
            got: series.len(),
        });
    }
    let closed = series.values_without_last(1);
    let end = closed.len();
    let forecast_price = model.predict(&closed[end - n..])?;
    Ok(ForecastRecord::issue(
        series.timestamps()[end - 1],
        closed[end - 1],
        forecast_timestamp,
        forecast_price,
    ))
}

/// Close of the bar immediately after `previous_timestamp`, if that bar is
/// in the window and already closed.
pub fn settlement_price(window: &RollingWindow, previous_timestamp: NaiveDateTime) -> Option<f64> {
    let idx = window.position(previous_timestamp)?;
    // The newest bar is still in progress.
    if idx + 2 >= window.len() {
        return None;
    }
    window.get(idx + 1).map(|b| b.close)
}

/// Settle the pending forecast at `actual_price` and fold it into the tally
/// and error metrics.
pub fn settle_pending(state: &mut SessionState, actual_price: f64) -> Option<SettledForecast> {
    let pending = state.pending.take()?;
    let settled = pending.settle(actual_price);
    state.tally.record(&settled.status);
    state
        .metrics
        .observe(actual_price, settled.record.forecast_price);
    Some(settled)
}

/// End-of-session report.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub symbol: String,
    pub interval: String,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub cycles: u64,
    pub updates: u64,
    pub forecasts_issued: u64,
    pub tally: AccuracyTally,
    pub hit_rate: Option<f64>,
    pub mae: Option<f64>,
    pub rmse: Option<f64>,
    /// Parameters of the final fit, or the last successful one if the final
    /// refit failed.
    pub final_params: Option<LinearParams>,
}

impl SessionSummary {
    pub fn from_state(
        state: &SessionState,
        symbol: &str,
        interval: &str,
        model: &ForecastModel,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            model: model.label(),
            started_at: state.started_at,
            ended_at: Utc::now(),
            cycles: state.cycles,
            updates: state.updates,
            forecasts_issued: state.forecasts_issued,
            tally: state.tally,
            hit_rate: state.tally.hit_rate(),
            mae: state.metrics.mae(),
            rmse: state.metrics.rmse(),
            final_params: model.params().cloned(),
        }
    }
}
