use std::collections::VecDeque;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const FORECAST_METRIC_WINDOW: usize = 1200;

/// A one-step forecast issued against the bar that just closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub previous_timestamp: NaiveDateTime,
    pub previous_price: f64,
    pub forecast_timestamp: NaiveDateTime,
    pub forecast_price: f64,
    pub actual_price: Option<f64>,
}

impl ForecastRecord {
    pub fn issue(
        previous_timestamp: NaiveDateTime,
        previous_price: f64,
        forecast_timestamp: NaiveDateTime,
        forecast_price: f64,
    ) -> Self {
        Self {
            previous_timestamp,
            previous_price,
            forecast_timestamp,
            forecast_price,
            actual_price: None,
        }
    }

    /// Fill the realized price and score the directional call. Consumes the
    /// pending record so it cannot be settled twice.
    pub fn settle(mut self, actual_price: f64) -> SettledForecast {
        self.actual_price = Some(actual_price);
        let status =
            PredictionStatus::evaluate(self.previous_price, self.forecast_price, actual_price);
        SettledForecast {
            record: self,
            status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionStatus {
    pub accurate_prediction: bool,
    pub predicted_to_rise: bool,
    pub rise_status: bool,
}

impl PredictionStatus {
    /// A flat move counts as "not a rise" on both sides.
    pub fn evaluate(previous_price: f64, forecast_price: f64, actual_price: f64) -> Self {
        let predicted_to_rise = forecast_price > previous_price;
        let rise_status = actual_price > previous_price;
        Self {
            accurate_prediction: predicted_to_rise == rise_status,
            predicted_to_rise,
            rise_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettledForecast {
    #[serde(flatten)]
    pub record: ForecastRecord,
    #[serde(flatten)]
    pub status: PredictionStatus,
}

impl SettledForecast {
    pub fn actual_price(&self) -> f64 {
        self.record.actual_price.unwrap_or(f64::NAN)
    }
}

/// Directional hit counts for the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyTally {
    pub correct: u64,
    pub incorrect: u64,
}

impl AccuracyTally {
    pub fn record(&mut self, status: &PredictionStatus) {
        if status.accurate_prediction {
            self.correct = self.correct.saturating_add(1);
        } else {
            self.incorrect = self.incorrect.saturating_add(1);
        }
    }

    pub fn total(&self) -> u64 {
        self.correct + self.incorrect
    }

    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            None
        } else {
            Some(self.correct as f64 / total as f64)
        }
    }
}

/// Bounded window of (actual, forecast) price pairs.
#[derive(Debug, Clone)]
pub struct ForecastErrorMetrics {
    window: usize,
    pairs: VecDeque<(f64, f64)>,
}

impl Default for ForecastErrorMetrics {
    fn default() -> Self {
        Self::with_window(FORECAST_METRIC_WINDOW)
    }
}

impl ForecastErrorMetrics {
    pub fn with_window(window: usize) -> Self {
        Self {
            window: window.max(1),
            pairs: VecDeque::with_capacity(window.clamp(1, FORECAST_METRIC_WINDOW)),
        }
    }

    pub fn observe(&mut self, actual: f64, forecast: f64) {
        if !actual.is_finite() || !forecast.is_finite() {
            return;
        }
        self.pairs.push_back((actual, forecast));
        if self.pairs.len() > self.window {
            let _ = self.pairs.pop_front();
        }
    }

    pub fn sample_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn mae(&self) -> Option<f64> {
        let n = self.pairs.len();
        if n == 0 {
            return None;
        }
        let sum_abs = self.pairs.iter().map(|(y, yhat)| (y - yhat).abs()).sum::<f64>();
        Some(sum_abs / n as f64)
    }

    pub fn rmse(&self) -> Option<f64> {
        let n = self.pairs.len();
        if n == 0 {
            return None;
        }
        let sse = self
            .pairs
            .iter()
            .map(|(y, yhat)| (y - yhat) * (y - yhat))
            .sum::<f64>();
        Some((sse / n as f64).sqrt())
    }
}
