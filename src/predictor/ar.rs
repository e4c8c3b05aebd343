use crate::error::ModelError;
use crate::regression::{build_lags, lag_row, LinearParams, LinearRegressor, Regressor};

/// AR(nlags): next value as a linear function of the previous `nlags` values.
#[derive(Debug, Clone)]
pub struct AutoRegressionModel<R: LinearRegressor = Regressor> {
    nlags: usize,
    regressor: R,
}

impl AutoRegressionModel<Regressor> {
    pub fn new(nlags: usize) -> Result<Self, ModelError> {
        Self::with_regressor(nlags, Regressor::default())
    }
}

impl<R: LinearRegressor> AutoRegressionModel<R> {
    pub fn with_regressor(nlags: usize, regressor: R) -> Result<Self, ModelError> {
        if nlags == 0 {
            return Err(ModelError::Configuration(
                "autoregression needs at least one lag".to_string(),
            ));
        }
        Ok(Self { nlags, regressor })
    }

    pub fn nlags(&self) -> usize {
        self.nlags
    }

    pub fn input_len(&self) -> usize {
        self.nlags
    }

    pub fn min_fit_len(&self) -> usize {
        self.nlags + 1
    }

    pub fn params(&self) -> Option<&LinearParams> {
        self.regressor.params()
    }

    pub fn is_fitted(&self) -> bool {
        self.params().is_some()
    }

    pub fn fit(&mut self, series: &[f64]) -> Result<(), ModelError> {
        if series.len() < self.min_fit_len() {
            return Err(ModelError::InsufficientData {
                needed: self.min_fit_len(),
                got: series.len(),
            });
        }
        let lags = build_lags(series, self.nlags)?;
        self.regressor.fit_lags(&lags)
    }

    /// `window` holds exactly `nlags` values, oldest first.
    pub fn predict(&self, window: &[f64]) -> Result<f64, ModelError> {
        if window.len() != self.nlags {
            return Err(ModelError::Dimension {
                expected: self.nlags,
                got: window.len(),
            });
        }
        self.regressor.predict(&lag_row(window))
    }
}
