use crate::error::ModelError;
use crate::regression::{build_lags, lag_row, LinearParams, LinearRegressor, Regressor};

use super::ar::AutoRegressionModel;
use super::residual::rolling_residuals;

/// ARMA(p, q): `p` raw-value lags and `q` residual lags of an embedded
/// AR(estimator_lags), fitted as one regression.
///
/// Feature columns are the raw lags (newest first) followed by the residual
/// lags (newest first).
#[derive(Debug, Clone)]
pub struct ArmaModel<R: LinearRegressor = Regressor> {
    p: usize,
    q: usize,
    estimator: AutoRegressionModel<R>,
    regressor: R,
}

impl ArmaModel<Regressor> {
    pub fn new(p: usize, q: usize, estimator_lags: usize) -> Result<Self, ModelError> {
        Self::with_regressor(p, q, estimator_lags, Regressor::default())
    }
}

impl<R: LinearRegressor> ArmaModel<R> {
    pub fn with_regressor(
        p: usize,
        q: usize,
        estimator_lags: usize,
        regressor: R,
    ) -> Result<Self, ModelError> {
        if p >= estimator_lags {
            return Err(ModelError::Configuration(format!(
                "p({}) must be less than estimator_lags({})",
                p, estimator_lags
            )));
        }
        if p == 0 && q == 0 {
            return Err(ModelError::Configuration(
                "ARMA needs p > 0 or q > 0".to_string(),
            ));
        }
        let estimator = AutoRegressionModel::with_regressor(estimator_lags, regressor.clone())?;
        Ok(Self {
            p,
            q,
            estimator,
            regressor,
        })
    }

    pub fn order(&self) -> (usize, usize) {
        (self.p, self.q)
    }

    pub fn estimator(&self) -> &AutoRegressionModel<R> {
        &self.estimator
    }

    pub fn input_len(&self) -> usize {
        if self.q > 0 {
            self.estimator.nlags() + self.q - 1
        } else {
            self.p
        }
    }

    pub fn min_fit_len(&self) -> usize {
        self.p.max(self.q) + self.estimator.nlags() + 1
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
        self.estimator.fit(series)?;

        let raw_lags = build_lags(series, self.p)?;
        let design = if self.q > 0 {
            let residuals = rolling_residuals(&self.estimator, series)?;
            let residual_lags = build_lags(residuals.values(), self.q)?.retarget(series)?;
            raw_lags.hconcat(residual_lags)?
        } else {
            raw_lags
        };
        self.regressor.fit_lags(&design)
    }

    /// `window` is chronological and at least `input_len()` long.
    pub fn predict(&self, window: &[f64]) -> Result<f64, ModelError> {
        if window.len() < self.input_len() {
            return Err(ModelError::InsufficientData {
                needed: self.input_len(),
                got: window.len(),
            });
        }
        let mut row = lag_row(&window[window.len() - self.p..]);
        if self.q > 0 {
            let residuals = rolling_residuals(&self.estimator, window)?;
            row.extend(lag_row(residuals.last(self.q)));
        }
        self.regressor.predict(&row)
    }
}
