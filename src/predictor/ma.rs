use crate::error::ModelError;
use crate::regression::{build_lags, lag_row, LinearParams, LinearRegressor, Regressor};

use super::ar::AutoRegressionModel;
use super::residual::rolling_residuals;

/// MA(nlags) over the residuals of an embedded AR(estimator_lags).
#[derive(Debug, Clone)]
pub struct MovingAverageModel<R: LinearRegressor = Regressor> {
    estimator: AutoRegressionModel<R>,
    nlags: usize,
    regressor: R,
}

impl MovingAverageModel<Regressor> {
    pub fn new(estimator_lags: usize, nlags: usize) -> Result<Self, ModelError> {
        Self::with_regressor(estimator_lags, nlags, Regressor::default())
    }
}

impl<R: LinearRegressor> MovingAverageModel<R> {
    pub fn with_regressor(
        estimator_lags: usize,
        nlags: usize,
        regressor: R,
    ) -> Result<Self, ModelError> {
        if nlags == 0 {
            return Err(ModelError::Configuration(
                "moving average needs at least one residual lag".to_string(),
            ));
        }
        let estimator = AutoRegressionModel::with_regressor(estimator_lags, regressor.clone())?;
        Ok(Self {
            estimator,
            nlags,
            regressor,
        })
    }

    pub fn estimator(&self) -> &AutoRegressionModel<R> {
        &self.estimator
    }

    pub fn nlags(&self) -> usize {
        self.nlags
    }

    pub fn input_len(&self) -> usize {
        self.estimator.nlags() + self.nlags - 1
    }

    pub fn min_fit_len(&self) -> usize {
        self.nlags + self.estimator.nlags() + 1
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
        let residuals = rolling_residuals(&self.estimator, series)?;
        let lags = build_lags(residuals.values(), self.nlags)?.retarget(series)?;
        self.regressor.fit_lags(&lags)
    }

    /// `window` is chronological and at least `input_len()` long; only the
    /// newest `nlags` residuals enter the regression.
    pub fn predict(&self, window: &[f64]) -> Result<f64, ModelError> {
        if window.len() < self.input_len() {
            return Err(ModelError::InsufficientData {
                needed: self.input_len(),
                got: window.len(),
            });
        }
        let residuals = rolling_residuals(&self.estimator, window)?;
        self.regressor.predict(&lag_row(residuals.last(self.nlags)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wavy(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.9).sin() * 2.0 + (i as f64 * 0.31).cos())
            .collect()
    }

    #[test]
    fn input_and_fit_lengths_follow_orders() {
        let ma = MovingAverageModel::new(3, 2).unwrap();
        assert_eq!(ma.input_len(), 4);
        assert_eq!(ma.min_fit_len(), 6);
    }

    #[test]
    fn short_predict_window_is_insufficient() {
        let mut ma = MovingAverageModel::new(3, 2).unwrap();
        ma.fit(&wavy(40)).unwrap();
        assert_eq!(
            ma.predict(&[1.0, 2.0, 3.0]).unwrap_err(),
            ModelError::InsufficientData { needed: 4, got: 3 }
        );
    }

    #[test]
    fn fit_then_predict_is_finite() {
        let series = wavy(60);
        let mut ma = MovingAverageModel::new(3, 2).unwrap();
        ma.fit(&series).unwrap();
        assert_eq!(ma.params().unwrap().coefficients.len(), 2);
        let y = ma.predict(&series[series.len() - 4..]).unwrap();
        assert!(y.is_finite());
    }
}
