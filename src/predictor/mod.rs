pub mod ar;
pub mod arma;
pub mod ma;
pub mod residual;

use serde::Deserialize;

use crate::error::ModelError;
use crate::regression::{LinearParams, Regressor, RegressorKind};

pub use ar::AutoRegressionModel;
pub use arma::ArmaModel;
pub use ma::MovingAverageModel;
pub use residual::{rolling_residuals, ResidualSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Ar,
    Ma,
    #[default]
    Arma,
}

/// Model family and orders. `nlags` is the AR order for `ar` and the
/// residual order for `ma`; `p`/`q` apply to `arma`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSpec {
    pub kind: ModelKind,
    pub p: usize,
    pub q: usize,
    pub estimator_lags: usize,
    pub nlags: usize,
    pub regressor: RegressorKind,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            kind: ModelKind::Arma,
            p: 2,
            q: 1,
            estimator_lags: 3,
            nlags: 2,
            regressor: RegressorKind::NormalEquations,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ForecastModel {
    Ar(AutoRegressionModel),
    Ma(MovingAverageModel),
    Arma(ArmaModel),
}

impl ForecastModel {
    pub fn from_spec(spec: &ModelSpec) -> Result<Self, ModelError> {
        let regressor = Regressor::from_kind(spec.regressor);
        Ok(match spec.kind {
            ModelKind::Ar => Self::Ar(AutoRegressionModel::with_regressor(spec.nlags, regressor)?),
            ModelKind::Ma => Self::Ma(MovingAverageModel::with_regressor(
                spec.estimator_lags,
                spec.nlags,
                regressor,
            )?),
            ModelKind::Arma => Self::Arma(ArmaModel::with_regressor(
                spec.p,
                spec.q,
                spec.estimator_lags,
                regressor,
            )?),
        })
    }

    pub fn label(&self) -> String {
        match self {
            Self::Ar(m) => format!("AR({})", m.nlags()),
            Self::Ma(m) => format!("MA({}; est={})", m.nlags(), m.estimator().nlags()),
            Self::Arma(m) => {
                let (p, q) = m.order();
                format!("ARMA({},{}; est={})", p, q, m.estimator().nlags())
            }
        }
    }

    /// Chronological values `predict` consumes.
    pub fn input_len(&self) -> usize {
        match self {
            Self::Ar(m) => m.input_len(),
            Self::Ma(m) => m.input_len(),
            Self::Arma(m) => m.input_len(),
        }
    }

    pub fn min_fit_len(&self) -> usize {
        match self {
            Self::Ar(m) => m.min_fit_len(),
            Self::Ma(m) => m.min_fit_len(),
            Self::Arma(m) => m.min_fit_len(),
        }
    }

    pub fn params(&self) -> Option<&LinearParams> {
        match self {
            Self::Ar(m) => m.params(),
            Self::Ma(m) => m.params(),
            Self::Arma(m) => m.params(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.params().is_some()
    }

    /// Refit on `series`. On failure the previous parameters (including any
    /// embedded estimator) are left untouched.
    pub fn fit(&mut self, series: &[f64]) -> Result<(), ModelError> {
        let mut next = self.clone();
        match &mut next {
            Self::Ar(m) => m.fit(series)?,
            Self::Ma(m) => m.fit(series)?,
            Self::Arma(m) => m.fit(series)?,
        }
        *self = next;
        Ok(())
    }

    pub fn predict(&self, window: &[f64]) -> Result<f64, ModelError> {
        match self {
            Self::Ar(m) => m.predict(window),
            Self::Ma(m) => m.predict(window),
            Self::Arma(m) => m.predict(window),
        }
    }
}
