//! Linear least-squares estimators behind a common fit/predict contract.
//!
//! Every backend fits `y ≈ X·coef + intercept` with an implicit constant
//! column and reports a rank-deficient design as [`ModelError::SingularMatrix`]
//! rather than returning degenerate coefficients.

pub mod lags;
pub mod normal;
pub mod svd;

use std::fmt;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

pub use lags::{build_lags, lag_row, LagMatrix};
pub use normal::NormalEquations;
pub use svd::SvdLeastSquares;

/// Fitted coefficients; overwritten wholesale on every fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearParams {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearParams {
    pub fn apply(&self, row: &[f64]) -> Result<f64, ModelError> {
        if row.len() != self.coefficients.len() {
            return Err(ModelError::Dimension {
                expected: self.coefficients.len(),
                got: row.len(),
            });
        }
        let value = row
            .iter()
            .zip(&self.coefficients)
            .map(|(x, c)| x * c)
            .sum::<f64>()
            + self.intercept;
        if !value.is_finite() {
            return Err(ModelError::NonFinite(format!("prediction overflowed to {}", value)));
        }
        Ok(value)
    }
}

/// Pluggable linear regression backend.
pub trait LinearRegressor: fmt::Debug + Clone {
    fn name(&self) -> &'static str;

    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<(), ModelError>;

    fn params(&self) -> Option<&LinearParams>;

    fn predict(&self, row: &[f64]) -> Result<f64, ModelError> {
        self.params().ok_or(ModelError::NotFitted)?.apply(row)
    }

    fn fit_lags(&mut self, lags: &LagMatrix) -> Result<(), ModelError> {
        let (x, y) = lags.to_design();
        self.fit(&x, &y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressorKind {
    #[default]
    NormalEquations,
    Svd,
}

/// Backend chosen at model-construction time.
#[derive(Debug, Clone)]
pub enum Regressor {
    NormalEquations(NormalEquations),
    Svd(SvdLeastSquares),
}

impl Default for Regressor {
    fn default() -> Self {
        Self::NormalEquations(NormalEquations::default())
    }
}

impl Regressor {
    pub fn from_kind(kind: RegressorKind) -> Self {
        match kind {
            RegressorKind::NormalEquations => Self::NormalEquations(NormalEquations::default()),
            RegressorKind::Svd => Self::Svd(SvdLeastSquares::default()),
        }
    }
}

impl LinearRegressor for Regressor {
    fn name(&self) -> &'static str {
        match self {
            Self::NormalEquations(r) => r.name(),
            Self::Svd(r) => r.name(),
        }
    }

    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<(), ModelError> {
        match self {
            Self::NormalEquations(r) => r.fit(x, y),
            Self::Svd(r) => r.fit(x, y),
        }
    }

    fn params(&self) -> Option<&LinearParams> {
        match self {
            Self::NormalEquations(r) => r.params(),
            Self::Svd(r) => r.params(),
        }
    }
}

fn check_design(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<(), ModelError> {
    if x.nrows() == 0 {
        return Err(ModelError::InsufficientData { needed: 1, got: 0 });
    }
    if x.nrows() != y.len() {
        return Err(ModelError::Dimension {
            expected: x.nrows(),
            got: y.len(),
        });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(ModelError::NonFinite(
            "design matrix contains NaN or infinite values".to_string(),
        ));
    }
    Ok(())
}

/// Append the constant column; the intercept is the last parameter.
fn with_intercept(x: &DMatrix<f64>) -> DMatrix<f64> {
    let m = x.ncols();
    DMatrix::from_fn(x.nrows(), m + 1, |i, j| if j < m { x[(i, j)] } else { 1.0 })
}

fn rank_tolerance(singular_values: &DVector<f64>, dim: usize) -> f64 {
    let max_sv = singular_values.iter().fold(0.0_f64, |acc, v| acc.max(*v));
    max_sv * dim as f64 * f64::EPSILON
}

fn split_params(
    beta: &DVector<f64>,
    x: &DMatrix<f64>,
    y: &DVector<f64>,
) -> Result<LinearParams, ModelError> {
    if beta.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::SingularMatrix);
    }
    let m = x.ncols();
    let coefficients: Vec<f64> = beta.iter().take(m).copied().collect();
    let intercept = beta[m];
    let fitted = x * DVector::from_column_slice(&coefficients);
    let mean_y = y.mean();
    let mut sse = 0.0;
    let mut sst = 0.0;
    for (yi, fi) in y.iter().zip(fitted.iter()) {
        let err = yi - (fi + intercept);
        sse += err * err;
        let d = yi - mean_y;
        sst += d * d;
    }
    let r_squared = if sst <= 1e-18 { 0.0 } else { 1.0 - sse / sst };
    Ok(LinearParams {
        coefficients,
        intercept,
        r_squared,
    })
}
