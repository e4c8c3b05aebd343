use crate::error::ModelError;
use crate::regression::LinearRegressor;

use super::ar::AutoRegressionModel;

/// One-step surprise series derived from an AR estimator.
///
/// `values()[j]` belongs to position `j + offset()` of the source series;
/// positions before the first full window have no residual.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualSeries {
    offset: usize,
    values: Vec<f64>,
}

impl ResidualSeries {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Newest `n` residuals, oldest first.
    pub fn last(&self, n: usize) -> &[f64] {
        &self.values[self.values.len().saturating_sub(n)..]
    }
}

/// Roll `estimator` over `series`. At each position `t` with a full trailing
/// window of `estimator.nlags()` values ending at and including `t`, the
/// residual is `series[t] - estimator.predict(window)`.
///
/// The window includes `t` itself; the estimate is not formed from values
/// strictly before `t`.
pub fn rolling_residuals<R: LinearRegressor>(
    estimator: &AutoRegressionModel<R>,
    series: &[f64],
) -> Result<ResidualSeries, ModelError> {
    let k = estimator.nlags();
    if series.len() < k {
        return Err(ModelError::InsufficientData {
            needed: k,
            got: series.len(),
        });
    }
    let values = series
        .windows(k)
        .map(|window| estimator.predict(window).map(|est| window[k - 1] - est))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ResidualSeries {
        offset: k - 1,
        values,
    })
}
