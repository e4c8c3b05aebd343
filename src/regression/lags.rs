use nalgebra::{DMatrix, DVector};

use crate::error::ModelError;

/// Aligned (lag features, target) rows. Column `i` holds the value `i + 1`
/// periods before the row's target.
#[derive(Debug, Clone, PartialEq)]
pub struct LagMatrix {
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
    ncols: usize,
}

impl LagMatrix {
    pub fn new(rows: Vec<Vec<f64>>, targets: Vec<f64>, ncols: usize) -> Result<Self, ModelError> {
        if rows.len() != targets.len() {
            return Err(ModelError::Dimension {
                expected: rows.len(),
                got: targets.len(),
            });
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
            return Err(ModelError::Dimension {
                expected: ncols,
                got: bad.len(),
            });
        }
        Ok(Self {
            rows,
            targets,
            ncols,
        })
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Keep only the newest `n` rows.
    pub fn tail(mut self, n: usize) -> Self {
        let drop = self.rows.len().saturating_sub(n);
        self.rows.drain(..drop);
        self.targets.drain(..drop);
        self
    }

    /// Replace targets with the newest `targets.len()` aligned values of
    /// another series ending at the same position.
    pub fn retarget(mut self, series: &[f64]) -> Result<Self, ModelError> {
        let n = self.rows.len();
        if series.len() < n {
            return Err(ModelError::Dimension {
                expected: n,
                got: series.len(),
            });
        }
        self.targets = series[series.len() - n..].to_vec();
        Ok(self)
    }

    /// Column-wise concatenation of two matrices whose rows end at the same
    /// position; the longer one is trimmed to the shorter.
    pub fn hconcat(self, other: LagMatrix) -> Result<Self, ModelError> {
        let n = self.nrows().min(other.nrows());
        let left = self.tail(n);
        let right = other.tail(n);
        if left.targets != right.targets {
            return Err(ModelError::Dimension {
                expected: left.nrows(),
                got: right.nrows(),
            });
        }
        let ncols = left.ncols + right.ncols;
        let rows = left
            .rows
            .into_iter()
            .zip(right.rows)
            .map(|(mut l, r)| {
                l.extend(r);
                l
            })
            .collect();
        LagMatrix::new(rows, left.targets, ncols)
    }

    pub fn to_design(&self) -> (DMatrix<f64>, DVector<f64>) {
        let x = DMatrix::from_fn(self.rows.len(), self.ncols, |i, j| self.rows[i][j]);
        let y = DVector::from_column_slice(&self.targets);
        (x, y)
    }
}

/// Lag feature/target pairs for `series`. The first `nlags` positions lack a
/// full history and are dropped, so the result has `len - nlags` rows.
pub fn build_lags(series: &[f64], nlags: usize) -> Result<LagMatrix, ModelError> {
    if series.len() <= nlags {
        return Err(ModelError::InsufficientData {
            needed: nlags + 1,
            got: series.len(),
        });
    }
    let rows = (nlags..series.len())
        .map(|t| (1..=nlags).map(|i| series[t - i]).collect())
        .collect();
    LagMatrix::new(rows, series[nlags..].to_vec(), nlags)
}

/// Chronological window (oldest first) to a lag-ordered feature row
/// (newest value first).
pub fn lag_row(window: &[f64]) -> Vec<f64> {
    window.iter().rev().copied().collect()
}
