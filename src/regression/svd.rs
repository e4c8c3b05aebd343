use nalgebra::{DMatrix, DVector};

use super::{
    check_design, rank_tolerance, split_params, with_intercept, LinearParams, LinearRegressor,
};
use crate::error::ModelError;

/// Least squares solved on the design itself through nalgebra's SVD, which
/// avoids squaring the condition number the way `X'X` does.
#[derive(Debug, Clone, Default)]
pub struct SvdLeastSquares {
    params: Option<LinearParams>,
}

impl LinearRegressor for SvdLeastSquares {
    fn name(&self) -> &'static str {
        "svd"
    }

    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<(), ModelError> {
        check_design(x, y)?;
        let xa = with_intercept(x);
        let dim = xa.nrows().max(xa.ncols());
        let ncols = xa.ncols();
        let svd = xa.svd(true, true);
        let tol = rank_tolerance(&svd.singular_values, dim);
        if svd.rank(tol) < ncols {
            return Err(ModelError::SingularMatrix);
        }
        let beta = svd.solve(y, tol).map_err(|_| ModelError::SingularMatrix)?;

        self.params = Some(split_params(&beta, x, y)?);
        Ok(())
    }

    fn params(&self) -> Option<&LinearParams> {
        self.params.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::NormalEquations;

    #[test]
    fn agrees_with_normal_equations_on_noisy_data() {
        let n = 40;
        let x = DMatrix::from_fn(n, 2, |i, j| ((i * (j + 3)) as f64 * 0.37).sin());
        let y = DVector::from_fn(n, |i, _| {
            0.8 * x[(i, 0)] - 0.3 * x[(i, 1)] + 2.0 + 0.01 * ((i as f64) * 1.3).cos()
        });
        let mut svd = SvdLeastSquares::default();
        let mut ne = NormalEquations::default();
        svd.fit(&x, &y).unwrap();
        ne.fit(&x, &y).unwrap();
        let a = svd.params().unwrap();
        let b = ne.params().unwrap();
        for (ca, cb) in a.coefficients.iter().zip(&b.coefficients) {
            assert!((ca - cb).abs() < 1e-8);
        }
        assert!((a.intercept - b.intercept).abs() < 1e-8);
    }

    #[test]
    fn duplicated_column_is_singular() {
        let x = DMatrix::from_fn(5, 2, |i, _| i as f64);
        let y = DVector::from_fn(5, |i, _| i as f64 * 2.0);
        let mut svd = SvdLeastSquares::default();
        assert_eq!(svd.fit(&x, &y).unwrap_err(), ModelError::SingularMatrix);
    }

    #[test]
    fn fewer_rows_than_parameters_is_singular() {
        let x = DMatrix::from_column_slice(1, 2, &[1.0, 2.0]);
        let y = DVector::from_column_slice(&[3.0]);
        let mut svd = SvdLeastSquares::default();
        assert_eq!(svd.fit(&x, &y).unwrap_err(), ModelError::SingularMatrix);
    }
}
