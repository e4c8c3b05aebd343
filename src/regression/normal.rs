use nalgebra::{DMatrix, DVector};

use super::{
    check_design, rank_tolerance, split_params, with_intercept, LinearParams, LinearRegressor,
};
use crate::error::ModelError;

/// Closed-form OLS: `beta = (X'X)^-1 X'y` on the intercept-augmented design.
#[derive(Debug, Clone, Default)]
pub struct NormalEquations {
    params: Option<LinearParams>,
}

impl LinearRegressor for NormalEquations {
    fn name(&self) -> &'static str {
        "normal_equations"
    }

    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<(), ModelError> {
        check_design(x, y)?;
        let xa = with_intercept(x);
        let xt = xa.transpose();
        let xtx = &xt * &xa;

        let singular_values = xtx.singular_values();
        let tol = rank_tolerance(&singular_values, xtx.nrows());
        if singular_values.iter().any(|sv| *sv <= tol) {
            return Err(ModelError::SingularMatrix);
        }
        let xtx_inv = xtx.try_inverse().ok_or(ModelError::SingularMatrix)?;
        let beta = xtx_inv * (&xt * y);

        self.params = Some(split_params(&beta, x, y)?);
        Ok(())
    }

    fn params(&self) -> Option<&LinearParams> {
        self.params.as_ref()
    }
}
