use nalgebra::{DMatrix, DVector};

use arma_quote::error::ModelError;
use arma_quote::regression::{
    build_lags, lag_row, LinearRegressor, NormalEquations, Regressor, RegressorKind,
    SvdLeastSquares,
};

#[test]
/// Verifies lag layout:
/// row t holds [s[t-1], s[t-2]] and targets start at s[nlags].
fn build_lags_orders_columns_by_lag() {
    let lags = build_lags(&[1.0, 2.0, 3.0, 4.0, 5.0], 2).expect("lags should build");
    assert_eq!(lags.nrows(), 3);
    assert_eq!(lags.ncols(), 2);
    assert_eq!(lags.rows()[0], vec![2.0, 1.0]);
    assert_eq!(lags.rows()[2], vec![4.0, 3.0]);
    assert_eq!(lags.targets(), &[3.0, 4.0, 5.0]);
    assert_eq!(lag_row(&[3.0, 4.0]), lags.rows()[2]);
}

#[test]
fn build_lags_needs_more_points_than_lags() {
    let err = build_lags(&[1.0, 2.0], 2).expect_err("two points cannot give a lag-2 row");
    assert_eq!(err, ModelError::InsufficientData { needed: 3, got: 2 });
}

#[test]
fn hconcat_aligns_on_newest_rows() {
    let series = [1.0, 2.0, 4.0, 7.0, 11.0, 16.0];
    let wide = build_lags(&series, 3).expect("lag-3");
    let narrow = build_lags(&series[1..], 1)
        .expect("lag-1")
        .retarget(&series)
        .expect("retarget");
    let joined = wide.hconcat(narrow).expect("hconcat");
    assert_eq!(joined.nrows(), 3);
    assert_eq!(joined.ncols(), 4);
    assert_eq!(joined.rows()[0], vec![4.0, 2.0, 1.0, 4.0]);
    assert_eq!(joined.targets(), &[7.0, 11.0, 16.0]);
}

fn plane() -> (DMatrix<f64>, DVector<f64>) {
    // y = 1.5 a - 2 b + 3
    let rows = [[1.0, 2.0], [2.0, 0.5], [3.0, 3.0], [4.0, 1.0], [5.0, 4.5], [0.5, 2.5]];
    let x = DMatrix::from_fn(rows.len(), 2, |i, j| rows[i][j]);
    let y = DVector::from_iterator(rows.len(), rows.iter().map(|r| 1.5 * r[0] - 2.0 * r[1] + 3.0));
    (x, y)
}

#[test]
fn both_backends_recover_an_exact_plane() {
    let (x, y) = plane();
    for kind in [RegressorKind::NormalEquations, RegressorKind::Svd] {
        let mut reg = Regressor::from_kind(kind);
        reg.fit(&x, &y).expect("fit should succeed");
        let params = reg.params().expect("params after fit");
        assert!((params.coefficients[0] - 1.5).abs() < 1e-9, "{}", reg.name());
        assert!((params.coefficients[1] + 2.0).abs() < 1e-9, "{}", reg.name());
        assert!((params.intercept - 3.0).abs() < 1e-9, "{}", reg.name());
        assert!((params.r_squared - 1.0).abs() < 1e-9);
        let y_hat = reg.predict(&[2.0, 1.0]).expect("predict");
        assert!((y_hat - 4.0).abs() < 1e-9);
    }
}

#[test]
/// Verifies rank-deficiency handling:
/// a constant feature duplicates the intercept and both backends refuse to fit.
fn constant_feature_is_singular_for_both_backends() {
    let x = DMatrix::from_row_slice(4, 2, &[1.0, 7.0, 2.0, 7.0, 3.0, 7.0, 4.0, 7.0]);
    let y = DVector::from_column_slice(&[1.0, 2.0, 3.0, 4.0]);

    let mut normal = NormalEquations::default();
    assert_eq!(normal.fit(&x, &y).unwrap_err(), ModelError::SingularMatrix);
    let mut svd = SvdLeastSquares::default();
    assert_eq!(svd.fit(&x, &y).unwrap_err(), ModelError::SingularMatrix);
    assert!(svd.params().is_none());
}

#[test]
fn mismatched_target_length_is_a_dimension_error() {
    let (x, _) = plane();
    let y = DVector::from_column_slice(&[1.0, 2.0]);
    let mut reg = Regressor::default();
    assert_eq!(
        reg.fit(&x, &y).unwrap_err(),
        ModelError::Dimension {
            expected: 6,
            got: 2
        }
    );
}
