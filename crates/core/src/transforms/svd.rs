//! Singular value decomposition of 2D fields
//!
//! Used to split a field into its dominant (leading) singular modes and the
//! residual. [`rebuild`] zeroes the first `n_suppress` singular values, which
//! are the largest, and reconstructs: the result is the field with its
//! dominant structure removed.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::core_types::{Field, Units};
use crate::error::SvdError;

/// Iteration cap handed to the bidiagonal SVD solver
const SVD_MAX_ITERATIONS: usize = 10_000;

/// Thin SVD factors with singular values in descending order
#[derive(Debug, Clone, PartialEq)]
pub struct SvdParts {
    /// Left singular vectors (rows x k)
    pub u: DMatrix<f64>,
    /// Singular values, descending (k)
    pub s: DVector<f64>,
    /// Right singular vectors, transposed (k x cols)
    pub vt: DMatrix<f64>,
}

/// Decompose a 2D field into `U`, `S`, `Vt`
///
/// # Errors
///
/// [`SvdError::NotTwoDimensional`], [`SvdError::NonFinite`] (the solver
/// needs finite input), or [`SvdError::NoConvergence`].
pub fn decompose(field: &Field) -> Result<SvdParts, SvdError> {
    let (rows, cols) = field
        .dims2()
        .map_err(|_| SvdError::NotTwoDimensional(field.shape().to_vec()))?;
    let non_finite = field.as_slice().iter().filter(|v| !v.is_finite()).count();
    if non_finite > 0 {
        return Err(SvdError::NonFinite { count: non_finite });
    }

    let matrix = DMatrix::from_row_slice(rows, cols, field.as_slice());
    let svd = matrix
        .try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATIONS)
        .ok_or(SvdError::NoConvergence { rows, cols })?;
    let (Some(u), Some(vt)) = (svd.u, svd.v_t) else {
        return Err(SvdError::NoConvergence { rows, cols });
    };

    // nalgebra does not promise an order; sort descending and permute the
    // singular vectors with the values
    let k = svd.singular_values.len();
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| svd.singular_values[b].total_cmp(&svd.singular_values[a]));

    let s = DVector::from_iterator(k, order.iter().map(|&i| svd.singular_values[i]));
    let u = DMatrix::from_fn(rows, k, |r, c| u[(r, order[c])]);
    let vt = DMatrix::from_fn(k, cols, |r, c| vt[(order[r], c)]);

    Ok(SvdParts { u, s, vt })
}

/// Rebuild `U · diag(S) · Vt` using the first `len(S)` singular values
pub fn reconstruct(parts: &SvdParts) -> Result<Field, SvdError> {
    let k = parts.s.len();
    if parts.u.ncols() < k || parts.vt.nrows() < k {
        return Err(SvdError::FactorMismatch {
            u_shape: parts.u.shape(),
            s_len: k,
            vt_shape: parts.vt.shape(),
        });
    }
    let (rows, cols) = (parts.u.nrows(), parts.vt.ncols());

    let u = parts.u.columns(0, k);
    let vt = parts.vt.rows(0, k);
    let scaled = u * DMatrix::from_diagonal(&parts.s);
    let matrix = scaled * vt;

    // Back to row-major
    let data = (0..rows * cols)
        .map(|idx| matrix[(idx / cols, idx % cols)])
        .collect();
    Ok(Field::from_parts(data, &[rows, cols], Units::Dimensionless))
}

/// Decompose, zero the first `n_suppress` (largest) singular values, and
/// reconstruct
///
/// The result keeps the units of the input.
///
/// # Errors
///
/// [`SvdError::SuppressOutOfRange`] if `n_suppress > min(rows, cols)`, plus
/// any [`decompose`] error.
pub fn rebuild(field: &Field, n_suppress: usize) -> Result<Field, SvdError> {
    let (rows, cols) = field
        .dims2()
        .map_err(|_| SvdError::NotTwoDimensional(field.shape().to_vec()))?;
    let max = rows.min(cols);
    if n_suppress > max {
        return Err(SvdError::SuppressOutOfRange {
            n_suppress,
            rows,
            cols,
            max,
        });
    }
    debug!("Rebuilding ({rows}, {cols}) array with {n_suppress} leading singular modes suppressed.");

    let mut parts = decompose(field)?;
    for i in 0..n_suppress {
        parts.s[i] = 0.0;
    }
    let rebuilt = reconstruct(&parts)?;
    Ok(Field::from_parts(rebuilt.into_vec(), &[rows, cols], field.units()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample(rows: usize, cols: usize) -> Field {
        let data = (0..rows * cols)
            .map(|idx| {
                let (r, c) = ((idx / cols) as f64, (idx % cols) as f64);
                (r * 0.7).sin() * (c * 0.3).cos() * 5.0 + r * 0.2 - c * 0.1 + ((idx * 31) % 7) as f64
            })
            .collect();
        Field::from_vec(data, &[rows, cols], Units::MetersPerSecond).unwrap()
    }

    fn energy(field: &Field) -> f64 {
        field.as_slice().iter().map(|v| v * v).sum()
    }

    #[test]
    fn test_svd_round_trip() {
        for &(rows, cols) in &[(6, 9), (9, 6), (5, 5)] {
            let field = sample(rows, cols);
            let rebuilt = reconstruct(&decompose(&field).unwrap()).unwrap();
            assert_eq!(rebuilt.shape(), field.shape());
            for (a, b) in field.as_slice().iter().zip(rebuilt.as_slice()) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_singular_values_descending() {
        let parts = decompose(&sample(8, 11)).unwrap();
        assert_eq!(parts.s.len(), 8);
        for w in parts.s.as_slice().windows(2) {
            assert!(w[0] >= w[1]);
        }
    }

    #[test]
    fn test_rebuild_energy_non_increasing() {
        let field = sample(7, 10);
        let mut previous = energy(&field);
        for n in 0..=7 {
            let e = energy(&rebuild(&field, n).unwrap());
            assert!(e <= previous + 1e-9, "n={n}: {e} > {previous}");
            previous = e;
        }
        // Everything suppressed leaves nothing
        assert_abs_diff_eq!(previous, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rebuild_zero_is_identity() {
        let field = sample(4, 6);
        let rebuilt = rebuild(&field, 0).unwrap();
        assert_eq!(rebuilt.units(), Units::MetersPerSecond);
        for (a, b) in field.as_slice().iter().zip(rebuilt.as_slice()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_rebuild_removes_rank_one_structure() {
        // Outer product plus a small checkerboard
        let (rows, cols) = (6, 8);
        let data = (0..rows * cols)
            .map(|idx| {
                let (r, c) = (idx / cols, idx % cols);
                let big = (r as f64 + 1.0) * (c as f64 + 1.0) * 10.0;
                let small = if (r + c) % 2 == 0 { 0.01 } else { -0.01 };
                big + small
            })
            .collect();
        let field = Field::from_vec(data, &[rows, cols], Units::Dimensionless).unwrap();
        let residual = rebuild(&field, 1).unwrap();
        assert!(residual.as_slice().iter().all(|v| v.abs() < 0.1));
    }

    #[test]
    fn test_rebuild_rejects_too_many_modes() {
        let err = rebuild(&sample(3, 5), 4).unwrap_err();
        assert_eq!(
            err,
            SvdError::SuppressOutOfRange {
                n_suppress: 4,
                rows: 3,
                cols: 5,
                max: 3
            }
        );
    }

    #[test]
    fn test_decompose_errors() {
        let cube = Field::zeros(&[2, 2, 2], Units::Dimensionless);
        assert!(matches!(decompose(&cube), Err(SvdError::NotTwoDimensional(_))));

        let mut bad = sample(3, 3);
        bad.set2(1, 1, f64::NAN);
        assert_eq!(decompose(&bad).unwrap_err(), SvdError::NonFinite { count: 1 });
    }

    #[test]
    fn test_reconstruct_detects_factor_mismatch() {
        let mut parts = decompose(&sample(4, 4)).unwrap();
        parts.vt = parts.vt.rows(0, 2).into_owned();
        assert!(matches!(reconstruct(&parts), Err(SvdError::FactorMismatch { .. })));
    }
}
