//! Successive radial gap filling
//!
//! Recovers values inside a radius by repeatedly blanking everything within
//! a shrinking inner radius and interpolating the blanked points from the
//! remaining valid points. Each pass has a ring of already-filled (or
//! originally valid) data to interpolate from, so the fill works its way in
//! toward the center.
//!
//! Interpolation is over the 2D index grid (column, row), not distance
//! weighted. Linear interpolation is barycentric over a Delaunay
//! triangulation of the valid points; points outside their convex hull stay
//! missing.

use serde::{Deserialize, Serialize};
use spade::{DelaunayTriangulation, FloatTriangulation, HasPosition, Point2, Triangulation};
use tracing::info;

use crate::core_types::Field;
use crate::error::RadialInterpolationError;

/// Scattered interpolation scheme for each pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadialMethod {
    #[default]
    Linear,
    Nearest,
}

/// A valid grid point in index space
struct Sample {
    position: Point2<f64>,
    value: f64,
}

impl HasPosition for Sample {
    type Scalar = f64;

    fn position(&self) -> Point2<f64> {
        self.position
    }
}

/// Fill `field` inward from `max_distance` in windows of `step_distance`
///
/// Starting with `outer = max_distance` and `inner = outer - step`, every
/// pass blanks points with `radial_distance <= inner` (and any `NaN`
/// points) and interpolates them from the rest, then slides the window in
/// until `inner < 0`. Only blanked points are overwritten, so a field with
/// nothing inside `max_distance` comes back unchanged.
///
/// # Errors
///
/// [`RadialInterpolationError`] on mismatched shapes, a non-positive step,
/// too few valid points, or a failed triangulation.
pub fn fill_radial_gaps(
    field: &Field,
    radial_distance: &Field,
    max_distance: f64,
    step_distance: f64,
    method: RadialMethod,
) -> Result<Field, RadialInterpolationError> {
    let shape_error = || RadialInterpolationError::ShapeMismatch {
        field: field.shape().to_vec(),
        distance: radial_distance.shape().to_vec(),
    };
    if field.shape() != radial_distance.shape() {
        return Err(shape_error());
    }
    let (_, cols) = field.dims2().map_err(|_| shape_error())?;
    if !(step_distance.is_finite() && step_distance > 0.0) {
        return Err(RadialInterpolationError::InvalidStep(step_distance));
    }

    let distance = radial_distance.as_slice();
    let mut values = field.as_slice().to_vec();
    let mut outer = max_distance;
    let mut inner = outer - step_distance;

    while inner >= 0.0 {
        info!("Interpolating within range {inner} and {outer}.");

        let missing: Vec<usize> = (0..values.len())
            .filter(|&idx| distance[idx] <= inner || values[idx].is_nan())
            .collect();

        if !missing.is_empty() {
            let samples: Vec<Sample> = values
                .iter()
                .enumerate()
                .filter(|&(idx, v)| distance[idx] > inner && !v.is_nan())
                .map(|(idx, &value)| Sample {
                    position: index_point(idx, cols),
                    value,
                })
                .collect();
            if samples.len() < 3 {
                return Err(RadialInterpolationError::TooFewPoints {
                    inner,
                    outer,
                    valid: samples.len(),
                });
            }

            let triangulation = DelaunayTriangulation::<Sample>::bulk_load(samples).map_err(|e| {
                RadialInterpolationError::Triangulation {
                    inner,
                    outer,
                    message: format!("{e:?}"),
                }
            })?;

            let filled: Vec<f64> = match method {
                RadialMethod::Linear => {
                    let barycentric = triangulation.barycentric();
                    missing
                        .iter()
                        .map(|&idx| {
                            barycentric
                                .interpolate(|v| v.data().value, index_point(idx, cols))
                                .unwrap_or(f64::NAN)
                        })
                        .collect()
                }
                RadialMethod::Nearest => missing
                    .iter()
                    .map(|&idx| {
                        triangulation
                            .nearest_neighbor(index_point(idx, cols))
                            .map_or(f64::NAN, |v| v.data().value)
                    })
                    .collect(),
            };
            for (&idx, value) in missing.iter().zip(filled) {
                values[idx] = value;
            }
        }

        outer = inner;
        inner = outer - step_distance;
    }

    Ok(Field::from_parts(values, field.shape(), field.units()))
}

#[inline]
fn index_point(idx: usize, cols: usize) -> Point2<f64> {
    Point2::new((idx % cols) as f64, (idx / cols) as f64)
}
