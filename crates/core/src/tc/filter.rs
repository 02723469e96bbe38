//! Vortex removal from 3D wind fields
//!
//! [`filter_vortex`] is the main path: per level, suppress the leading
//! singular modes of each wind component and blend with the raw field
//! through the relaxation mask:
//!
//! ```text
//! result = (1 - mask) * (raw - suppressed) + mask * raw
//! ```
//!
//! Beyond every relaxation radius the raw wind is returned untouched;
//! inside an exclusion radius only `raw - suppressed` remains.
//!
//! [`remove_vortex_radial`] is the older alternative that blanks each
//! event's exclusion zone and refills it with the successive radial fill.

use rayon::prelude::*;
use tracing::info;

use super::mask::{build_relaxation_mask, RelaxationMask};
use crate::core_types::{Field, Grid, TcEvent};
use crate::error::{FilterError, RadialInterpolationError};
use crate::geomets::{grid_radial_distance, EARTH_RADIUS};
use crate::interp::radial::{fill_radial_gaps, RadialMethod};
use crate::transforms::svd::rebuild;

/// Blend one 2D level with the mask
fn blend_level(raw: &Field, mask: &RelaxationMask, n_suppress: usize) -> Result<Vec<f64>, FilterError> {
    let suppressed = rebuild(raw, n_suppress)?;
    Ok(raw
        .as_slice()
        .iter()
        .zip(suppressed.as_slice())
        .zip(mask.as_slice())
        .map(|((&r, &s), &m)| (1.0 - m) * (r - s) + m * r)
        .collect())
}

fn check_winds(u: &Field, v: &Field, grid: &Grid) -> Result<usize, FilterError> {
    let mismatch = || FilterError::ShapeMismatch {
        u: u.shape().to_vec(),
        v: v.shape().to_vec(),
        grid: grid.shape().to_vec(),
    };
    let (nlev, ny, nx) = u
        .dims3()
        .map_err(|_| FilterError::NotThreeDimensional(u.shape().to_vec()))?;
    if u.shape() != v.shape() || [ny, nx] != grid.shape() {
        return Err(mismatch());
    }
    Ok(nlev)
}

/// Remove the TC vortex signal from `u` and `v`
///
/// Levels are processed independently (in parallel).
///
/// # Errors
///
/// [`FilterError`] for bad radii, mismatched shapes, or an SVD failure
/// (including non-finite winds or `n_suppress` beyond the level size).
pub fn filter_vortex(
    u: &Field,
    v: &Field,
    grid: &Grid,
    events: &[TcEvent],
    exclusion_radius: f64,
    relax_radius: f64,
    n_suppress: usize,
) -> Result<(Field, Field), FilterError> {
    let nlev = check_winds(u, v, grid)?;
    let mask = build_relaxation_mask(grid, events, exclusion_radius, relax_radius)?;
    info!("Filtering {nlev} levels, suppressing {n_suppress} leading singular modes.");

    let levels: Vec<(Vec<f64>, Vec<f64>)> = (0..nlev)
        .into_par_iter()
        .map(|k| -> Result<_, FilterError> {
            let u_raw = u.level(k).map_err(|_| FilterError::NotThreeDimensional(u.shape().to_vec()))?;
            let v_raw = v.level(k).map_err(|_| FilterError::NotThreeDimensional(v.shape().to_vec()))?;
            Ok((
                blend_level(&u_raw, &mask, n_suppress)?,
                blend_level(&v_raw, &mask, n_suppress)?,
            ))
        })
        .collect::<Result<_, _>>()?;

    let mut u_out = Vec::with_capacity(u.len());
    let mut v_out = Vec::with_capacity(v.len());
    for (ul, vl) in levels {
        u_out.extend(ul);
        v_out.extend(vl);
    }
    Ok((
        Field::from_parts(u_out, u.shape(), u.units()),
        Field::from_parts(v_out, v.shape(), v.units()),
    ))
}

/// Refill each event's exclusion zone on every level of `field` by
/// successive radial interpolation
pub fn remove_vortex_radial(
    field: &Field,
    grid: &Grid,
    events: &[TcEvent],
    exclusion_radius: f64,
    step_distance: f64,
) -> Result<Field, RadialInterpolationError> {
    let shape_error = || RadialInterpolationError::ShapeMismatch {
        field: field.shape().to_vec(),
        distance: grid.shape().to_vec(),
    };
    let (nlev, ny, nx) = field.dims3().map_err(|_| shape_error())?;
    if [ny, nx] != grid.shape() {
        return Err(shape_error());
    }

    let mut levels: Vec<Field> = (0..nlev)
        .map(|k| field.level(k).map_err(|_| shape_error()))
        .collect::<Result<_, _>>()?;

    for event in events {
        info!("Removing vortex for TC {} by radial interpolation.", event.id);
        let distance =
            grid_radial_distance(event.center(), grid, EARTH_RADIUS).map_err(|_| shape_error())?;
        levels = levels
            .par_iter()
            .map(|level| {
                fill_radial_gaps(level, &distance, exclusion_radius, step_distance, RadialMethod::Linear)
            })
            .collect::<Result<_, _>>()?;
    }

    Field::stack(&levels, field.units()).map_err(|_| shape_error())
}
