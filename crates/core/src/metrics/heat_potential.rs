//! Leipper and Volgenau (1972) TC heat potential
//!
//! Heat content of the upper ocean in excess of a reference isotherm:
//!
//! ```text
//! TCHP = Σ ρ(T, S) cp (T(z) - T_iso) Δz,   z = z_top, z_top + Δz, ... <= D_iso
//! ```
//!
//! `D_iso` is the first depth at which the column cools to the isotherm.
//! Density comes from a linear equation of state.

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::HeatPotentialOptions;
use crate::core_types::{Field, Units};
use crate::error::HeatPotentialError;

/// Thermal expansion coefficient (K⁻¹)
const ALPHA: f64 = 2.0e-4;
/// Haline contraction coefficient (PSU⁻¹)
const BETA: f64 = 7.6e-4;
/// Equation-of-state reference temperature (°C)
const T_REF: f64 = 10.0;
/// Equation-of-state reference salinity (PSU)
const S_REF: f64 = 35.0;
/// J m⁻² to kJ cm⁻²
const J_PER_M2_TO_KJ_PER_CM2: f64 = 1.0e-7;

/// Gridded ocean inputs
#[derive(Debug, Clone, Copy)]
pub struct HeatPotentialInputs<'a> {
    /// Depth of each level (m), increasing downward
    pub depths: &'a [f64],
    /// Temperature `[depth, lat, lon]` (°C)
    pub temperature: &'a Field,
    /// Practical salinity `[depth, lat, lon]`
    pub salinity: &'a Field,
}

/// Gridded heat potential
#[derive(Debug, Clone, Serialize)]
pub struct HeatPotential {
    /// Depth of the reference isotherm (m)
    pub isotherm_depth: Field,
    /// TC heat potential (kJ cm⁻²)
    pub tchp: Field,
}

/// Seawater density (kg m⁻³)
#[inline]
fn density(reference_density: f64, temperature: f64, salinity: f64) -> f64 {
    reference_density * (1.0 - ALPHA * (temperature - T_REF) + BETA * (salinity - S_REF))
}

/// Linear interpolation of `values` at depth `z` within `depths`
fn at_depth(depths: &[f64], values: &[f64], z: f64) -> f64 {
    match depths.iter().position(|&d| d >= z) {
        Some(0) => values[0],
        Some(k) => {
            let w = (z - depths[k - 1]) / (depths[k] - depths[k - 1]);
            values[k - 1] + w * (values[k] - values[k - 1])
        }
        None => values[values.len() - 1],
    }
}

/// First depth where the column cools to `isotherm`
///
/// `Some(depths[0])` when the surface is already colder; `None` when the
/// whole column is warmer.
fn isotherm_depth(depths: &[f64], temperature: &[f64], isotherm: f64) -> Option<f64> {
    if temperature[0] <= isotherm {
        return Some(depths[0]);
    }
    temperature.windows(2).enumerate().find_map(|(k, pair)| {
        (pair[1] <= isotherm).then(|| {
            let w = (pair[0] - isotherm) / (pair[0] - pair[1]);
            depths[k] + w * (depths[k + 1] - depths[k])
        })
    })
}

/// `(isotherm depth, TCHP)` for one column
///
/// Any missing value in the column gives `NaN` for both; a surface colder
/// than the isotherm gives zero heat potential. If the whole column is
/// warmer than the isotherm the depth is `NaN` and the heat is integrated to
/// the deepest level.
pub fn heat_potential_column(
    depths: &[f64],
    temperature: &[f64],
    salinity: &[f64],
    opts: &HeatPotentialOptions,
) -> (f64, f64) {
    let complete = !depths.is_empty()
        && temperature.len() == depths.len()
        && salinity.len() == depths.len()
        && depths
            .iter()
            .chain(temperature)
            .chain(salinity)
            .all(|v| v.is_finite());
    if !complete {
        return (f64::NAN, f64::NAN);
    }
    let n = depths.len();
    let iso = *opts.isotherm;

    let (reported_depth, bottom) = match isotherm_depth(depths, temperature, iso) {
        Some(d) => (d, d),
        None => (f64::NAN, depths[n - 1]),
    };
    if temperature[0] <= iso {
        return (reported_depth, 0.0);
    }

    let dz = *opts.deltaz;
    let mut heat = 0.0;
    let mut step = 0.0;
    loop {
        let z = depths[0] + step * dz;
        if z > bottom {
            break;
        }
        let t = at_depth(depths, temperature, z);
        let s = at_depth(depths, salinity, z);
        heat += density(opts.reference_density, t, s) * opts.specific_heat * (t - iso).max(0.0) * dz;
        step += 1.0;
    }
    (reported_depth, heat * J_PER_M2_TO_KJ_PER_CM2)
}

/// TC heat potential at every grid column
pub fn compute_heat_potential(
    inputs: &HeatPotentialInputs<'_>,
    opts: &HeatPotentialOptions,
) -> Result<HeatPotential, HeatPotentialError> {
    let depths = inputs.depths;
    if depths.is_empty() || depths.windows(2).any(|w| w[1] <= w[0]) {
        return Err(HeatPotentialError::InvalidDepths);
    }
    let shape_error = |name: &'static str, field: &Field| HeatPotentialError::ShapeMismatch {
        name,
        shape: field.shape().to_vec(),
        expected: vec![depths.len(), 0, 0],
    };
    let (nz, ny, nx) = inputs
        .temperature
        .dims3()
        .map_err(|_| shape_error("temperature", inputs.temperature))?;
    if nz != depths.len() {
        return Err(shape_error("temperature", inputs.temperature));
    }
    if inputs.salinity.shape() != inputs.temperature.shape() {
        return Err(HeatPotentialError::ShapeMismatch {
            name: "salinity",
            shape: inputs.salinity.shape().to_vec(),
            expected: inputs.temperature.shape().to_vec(),
        });
    }

    info!(
        "Computing the tropical cyclone heat potential relative to the {} isotherm.",
        opts.isotherm
    );
    let ncol = ny * nx;
    let (temp, saln) = (inputs.temperature.as_slice(), inputs.salinity.as_slice());
    let columns: Vec<(f64, f64)> = (0..ncol)
        .into_par_iter()
        .map(|col| {
            let t: Vec<f64> = (0..nz).map(|k| temp[k * ncol + col]).collect();
            let s: Vec<f64> = (0..nz).map(|k| saln[k * ncol + col]).collect();
            heat_potential_column(depths, &t, &s, opts)
        })
        .collect();

    let shape = [ny, nx];
    Ok(HeatPotential {
        isotherm_depth: Field::from_parts(columns.iter().map(|c| c.0).collect(), &shape, Units::Meters)
            .with_meta("isotherm", "Depth of the reference isotherm"),
        tchp: Field::from_parts(
            columns.iter().map(|c| c.1).collect(),
            &shape,
            Units::KilojoulesPerSquareCentimeter,
        )
        .with_meta("tchp", "Tropical cyclone heat potential"),
    })
}
