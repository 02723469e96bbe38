//! Velden and Leslie (1991) environmental steering flow
//!
//! The TC vortices are removed from the model-level winds once for all
//! events, the result is interpolated to isobaric levels, and the
//! environmental wind is partitioned into rotational, divergent, and
//! harmonic parts.

use serde::Serialize;
use tracing::info;

use crate::config::{SteeringFlowOptions, VortexRemoval};
use crate::core_types::{Field, Grid, TcEvent, Units};
use crate::derived::winds::{WindPartition, WindPartitioner};
use crate::error::Result;
use crate::interp::vertical::interp_to_levels;
use crate::tc::filter::{filter_vortex, remove_vortex_radial};

/// Model-level inputs
#[derive(Debug, Clone, Copy)]
pub struct SteeringFlowInputs<'a> {
    pub grid: &'a Grid,
    /// Pressure `[level, lat, lon]` (Pa or hPa)
    pub pressure: &'a Field,
    /// Zonal wind `[level, lat, lon]`
    pub u: &'a Field,
    /// Meridional wind `[level, lat, lon]`
    pub v: &'a Field,
}

/// Environmental wind on isobaric levels and its partition
#[derive(Debug, Clone, Serialize)]
pub struct SteeringFlow {
    /// Isobaric levels (hPa)
    pub levels: Vec<f64>,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    /// Vortex-removed zonal wind `[level, lat, lon]`
    pub uwnd: Field,
    /// Vortex-removed meridional wind `[level, lat, lon]`
    pub vwnd: Field,
    #[serde(flatten)]
    pub partition: WindPartition,
}

/// Remove the vortices, interpolate to `opts.isolevels`, and partition
pub fn compute_steering_flow<P>(
    inputs: &SteeringFlowInputs<'_>,
    events: &[TcEvent],
    opts: &SteeringFlowOptions,
    partitioner: &P,
) -> Result<SteeringFlow>
where
    P: WindPartitioner + ?Sized,
{
    let levels = opts.isolevels_hpa();
    let pressure = inputs.pressure.convert(Units::Hectopascals)?;
    let excl = *opts.exclusion_radius;
    info!(
        "Computing the steering flow on {} isobaric levels for {} TC events.",
        levels.len(),
        events.len()
    );

    let (uwnd, vwnd) = match opts.removal {
        VortexRemoval::Svd => {
            let (u, v) = filter_vortex(
                inputs.u,
                inputs.v,
                inputs.grid,
                events,
                excl,
                *opts.relax_radius,
                opts.n_suppress,
            )?;
            (
                interp_to_levels(&u, &pressure, &levels)?,
                interp_to_levels(&v, &pressure, &levels)?,
            )
        }
        VortexRemoval::RadialInterpolation { step_distance } => {
            let u = interp_to_levels(inputs.u, &pressure, &levels)?;
            let v = interp_to_levels(inputs.v, &pressure, &levels)?;
            (
                remove_vortex_radial(&u, inputs.grid, events, excl, *step_distance)?,
                remove_vortex_radial(&v, inputs.grid, events, excl, *step_distance)?,
            )
        }
    };

    let partition = partitioner.partition(&uwnd, &vwnd, inputs.grid)?;
    info!("Steering flow complete.");
    Ok(SteeringFlow {
        levels,
        lats: inputs.grid.lats().to_vec(),
        lons: inputs.grid.lons().to_vec(),
        uwnd: uwnd.with_meta("uwnd", "Environmental zonal wind"),
        vwnd: vwnd.with_meta("vwnd", "Environmental meridional wind"),
        partition,
    })
}
