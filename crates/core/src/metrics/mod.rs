//! TC diagnostic metrics and the runner that drives them
//!
//! Each configured metric is an independent unit of failure: [`run_metrics`]
//! logs a failing metric, records it in the [`MetricReport`], and carries
//! on with the rest.

pub mod heat_potential;
pub mod msi;
pub mod potential_intensity;
pub mod steering_flow;

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{HeatPotentialOptions, MsiOptions, PotentialIntensityOptions, SteeringFlowOptions, TcDiagsConfig};
use crate::core_types::{nan_max, Field, Grid, TcEvent};
use crate::derived::thermo::mixing_ratio_from_specific_humidity;
use crate::derived::winds::SphericalPoissonPartitioner;
use crate::error::{DiagsError, FieldError, Result};
use crate::output::Table;

pub use heat_potential::{compute_heat_potential, HeatPotential, HeatPotentialInputs};
pub use msi::{compute_msi, near_surface_wind, MsiSummary, MultiScaleIntensity};
pub use potential_intensity::{compute_potential_intensity, PiInputs, PiStatus, PotentialIntensity};
pub use steering_flow::{compute_steering_flow, SteeringFlow, SteeringFlowInputs};

/// The diagnostics this crate computes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    PotentialIntensity,
    MultiScaleIntensity,
    SteeringFlow,
    HeatPotential,
}

impl MetricKind {
    pub fn name(self) -> &'static str {
        match self {
            MetricKind::PotentialIntensity => "potential_intensity",
            MetricKind::MultiScaleIntensity => "multi_scale_intensity",
            MetricKind::SteeringFlow => "steering_flow",
            MetricKind::HeatPotential => "heat_potential",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Upper-ocean profiles for the heat potential
#[derive(Debug, Clone)]
pub struct OceanProfiles {
    /// Depth of each level (m), increasing downward
    pub depths: Vec<f64>,
    /// Temperature `[depth, lat, lon]`
    pub temperature: Field,
    /// Salinity `[depth, lat, lon]`
    pub salinity: Field,
}

/// Unit-tagged analysis fields on one lat/lon grid
///
/// Only the grid is mandatory; each metric checks for the inputs it needs.
/// Three-dimensional atmospheric fields are `[level, lat, lon]`.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub grid: Grid,
    pub pressure: Option<Field>,
    /// Geopotential height (m)
    pub height: Option<Field>,
    pub temperature: Option<Field>,
    pub mixing_ratio: Option<Field>,
    /// Used to derive the mixing ratio when that is absent
    pub specific_humidity: Option<Field>,
    pub u: Option<Field>,
    pub v: Option<Field>,
    pub surface_height: Option<Field>,
    pub sea_level_pressure: Option<Field>,
    pub sst: Option<Field>,
    pub ocean: Option<OceanProfiles>,
}

impl Analysis {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            pressure: None,
            height: None,
            temperature: None,
            mixing_ratio: None,
            specific_humidity: None,
            u: None,
            v: None,
            surface_height: None,
            sea_level_pressure: None,
            sst: None,
            ocean: None,
        }
    }
}

fn require<'a, T>(value: Option<&'a T>, metric: MetricKind, field: &'static str) -> Result<&'a T> {
    value.ok_or(DiagsError::MissingInput {
        metric: metric.name(),
        field,
    })
}

/// Output of one successful metric
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum MetricOutput {
    PotentialIntensity(Box<PotentialIntensity>),
    MultiScaleIntensity { events: Vec<MultiScaleIntensity> },
    SteeringFlow(Box<SteeringFlow>),
    HeatPotential(Box<HeatPotential>),
}

impl MetricOutput {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricOutput::PotentialIntensity(_) => MetricKind::PotentialIntensity,
            MetricOutput::MultiScaleIntensity { .. } => MetricKind::MultiScaleIntensity,
            MetricOutput::SteeringFlow(_) => MetricKind::SteeringFlow,
            MetricOutput::HeatPotential(_) => MetricKind::HeatPotential,
        }
    }

    /// Console summary tables
    pub fn tables(&self) -> Vec<Table> {
        match self {
            MetricOutput::PotentialIntensity(pi) => {
                let mut table = Table::new("Potential intensity", &["Quantity", "Value"]);
                table.push_row(["Maximum vmax (m/s)".to_string(), format!("{:.2}", pi.vmax.nan_max())]);
                let pmin = pi.pmin.as_slice().iter().copied().filter(|p| !p.is_nan()).fold(f64::NAN, f64::min);
                table.push_row(["Lowest pmin (hPa)".to_string(), format!("{pmin:.2}")]);
                for status in [PiStatus::Ok, PiStatus::NoConvergence, PiStatus::InvalidInput, PiStatus::Skipped] {
                    table.push_row([format!("Columns {status:?}"), pi.count(status).to_string()]);
                }
                vec![table]
            }
            MetricOutput::MultiScaleIntensity { events } => events
                .iter()
                .flat_map(|msi| [msi.summary.attribute_table(&msi.event), msi.wavenumber_table()])
                .collect(),
            MetricOutput::SteeringFlow(flow) => {
                let mut table = Table::new("Steering flow", &["Level (hPa)", "Max |uwnd| (m/s)", "Max |vwnd| (m/s)"]);
                let n = flow.lats.len() * flow.lons.len();
                for (k, level) in flow.levels.iter().enumerate() {
                    let peak = |field: &Field| {
                        let abs: Vec<f64> = field.as_slice()[k * n..(k + 1) * n].iter().map(|v| v.abs()).collect();
                        nan_max(&abs)
                    };
                    table.push_row([
                        format!("{level:.0}"),
                        format!("{:.2}", peak(&flow.uwnd)),
                        format!("{:.2}", peak(&flow.vwnd)),
                    ]);
                }
                vec![table]
            }
            MetricOutput::HeatPotential(hp) => {
                let mut table = Table::new("TC heat potential", &["Quantity", "Value"]);
                table.push_row(["Maximum TCHP (kJ/cm^2)".to_string(), format!("{:.2}", hp.tchp.nan_max())]);
                table.push_row([
                    "Deepest isotherm (m)".to_string(),
                    format!("{:.1}", hp.isotherm_depth.nan_max()),
                ]);
                vec![table]
            }
        }
    }
}

/// A metric that did not complete
#[derive(Debug, Error)]
#[error("{metric} failed: {source}")]
pub struct MetricFailure {
    pub metric: MetricKind,
    #[source]
    pub source: DiagsError,
}

/// Everything one run produced
#[derive(Debug, Default)]
pub struct MetricReport {
    pub outputs: Vec<MetricOutput>,
    pub failures: Vec<MetricFailure>,
}

impl MetricReport {
    pub fn get(&self, kind: MetricKind) -> Option<&MetricOutput> {
        self.outputs.iter().find(|o| o.kind() == kind)
    }

    pub fn failure(&self, kind: MetricKind) -> Option<&MetricFailure> {
        self.failures.iter().find(|f| f.metric == kind)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Temperature at the highest-pressure valid level of each column
fn lowest_level(temperature: &Field, pressure: &Field) -> Result<Field> {
    let (nlev, ny, nx) = temperature.dims3()?;
    if pressure.shape() != temperature.shape() {
        return Err(FieldError::ShapeMismatch {
            shape: pressure.shape().to_vec(),
            len: pressure.len(),
            expected: temperature.len(),
        }
        .into());
    }
    let ncol = ny * nx;
    let (t, p) = (temperature.as_slice(), pressure.as_slice());
    let data = (0..ncol)
        .map(|col| {
            (0..nlev)
                .map(|k| k * ncol + col)
                .filter(|&idx| !p[idx].is_nan() && !t[idx].is_nan())
                .max_by(|&a, &b| p[a].total_cmp(&p[b]))
                .map_or(f64::NAN, |idx| t[idx])
        })
        .collect();
    Ok(Field::from_vec(data, &[ny, nx], temperature.units())?.with_meta("sst", "Lowest-level air temperature"))
}

fn run_potential_intensity(opts: &PotentialIntensityOptions, analysis: &Analysis) -> Result<MetricOutput> {
    const KIND: MetricKind = MetricKind::PotentialIntensity;
    opts.validate()?;
    let pressure = require(analysis.pressure.as_ref(), KIND, "pressure")?;
    let temperature = require(analysis.temperature.as_ref(), KIND, "temperature")?;
    let derived;
    let mixing_ratio = match (&analysis.mixing_ratio, &analysis.specific_humidity) {
        (Some(r), _) => r,
        (None, Some(q)) => {
            derived = mixing_ratio_from_specific_humidity(q);
            &derived
        }
        (None, None) => {
            return Err(DiagsError::MissingInput {
                metric: KIND.name(),
                field: "mixing_ratio",
            })
        }
    };
    let fallback;
    let sst = if let Some(sst) = &analysis.sst {
        sst
    } else {
        warn!("No sea-surface temperature supplied; using the lowest-level air temperature.");
        fallback = lowest_level(temperature, pressure)?;
        &fallback
    };
    let pi = compute_potential_intensity(
        &PiInputs {
            sst,
            sea_level_pressure: require(analysis.sea_level_pressure.as_ref(), KIND, "sea_level_pressure")?,
            pressure,
            temperature,
            mixing_ratio,
            surface_height: require(analysis.surface_height.as_ref(), KIND, "surface_height")?,
        },
        opts,
    )?;
    Ok(MetricOutput::PotentialIntensity(Box::new(pi)))
}

fn run_multi_scale_intensity(opts: &MsiOptions, events: &[TcEvent], analysis: &Analysis) -> Result<MetricOutput> {
    const KIND: MetricKind = MetricKind::MultiScaleIntensity;
    opts.validate()?;
    let wind = near_surface_wind(
        require(analysis.u.as_ref(), KIND, "u")?,
        require(analysis.v.as_ref(), KIND, "v")?,
        require(analysis.height.as_ref(), KIND, "height")?,
        *opts.target_height,
    )?;
    let events = events
        .iter()
        .map(|event| compute_msi(&wind, &analysis.grid, event, opts))
        .collect::<Result<Vec<_>>>()?;
    Ok(MetricOutput::MultiScaleIntensity { events })
}

fn run_steering_flow(opts: &SteeringFlowOptions, events: &[TcEvent], analysis: &Analysis) -> Result<MetricOutput> {
    const KIND: MetricKind = MetricKind::SteeringFlow;
    opts.validate()?;
    let inputs = SteeringFlowInputs {
        grid: &analysis.grid,
        pressure: require(analysis.pressure.as_ref(), KIND, "pressure")?,
        u: require(analysis.u.as_ref(), KIND, "u")?,
        v: require(analysis.v.as_ref(), KIND, "v")?,
    };
    let flow = compute_steering_flow(&inputs, events, opts, &SphericalPoissonPartitioner::default())?;
    Ok(MetricOutput::SteeringFlow(Box::new(flow)))
}

fn run_heat_potential(opts: &HeatPotentialOptions, analysis: &Analysis) -> Result<MetricOutput> {
    opts.validate()?;
    let ocean = require(analysis.ocean.as_ref(), MetricKind::HeatPotential, "ocean")?;
    let hp = compute_heat_potential(
        &HeatPotentialInputs {
            depths: &ocean.depths,
            temperature: &ocean.temperature,
            salinity: &ocean.salinity,
        },
        opts,
    )?;
    Ok(MetricOutput::HeatPotential(Box::new(hp)))
}

impl MetricReport {
    fn record(&mut self, kind: MetricKind, driver: impl FnOnce() -> Result<MetricOutput>) {
        info!("Running {kind}.");
        match driver() {
            Ok(output) => {
                info!("Finished {kind}.");
                self.outputs.push(output);
            }
            Err(source) => {
                error!("{kind} failed: {source}");
                self.failures.push(MetricFailure { metric: kind, source });
            }
        }
    }
}

/// Run every configured metric on `analysis`
///
/// Metrics run in a fixed order. A metric's failure, including invalid
/// options for it, is logged and recorded; it never stops the others.
pub fn run_metrics(config: &TcDiagsConfig, analysis: &Analysis) -> MetricReport {
    let mut report = MetricReport::default();
    let events = &config.tc_events;
    if let Some(opts) = &config.potential_intensity {
        report.record(MetricKind::PotentialIntensity, || run_potential_intensity(opts, analysis));
    }
    if let Some(opts) = &config.multi_scale_intensity {
        report.record(MetricKind::MultiScaleIntensity, || {
            run_multi_scale_intensity(opts, events, analysis)
        });
    }
    if let Some(opts) = &config.steering_flow {
        report.record(MetricKind::SteeringFlow, || run_steering_flow(opts, events, analysis));
    }
    if let Some(opts) = &config.heat_potential {
        report.record(MetricKind::HeatPotential, || run_heat_potential(opts, analysis));
    }
    report
}
