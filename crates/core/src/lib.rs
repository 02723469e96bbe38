//! Tropical Cyclone Diagnostics Core Library
//!
//! Diagnostic quantities for tropical cyclones computed from gridded
//! atmospheric and oceanic analysis fields:
//!
//! - Bister and Emanuel (2002) potential intensity
//! - Vukicevic et al. (2014) multi-scale intensity by azimuthal wavenumber
//! - Velden and Leslie (1991) environmental steering flow with the TC
//!   vortex removed
//! - Leipper and Volgenau (1972) ocean heat potential
//!
//! ## Vortex filtering and spectral decomposition
//!
//! The steering flow and multi-scale intensity share one pipeline: winds are
//! re-projected onto a TC-centered polar grid, split by 2D FFT into
//! per-wavenumber reconstructions, and the vortex is suppressed by removing
//! leading singular modes inside a radial relaxation mask.
//!
//! File formats are out of scope. Inputs arrive as unit-tagged
//! [`Field`]s on a lat/lon [`Grid`]; outputs are plain records that
//! serialize with serde.

// Core types and utilities
pub mod config;
pub mod core_types;
pub mod error;
pub mod geomets;
pub mod output;

// Numerical components
pub mod derived;
pub mod interp;
pub mod tc;
pub mod transforms;

// Metric drivers
pub mod metrics;

// Re-export core types
pub use core_types::{Field, FieldMeta, GeoPoint, Grid, TcEvent, Units};
pub use core_types::{Celsius, Degrees, Hectopascals, Kelvin, Meters, MetersPerSecond};

// Re-export configuration and errors
pub use config::{
    HeatPotentialOptions, MsiOptions, PotentialIntensityOptions, SteeringFlowOptions, TcDiagsConfig,
    VortexRemoval,
};
pub use error::{DiagsError, Result};

// Re-export the metric runner
pub use metrics::{run_metrics, Analysis, MetricFailure, MetricKind, MetricOutput, MetricReport, OceanProfiles};
pub use output::Table;
