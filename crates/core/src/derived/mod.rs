//! Quantities derived from analysis fields
//!
//! - `thermo`: moist thermodynamic constants and conversions
//! - `winds`: wind speed and the global Helmholtz wind partition

pub mod thermo;
pub mod winds;

pub use thermo::mixing_ratio_from_specific_humidity;
pub use winds::{wind_magnitude, SphericalPoissonPartitioner, WindPartition, WindPartitioner};
