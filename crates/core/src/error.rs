//! Error taxonomy for the diagnostics core
//!
//! Each component reports its own error kind. Every message carries the
//! offending shape or value. Nothing here is retried: all failures are
//! deterministic numerical-precondition violations.
//!
//! [`DiagsError`] aggregates the component errors so a metric driver can use
//! `?` across component boundaries; the metric runner turns a driver's
//! `DiagsError` into a [`MetricFailure`](crate::metrics::MetricFailure) and
//! moves on to the next metric.

use thiserror::Error;

use crate::core_types::Units;

/// Crate-level result type
pub type Result<T> = std::result::Result<T, DiagsError>;

/// Malformed buffers handed to [`Field`](crate::core_types::Field)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("field buffer holds {len} values but shape {shape:?} needs {expected}")]
    ShapeMismatch {
        shape: Vec<usize>,
        len: usize,
        expected: usize,
    },

    #[error("expected a {expected}-dimensional field, got shape {shape:?}")]
    Rank { expected: usize, shape: Vec<usize> },

    #[error("level {level} out of range for shape {shape:?}")]
    LevelOutOfRange { level: usize, shape: Vec<usize> },

    #[error("cannot convert a field from {from} to {to}")]
    IncompatibleUnits { from: Units, to: Units },
}

/// Lat/lon grid construction failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("latitude/longitude are not co-dimensional: {lat:?} vs {lon:?}")]
    NotCoDimensional { lat: Vec<usize>, lon: Vec<usize> },

    #[error("coordinate mesh must be 2-dimensional, got shape {0:?}")]
    NotTwoDimensional(Vec<usize>),

    #[error("{axis} axis is empty")]
    EmptyAxis { axis: &'static str },

    #[error("{axis} axis is not strictly monotonic at index {index}")]
    NotMonotonic { axis: &'static str, index: usize },

    #[error("{axis} value {value} at index {index} is not finite")]
    NonFinite {
        axis: &'static str,
        index: usize,
        value: f64,
    },

    #[error("coordinate mesh is not rectilinear: {axis} varies along row/column {index}")]
    NotRectilinear { axis: &'static str, index: usize },
}

/// Malformed coordinate input to radial-distance computation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("{axis} coordinates must be 1-dimensional, got shape {shape:?}")]
    NotOneDimensional { axis: &'static str, shape: Vec<usize> },

    #[error("latitude ({lat}) and longitude ({lon}) arrays differ in length")]
    LengthMismatch { lat: usize, lon: usize },
}

/// Non-2D input to the forward/inverse Fourier transform
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpectralError {
    #[error("spectral transform requires a 2-dimensional array, got shape {0:?}")]
    NotTwoDimensional(Vec<usize>),

    #[error("spectrum holds {len} values but shape is {rows}x{cols}")]
    ShapeMismatch { rows: usize, cols: usize, len: usize },

    #[error("cannot transform an empty {rows}x{cols} array")]
    Empty { rows: usize, cols: usize },
}

/// Singular value decomposition failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SvdError {
    #[error("SVD requires a 2-dimensional array, got shape {0:?}")]
    NotTwoDimensional(Vec<usize>),

    #[error("SVD input contains {count} non-finite values")]
    NonFinite { count: usize },

    #[error("SVD did not converge for a {rows}x{cols} matrix")]
    NoConvergence { rows: usize, cols: usize },

    #[error("cannot suppress {n_suppress} modes of a {rows}x{cols} matrix (at most {max})")]
    SuppressOutOfRange {
        n_suppress: usize,
        rows: usize,
        cols: usize,
        max: usize,
    },

    #[error("factor shapes are inconsistent: U {u_shape:?}, S len {s_len}, Vt {vt_shape:?}")]
    FactorMismatch {
        u_shape: (usize, usize),
        s_len: usize,
        vt_shape: (usize, usize),
    },
}

/// Polar re-projection precondition failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolarProjectionError {
    #[error("field shape {field:?} does not match grid shape {grid:?}")]
    ShapeMismatch { field: Vec<usize>, grid: Vec<usize> },

    #[error("invalid polar grid spacing: {0}")]
    InvalidSpacing(String),
}

/// Failures inside the successive radial fill
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RadialInterpolationError {
    #[error("radial fill shape mismatch: field {field:?}, distance {distance:?}")]
    ShapeMismatch {
        field: Vec<usize>,
        distance: Vec<usize>,
    },

    #[error("step distance must be positive, got {0}")]
    InvalidStep(f64),

    #[error("radial window [{inner}, {outer}] m: only {valid} valid points, need at least 3")]
    TooFewPoints { inner: f64, outer: f64, valid: usize },

    #[error("radial window [{inner}, {outer}] m: triangulation failed: {message}")]
    Triangulation {
        inner: f64,
        outer: f64,
        message: String,
    },
}

/// Vortex mask / filter precondition failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("relaxation radius {relax} m must exceed exclusion radius {exclusion} m")]
    InvalidRadii { exclusion: f64, relax: f64 },

    #[error("wind components must be 3-dimensional (level, lat, lon), got {0:?}")]
    NotThreeDimensional(Vec<usize>),

    #[error("u {u:?} and v {v:?} differ in shape, or do not match the grid {grid:?}")]
    ShapeMismatch {
        u: Vec<usize>,
        v: Vec<usize>,
        grid: Vec<usize>,
    },

    #[error(transparent)]
    Svd(#[from] SvdError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Malformed input to the global wind partition
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WindPartitionError {
    #[error("wind components must be 2- or 3-dimensional, got {0:?}")]
    Rank(Vec<usize>),

    #[error("u {u:?} and v {v:?} differ in shape")]
    ComponentMismatch { u: Vec<usize>, v: Vec<usize> },

    #[error("wind horizontal shape {wind:?} does not match grid shape {grid:?}")]
    GridMismatch { wind: Vec<usize>, grid: Vec<usize> },

    #[error("wind partition requires a global regular lat/lon grid: {0}")]
    NotGlobal(String),
}

/// Vertical interpolation failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VerticalInterpolationError {
    #[error("field {field:?} and vertical coordinate {coord:?} differ in shape")]
    ShapeMismatch { field: Vec<usize>, coord: Vec<usize> },

    #[error("vertical interpolation requires a 3-dimensional field, got {0:?}")]
    NotThreeDimensional(Vec<usize>),

    #[error("no target levels requested")]
    NoLevels,
}

/// Potential intensity input failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PotentialIntensityError {
    #[error("profile lengths differ: pressure {pressure}, temperature {temperature}, mixing ratio {mixing_ratio}")]
    ProfileMismatch {
        pressure: usize,
        temperature: usize,
        mixing_ratio: usize,
    },

    #[error("empty thermodynamic profile")]
    EmptyProfile,

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("{name} shape {shape:?} does not match expected {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        shape: Vec<usize>,
        expected: Vec<usize>,
    },
}

/// Ocean heat potential input failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HeatPotentialError {
    #[error("{name} shape {shape:?} does not match expected {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        shape: Vec<usize>,
        expected: Vec<usize>,
    },

    #[error("depth axis must be non-empty and strictly increasing")]
    InvalidDepths,

    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Invalid scalar options
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{option} must be positive, got {value}")]
    NotPositive { option: &'static str, value: f64 },

    #[error("relax_radius ({relax}) must exceed exclusion_radius ({exclusion})")]
    RadiiOrder { exclusion: f64, relax: f64 },

    #[error("{option} is invalid: {message}")]
    Invalid {
        option: &'static str,
        message: String,
    },
}

/// Aggregate error for metric drivers
#[derive(Debug, Error)]
pub enum DiagsError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Spectral(#[from] SpectralError),

    #[error(transparent)]
    Svd(#[from] SvdError),

    #[error(transparent)]
    PolarProjection(#[from] PolarProjectionError),

    #[error(transparent)]
    RadialInterpolation(#[from] RadialInterpolationError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    WindPartition(#[from] WindPartitionError),

    #[error(transparent)]
    VerticalInterpolation(#[from] VerticalInterpolationError),

    #[error(transparent)]
    PotentialIntensity(#[from] PotentialIntensityError),

    #[error(transparent)]
    HeatPotential(#[from] HeatPotentialError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("metric {metric} requires input field `{field}`")]
    MissingInput {
        metric: &'static str,
        field: &'static str,
    },
}
