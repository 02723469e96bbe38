//! Interpolation: polar re-projection, successive radial fill, and vertical
//! column interpolation

pub mod polar;
pub mod radial;
pub mod vertical;

pub use polar::{to_polar, PolarField, PolarGridSpec};
pub use radial::{fill_radial_gaps, RadialMethod};
pub use vertical::{interp_to_level_or_lowest, interp_to_levels};
