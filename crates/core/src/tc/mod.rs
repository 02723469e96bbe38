//! TC vortex relaxation mask and vortex removal

pub mod filter;
pub mod mask;

pub use filter::{filter_vortex, remove_vortex_radial};
pub use mask::{build_relaxation_mask, ramp_weight, RelaxationMask};
