//! Core types: fields, grids, TC events, and unit newtypes

pub mod field;
pub mod grid;
pub mod tc_event;
pub mod units;

pub use field::{nan_max, Field, FieldMeta};
pub use grid::Grid;
pub use tc_event::{GeoPoint, TcEvent};
pub use units::*;
