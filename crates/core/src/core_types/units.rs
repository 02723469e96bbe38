//! Semantic unit types for physical quantities
//!
//! Scalar quantities that appear in public records (radii, headings, wind
//! speeds, pressures, temperatures) are wrapped in newtypes so a radius in
//! meters can never be passed where a heading in degrees is expected.
//! Array data carries a [`Units`] tag instead.
//!
//! # Design
//! - All quantities are `f64`; the diagnostics work on analysis fields
//!   where single precision loses meaningful digits in the thermodynamics
//! - Total ordering via `total_cmp` so quantities sort and `max` cleanly
//! - Serde support for configuration and output records
//!
//! # Usage
//! ```
//! use tcdiags_core::core_types::units::{Celsius, Kelvin, Meters};
//!
//! let sst = Celsius::new(29.0);
//! let kelvin: Kelvin = sst.into();
//! assert!((*kelvin - 302.15).abs() < 1e-9);
//!
//! let rmw = Meters::from_km(45.0);
//! assert_eq!(*rmw, 45_000.0);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Deref, Div, Mul, Sub};

/// Implements the shared trait surface for an `f64` newtype.
macro_rules! scalar_quantity {
    ($name:ident, $symbol:expr) => {
        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.total_cmp(&other.0)
            }
        }

        impl Deref for $name {
            type Target = f64;
            #[inline]
            fn deref(&self) -> &f64 {
                &self.0
            }
        }

        impl From<f64> for $name {
            fn from(v: f64) -> Self {
                $name(v)
            }
        }

        impl From<$name> for f64 {
            fn from(v: $name) -> f64 {
                v.0
            }
        }

        impl Add for $name {
            type Output = $name;
            fn add(self, rhs: $name) -> $name {
                $name(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = $name;
            fn sub(self, rhs: $name) -> $name {
                $name(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = $name;
            fn mul(self, rhs: f64) -> $name {
                $name(self.0 * rhs)
            }
        }

        impl Div<f64> for $name {
            type Output = $name;
            fn div(self, rhs: f64) -> $name {
                $name(self.0 / rhs)
            }
        }

        impl PartialEq<f64> for $name {
            fn eq(&self, other: &f64) -> bool {
                self.0 == *other
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:.2} {}", self.0, $symbol)
            }
        }
    };
}

// ============================================================================
// LENGTH AND ANGLE
// ============================================================================

/// Distance in meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Meters(f64);

scalar_quantity!(Meters, "m");

impl Meters {
    #[inline]
    pub const fn new(value: f64) -> Self {
        Meters(value)
    }

    /// Build from kilometers
    #[inline]
    pub fn from_km(km: f64) -> Self {
        Meters(km * 1000.0)
    }

    #[inline]
    pub fn to_km(self) -> f64 {
        self.0 / 1000.0
    }
}

/// Angle in degrees (latitude, longitude, or compass heading)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Degrees(f64);

scalar_quantity!(Degrees, "deg");

impl Degrees {
    #[inline]
    pub const fn new(value: f64) -> Self {
        Degrees(value)
    }

    #[inline]
    pub fn to_radians(self) -> f64 {
        self.0.to_radians()
    }

    /// Wrap into [0, 360)
    #[inline]
    pub fn normalized(self) -> Self {
        Degrees(self.0.rem_euclid(360.0))
    }
}

// ============================================================================
// WIND AND PRESSURE
// ============================================================================

/// Speed in meters per second
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MetersPerSecond(f64);

scalar_quantity!(MetersPerSecond, "m/s");

impl MetersPerSecond {
    #[inline]
    pub const fn new(value: f64) -> Self {
        MetersPerSecond(value)
    }
}

/// Pressure in hectopascals (millibars)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Hectopascals(f64);

scalar_quantity!(Hectopascals, "hPa");

impl Hectopascals {
    #[inline]
    pub const fn new(value: f64) -> Self {
        Hectopascals(value)
    }

    #[inline]
    pub fn from_pascals(pa: f64) -> Self {
        Hectopascals(pa / 100.0)
    }

    #[inline]
    pub fn to_pascals(self) -> f64 {
        self.0 * 100.0
    }
}

// ============================================================================
// TEMPERATURE
// ============================================================================

/// Celsius to Kelvin conversion offset (0°C = 273.15 K)
const CELSIUS_KELVIN_OFFSET: f64 = 273.15;

/// Temperature in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Celsius(f64);

scalar_quantity!(Celsius, "°C");

impl Celsius {
    #[inline]
    pub const fn new(value: f64) -> Self {
        Celsius(value)
    }

    #[inline]
    pub fn to_kelvin(self) -> Kelvin {
        Kelvin(self.0 + CELSIUS_KELVIN_OFFSET)
    }
}

/// Absolute temperature in Kelvin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Kelvin(f64);

scalar_quantity!(Kelvin, "K");

impl Kelvin {
    #[inline]
    pub const fn new(value: f64) -> Self {
        Kelvin(value)
    }

    #[inline]
    pub fn to_celsius(self) -> Celsius {
        Celsius(self.0 - CELSIUS_KELVIN_OFFSET)
    }
}

impl From<Celsius> for Kelvin {
    fn from(c: Celsius) -> Kelvin {
        c.to_kelvin()
    }
}

impl From<Kelvin> for Celsius {
    fn from(k: Kelvin) -> Celsius {
        k.to_celsius()
    }
}

// ============================================================================
// ARRAY UNIT TAGS
// ============================================================================

/// Physical unit attached to a [`Field`](super::Field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    #[default]
    Dimensionless,
    Meters,
    Degrees,
    MetersPerSecond,
    /// Vorticity and divergence
    PerSecond,
    /// Streamfunction and velocity potential
    SquareMetersPerSecond,
    Pascals,
    Hectopascals,
    Kelvin,
    Celsius,
    KilogramsPerKilogram,
    PracticalSalinity,
    KilojoulesPerSquareCentimeter,
}

impl Units {
    /// Short symbol used in tables and output metadata
    pub fn symbol(self) -> &'static str {
        match self {
            Units::Dimensionless => "1",
            Units::Meters => "m",
            Units::Degrees => "deg",
            Units::MetersPerSecond => "m/s",
            Units::PerSecond => "1/s",
            Units::SquareMetersPerSecond => "m^2/s",
            Units::Pascals => "Pa",
            Units::Hectopascals => "hPa",
            Units::Kelvin => "K",
            Units::Celsius => "degC",
            Units::KilogramsPerKilogram => "kg/kg",
            Units::PracticalSalinity => "PSU",
            Units::KilojoulesPerSquareCentimeter => "kJ/cm^2",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
