//! Rectilinear latitude/longitude grid
//!
//! Every analysis field lives on a `(ny, nx)` mesh of latitudes and
//! longitudes in degrees. Grids are built once per analysis, either from
//! 1D coordinate vectors (expanded by meshgrid) or from 2D coordinate
//! arrays, which must be co-dimensional and rectilinear.

use serde::{Deserialize, Serialize};

use super::field::Field;
use super::units::Units;
use crate::error::GridError;

/// Tolerance (degrees) for regular-spacing and global-span checks
const SPACING_TOLERANCE_DEG: f64 = 1.0e-6;

/// Immutable lat/lon grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    lats: Vec<f64>,
    lons: Vec<f64>,
}

impl Grid {
    /// Build from 1D latitude and longitude axes
    ///
    /// Both axes must be non-empty, finite, and strictly monotonic (either
    /// direction).
    pub fn from_axes(lats: Vec<f64>, lons: Vec<f64>) -> Result<Self, GridError> {
        validate_axis("latitude", &lats)?;
        validate_axis("longitude", &lons)?;
        Ok(Self { lats, lons })
    }

    /// Build from co-dimensional 2D latitude and longitude meshes
    pub fn from_mesh(lat: &Field, lon: &Field) -> Result<Self, GridError> {
        if lat.shape() != lon.shape() {
            return Err(GridError::NotCoDimensional {
                lat: lat.shape().to_vec(),
                lon: lon.shape().to_vec(),
            });
        }
        let (ny, nx) = lat
            .dims2()
            .map_err(|_| GridError::NotTwoDimensional(lat.shape().to_vec()))?;

        let lats: Vec<f64> = (0..ny).map(|j| lat.get2(j, 0)).collect();
        let lons: Vec<f64> = (0..nx).map(|i| lon.get2(0, i)).collect();

        for j in 0..ny {
            for i in 0..nx {
                if (lat.get2(j, i) - lats[j]).abs() > SPACING_TOLERANCE_DEG {
                    return Err(GridError::NotRectilinear {
                        axis: "latitude",
                        index: j,
                    });
                }
                if (lon.get2(j, i) - lons[i]).abs() > SPACING_TOLERANCE_DEG {
                    return Err(GridError::NotRectilinear {
                        axis: "longitude",
                        index: i,
                    });
                }
            }
        }

        Self::from_axes(lats, lons)
    }

    /// Regular global grid with `ny` latitudes from -90 to 90 and `nx`
    /// longitudes from 0 (exclusive of 360)
    pub fn global(ny: usize, nx: usize) -> Result<Self, GridError> {
        if ny < 2 {
            return Err(GridError::EmptyAxis { axis: "latitude" });
        }
        if nx == 0 {
            return Err(GridError::EmptyAxis { axis: "longitude" });
        }
        let dlat = 180.0 / (ny - 1) as f64;
        let dlon = 360.0 / nx as f64;
        let lats = (0..ny).map(|j| -90.0 + j as f64 * dlat).collect();
        let lons = (0..nx).map(|i| i as f64 * dlon).collect();
        Self::from_axes(lats, lons)
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.lats.len()
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.lons.len()
    }

    /// `[ny, nx]`
    pub fn shape(&self) -> [usize; 2] {
        [self.ny(), self.nx()]
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    /// 2D latitude mesh
    pub fn lat_mesh(&self) -> Field {
        let mut mesh = Field::zeros(&self.shape(), Units::Degrees);
        let nx = self.nx();
        for (idx, v) in mesh.as_mut_slice().iter_mut().enumerate() {
            *v = self.lats[idx / nx];
        }
        mesh
    }

    /// 2D longitude mesh
    pub fn lon_mesh(&self) -> Field {
        let mut mesh = Field::zeros(&self.shape(), Units::Degrees);
        let nx = self.nx();
        for (idx, v) in mesh.as_mut_slice().iter_mut().enumerate() {
            *v = self.lons[idx % nx];
        }
        mesh
    }

    /// Uniform spacing of an axis, if it has one
    fn regular_step(axis: &[f64]) -> Option<f64> {
        if axis.len() < 2 {
            return None;
        }
        let step = axis[1] - axis[0];
        axis.windows(2)
            .all(|w| ((w[1] - w[0]) - step).abs() < SPACING_TOLERANCE_DEG)
            .then_some(step)
    }

    /// Latitude spacing (signed) if regular
    pub fn dlat(&self) -> Option<f64> {
        Self::regular_step(&self.lats)
    }

    /// Longitude spacing (signed) if regular
    pub fn dlon(&self) -> Option<f64> {
        Self::regular_step(&self.lons)
    }

    /// Whether the longitude axis wraps around the globe.
    ///
    /// Returns `Some(true)` when the last column duplicates the first
    /// (e.g. 0..=360), `Some(false)` for a plain periodic axis, and `None`
    /// when the axis is not global.
    pub fn periodic_longitude(&self) -> Option<bool> {
        let dlon = self.dlon()?.abs();
        let nx = self.nx() as f64;
        if (nx * dlon - 360.0).abs() < 1.0e-3 {
            Some(false)
        } else if ((nx - 1.0) * dlon - 360.0).abs() < 1.0e-3 {
            Some(true)
        } else {
            None
        }
    }

    /// Whether the grid is regular and spans the full sphere pole to pole
    pub fn is_global(&self) -> bool {
        let Some(dlat) = self.dlat() else {
            return false;
        };
        let (first, last) = (self.lats[0], self.lats[self.ny() - 1]);
        let spans_poles = (first.abs() - 90.0).abs() < 1.0e-3
            && (last.abs() - 90.0).abs() < 1.0e-3
            && first * last < 0.0;
        dlat.abs() > 0.0 && spans_poles && self.periodic_longitude().is_some()
    }
}

fn validate_axis(axis: &'static str, values: &[f64]) -> Result<(), GridError> {
    if values.is_empty() {
        return Err(GridError::EmptyAxis { axis });
    }
    if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(GridError::NonFinite { axis, index, value });
    }
    if values.len() > 1 {
        let increasing = values[1] > values[0];
        for (index, w) in values.windows(2).enumerate() {
            let ok = if increasing { w[1] > w[0] } else { w[1] < w[0] };
            if !ok {
                return Err(GridError::NotMonotonic {
                    axis,
                    index: index + 1,
                });
            }
        }
    }
    Ok(())
}
