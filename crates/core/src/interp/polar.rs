//! Re-projection of lat/lon fields onto a TC-centered polar grid
//!
//! Radii run from 0 (the center) to `max_radius` inclusive in steps of
//! `d_radius`; azimuths run clockwise from north over [0, 360) in steps of
//! `d_azimuth`. Each polar point is located with the forward geodesic and
//! sampled from the rectilinear field by bilinear interpolation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core_types::{Field, GeoPoint, Grid};
use crate::error::PolarProjectionError;
use crate::geomets::{bearing_destination, EARTH_RADIUS};

/// Polar mesh layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarGridSpec {
    /// Outermost radius (m)
    pub max_radius: f64,
    /// Radial spacing (m)
    pub d_radius: f64,
    /// Azimuthal spacing (degrees)
    pub d_azimuth: f64,
}

impl PolarGridSpec {
    fn validate(&self) -> Result<(), PolarProjectionError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.max_radius) || !positive(self.d_radius) {
            return Err(PolarProjectionError::InvalidSpacing(format!(
                "max_radius {} m and d_radius {} m must be positive",
                self.max_radius, self.d_radius
            )));
        }
        if !positive(self.d_azimuth) || self.d_azimuth > 360.0 {
            return Err(PolarProjectionError::InvalidSpacing(format!(
                "d_azimuth {} deg must lie in (0, 360]",
                self.d_azimuth
            )));
        }
        Ok(())
    }

    /// Radial coordinates (m), center first
    pub fn radii(&self) -> Vec<f64> {
        let n = (self.max_radius / self.d_radius + 1.0e-9).floor() as usize + 1;
        (0..n).map(|i| i as f64 * self.d_radius).collect()
    }

    /// Azimuthal coordinates (degrees clockwise from north)
    pub fn azimuths(&self) -> Vec<f64> {
        let n = (360.0 / self.d_azimuth - 1.0e-9).ceil().max(1.0) as usize;
        (0..n).map(|i| i as f64 * self.d_azimuth).collect()
    }
}

/// A field resampled onto a polar grid
#[derive(Debug, Clone, Serialize)]
pub struct PolarField {
    /// Values shaped `[n_radius, n_azimuth]`
    pub data: Field,
    /// Radial coordinates (m)
    pub radial: Vec<f64>,
    /// Azimuthal coordinates (degrees)
    pub azimuth: Vec<f64>,
    pub center: GeoPoint,
}

/// Bilinear sampler over a rectilinear lat/lon field
pub(crate) struct BilinearSampler<'a> {
    grid: &'a Grid,
    values: &'a [f64],
    periodic: bool,
}

impl<'a> BilinearSampler<'a> {
    pub(crate) fn new(grid: &'a Grid, field: &'a Field) -> Result<Self, PolarProjectionError> {
        if field.shape() != grid.shape() {
            return Err(PolarProjectionError::ShapeMismatch {
                field: field.shape().to_vec(),
                grid: grid.shape().to_vec(),
            });
        }
        Ok(Self {
            grid,
            values: field.as_slice(),
            periodic: grid.periodic_longitude() == Some(false),
        })
    }

    /// Value at `point`, `NaN` outside the grid
    pub(crate) fn sample(&self, point: GeoPoint) -> f64 {
        let lats = self.grid.lats();
        let lons = self.grid.lons();
        let nx = lons.len();

        let Some((j0, j1, fy)) = bracket(lats, point.lat) else {
            return f64::NAN;
        };

        // Move the longitude into the grid's frame
        let ascending = nx < 2 || lons[1] > lons[0];
        // Columns holding the westernmost and easternmost longitudes
        let (west, east) = if ascending { (0, nx - 1) } else { (nx - 1, 0) };
        let lon = lons[west] + (point.lon - lons[west]).rem_euclid(360.0);

        let (i0, i1, fx) = match bracket(lons, lon) {
            Some(b) => b,
            None if self.periodic => {
                // Between the easternmost column and the westernmost one, wrapped
                let span = lons[west] + 360.0 - lons[east];
                if lon >= lons[east] && span > 0.0 {
                    (east, west, (lon - lons[east]) / span)
                } else {
                    return f64::NAN;
                }
            }
            None => return f64::NAN,
        };

        let at = |j: usize, i: usize| self.values[j * nx + i];
        let corners = [at(j0, i0), at(j0, i1), at(j1, i0), at(j1, i1)];
        if corners.iter().any(|v| v.is_nan()) {
            // Nearest corner (may itself be missing)
            let j = if fy < 0.5 { j0 } else { j1 };
            let i = if fx < 0.5 { i0 } else { i1 };
            return at(j, i);
        }
        let [c00, c01, c10, c11] = corners;
        (1.0 - fy) * ((1.0 - fx) * c00 + fx * c01) + fy * ((1.0 - fx) * c10 + fx * c11)
    }
}

/// Bracketing indices and fractional offset of `x` in a monotonic axis
fn bracket(axis: &[f64], x: f64) -> Option<(usize, usize, f64)> {
    let n = axis.len();
    if n == 1 {
        return ((axis[0] - x).abs() < 1.0e-9).then_some((0, 0, 0.0));
    }
    let ascending = axis[1] > axis[0];
    let (lo, hi) = if ascending {
        (axis[0], axis[n - 1])
    } else {
        (axis[n - 1], axis[0])
    };
    if !(lo..=hi).contains(&x) {
        return None;
    }
    // First index whose value is past x
    let upper = if ascending {
        axis.partition_point(|&v| v <= x)
    } else {
        axis.partition_point(|&v| v >= x)
    };
    let i1 = upper.clamp(1, n - 1);
    let i0 = i1 - 1;
    let frac = (x - axis[i0]) / (axis[i1] - axis[i0]);
    Some((i0, i1, frac.clamp(0.0, 1.0)))
}

/// Resample `field` onto a polar grid centered at `center`
///
/// # Errors
///
/// [`PolarProjectionError::ShapeMismatch`] if the field is not on `grid`, or
/// [`PolarProjectionError::InvalidSpacing`].
pub fn to_polar(
    field: &Field,
    grid: &Grid,
    center: GeoPoint,
    spec: &PolarGridSpec,
) -> Result<PolarField, PolarProjectionError> {
    spec.validate()?;
    let sampler = BilinearSampler::new(grid, field)?;
    let radial = spec.radii();
    let azimuth = spec.azimuths();
    debug!(
        "Projecting field onto {}x{} polar grid centered at {center}.",
        radial.len(),
        azimuth.len()
    );

    let mut data = Vec::with_capacity(radial.len() * azimuth.len());
    for &r in &radial {
        for &a in &azimuth {
            let point = bearing_destination(center, r, a, EARTH_RADIUS);
            data.push(sampler.sample(point));
        }
    }

    Ok(PolarField {
        data: Field::from_parts(data, &[radial.len(), azimuth.len()], field.units()),
        radial,
        azimuth,
        center,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Units;
    use approx::assert_abs_diff_eq;

    fn spec() -> PolarGridSpec {
        PolarGridSpec {
            max_radius: 500_000.0,
            d_radius: 100_000.0,
            d_azimuth: 45.0,
        }
    }

    fn linear_field(grid: &Grid) -> Field {
        let lat = grid.lat_mesh();
        let lon = grid.lon_mesh();
        let data = lat
            .as_slice()
            .iter()
            .zip(lon.as_slice())
            .map(|(y, x)| 2.0 * y + 0.5 * x)
            .collect();
        Field::from_vec(data, &grid.shape(), Units::Kelvin).unwrap()
    }

    #[test]
    fn test_polar_axes() {
        let s = spec();
        assert_eq!(s.radii(), vec![0.0, 1.0e5, 2.0e5, 3.0e5, 4.0e5, 5.0e5]);
        assert_eq!(s.azimuths().len(), 8);
        assert_eq!(s.azimuths()[7], 315.0);

        let uneven = PolarGridSpec {
            max_radius: 250_000.0,
            d_radius: 100_000.0,
            d_azimuth: 7.0,
        };
        assert_eq!(uneven.radii().len(), 3);
        assert_eq!(*uneven.azimuths().last().unwrap(), 357.0);
    }

    #[test]
    fn test_center_row_is_center_value() {
        let grid = Grid::from_axes(
            (0..41).map(|j| f64::from(j) * 0.5).collect(),
            (0..41).map(|i| 270.0 + f64::from(i) * 0.5).collect(),
        )
        .unwrap();
        let field = linear_field(&grid);
        let polar = to_polar(&field, &grid, GeoPoint::new(10.0, 280.0), &spec()).unwrap();
        assert_eq!(polar.data.shape(), &[6, 8]);
        assert_eq!(polar.data.units(), Units::Kelvin);
        for a in 0..8 {
            assert_abs_diff_eq!(polar.data.get2(0, a), 2.0 * 10.0 + 0.5 * 280.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_bilinear_is_exact_for_linear_fields() {
        let grid = Grid::from_axes(
            (0..41).map(|j| f64::from(j) * 0.5).collect(),
            (0..41).map(|i| 270.0 + f64::from(i) * 0.5).collect(),
        )
        .unwrap();
        let field = linear_field(&grid);
        let center = GeoPoint::new(10.0, 280.0);
        let polar = to_polar(&field, &grid, center, &spec()).unwrap();
        for (r_idx, &r) in polar.radial.iter().enumerate() {
            for (a_idx, &a) in polar.azimuth.iter().enumerate() {
                let p = bearing_destination(center, r, a, EARTH_RADIUS);
                let expected = 2.0 * p.lat + 0.5 * p.lon;
                assert_abs_diff_eq!(polar.data.get2(r_idx, a_idx), expected, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_points_off_grid_are_nan() {
        let grid = Grid::from_axes(vec![9.0, 10.0, 11.0], vec![279.0, 280.0, 281.0]).unwrap();
        let field = Field::filled(&grid.shape(), 1.0, Units::Dimensionless);
        let polar = to_polar(&field, &grid, GeoPoint::new(10.0, 280.0), &spec()).unwrap();
        assert_abs_diff_eq!(polar.data.get2(0, 0), 1.0, epsilon = 1e-12);
        // 500 km is well outside a 2-degree box
        assert!(polar.data.get2(5, 0).is_nan());
    }

    #[test]
    fn test_longitude_wraps_on_periodic_grid() {
        let grid = Grid::global(19, 36).unwrap();
        let field = Field::filled(&grid.shape(), 3.0, Units::Dimensionless);
        // Center sits between the 350E column and 0E
        let polar = to_polar(&field, &grid, GeoPoint::new(0.0, -5.0), &spec()).unwrap();
        assert!(polar.data.as_slice().iter().all(|&v| (v - 3.0).abs() < 1e-12));
    }

    #[test]
    fn test_longitude_wraps_on_descending_periodic_grid() {
        let lats: Vec<f64> = (0..19).map(|j| -90.0 + 10.0 * f64::from(j)).collect();
        let lons: Vec<f64> = (0..36).map(|i| 350.0 - 10.0 * f64::from(i)).collect();
        let grid = Grid::from_axes(lats, lons).unwrap();
        assert_eq!(grid.periodic_longitude(), Some(false));

        // Varies with longitude only, smooth across the seam
        let data = grid
            .lon_mesh()
            .as_slice()
            .iter()
            .map(|x| x.to_radians().cos())
            .collect();
        let field = Field::from_vec(data, &grid.shape(), Units::Dimensionless).unwrap();
        let polar = to_polar(&field, &grid, GeoPoint::new(0.0, 355.0), &spec()).unwrap();
        assert_eq!(polar.data.nan_count(), 0);

        // Center is halfway between the 350E and 0E columns
        let expected = 0.5 * (350.0_f64.to_radians().cos() + 1.0);
        assert_abs_diff_eq!(polar.data.get2(0, 0), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_descending_latitudes() {
        let grid = Grid::from_axes(
            (0..21).map(|j| 20.0 - f64::from(j)).collect(),
            (0..21).map(|i| 270.0 + f64::from(i)).collect(),
        )
        .unwrap();
        let field = linear_field(&grid);
        let polar = to_polar(&field, &grid, GeoPoint::new(10.0, 280.0), &spec()).unwrap();
        assert_abs_diff_eq!(polar.data.get2(0, 0), 160.0, epsilon = 1e-9);
        assert!(polar.data.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_nan_corner_falls_back_to_nearest() {
        let grid = Grid::from_axes(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        let field = Field::from_vec(vec![1.0, f64::NAN, 3.0, 4.0], &[2, 2], Units::Dimensionless).unwrap();
        let sampler = BilinearSampler::new(&grid, &field).unwrap();
        assert_eq!(sampler.sample(GeoPoint::new(0.9, 0.1)), 3.0);
        assert!(sampler.sample(GeoPoint::new(0.1, 0.9)).is_nan());
    }

    #[test]
    fn test_rejects_bad_spec_and_shape() {
        let grid = Grid::from_axes(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        let field = Field::zeros(&[3, 2], Units::Dimensionless);
        assert!(matches!(
            to_polar(&field, &grid, GeoPoint::default(), &spec()),
            Err(PolarProjectionError::ShapeMismatch { .. })
        ));
        let bad = PolarGridSpec {
            d_radius: 0.0,
            ..spec()
        };
        let field = Field::zeros(&[2, 2], Units::Dimensionless);
        assert!(matches!(
            to_polar(&field, &grid, GeoPoint::default(), &bad),
            Err(PolarProjectionError::InvalidSpacing(_))
        ));
    }
}
