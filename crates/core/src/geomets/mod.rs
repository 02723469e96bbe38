//! Spherical-earth geometry
//!
//! Great-circle distance, the forward geodesic (destination from origin,
//! distance, and heading), and radial distance fields relative to a
//! reference location. All functions take the sphere radius explicitly so
//! alternate spheres stay consistent between distance and destination.

use rayon::prelude::*;

use crate::core_types::{Field, GeoPoint, Grid, Units};
use crate::error::GeometryError;

/// Mean equatorial Earth radius (m)
pub const EARTH_RADIUS: f64 = 6_378_100.0;

/// Great-circle distance (m) between two points by the haversine formula
pub fn haversine(a: GeoPoint, b: GeoPoint, radius: f64) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points
    2.0 * radius * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Destination reached from `origin` after `distance` meters along the
/// initial compass `heading` (degrees clockwise from north)
///
/// The returned longitude is continuous with the origin longitude (it is
/// not wrapped), so an origin at 280°E stays in the 0..360 frame.
pub fn bearing_destination(origin: GeoPoint, distance: f64, heading: f64, radius: f64) -> GeoPoint {
    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();
    let theta = heading.to_radians();
    let delta = distance / radius;

    let sin_lat2 = lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * sin_lat2);

    GeoPoint::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Distance (m) from `reference` to every point of flattened coordinate
/// arrays
///
/// # Errors
///
/// [`GeometryError::NotOneDimensional`] if either array is not 1D (callers
/// flatten 2D grids first), or [`GeometryError::LengthMismatch`].
pub fn radial_distance_field(
    reference: GeoPoint,
    lats: &Field,
    lons: &Field,
    radius: f64,
) -> Result<Field, GeometryError> {
    for (axis, field) in [("latitude", lats), ("longitude", lons)] {
        if field.ndim() != 1 {
            return Err(GeometryError::NotOneDimensional {
                axis,
                shape: field.shape().to_vec(),
            });
        }
    }
    if lats.len() != lons.len() {
        return Err(GeometryError::LengthMismatch {
            lat: lats.len(),
            lon: lons.len(),
        });
    }

    let distances: Vec<f64> = lats
        .as_slice()
        .par_iter()
        .zip(lons.as_slice().par_iter())
        .map(|(&lat, &lon)| haversine(reference, GeoPoint::new(lat, lon), radius))
        .collect();

    let n = distances.len();
    Ok(Field::from_parts(distances, &[n], Units::Meters))
}

/// Distance (m) from `reference` to every point of a grid, shaped `[ny, nx]`
pub fn grid_radial_distance(reference: GeoPoint, grid: &Grid, radius: f64) -> Result<Field, GeometryError> {
    let n = grid.ny() * grid.nx();
    let flatten = |mesh: Field| Field::from_parts(mesh.into_vec(), &[n], Units::Degrees);
    let flat = radial_distance_field(
        reference,
        &flatten(grid.lat_mesh()),
        &flatten(grid.lon_mesh()),
        radius,
    )?;
    Ok(Field::from_parts(flat.into_vec(), &grid.shape(), Units::Meters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_haversine_symmetry_and_zero() {
        let a = GeoPoint::new(15.0, 280.0);
        let b = GeoPoint::new(-33.9, 151.2);
        assert_eq!(haversine(a, b, EARTH_RADIUS), haversine(b, a, EARTH_RADIUS));
        assert_eq!(haversine(a, a, EARTH_RADIUS), 0.0);
    }

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        let d = haversine(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0), EARTH_RADIUS);
        assert_relative_eq!(d, EARTH_RADIUS * 1.0_f64.to_radians(), max_relative = 1e-12);
    }

    #[test]
    fn test_bearing_round_trip() {
        let origin = GeoPoint::new(15.0, 280.0);
        for &distance in &[1_000.0, 500_000.0] {
            for &heading in &[0.0, 90.0, 180.0, 270.0] {
                let dest = bearing_destination(origin, distance, heading, EARTH_RADIUS);
                let back = haversine(origin, dest, EARTH_RADIUS);
                assert_relative_eq!(back, distance, max_relative = 1e-3);
            }
        }
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = GeoPoint::new(10.0, 100.0);
        let north = bearing_destination(origin, 111_000.0, 0.0, EARTH_RADIUS);
        assert!(north.lat > origin.lat);
        assert_relative_eq!(north.lon, origin.lon, epsilon = 1e-9);

        let east = bearing_destination(origin, 111_000.0, 90.0, EARTH_RADIUS);
        assert!(east.lon > origin.lon);

        let west = bearing_destination(origin, 111_000.0, 270.0, EARTH_RADIUS);
        assert!(west.lon < origin.lon);
    }

    #[test]
    fn test_alternate_sphere_radius() {
        let origin = GeoPoint::new(0.0, 0.0);
        let dest = bearing_destination(origin, 1_000.0, 45.0, 1.0e5);
        assert_relative_eq!(haversine(origin, dest, 1.0e5), 1_000.0, max_relative = 1e-9);
    }

    #[test]
    fn test_radial_distance_rejects_2d_input() {
        let grid = Grid::from_axes(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        let err = radial_distance_field(
            GeoPoint::new(0.0, 0.0),
            &grid.lat_mesh(),
            &grid.lon_mesh(),
            EARTH_RADIUS,
        )
        .unwrap_err();
        assert_eq!(
            err,
            GeometryError::NotOneDimensional {
                axis: "latitude",
                shape: vec![2, 2]
            }
        );
    }

    #[test]
    fn test_radial_distance_length_mismatch() {
        let lats = Field::zeros(&[3], Units::Degrees);
        let lons = Field::zeros(&[4], Units::Degrees);
        assert!(matches!(
            radial_distance_field(GeoPoint::default(), &lats, &lons, EARTH_RADIUS),
            Err(GeometryError::LengthMismatch { lat: 3, lon: 4 })
        ));
    }

    #[test]
    fn test_grid_radial_distance() {
        let grid = Grid::from_axes(vec![0.0, 1.0, 2.0], vec![10.0, 11.0]).unwrap();
        let dist = grid_radial_distance(GeoPoint::new(1.0, 10.0), &grid, EARTH_RADIUS).unwrap();
        assert_eq!(dist.shape(), &[3, 2]);
        assert_eq!(dist.get2(1, 0), 0.0);
        assert_relative_eq!(dist.get2(0, 0), dist.get2(2, 0), max_relative = 1e-12);
    }
}
