//! Vortex relaxation mask
//!
//! 0 inside an event's exclusion radius, a linear ramp through the
//! relaxation band, and 1 beyond every event's relaxation radius. With
//! several events the lowest value wins at each point, so the result does
//! not depend on event order.

use serde::Serialize;
use tracing::info;

use crate::core_types::{Field, Grid, TcEvent, Units};
use crate::error::FilterError;
use crate::geomets::{grid_radial_distance, EARTH_RADIUS};

/// Per-grid-point blending weight in [0, 1]
#[derive(Debug, Clone, Serialize)]
pub struct RelaxationMask {
    /// Weights shaped like the grid
    pub data: Field,
    /// Exclusion radius (m)
    pub exclusion_radius: f64,
    /// Relaxation radius (m)
    pub relax_radius: f64,
}

impl RelaxationMask {
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        self.data.as_slice()
    }
}

/// Mask weight at `distance` from a single event
#[inline]
pub fn ramp_weight(distance: f64, exclusion_radius: f64, relax_radius: f64) -> f64 {
    if distance <= exclusion_radius {
        0.0
    } else if distance < relax_radius {
        (distance - exclusion_radius) / (relax_radius - exclusion_radius)
    } else {
        1.0
    }
}

/// Build the relaxation mask for all `events` on `grid`
///
/// # Errors
///
/// [`FilterError::InvalidRadii`] unless `relax_radius > exclusion_radius`.
pub fn build_relaxation_mask(
    grid: &Grid,
    events: &[TcEvent],
    exclusion_radius: f64,
    relax_radius: f64,
) -> Result<RelaxationMask, FilterError> {
    if relax_radius.is_nan() || relax_radius <= exclusion_radius || !exclusion_radius.is_finite() {
        return Err(FilterError::InvalidRadii {
            exclusion: exclusion_radius,
            relax: relax_radius,
        });
    }

    let mut mask = Field::filled(&grid.shape(), 1.0, Units::Dimensionless);
    for event in events {
        info!("Computing radial distances relative to TC {}.", event.id);
        let distance = grid_radial_distance(event.center(), grid, EARTH_RADIUS)?;
        for (m, &d) in mask.as_mut_slice().iter_mut().zip(distance.as_slice()) {
            *m = m.min(ramp_weight(d, exclusion_radius, relax_radius));
        }
    }

    Ok(RelaxationMask {
        data: mask,
        exclusion_radius,
        relax_radius,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::GeoPoint;
    use crate::geomets::haversine;

    fn grid() -> Grid {
        Grid::from_axes(
            (0..41).map(|j| f64::from(j) * 0.5).collect(),
            (0..81).map(|i| 260.0 + f64::from(i) * 0.5).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_single_event_boundaries() {
        let grid = grid();
        let tc = TcEvent::new("01L", 10.0, 280.0);
        let mask = build_relaxation_mask(&grid, &[tc.clone()], 150_000.0, 400_000.0).unwrap();
        let lat = grid.lat_mesh();
        let lon = grid.lon_mesh();

        let mut ramp: Vec<(f64, f64)> = Vec::new();
        for idx in 0..mask.data.len() {
            let d = haversine(
                tc.center(),
                GeoPoint::new(lat.as_slice()[idx], lon.as_slice()[idx]),
                EARTH_RADIUS,
            );
            let m = mask.as_slice()[idx];
            assert!((0.0..=1.0).contains(&m));
            if d == 0.0 {
                assert_eq!(m, 0.0);
            }
            if d <= 150_000.0 {
                assert_eq!(m, 0.0);
            } else if d >= 400_000.0 {
                assert_eq!(m, 1.0);
            } else {
                ramp.push((d, m));
            }
        }

        // Non-decreasing with distance inside the band
        ramp.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert!(!ramp.is_empty());
        for w in ramp.windows(2) {
            assert!(w[1].1 >= w[0].1);
        }
    }

    #[test]
    fn test_two_separated_events_each_exclude() {
        let grid = grid();
        let a = TcEvent::new("01L", 10.0, 270.0);
        let b = TcEvent::new("02L", 10.0, 290.0);
        let mask = build_relaxation_mask(&grid, &[a, b], 150_000.0, 400_000.0).unwrap();
        let nx = grid.nx();
        // (10N, 270E) is row 20, column 20; (10N, 290E) is column 60
        assert_eq!(mask.as_slice()[20 * nx + 20], 0.0);
        assert_eq!(mask.as_slice()[20 * nx + 60], 0.0);
        // Midway between them is far from both
        assert_eq!(mask.as_slice()[20 * nx + 40], 1.0);
    }

    #[test]
    fn test_overlapping_events_take_minimum_in_any_order() {
        let grid = grid();
        let a = TcEvent::new("01L", 10.0, 279.0);
        let b = TcEvent::new("02L", 10.0, 282.0);
        let ab = build_relaxation_mask(&grid, &[a.clone(), b.clone()], 150_000.0, 600_000.0).unwrap();
        let ba = build_relaxation_mask(&grid, &[b, a.clone()], 150_000.0, 600_000.0).unwrap();
        assert_eq!(ab.data, ba.data);

        // A's center lies in B's ramp band but must stay excluded
        let nx = grid.nx();
        assert_eq!(ab.as_slice()[20 * nx + 38], 0.0);
        let alone = build_relaxation_mask(&grid, &[a], 150_000.0, 600_000.0).unwrap();
        for (both, single) in ab.as_slice().iter().zip(alone.as_slice()) {
            assert!(both <= single);
        }
    }

    #[test]
    fn test_no_events_is_all_ones() {
        let mask = build_relaxation_mask(&grid(), &[], 1.0, 2.0).unwrap();
        assert!(mask.as_slice().iter().all(|&m| m == 1.0));
    }

    #[test]
    fn test_invalid_radii() {
        assert_eq!(
            build_relaxation_mask(&grid(), &[], 400.0, 400.0).unwrap_err(),
            FilterError::InvalidRadii {
                exclusion: 400.0,
                relax: 400.0
            }
        );
    }

    #[test]
    fn test_ramp_weight() {
        assert_eq!(ramp_weight(0.0, 100.0, 300.0), 0.0);
        assert_eq!(ramp_weight(100.0, 100.0, 300.0), 0.0);
        assert_eq!(ramp_weight(200.0, 100.0, 300.0), 0.5);
        assert_eq!(ramp_weight(300.0, 100.0, 300.0), 1.0);
    }
}
