//! Shared fixtures for the integration tests

#![allow(dead_code)]

use tcdiags_core::geomets::{grid_radial_distance, EARTH_RADIUS};
use tcdiags_core::{Field, GeoPoint, Grid, Units};

/// Route `tracing` output through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Global 5-degree grid with the 360E column repeated
pub fn global_grid() -> Grid {
    Grid::from_axes(
        (0..37).map(|j| -90.0 + 5.0 * f64::from(j)).collect(),
        (0..73).map(|i| 5.0 * f64::from(i)).collect(),
    )
    .unwrap()
}

/// Quarter-degree regional grid over 5-25N, 270-290E
pub fn regional_grid() -> Grid {
    Grid::from_axes(
        (0..81).map(|j| 5.0 + 0.25 * f64::from(j)).collect(),
        (0..81).map(|i| 270.0 + 0.25 * f64::from(i)).collect(),
    )
    .unwrap()
}

/// Tangential wind of the idealized vortex: peaks at `vmax` on `rmw`
pub fn tangential_wind(distance: f64, vmax: f64, rmw: f64) -> f64 {
    let s = distance / rmw;
    vmax * s * (0.5 * (1.0 - s * s)).exp()
}

/// Cyclonic (northern hemisphere) vortex winds `[lat, lon]` around `center`
pub fn vortex_winds(grid: &Grid, center: GeoPoint, vmax: f64, rmw: f64) -> (Field, Field) {
    let distance = grid_radial_distance(center, grid, EARTH_RADIUS).unwrap();
    let (lat, lon) = (grid.lat_mesh(), grid.lon_mesh());
    let mut u = Vec::with_capacity(distance.len());
    let mut v = Vec::with_capacity(distance.len());
    for idx in 0..distance.len() {
        let vt = tangential_wind(distance.as_slice()[idx], vmax, rmw);
        let dy = lat.as_slice()[idx] - center.lat;
        let dx = (lon.as_slice()[idx] - center.lon) * center.lat.to_radians().cos();
        let r = dx.hypot(dy);
        if r == 0.0 {
            u.push(0.0);
            v.push(0.0);
        } else {
            u.push(-vt * dy / r);
            v.push(vt * dx / r);
        }
    }
    let shape = grid.shape();
    (
        Field::from_vec(u, &shape, Units::MetersPerSecond).unwrap(),
        Field::from_vec(v, &shape, Units::MetersPerSecond).unwrap(),
    )
}

/// Repeat a `[lat, lon]` field on every level
pub fn stack_levels(field: &Field, nlev: usize) -> Field {
    let levels: Vec<Field> = (0..nlev).map(|_| field.clone()).collect();
    Field::stack(&levels, field.units()).unwrap()
}

/// `[level, lat, lon]` field holding `values[k]` everywhere on level `k`
pub fn level_constant(values: &[f64], grid: &Grid, units: Units) -> Field {
    let n = grid.ny() * grid.nx();
    let data = values.iter().flat_map(|&v| vec![v; n]).collect();
    Field::from_vec(data, &[values.len(), grid.ny(), grid.nx()], units).unwrap()
}

/// Tropical sounding (hPa, °C, g/kg mixing ratio), surface first
pub const PRESSURE: [f64; 12] = [1000.0, 925.0, 850.0, 700.0, 600.0, 500.0, 400.0, 300.0, 250.0, 200.0, 150.0, 100.0];
pub const TEMPERATURE: [f64; 12] = [26.0, 21.5, 17.5, 8.5, 0.5, -6.5, -17.0, -32.5, -42.0, -54.0, -67.0, -75.0];
pub const MIXING_RATIO: [f64; 12] = [18.5, 15.0, 12.0, 7.0, 4.5, 2.8, 1.3, 0.4, 0.2, 0.05, 0.02, 0.01];
