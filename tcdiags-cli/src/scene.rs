//! Synthetic analysis: a tropical atmosphere and ocean with idealized TCs
//!
//! Stands in for the gridded analysis a NetCDF reader would supply. Every
//! field is unit-tagged and laid out `[level, lat, lon]` on a global grid.

use tcdiags_core::geomets::{grid_radial_distance, EARTH_RADIUS};
use tcdiags_core::{Analysis, DiagsError, Field, Grid, OceanProfiles, TcEvent, Units};

/// Isobaric model levels (hPa), surface first
const PRESSURE: [f64; 12] = [1000.0, 925.0, 850.0, 700.0, 600.0, 500.0, 400.0, 300.0, 250.0, 200.0, 150.0, 100.0];
/// Tropical temperature profile (°C)
const TEMPERATURE: [f64; 12] = [26.0, 21.5, 17.5, 8.5, 0.5, -6.5, -17.0, -32.5, -42.0, -54.0, -67.0, -75.0];
/// Tropical mixing ratio profile (g/kg)
const MIXING_RATIO: [f64; 12] = [18.5, 15.0, 12.0, 7.0, 4.5, 2.8, 1.3, 0.4, 0.2, 0.05, 0.02, 0.01];

/// Idealized storm parameters
#[derive(Debug, Clone, Copy)]
pub struct VortexParams {
    /// Peak tangential wind at the lowest level (m/s)
    pub vmax: f64,
    /// Radius of maximum wind (m)
    pub rmw: f64,
}

/// Standard-atmosphere height of a pressure level (m)
fn standard_height(p_hpa: f64) -> f64 {
    44_330.8 * (1.0 - (p_hpa / 1013.25).powf(0.190_263))
}

/// Build the analysis on a global grid with `resolution` degree spacing
pub fn build_analysis(resolution: f64, events: &[TcEvent], vortex: VortexParams) -> Result<Analysis, DiagsError> {
    let ny = (180.0 / resolution).round() as usize + 1;
    let nx = (360.0 / resolution).round() as usize;
    let grid = Grid::global(ny, nx)?;
    let n = ny * nx;
    let nlev = PRESSURE.len();
    let shape = [nlev, ny, nx];
    let sin2: Vec<f64> = grid.lat_mesh().as_slice().iter().map(|lat| lat.to_radians().sin().powi(2)).collect();

    let distances: Vec<Field> = events
        .iter()
        .map(|e| grid_radial_distance(e.center(), &grid, EARTH_RADIUS))
        .collect::<Result<_, _>>()?;
    let (lat, lon) = (grid.lat_mesh(), grid.lon_mesh());

    let mut pressure = Vec::with_capacity(nlev * n);
    let mut height = Vec::with_capacity(nlev * n);
    let mut temperature = Vec::with_capacity(nlev * n);
    let mut mixing_ratio = Vec::with_capacity(nlev * n);
    let mut u = Vec::with_capacity(nlev * n);
    let mut v = Vec::with_capacity(nlev * n);
    for k in 0..nlev {
        // Vortex decays with height
        let strength = PRESSURE[k] / PRESSURE[0];
        for idx in 0..n {
            let s2 = sin2[idx];
            pressure.push(PRESSURE[k]);
            height.push(standard_height(PRESSURE[k]));
            temperature.push(TEMPERATURE[k] - 30.0 * s2);
            mixing_ratio.push(MIXING_RATIO[k] / 1000.0 * (1.0 - s2));

            let mut uu = 10.0 * (1.0 - s2).sqrt() * (1.0 - strength) + 5.0 * strength;
            let mut vv = 0.0;
            for (event, distance) in events.iter().zip(&distances) {
                let x = distance.as_slice()[idx] / vortex.rmw;
                let vt = strength * vortex.vmax * x * (0.5 * (1.0 - x * x)).exp();
                let dy = lat.as_slice()[idx] - event.lat;
                let dx = (lon.as_slice()[idx] - event.lon) * event.lat.to_radians().cos();
                let r = dx.hypot(dy);
                if r > 0.0 {
                    // Counter-clockwise north of the equator
                    let sense = event.lat.signum();
                    uu -= sense * vt * dy / r;
                    vv += sense * vt * dx / r;
                }
            }
            u.push(uu);
            v.push(vv);
        }
    }

    let sst: Vec<f64> = sin2.iter().map(|s2| 29.5 - 28.0 * s2).collect();
    let depths: Vec<f64> = (0..=20).map(|k| 10.0 * f64::from(k)).collect();
    let mut ocean_temperature = Vec::with_capacity(depths.len() * n);
    for z in &depths {
        ocean_temperature.extend(sst.iter().map(|t| t - z / 12.0));
    }

    let mut analysis = Analysis::new(grid);
    analysis.pressure = Some(Field::from_vec(pressure, &shape, Units::Hectopascals)?.with_meta("pres", "Pressure"));
    analysis.height = Some(Field::from_vec(height, &shape, Units::Meters)?.with_meta("hght", "Geopotential height"));
    analysis.temperature = Some(Field::from_vec(temperature, &shape, Units::Celsius)?.with_meta("temp", "Temperature"));
    analysis.mixing_ratio =
        Some(Field::from_vec(mixing_ratio, &shape, Units::KilogramsPerKilogram)?.with_meta("mxrt", "Mixing ratio"));
    analysis.u = Some(Field::from_vec(u, &shape, Units::MetersPerSecond)?.with_meta("uwnd", "Zonal wind"));
    analysis.v = Some(Field::from_vec(v, &shape, Units::MetersPerSecond)?.with_meta("vwnd", "Meridional wind"));
    analysis.surface_height = Some(Field::zeros(&[ny, nx], Units::Meters));
    analysis.sea_level_pressure = Some(Field::filled(&[ny, nx], 1012.0, Units::Hectopascals));
    analysis.sst = Some(Field::from_vec(sst, &[ny, nx], Units::Celsius)?.with_meta("sst", "Sea-surface temperature"));
    analysis.ocean = Some(OceanProfiles {
        temperature: Field::from_vec(ocean_temperature, &[depths.len(), ny, nx], Units::Celsius)?,
        salinity: Field::filled(&[depths.len(), ny, nx], 35.0, Units::PracticalSalinity),
        depths,
    });
    Ok(analysis)
}
