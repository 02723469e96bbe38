//! Vukicevic et al. (2014) multi-scale intensity
//!
//! The near-surface wind speed is re-projected onto a polar grid centered
//! on the TC, transformed, and split into azimuthal wavenumber components.
//! Intensity is reported for the symmetric (wavenumber 0) and first
//! asymmetric (wavenumber 1) parts, their sum, and the residual against the
//! total wind. The radius of maximum wind is where the wavenumber 0 + 1
//! reconstruction peaks.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::MsiOptions;
use crate::core_types::{nan_max, Degrees, Field, GeoPoint, Grid, Meters, MetersPerSecond, TcEvent, Units};
use crate::derived::winds::wind_magnitude;
use crate::error::Result;
use crate::geomets::{bearing_destination, EARTH_RADIUS};
use crate::interp::polar::{to_polar, PolarField};
use crate::interp::vertical::interp_to_level_or_lowest;
use crate::output::Table;
use crate::transforms::fft::{forward_fft2d, reconstruct_by_wavenumber, WavenumberSpectrum};

/// Per-event multi-scale intensity attributes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MsiSummary {
    /// Maximum total wind on the polar grid
    pub vmax: MetersPerSecond,
    /// Radius of the wavenumber 0 + 1 maximum
    pub rmw: Meters,
    pub lat_rmw: Degrees,
    pub lon_rmw: Degrees,
    /// Heading from the center to the maximum, clockwise from north
    pub head_rmw: Degrees,
    pub wn0: MetersPerSecond,
    pub wn1: MetersPerSecond,
    pub wn0p1: MetersPerSecond,
    /// `vmax - wn0p1`
    pub epsi: MetersPerSecond,
    /// Wavenumbers actually reconstructed
    pub n_wavenumbers: usize,
    pub lat_llcrnr: Degrees,
    pub lat_urcrnr: Degrees,
    pub lon_llcrnr: Degrees,
    pub lon_urcrnr: Degrees,
}

impl MsiSummary {
    /// Attribute table: description, value, units
    pub fn attribute_table(&self, event: &TcEvent) -> Table {
        let mut table = Table::new(
            format!("Multi-scale intensity for TC {}", event.id),
            &["Description", "Value", "Units"],
        );
        let rows: [(&str, f64, &str); 9] = [
            ("Maximum 10-meter wind", *self.vmax, "m/s"),
            ("Radius of maximum wind", self.rmw.to_km(), "km"),
            ("Latitude of maximum wind", *self.lat_rmw, "deg"),
            ("Longitude of maximum wind", *self.lon_rmw, "deg"),
            ("Heading of maximum wind", *self.head_rmw, "deg"),
            ("Wavenumber 0 intensity", *self.wn0, "m/s"),
            ("Wavenumber 1 intensity", *self.wn1, "m/s"),
            ("Wavenumber 0+1 intensity", *self.wn0p1, "m/s"),
            ("Residual intensity", *self.epsi, "m/s"),
        ];
        for (description, value, units) in rows {
            table.push_row([description.to_string(), format!("{value:.2}"), units.to_string()]);
        }
        table
    }
}

/// Multi-scale intensity of one TC event
#[derive(Debug, Clone, Serialize)]
pub struct MultiScaleIntensity {
    pub event: TcEvent,
    pub summary: MsiSummary,
    /// Near-surface wind speed on the polar grid
    pub wnds10m: PolarField,
    /// Wavenumber reconstructions, `[wavenumber, radius, azimuth]`
    pub wnds10m_spec: Field,
    #[serde(skip)]
    spectrum: WavenumberSpectrum,
}

impl MultiScaleIntensity {
    pub fn spectrum(&self) -> &WavenumberSpectrum {
        &self.spectrum
    }

    /// Maximum wind of each reconstructed wavenumber
    pub fn wavenumber_table(&self) -> Table {
        let mut table = Table::new(
            format!("Wavenumber maximum winds for TC {}", self.event.id),
            &["Wavenumber", "Max wind (m/s)"],
        );
        for (k, vmax) in self.spectrum.maxima().into_iter().enumerate() {
            table.push_row([k.to_string(), format!("{vmax:.2}")]);
        }
        table
    }
}

/// Near-surface wind speed `[lat, lon]` at `target_height` (m)
///
/// Columns whose lowest level lies above the target use the lowest level.
pub fn near_surface_wind(u: &Field, v: &Field, height: &Field, target_height: f64) -> Result<Field> {
    let speed = wind_magnitude(u, v)?;
    let out = interp_to_level_or_lowest(&speed, height, target_height)?;
    Ok(out.with_meta("wnds10m", "Near-surface wind speed"))
}

/// First row-major index of the maximum, ignoring `NaN`
fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (idx, &v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
}

/// Multi-scale intensity for `event` from a `[lat, lon]` wind speed field
pub fn compute_msi(wind: &Field, grid: &Grid, event: &TcEvent, opts: &MsiOptions) -> Result<MultiScaleIntensity> {
    info!("Computing multi-scale intensity for TC {}.", event.id);
    let center = event.center();
    let polar = to_polar(wind, grid, center, &opts.polar_spec())?;
    let (n_radius, n_azimuth) = (polar.radial.len(), polar.azimuth.len());

    let missing = polar.data.nan_count();
    let transform_input = if missing > 0 {
        warn!("Polar wind for TC {} has {missing} missing values; they enter the transform as zero.", event.id);
        polar.data.map(polar.data.units(), |v| if v.is_nan() { 0.0 } else { v })
    } else {
        polar.data.clone()
    };

    let available = n_azimuth / 2;
    let n_wavenumbers = if opts.max_wavenumber > available {
        warn!(
            "Requested {} wavenumbers but the azimuthal grid supports {available}; using {available}.",
            opts.max_wavenumber
        );
        available
    } else {
        opts.max_wavenumber
    };
    let spectrum = reconstruct_by_wavenumber(&forward_fft2d(&transform_input)?, n_wavenumbers, Units::MetersPerSecond)?;

    let zeros = Field::zeros(&[n_radius, n_azimuth], Units::MetersPerSecond);
    let wn0_field = spectrum.get(0).unwrap_or(&zeros);
    let wn1_field = spectrum.get(1);
    let wn0p1: Vec<f64> = match wn1_field {
        Some(wn1) => wn0_field.as_slice().iter().zip(wn1.as_slice()).map(|(a, b)| a + b).collect(),
        None => wn0_field.as_slice().to_vec(),
    };
    let wn0 = wn0_field.nan_max();
    let wn1 = wn1_field.map_or(f64::NAN, Field::nan_max);
    let wn0p1_max = nan_max(&wn0p1);

    let mut vmax = polar.data.nan_max();
    if vmax.is_nan() {
        vmax = spectrum.maxima().iter().filter(|v| !v.is_nan()).sum();
        warn!("No valid total wind for TC {}; vmax taken from the wavenumber maxima ({vmax:.2}).", event.id);
    }

    let (rmw, head_rmw, location) = match argmax(&wn0p1) {
        Some(idx) => {
            let (r, a) = (polar.radial[idx / n_azimuth], polar.azimuth[idx % n_azimuth]);
            (r, a, bearing_destination(center, r, a, EARTH_RADIUS))
        }
        None => (f64::NAN, f64::NAN, GeoPoint::new(f64::NAN, f64::NAN)),
    };

    let corner = |heading: f64| bearing_destination(center, *opts.max_radius, heading, EARTH_RADIUS);
    let summary = MsiSummary {
        vmax: MetersPerSecond::new(vmax),
        rmw: Meters::new(rmw),
        lat_rmw: Degrees::new(location.lat),
        lon_rmw: Degrees::new(location.lon),
        head_rmw: Degrees::new(head_rmw).normalized(),
        wn0: MetersPerSecond::new(wn0),
        wn1: MetersPerSecond::new(wn1),
        wn0p1: MetersPerSecond::new(wn0p1_max),
        epsi: MetersPerSecond::new(vmax - wn0p1_max),
        n_wavenumbers: spectrum.len(),
        lat_llcrnr: Degrees::new(corner(180.0).lat),
        lat_urcrnr: Degrees::new(corner(0.0).lat),
        lon_llcrnr: Degrees::new(corner(270.0).lon),
        lon_urcrnr: Degrees::new(corner(90.0).lon),
    };
    info!(
        "TC {}: vmax {:.2}, wn0 {:.2}, wn1 {:.2}, rmw {:.0} km.",
        event.id,
        vmax,
        wn0,
        wn1,
        rmw / 1000.0
    );

    let wnds10m_spec = spectrum
        .to_field()?
        .with_meta("wnds10m_spec", "Near-surface wind speed by azimuthal wavenumber");
    Ok(MultiScaleIntensity {
        event: event.clone(),
        summary,
        wnds10m: polar,
        wnds10m_spec,
        spectrum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geomets::grid_radial_distance;

    fn grid() -> Grid {
        Grid::from_axes(
            (0..81).map(|j| 5.0 + f64::from(j) * 0.25).collect(),
            (0..81).map(|i| 270.0 + f64::from(i) * 0.25).collect(),
        )
        .unwrap()
    }

    /// Rankine-like vortex peaking at `vm` 100 km from (15N, 280E), plus an
    /// optional translation asymmetry
    fn vortex(grid: &Grid, vm: f64, asymmetry: f64) -> Field {
        let center = GeoPoint::new(15.0, 280.0);
        let distance = grid_radial_distance(center, grid, EARTH_RADIUS).unwrap();
        let lon = grid.lon_mesh();
        let data = distance
            .as_slice()
            .iter()
            .zip(lon.as_slice())
            .map(|(&d, &x)| {
                let s = d / 100_000.0;
                let v = vm * s * (0.5 * (1.0 - s * s)).exp();
                v + asymmetry * (x - 280.0).clamp(-2.0, 2.0) * (-s * s / 4.0).exp()
            })
            .collect();
        Field::from_vec(data, &grid.shape(), Units::MetersPerSecond).unwrap()
    }

    fn options() -> MsiOptions {
        MsiOptions {
            max_radius: Meters::new(500_000.0),
            d_radius: Meters::new(25_000.0),
            d_azimuth: Degrees::new(10.0),
            ..MsiOptions::default()
        }
    }

    #[test]
    fn test_axisymmetric_vortex() {
        let grid = grid();
        let tc = TcEvent::new("01L", 15.0, 280.0);
        let msi = compute_msi(&vortex(&grid, 50.0, 0.0), &grid, &tc, &options()).unwrap();
        let s = msi.summary;
        assert_eq!(s.n_wavenumbers, 3);
        assert!(*s.vmax > 45.0 && *s.vmax <= 50.0);
        assert!((*s.wn0 - *s.vmax).abs() < 0.03 * *s.vmax);
        assert!(s.wn1.abs() < 0.02 * *s.vmax);
        assert!((*s.rmw - 100_000.0).abs() <= 25_000.0);
        assert_eq!(msi.wnds10m_spec.shape(), &[3, 21, 36]);
    }

    #[test]
    fn test_asymmetry_shows_in_wavenumber_one() {
        let grid = grid();
        let tc = TcEvent::new("01L", 15.0, 280.0);
        let sym = compute_msi(&vortex(&grid, 40.0, 0.0), &grid, &tc, &options()).unwrap();
        let asym = compute_msi(&vortex(&grid, 40.0, 5.0), &grid, &tc, &options()).unwrap();
        assert!(*asym.summary.wn1 > *sym.summary.wn1 + 1.0);
        // Stronger winds lie east of the center
        assert!(*asym.summary.lon_rmw > 280.0);
        assert!(*asym.summary.head_rmw > 0.0 && *asym.summary.head_rmw < 180.0);
    }

    #[test]
    fn test_domain_corners() {
        let grid = grid();
        let tc = TcEvent::new("01L", 15.0, 280.0);
        let s = compute_msi(&vortex(&grid, 30.0, 0.0), &grid, &tc, &options()).unwrap().summary;
        assert!((*s.lat_llcrnr - (15.0 - 4.49)).abs() < 0.05);
        assert!((*s.lat_urcrnr - (15.0 + 4.49)).abs() < 0.05);
        assert!(*s.lon_llcrnr < 280.0 && *s.lon_urcrnr > 280.0);
        assert!((*s.lon_urcrnr - 280.0 - (280.0 - *s.lon_llcrnr)).abs() < 1e-9);
    }

    #[test]
    fn test_wavenumber_count_is_clipped() {
        let grid = grid();
        let tc = TcEvent::new("01L", 15.0, 280.0);
        let opts = MsiOptions {
            d_azimuth: Degrees::new(90.0),
            max_wavenumber: 6,
            ..options()
        };
        let msi = compute_msi(&vortex(&grid, 30.0, 0.0), &grid, &tc, &opts).unwrap();
        assert_eq!(msi.summary.n_wavenumbers, 2);
        assert_eq!(msi.wavenumber_table().len(), 2);
    }

    #[test]
    fn test_argmax_first_occurrence() {
        assert_eq!(argmax(&[1.0, 3.0, f64::NAN, 3.0]), Some(1));
        assert_eq!(argmax(&[f64::NAN]), None);
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_near_surface_wind() {
        let u = Field::from_vec(vec![3.0, 6.0], &[2, 1, 1], Units::MetersPerSecond).unwrap();
        let v = Field::from_vec(vec![4.0, 8.0], &[2, 1, 1], Units::MetersPerSecond).unwrap();
        let z = Field::from_vec(vec![0.0, 20.0], &[2, 1, 1], Units::Meters).unwrap();
        let w = near_surface_wind(&u, &v, &z, 10.0).unwrap();
        assert_eq!(w.shape(), &[1, 1]);
        assert!((w.as_slice()[0] - 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_attribute_table() {
        let grid = grid();
        let tc = TcEvent::new("01L", 15.0, 280.0);
        let msi = compute_msi(&vortex(&grid, 30.0, 0.0), &grid, &tc, &options()).unwrap();
        let table = msi.summary.attribute_table(&tc).to_string();
        assert!(table.contains("TC 01L"));
        assert!(table.contains("Wavenumber 0 intensity"));
    }
}
