//! Moist thermodynamics
//!
//! Constants and saturation/parcel helpers shared by the potential
//! intensity solver, plus the mixing-ratio conversion applied to analysis
//! humidity. Pressures are hPa, temperatures K unless the name says `_c`.

use crate::core_types::{Field, Units};

/// Specific heat of dry air at constant pressure (J kg⁻¹ K⁻¹)
pub const CPD: f64 = 1005.7;
/// Specific heat of water vapor at constant pressure (J kg⁻¹ K⁻¹)
pub const CPV: f64 = 1870.0;
/// Specific heat of liquid water (J kg⁻¹ K⁻¹)
pub const CL: f64 = 2500.0;
/// Gas constant for water vapor (J kg⁻¹ K⁻¹)
pub const RV: f64 = 461.5;
/// Gas constant for dry air (J kg⁻¹ K⁻¹)
pub const RD: f64 = 287.04;
/// `RD / RV`
pub const EPS: f64 = RD / RV;
/// Latent heat of vaporization at 0 °C (J kg⁻¹)
pub const ALV0: f64 = 2.501e6;
/// 0 °C in K
pub const T0: f64 = 273.15;

/// Saturation vapor pressure over water (hPa), Bolton (1980)
#[inline]
pub fn saturation_vapor_pressure(t_c: f64) -> f64 {
    6.112 * (17.67 * t_c / (243.5 + t_c)).exp()
}

/// Vapor pressure (hPa) from mixing ratio and pressure
#[inline]
pub fn vapor_pressure(r: f64, p: f64) -> f64 {
    r * p / (EPS + r)
}

/// Mixing ratio (kg/kg) from vapor pressure and pressure
#[inline]
pub fn mixing_ratio(e: f64, p: f64) -> f64 {
    EPS * e / (p - e)
}

/// Temperature-dependent latent heat of vaporization (J kg⁻¹)
#[inline]
pub fn latent_heat(t_c: f64) -> f64 {
    ALV0 + (CPV - CL) * t_c
}

/// Density temperature with total water `rt` and vapor `r`
#[inline]
pub fn density_temperature(t: f64, rt: f64, r: f64) -> f64 {
    t * (1.0 + r / EPS) / (1.0 + rt)
}

/// `q / (1 - q)`; `NaN` stays `NaN`
pub fn mixing_ratio_from_specific_humidity(q: &Field) -> Field {
    q.map(Units::KilogramsPerKilogram, |q| q / (1.0 - q))
        .with_meta("mixing_ratio", "Water vapor mixing ratio")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_saturation_vapor_pressure() {
        assert_relative_eq!(saturation_vapor_pressure(0.0), 6.112);
        // About 42.4 hPa at 30 °C
        assert_relative_eq!(saturation_vapor_pressure(30.0), 42.43, max_relative = 1e-3);
    }

    #[test]
    fn test_vapor_pressure_inverts_mixing_ratio() {
        let e = vapor_pressure(0.015, 1000.0);
        assert_relative_eq!(mixing_ratio(e, 1000.0), 0.015, max_relative = 1e-12);
    }

    #[test]
    fn test_density_temperature_dry_air() {
        assert_eq!(density_temperature(300.0, 0.0, 0.0), 300.0);
        assert!(density_temperature(300.0, 0.01, 0.01) > 300.0);
    }

    #[test]
    fn test_mixing_ratio_from_specific_humidity() {
        let q = Field::from_vec(vec![0.0, 0.02, f64::NAN], &[3], Units::KilogramsPerKilogram).unwrap();
        let r = mixing_ratio_from_specific_humidity(&q);
        assert_eq!(r.as_slice()[0], 0.0);
        assert_relative_eq!(r.as_slice()[1], 0.02 / 0.98);
        assert!(r.as_slice()[2].is_nan());
        assert_eq!(r.units(), Units::KilogramsPerKilogram);
    }
}
