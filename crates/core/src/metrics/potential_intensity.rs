//! Bister and Emanuel (2002) potential intensity
//!
//! Emanuel's `pcmin` as packaged by Gifford (2020): the minimum central
//! pressure is iterated from the CAPE of the environmental parcel, of a
//! parcel at the radius of maximum winds lifted from the current central
//! pressure, and of a saturated parcel at SST. The maximum wind follows
//! from the final CAPE difference and the outflow temperature.
//!
//! Each column is independent; the gridded driver runs them in parallel.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::PotentialIntensityOptions;
use crate::core_types::{Field, Units};
use crate::derived::thermo::{
    density_temperature, latent_heat, mixing_ratio, saturation_vapor_pressure, vapor_pressure, CL, CPD, EPS, RD,
    RV, T0,
};
use crate::error::PotentialIntensityError;

/// First guess for the central pressure (hPa)
const PM_FIRST_GUESS: f64 = 970.0;
/// Central pressure convergence threshold (hPa)
const PM_TOLERANCE: f64 = 0.5;
const MAX_PM_ITERATIONS: usize = 200;
/// Iteration is abandoned once the central pressure falls below this (hPa)
const PM_FLOOR: f64 = 400.0;
/// Fraction of the CAPE difference used for the central pressure estimate
const CATFAC: f64 = 0.75;
/// Below this SST (°C) no potential intensity is computed
const SST_MIN: f64 = 5.0;
const MAX_PARCEL_ITERATIONS: usize = 500;

/// Outcome of a column computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PiStatus {
    Ok,
    /// The central pressure or a parcel temperature failed to converge
    NoConvergence,
    /// Missing values, too few levels, or SST too cold
    InvalidInput,
    /// Surface height above `zmax`
    Skipped,
}

/// Potential intensity of one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PiColumn {
    /// Maximum sustained wind (m/s)
    pub vmax: f64,
    /// Minimum central pressure (hPa)
    pub pmin: f64,
    /// Outflow temperature (K)
    pub tout: f64,
    /// Outflow pressure (hPa)
    pub pout: f64,
    pub status: PiStatus,
}

impl PiColumn {
    fn missing(status: PiStatus) -> Self {
        Self {
            vmax: f64::NAN,
            pmin: f64::NAN,
            tout: f64::NAN,
            pout: f64::NAN,
            status,
        }
    }
}

/// A thermodynamic profile ordered from the surface upward
#[derive(Debug, Clone)]
pub struct Sounding {
    /// Pressure (hPa), decreasing
    pressure: Vec<f64>,
    /// Temperature (K)
    temperature: Vec<f64>,
    /// Mixing ratio (kg/kg)
    mixing_ratio: Vec<f64>,
}

impl Sounding {
    /// Build from pressure (hPa), temperature (°C), and mixing ratio
    /// (kg/kg)
    ///
    /// Levels with any missing value are dropped; a profile given top-down
    /// is reversed.
    pub fn new(pressure: &[f64], temperature_c: &[f64], mixing_ratio: &[f64]) -> Result<Self, PotentialIntensityError> {
        if pressure.len() != temperature_c.len() || pressure.len() != mixing_ratio.len() {
            return Err(PotentialIntensityError::ProfileMismatch {
                pressure: pressure.len(),
                temperature: temperature_c.len(),
                mixing_ratio: mixing_ratio.len(),
            });
        }
        if pressure.is_empty() {
            return Err(PotentialIntensityError::EmptyProfile);
        }

        let mut levels: Vec<(f64, f64, f64)> = pressure
            .iter()
            .zip(temperature_c)
            .zip(mixing_ratio)
            .filter(|((p, t), r)| p.is_finite() && t.is_finite() && r.is_finite())
            .map(|((&p, &t), &r)| (p, t + T0, r))
            .collect();
        if levels.len() > 1 && levels[0].0 < levels[levels.len() - 1].0 {
            levels.reverse();
        }

        Ok(Self {
            pressure: levels.iter().map(|l| l.0).collect(),
            temperature: levels.iter().map(|l| l.1).collect(),
            mixing_ratio: levels.iter().map(|l| l.2).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.pressure.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pressure.is_empty()
    }
}

/// Parcel buoyancy integral
#[derive(Debug, Clone, Copy)]
struct Cape {
    /// Convective available potential energy (J/kg)
    value: f64,
    /// Temperature at the level of neutral buoyancy (K)
    t_out: f64,
    /// Pressure at the level of neutral buoyancy (hPa)
    p_out: f64,
}

/// CAPE of a parcel with temperature `tp` (K), mixing ratio `rp`, at
/// pressure `pp` (hPa); `None` if the moist-adiabat iteration fails
fn parcel_cape(tp: f64, rp: f64, pp: f64, env: &Sounding, ascent_flag: f64, ptop: f64) -> Option<Cape> {
    let (p, t, r) = (&env.pressure, &env.temperature, &env.mixing_ratio);
    let n = p.iter().take_while(|&&x| x >= ptop).count();
    let stable = Cape {
        value: 0.0,
        t_out: t[0],
        p_out: p[0],
    };

    // Parcel entropy and lifted condensation level
    let tpc = tp - T0;
    let evp = vapor_pressure(rp, pp);
    let rh = (evp / saturation_vapor_pressure(tpc)).min(1.0);
    let alv = latent_heat(tpc);
    let humidity_term = if rp > 0.0 { rp * RV * rh.ln() } else { 0.0 };
    let s = (CPD + rp * CL) * tp.ln() - RD * (pp - evp).ln() + alv * rp / tp - humidity_term;
    let chi = tp / (1669.0 - 122.0 * rh - tp);
    let plcl = pp * rh.powf(chi);

    let Some(jmin) = (0..n).find(|&j| p[j] <= pp) else {
        return Some(stable);
    };

    // Density temperature difference between parcel and environment
    let mut tv = vec![0.0; n];
    for j in jmin..n {
        let env_trho = density_temperature(t[j], r[j], r[j]);
        if p[j] >= plcl {
            let tg = tp * (p[j] / pp).powf(RD / CPD);
            tv[j] = density_temperature(tg, rp, rp) - env_trho;
            continue;
        }

        // Saturated: solve for the temperature conserving parcel entropy
        let mut tg_new = t[j];
        let mut tg = 0.0;
        let mut rg = 0.0;
        let mut iterations = 0;
        while (tg_new - tg).abs() > 0.001 {
            tg = tg_new;
            let tc = tg - T0;
            let e_new = saturation_vapor_pressure(tc);
            rg = mixing_ratio(e_new, p[j]);
            iterations += 1;
            let alv = latent_heat(tc);
            let sl = (CPD + rp * CL + alv * alv * rg / (RV * tg * tg)) / tg;
            let em = vapor_pressure(rg, p[j]);
            let sg = (CPD + rp * CL) * tg.ln() - RD * (p[j] - em).ln() + alv * rg / tg;
            let relax = if iterations < 3 { 0.3 } else { 1.0 };
            tg_new = tg + relax * (s - sg) / sl;
            if iterations > MAX_PARCEL_ITERATIONS || e_new > p[j] - 1.0 {
                return None;
            }
        }
        let r_mean = ascent_flag * rg + (1.0 - ascent_flag) * rp;
        tv[j] = density_temperature(tg, r_mean, rg) - env_trho;
    }

    // Highest positively buoyant level
    let Some(inb) = (jmin + 1..n).rev().find(|&j| tv[j] > 0.0) else {
        return Some(stable);
    };

    let (mut positive, mut negative) = (0.0, 0.0);
    for j in jmin + 1..=inb {
        let pf = RD * (tv[j] + tv[j - 1]) * (p[j - 1] - p[j]) / (p[j] + p[j - 1]);
        positive += pf.max(0.0);
        negative -= pf.min(0.0);
    }
    let pf = RD * (pp - p[jmin]) / (pp + p[jmin]);
    positive += pf * tv[jmin].max(0.0);
    negative -= pf * tv[jmin].min(0.0);

    // Residual area above the last buoyant level
    let (mut area_top, mut t_out, mut p_out) = (0.0, t[inb], p[inb]);
    if inb + 1 < n {
        let p_inb = (p[inb + 1] * tv[inb] - p[inb] * tv[inb + 1]) / (tv[inb] - tv[inb + 1]);
        area_top = RD * tv[inb] * (p[inb] - p_inb) / (p[inb] + p_inb);
        t_out = (t[inb] * (p_inb - p[inb + 1]) + t[inb + 1] * (p[inb] - p_inb)) / (p[inb] - p[inb + 1]);
        p_out = p_inb;
    }

    Some(Cape {
        value: (positive + area_top - negative).max(0.0),
        t_out,
        p_out,
    })
}

/// Potential intensity for one column
///
/// `sst_c` in °C, `msl` in hPa. Physically invalid columns come back as
/// `NaN` with a status rather than an error.
pub fn potential_intensity_column(sst_c: f64, msl: f64, env: &Sounding, opts: &PotentialIntensityOptions) -> PiColumn {
    if !sst_c.is_finite() || !msl.is_finite() || env.len() < 2 || sst_c <= SST_MIN {
        return PiColumn::missing(PiStatus::InvalidInput);
    }
    let (ck_cd, af, ptop) = (opts.ck_cd, opts.ascent_flag, *opts.ptop);
    let sst_k = sst_c + T0;
    let es0 = saturation_vapor_pressure(sst_c);
    let (t0, r0, p0) = (env.temperature[0], env.mixing_ratio[0], env.pressure[0]);

    let Some(cape_env) = parcel_cape(t0, r0, p0, env, af, ptop) else {
        return PiColumn::missing(PiStatus::NoConvergence);
    };

    let mut pm = PM_FIRST_GUESS;
    let mut iterations = 0;
    let (cape_rmw, cape_sat, ratio, tv_mean) = loop {
        // Boundary-layer parcel at the radius of maximum winds
        let pp = pm.min(1000.0);
        let rp = EPS * r0 * msl / (pp * (EPS + r0) - r0 * msl);
        let Some(cape_rmw) = parcel_cape(t0, rp, pp, env, af, ptop) else {
            return PiColumn::missing(PiStatus::NoConvergence);
        };

        // Saturated parcel at SST
        let rp = mixing_ratio(es0, pp);
        let Some(cape_sat) = parcel_cape(sst_k, rp, pp, env, af, ptop) else {
            return PiColumn::missing(PiStatus::NoConvergence);
        };

        let ratio = if opts.dissipative_heating { sst_k / cape_sat.t_out } else { 1.0 };
        let tv_mean = 0.5 * (density_temperature(t0, r0, r0) + density_temperature(sst_k, rp, rp));
        let cat = ((cape_rmw.value - cape_env.value) + 0.5 * ck_cd * ratio * (cape_sat.value - cape_rmw.value)).max(0.0);
        let pm_new = msl * (-cat / (RD * tv_mean)).exp();
        let pm_old = pm;
        pm = pm_new;
        iterations += 1;
        if iterations > MAX_PM_ITERATIONS || pm < PM_FLOOR {
            debug!("Central pressure did not converge after {iterations} iterations (pm = {pm:.1} hPa).");
            return PiColumn::missing(PiStatus::NoConvergence);
        }
        if (pm_new - pm_old).abs() <= PM_TOLERANCE {
            break (cape_rmw, cape_sat, ratio, tv_mean);
        }
    };

    let cat = ((cape_rmw.value - cape_env.value) + ck_cd * ratio * CATFAC * (cape_sat.value - cape_rmw.value)).max(0.0);
    PiColumn {
        vmax: opts.v_reduc * (ck_cd * ratio * (cape_sat.value - cape_rmw.value).max(0.0)).sqrt(),
        pmin: msl * (-cat / (RD * tv_mean)).exp(),
        tout: cape_sat.t_out,
        pout: cape_sat.p_out,
        status: PiStatus::Ok,
    }
}

/// Gridded inputs for [`compute_potential_intensity`]
#[derive(Debug, Clone, Copy)]
pub struct PiInputs<'a> {
    /// Sea-surface temperature `[lat, lon]`
    pub sst: &'a Field,
    /// Sea-level pressure `[lat, lon]`
    pub sea_level_pressure: &'a Field,
    /// Pressure `[level, lat, lon]`
    pub pressure: &'a Field,
    /// Temperature `[level, lat, lon]`
    pub temperature: &'a Field,
    /// Water vapor mixing ratio `[level, lat, lon]`
    pub mixing_ratio: &'a Field,
    /// Surface height `[lat, lon]`
    pub surface_height: &'a Field,
}

/// Gridded potential intensity
#[derive(Debug, Clone, Serialize)]
pub struct PotentialIntensity {
    pub vmax: Field,
    pub pmin: Field,
    pub tout: Field,
    pub pout: Field,
    /// Per-column status, row-major like the fields
    pub status: Vec<PiStatus>,
}

impl PotentialIntensity {
    pub fn count(&self, status: PiStatus) -> usize {
        self.status.iter().filter(|&&s| s == status).count()
    }
}

fn check_shape(name: &'static str, field: &Field, expected: &[usize]) -> Result<(), PotentialIntensityError> {
    if field.shape() == expected {
        Ok(())
    } else {
        Err(PotentialIntensityError::ShapeMismatch {
            name,
            shape: field.shape().to_vec(),
            expected: expected.to_vec(),
        })
    }
}

/// Potential intensity at every grid column
///
/// Columns whose surface height exceeds `zmax` are skipped (`NaN`).
pub fn compute_potential_intensity(
    inputs: &PiInputs<'_>,
    opts: &PotentialIntensityOptions,
) -> Result<PotentialIntensity, PotentialIntensityError> {
    let profile_shape = inputs.temperature.shape().to_vec();
    let (nlev, ny, nx) = inputs
        .temperature
        .dims3()
        .map_err(|_| PotentialIntensityError::ShapeMismatch {
            name: "temperature",
            shape: profile_shape.clone(),
            expected: vec![0, 0, 0],
        })?;
    if nlev == 0 {
        return Err(PotentialIntensityError::EmptyProfile);
    }
    check_shape("pressure", inputs.pressure, &profile_shape)?;
    check_shape("mixing_ratio", inputs.mixing_ratio, &profile_shape)?;
    for (name, field) in [
        ("sst", inputs.sst),
        ("sea_level_pressure", inputs.sea_level_pressure),
        ("surface_height", inputs.surface_height),
    ] {
        check_shape(name, field, &[ny, nx])?;
    }

    info!("Computing potential intensity for {} columns.", ny * nx);
    let ncol = ny * nx;
    let sst = inputs.sst.convert(Units::Celsius)?;
    let msl = inputs.sea_level_pressure.convert(Units::Hectopascals)?;
    let pres = inputs.pressure.convert(Units::Hectopascals)?;
    let temp = inputs.temperature.convert(Units::Celsius)?;
    let (sst, msl, pres, temp) = (sst.as_slice(), msl.as_slice(), pres.as_slice(), temp.as_slice());
    let mxrt = inputs.mixing_ratio.as_slice();
    let zsfc = inputs.surface_height.as_slice();

    let columns: Vec<PiColumn> = (0..ncol)
        .into_par_iter()
        .map(|col| -> Result<PiColumn, PotentialIntensityError> {
            if zsfc[col] > *opts.zmax {
                return Ok(PiColumn::missing(PiStatus::Skipped));
            }
            let gather = |values: &[f64]| -> Vec<f64> { (0..nlev).map(|k| values[k * ncol + col]).collect() };
            let sounding = Sounding::new(&gather(pres), &gather(temp), &gather(mxrt))?;
            Ok(potential_intensity_column(sst[col], msl[col], &sounding, opts))
        })
        .collect::<Result<_, _>>()?;

    let shape = [ny, nx];
    let field = |f: fn(&PiColumn) -> f64, units: Units, name: &str, description: &str| {
        Field::from_parts(columns.iter().map(f).collect(), &shape, units).with_meta(name, description)
    };
    Ok(PotentialIntensity {
        vmax: field(|c| c.vmax, Units::MetersPerSecond, "vmax", "Potential intensity maximum wind"),
        pmin: field(|c| c.pmin, Units::Hectopascals, "pmin", "Potential intensity minimum pressure"),
        tout: field(|c| c.tout, Units::Kelvin, "tout", "Outflow temperature"),
        pout: field(|c| c.pout, Units::Hectopascals, "pout", "Outflow pressure"),
        status: columns.iter().map(|c| c.status).collect(),
    })
}
