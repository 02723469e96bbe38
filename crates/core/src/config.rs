//! Run configuration
//!
//! One optional section per metric; a metric runs only when its section is
//! present. Every section deserializes from YAML with defaults for any
//! omitted option and is checked with `validate()` before use.

use serde::{Deserialize, Serialize};

use crate::core_types::{Celsius, Degrees, Hectopascals, Meters, TcEvent};
use crate::error::ConfigError;
use crate::interp::PolarGridSpec;

fn require_positive(option: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { option, value })
    }
}

/// Top-level configuration for a diagnostics run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TcDiagsConfig {
    /// TC events, in the order they are reported
    pub tc_events: Vec<TcEvent>,

    /// Bister and Emanuel (2002) potential intensity
    pub potential_intensity: Option<PotentialIntensityOptions>,

    /// Vukicevic et al. (2014) multi-scale intensity
    pub multi_scale_intensity: Option<MsiOptions>,

    /// Velden and Leslie (1991) steering flow
    pub steering_flow: Option<SteeringFlowOptions>,

    /// Leipper and Volgenau (1972) TC heat potential
    pub heat_potential: Option<HeatPotentialOptions>,
}

impl TcDiagsConfig {
    /// Validate every configured section
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(opts) = &self.potential_intensity {
            opts.validate()?;
        }
        if let Some(opts) = &self.multi_scale_intensity {
            opts.validate()?;
        }
        if let Some(opts) = &self.steering_flow {
            opts.validate()?;
        }
        if let Some(opts) = &self.heat_potential {
            opts.validate()?;
        }
        Ok(())
    }
}

/// How the TC vortex is removed before the steering-flow partition
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum VortexRemoval {
    /// Singular-mode suppression blended through the relaxation mask
    #[default]
    Svd,
    /// Successive radial refill of each event's exclusion zone, applied
    /// after vertical interpolation
    RadialInterpolation {
        /// Radial window step (m)
        step_distance: Meters,
    },
}

/// Steering-flow (VL1991) options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SteeringFlowOptions {
    /// Radius inside which the vortex is fully removed (m)
    pub exclusion_radius: Meters,

    /// Radius beyond which the raw wind is kept (m)
    pub relax_radius: Meters,

    /// Number of leading singular modes suppressed per level
    pub n_suppress: usize,

    /// Isobaric levels for the partition (hPa)
    pub isolevels: Vec<Hectopascals>,

    pub removal: VortexRemoval,
}

impl Default for SteeringFlowOptions {
    fn default() -> Self {
        Self {
            exclusion_radius: Meters::from_km(300.0),
            relax_radius: Meters::from_km(600.0),
            n_suppress: 5,
            isolevels: [850.0, 700.0, 500.0, 300.0, 200.0]
                .into_iter()
                .map(Hectopascals::new)
                .collect(),
            removal: VortexRemoval::Svd,
        }
    }
}

impl SteeringFlowOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("exclusion_radius", *self.exclusion_radius)?;
        require_positive("relax_radius", *self.relax_radius)?;
        if self.relax_radius <= self.exclusion_radius {
            return Err(ConfigError::RadiiOrder {
                exclusion: *self.exclusion_radius,
                relax: *self.relax_radius,
            });
        }
        if self.isolevels.is_empty() {
            return Err(ConfigError::Invalid {
                option: "isolevels",
                message: "at least one isobaric level is required".to_string(),
            });
        }
        for level in &self.isolevels {
            require_positive("isolevels", **level)?;
        }
        if let VortexRemoval::RadialInterpolation { step_distance } = self.removal {
            require_positive("step_distance", *step_distance)?;
        }
        Ok(())
    }

    /// Isobaric levels as plain hPa values
    pub fn isolevels_hpa(&self) -> Vec<f64> {
        self.isolevels.iter().map(|p| **p).collect()
    }
}

/// Multi-scale intensity (VURK2014) options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MsiOptions {
    /// Outermost polar radius (m)
    pub max_radius: Meters,

    /// Polar radial spacing (m)
    pub d_radius: Meters,

    /// Polar azimuthal spacing
    pub d_azimuth: Degrees,

    /// Number of azimuthal wavenumbers to reconstruct (clipped to half the
    /// azimuth count)
    pub max_wavenumber: usize,

    /// Height of the analyzed wind (m)
    pub target_height: Meters,
}

impl Default for MsiOptions {
    fn default() -> Self {
        Self {
            max_radius: Meters::from_km(1000.0),
            d_radius: Meters::from_km(100.0),
            d_azimuth: Degrees::new(45.0),
            max_wavenumber: 3,
            target_height: Meters::new(10.0),
        }
    }
}

impl MsiOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("max_radius", *self.max_radius)?;
        require_positive("d_radius", *self.d_radius)?;
        require_positive("d_azimuth", *self.d_azimuth)?;
        if self.polar_spec().azimuths().len() < 2 {
            return Err(ConfigError::Invalid {
                option: "d_azimuth",
                message: format!("{} leaves fewer than two azimuths", self.d_azimuth),
            });
        }
        if self.max_wavenumber == 0 {
            return Err(ConfigError::Invalid {
                option: "max_wavenumber",
                message: "at least wavenumber 0 must be reconstructed".to_string(),
            });
        }
        Ok(())
    }

    pub fn polar_spec(&self) -> PolarGridSpec {
        PolarGridSpec {
            max_radius: *self.max_radius,
            d_radius: *self.d_radius,
            d_azimuth: *self.d_azimuth,
        }
    }
}

/// Potential intensity (BE2002) options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PotentialIntensityOptions {
    /// Columns with surface height above this are skipped (m)
    pub zmax: Meters,

    /// Ratio of enthalpy to momentum exchange coefficients
    pub ck_cd: f64,

    /// Gradient-to-10 m wind reduction factor
    pub v_reduc: f64,

    /// 0 for pseudo-adiabatic ascent, 1 for reversible ascent
    pub ascent_flag: f64,

    /// Include dissipative heating (SST / outflow temperature factor)
    pub dissipative_heating: bool,

    /// Highest pressure level used in the CAPE integral (hPa)
    pub ptop: Hectopascals,
}

impl Default for PotentialIntensityOptions {
    fn default() -> Self {
        Self {
            zmax: Meters::new(10.0),
            ck_cd: 0.9,
            v_reduc: 0.8,
            ascent_flag: 0.0,
            dissipative_heating: true,
            ptop: Hectopascals::new(50.0),
        }
    }
}

impl PotentialIntensityOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("ck_cd", self.ck_cd)?;
        require_positive("v_reduc", self.v_reduc)?;
        require_positive("ptop", *self.ptop)?;
        if !(0.0..=1.0).contains(&self.ascent_flag) {
            return Err(ConfigError::Invalid {
                option: "ascent_flag",
                message: format!("{} must lie in [0, 1]", self.ascent_flag),
            });
        }
        if self.zmax.is_nan() {
            return Err(ConfigError::Invalid {
                option: "zmax",
                message: "must be a number".to_string(),
            });
        }
        Ok(())
    }
}

/// TC heat potential (LV1972) options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeatPotentialOptions {
    /// Reference isotherm
    pub isotherm: Celsius,

    /// Vertical integration step (m)
    pub deltaz: Meters,

    /// Seawater reference density (kg m⁻³)
    pub reference_density: f64,

    /// Seawater specific heat (J kg⁻¹ K⁻¹)
    pub specific_heat: f64,
}

impl Default for HeatPotentialOptions {
    fn default() -> Self {
        Self {
            isotherm: Celsius::new(26.0),
            deltaz: Meters::new(1.0),
            reference_density: 1025.0,
            specific_heat: 3993.0,
        }
    }
}

impl HeatPotentialOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("deltaz", *self.deltaz)?;
        require_positive("reference_density", self.reference_density)?;
        require_positive("specific_heat", self.specific_heat)?;
        if !self.isotherm.is_finite() {
            return Err(ConfigError::Invalid {
                option: "isotherm",
                message: format!("{} is not finite", self.isotherm),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        SteeringFlowOptions::default().validate().unwrap();
        MsiOptions::default().validate().unwrap();
        PotentialIntensityOptions::default().validate().unwrap();
        HeatPotentialOptions::default().validate().unwrap();
        TcDiagsConfig::default().validate().unwrap();
    }

    #[test]
    fn test_msi_needs_two_azimuths() {
        let single = MsiOptions {
            d_azimuth: Degrees::new(360.0),
            ..MsiOptions::default()
        };
        assert!(matches!(
            single.validate(),
            Err(ConfigError::Invalid { option: "d_azimuth", .. })
        ));
        let two = MsiOptions {
            d_azimuth: Degrees::new(180.0),
            ..MsiOptions::default()
        };
        two.validate().unwrap();
    }

    #[test]
    fn test_yaml_sections_fill_defaults() {
        let yaml = r"
tc_events:
  - id: 09L
    lat: 24.5
    lon: 272.0
steering_flow:
  exclusion_radius: 200000.0
  removal:
    method: radial_interpolation
    step_distance: 50000.0
multi_scale_intensity:
  d_azimuth: 10.0
";
        let config: TcDiagsConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tc_events.len(), 1);
        assert_eq!(config.tc_events[0].id, "09L");

        let steering = config.steering_flow.as_ref().unwrap();
        assert_eq!(steering.exclusion_radius, 200_000.0);
        assert_eq!(steering.relax_radius, 600_000.0);
        assert_eq!(
            steering.removal,
            VortexRemoval::RadialInterpolation {
                step_distance: Meters::new(50_000.0)
            }
        );
        assert_eq!(steering.isolevels_hpa(), vec![850.0, 700.0, 500.0, 300.0, 200.0]);

        let msi = config.multi_scale_intensity.unwrap();
        assert_eq!(msi.d_azimuth, 10.0);
        assert_eq!(msi.max_wavenumber, 3);
        assert!(config.potential_intensity.is_none());
        assert!(config.heat_potential.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_radii_order_rejected() {
        let opts = SteeringFlowOptions {
            exclusion_radius: Meters::from_km(500.0),
            relax_radius: Meters::from_km(400.0),
            ..SteeringFlowOptions::default()
        };
        assert_eq!(
            opts.validate(),
            Err(ConfigError::RadiiOrder {
                exclusion: 500_000.0,
                relax: 400_000.0
            })
        );
    }

    #[test]
    fn test_invalid_options() {
        let msi = MsiOptions {
            d_radius: Meters::new(0.0),
            ..MsiOptions::default()
        };
        assert!(matches!(msi.validate(), Err(ConfigError::NotPositive { option: "d_radius", .. })));

        let pi = PotentialIntensityOptions {
            ascent_flag: 2.0,
            ..PotentialIntensityOptions::default()
        };
        assert!(matches!(pi.validate(), Err(ConfigError::Invalid { option: "ascent_flag", .. })));

        let steering = SteeringFlowOptions {
            isolevels: Vec::new(),
            ..SteeringFlowOptions::default()
        };
        assert!(steering.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = "steering_flow:\n  ncoeffs: 4\n";
        assert!(serde_yaml::from_str::<TcDiagsConfig>(yaml).is_err());
    }

    #[test]
    fn test_polar_spec_from_options() {
        let spec = MsiOptions::default().polar_spec();
        assert_eq!(spec.max_radius, 1_000_000.0);
        assert_eq!(spec.azimuths().len(), 8);
        assert_eq!(spec.radii().len(), 11);
    }
}
