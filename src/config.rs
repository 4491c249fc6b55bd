//! # Declarative system configuration
//!
//! A [`SystemConfig`] describes a whole system in TOML and builds the matching [`System`].
//!
//! ```toml
//! texp = 0.0
//! light_delay = false
//!
//! [primary]
//! r = 1.0
//! m = 1.0
//! [primary.map]
//! kind = "limb_darkened"
//! u = [0.4, 0.26]
//!
//! [[secondaries]]
//! r = 0.1
//! porb = 1.0
//! amp = 0.005
//! [secondaries.map]
//! kind = "spherical_harmonic"
//! ydeg = 1
//! y = [1.0, 0.0, 0.3, 0.0]
//! ```
//!
//! Every field has a default, so only what differs from a unit-radius, massless, non-rotating,
//! equator-on, uniform body needs to be written. For a secondary, `t0` is both the reference
//! time of its rotational phase and its time of transit.

use std::path::Path;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::{
    body::{Amplitude, Body, BodyKind, Primary, Secondary},
    constants::{Day, Radian, SolarMass, SolarRadius},
    kernel::{LimbDarkenedKernel, SphericalHarmonicKernel},
    orbit::OrbitalElements,
    syzygy_errors::SyzygyError,
    system::System,
};

/// Surface map of a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapConfig {
    LimbDarkened {
        #[serde(default)]
        u: Vec<f64>,
    },
    SphericalHarmonic {
        ydeg: usize,
        /// Defaults to the uniform map.
        #[serde(default)]
        y: Option<Vec<f64>>,
        #[serde(default)]
        u: Vec<f64>,
        #[serde(default = "no_filter")]
        f: Vec<f64>,
    },
}

fn no_filter() -> Vec<f64> {
    vec![1.0]
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig::LimbDarkened { u: Vec::new() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindConfig {
    #[default]
    Emitting,
    Oblate,
    Reflected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    pub r: SolarRadius,
    pub m: SolarMass,
    pub prot: Day,
    pub t0: Day,
    pub theta0: Radian,
    pub inc: Radian,
    pub obl: Radian,
    pub amp: Amplitude,
    pub kind: KindConfig,
    /// Only read when `kind = "oblate"`.
    pub oblateness: f64,
    pub map: MapConfig,
}

impl Default for BodyConfig {
    fn default() -> Self {
        BodyConfig {
            r: 1.0,
            m: 0.0,
            prot: 0.0,
            t0: 0.0,
            theta0: 0.0,
            inc: std::f64::consts::FRAC_PI_2,
            obl: 0.0,
            amp: Amplitude::default(),
            kind: KindConfig::Emitting,
            oblateness: 0.0,
            map: MapConfig::default(),
        }
    }
}

impl BodyConfig {
    pub fn build(&self) -> Result<Body, SyzygyError> {
        let body = match &self.map {
            MapConfig::LimbDarkened { u } => Body::new(LimbDarkenedKernel::new(u.clone())),
            MapConfig::SphericalHarmonic { ydeg, y, u, f } => {
                let y = match y {
                    Some(values) => DVector::from_column_slice(values),
                    None => {
                        let mut uniform = DVector::zeros((ydeg + 1).pow(2));
                        uniform[0] = 1.0;
                        uniform
                    }
                };
                Body::new(SphericalHarmonicKernel::new(*ydeg, y, u.clone(), f.clone())?)
            }
        };

        let kind = match self.kind {
            KindConfig::Emitting => BodyKind::Emitting,
            KindConfig::Oblate => BodyKind::Oblate {
                oblateness: self.oblateness,
            },
            KindConfig::Reflected => BodyKind::Reflected,
        };

        Ok(body
            .with_radius(self.r)
            .with_mass(self.m)
            .with_rotation(self.prot, self.t0, self.theta0)
            .with_amplitude(self.amp.clone())
            .with_orientation(self.inc, self.obl)
            .with_kind(kind))
    }
}

/// A companion: body parameters plus orbital elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecondaryConfig {
    #[serde(flatten)]
    pub body: BodyConfig,
    pub porb: Day,
    /// Semi-major axis, only used when `porb` is zero.
    pub a: Option<SolarRadius>,
    pub ecc: f64,
    pub w: Radian,
    pub omega: Radian,
    pub iorb: Radian,
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        let elements = OrbitalElements::default();
        SecondaryConfig {
            body: BodyConfig::default(),
            porb: elements.porb,
            a: elements.a,
            ecc: elements.ecc,
            w: elements.w,
            omega: elements.omega,
            iorb: elements.iorb,
        }
    }
}

impl SecondaryConfig {
    pub fn elements(&self) -> OrbitalElements {
        OrbitalElements {
            porb: self.porb,
            a: self.a,
            t0: self.body.t0,
            ecc: self.ecc,
            w: self.w,
            omega: self.omega,
            iorb: self.iorb,
        }
    }

    pub fn build(&self) -> Result<Secondary, SyzygyError> {
        Ok(Secondary::new(self.body.build()?, self.elements()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub texp: Day,
    pub light_delay: bool,
    pub rv: bool,
    pub primary: BodyConfig,
    pub secondaries: Vec<SecondaryConfig>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            texp: 0.0,
            light_delay: false,
            rv: false,
            primary: BodyConfig {
                m: 1.0,
                ..Default::default()
            },
            secondaries: Vec::new(),
        }
    }
}

impl SystemConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, SyzygyError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a TOML system description from disk.
    ///
    /// Arguments
    /// ---------
    /// * `path`: path to the TOML file.
    ///
    /// Return
    /// ------
    /// * The parsed configuration, [`SyzygyError::IoError`] if the file cannot be read or
    ///   [`SyzygyError::ConfigParse`] if it is not a valid description.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SyzygyError> {
        let content = std::fs::read_to_string(path)?;
        SystemConfig::from_toml_str(&content)
    }

    /// Build and validate the described system.
    pub fn build(&self) -> Result<System, SyzygyError> {
        let secondaries = self
            .secondaries
            .iter()
            .map(SecondaryConfig::build)
            .collect::<Result<Vec<_>, _>>()?;

        System::builder(Primary::new(self.primary.build()?))
            .secondaries(secondaries)
            .texp(self.texp)
            .light_delay(self.light_delay)
            .rv(self.rv)
            .build()
    }
}

#[cfg(test)]
mod config_test {
    use super::*;
    use crate::syzygy_errors::UnsupportedFeature;
    use approx::assert_relative_eq;

    const HOT_JUPITER: &str = r#"
        light_delay = true

        [primary]
        r = 1.0
        m = 1.0
        [primary.map]
        kind = "limb_darkened"
        u = [0.4, 0.26]

        [[secondaries]]
        r = 0.1
        m = 0.001
        porb = 3.0
        t0 = 0.5
        ecc = 0.1
        amp = [0.001, 0.002]
        [secondaries.map]
        kind = "spherical_harmonic"
        ydeg = 1
        y = [1.0, 0.0, 0.3, 0.0]
    "#;

    #[test]
    fn test_parse_system() {
        let config = SystemConfig::from_toml_str(HOT_JUPITER).unwrap();
        assert!(config.light_delay);
        assert_eq!(config.texp, 0.0);
        assert_eq!(
            config.primary.map,
            MapConfig::LimbDarkened { u: vec![0.4, 0.26] }
        );

        let sec = &config.secondaries[0];
        assert_eq!(sec.body.amp, Amplitude::Spectral(vec![0.001, 0.002]));
        assert_eq!(sec.body.r, 0.1);
        assert_eq!(sec.ecc, 0.1);
        assert_relative_eq!(sec.iorb, std::f64::consts::FRAC_PI_2);

        let elements = sec.elements();
        assert_eq!(elements.t0, 0.5);
        assert_eq!(elements.porb, 3.0);
    }

    #[test]
    fn test_build_system() {
        let system = SystemConfig::from_toml_str(HOT_JUPITER)
            .unwrap()
            .build()
            .unwrap();
        assert!(system.light_delay());
        assert_eq!(system.secondaries().len(), 1);
        assert_eq!(system.secondaries()[0].body.t0, 0.5);
        assert_eq!(system.n_bins(), 2);

        let x = system.design_matrix(&[0.5, 1.25]).unwrap();
        // Primary: one column; secondary: four coefficients for each of two bins
        assert_eq!(x.shape(), (2, 9));
    }

    #[test]
    fn test_defaults() {
        let config = SystemConfig::from_toml_str("").unwrap();
        assert_eq!(config, SystemConfig::default());
        assert_eq!(config.primary.m, 1.0);
        assert!(config.build().is_ok());
    }

    #[test]
    fn test_reflected_kind_is_parsed_then_rejected() {
        let config = SystemConfig::from_toml_str(
            r#"
            [[secondaries]]
            r = 0.1
            kind = "reflected"
            "#,
        )
        .unwrap();
        assert_eq!(config.secondaries[0].body.kind, KindConfig::Reflected);
        assert_eq!(
            config.build().unwrap_err(),
            SyzygyError::Unsupported(UnsupportedFeature::ReflectedLight)
        );
    }

    #[test]
    fn test_oblate_kind() {
        let config = SystemConfig::from_toml_str(
            r#"
            [primary]
            m = 1.0
            kind = "oblate"
            oblateness = 0.1
            "#,
        )
        .unwrap();
        let system = config.build().unwrap();
        assert_eq!(
            system.primary().body.kind,
            BodyKind::Oblate { oblateness: 0.1 }
        );
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            SystemConfig::from_toml_str("texp = \"soon\""),
            Err(SyzygyError::ConfigParse(_))
        ));
        assert!(matches!(
            SystemConfig::from_toml_str("[primary.map]\nkind = \"hexagonal\""),
            Err(SyzygyError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_inconsistent_map_is_rejected() {
        let config = SystemConfig::from_toml_str(
            r#"
            [primary.map]
            kind = "spherical_harmonic"
            ydeg = 2
            y = [1.0, 0.0]
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.build(),
            Err(SyzygyError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SystemConfig::from_file("does/not/exist.toml"),
            Err(SyzygyError::IoError(_))
        ));
    }
}
