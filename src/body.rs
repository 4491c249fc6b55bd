//! # Bodies of a system
//!
//! A [`Body`] gathers everything the light-curve engine needs to know about one emitter: its
//! size and mass, its spin ([`PhaseClock`]), its spin-axis [`Orientation`], its surface map
//! (a [`BodyFluxKernel`]) with an [`Amplitude`], and its [`BodyKind`].
//!
//! Roles are expressed by wrapping a body: [`Primary`] is the central star, [`Secondary`] adds
//! the [`OrbitalElements`] of a companion.
//!
//! ## Body kinds
//!
//! The kind is a closed sum type rather than a set of flags, so that "oblate and reflected" can
//! not be expressed at all:
//!
//! | kind | phase curve | occultations |
//! |---|---|---|
//! | `Emitting` | kernel | kernel |
//! | `Oblate` | kernel | unsupported |
//! | `Reflected` | unsupported | unsupported |

use std::sync::Arc;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{Day, Radian, SolarMass, SolarRadius},
    kernel::{BodyFluxKernel, LimbDarkenedKernel, Orientation},
    orbit::OrbitalElements,
    phase::PhaseClock,
    syzygy_errors::{SyzygyError, UnsupportedFeature},
};

/// Which emission model a body follows.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BodyKind {
    /// Self-luminous spherical body.
    #[default]
    Emitting,
    /// Self-luminous body flattened at the poles; `oblateness = 1 − R_polar / R_equatorial`.
    Oblate { oblateness: f64 },
    /// Body seen in light reflected from the primary.
    Reflected,
}

/// Overall scale of a surface map, either grey or one value per wavelength bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amplitude {
    Scalar(f64),
    Spectral(Vec<f64>),
}

impl Default for Amplitude {
    fn default() -> Self {
        Amplitude::Scalar(1.0)
    }
}

impl Amplitude {
    /// Number of wavelength bins.
    pub fn n_bins(&self) -> usize {
        match self {
            Amplitude::Scalar(_) => 1,
            Amplitude::Spectral(values) => values.len(),
        }
    }

    pub fn values(&self) -> &[f64] {
        match self {
            Amplitude::Scalar(value) => std::slice::from_ref(value),
            Amplitude::Spectral(values) => values,
        }
    }

    /// Scale a unit-amplitude design matrix into one block per bin, side by side.
    pub fn expand(&self, unit: &DMatrix<f64>) -> DMatrix<f64> {
        let nc = unit.ncols();
        let values = self.values();
        let mut block = DMatrix::zeros(unit.nrows(), nc * values.len());
        for (w, &amp) in values.iter().enumerate() {
            block.columns_mut(w * nc, nc).copy_from(&(unit * amp));
        }
        block
    }
}

#[derive(Debug, Clone)]
pub struct Body {
    /// Radius (R☉).
    pub r: SolarRadius,
    /// Mass (M☉).
    pub m: SolarMass,
    /// Rotation period (days); zero for a non-rotating body.
    pub prot: Day,
    /// Reference time of the rotational phase (days).
    pub t0: Day,
    /// Rotational phase at `t0`.
    pub theta0: Radian,
    pub amp: Amplitude,
    /// Spin-axis inclination (π/2 = equator-on).
    pub inc: Radian,
    /// Spin-axis obliquity.
    pub obl: Radian,
    pub kind: BodyKind,
    map: Arc<dyn BodyFluxKernel>,
}

impl Body {
    /// Unit-radius, massless, non-rotating, equator-on body with the given surface map.
    pub fn new<K: BodyFluxKernel + 'static>(map: K) -> Self {
        Body {
            r: 1.0,
            m: 0.0,
            prot: 0.0,
            t0: 0.0,
            theta0: 0.0,
            amp: Amplitude::default(),
            inc: std::f64::consts::FRAC_PI_2,
            obl: 0.0,
            kind: BodyKind::Emitting,
            map: Arc::new(map),
        }
    }

    pub fn with_radius(mut self, r: SolarRadius) -> Self {
        self.r = r;
        self
    }

    pub fn with_mass(mut self, m: SolarMass) -> Self {
        self.m = m;
        self
    }

    pub fn with_rotation(mut self, prot: Day, t0: Day, theta0: Radian) -> Self {
        self.prot = prot;
        self.t0 = t0;
        self.theta0 = theta0;
        self
    }

    pub fn with_amplitude(mut self, amp: Amplitude) -> Self {
        self.amp = amp;
        self
    }

    pub fn with_orientation(mut self, inc: Radian, obl: Radian) -> Self {
        self.inc = inc;
        self.obl = obl;
        self
    }

    pub fn with_kind(mut self, kind: BodyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn map(&self) -> &dyn BodyFluxKernel {
        self.map.as_ref()
    }

    pub fn set_map<K: BodyFluxKernel + 'static>(&mut self, map: K) {
        self.map = Arc::new(map);
    }

    pub fn phase_clock(&self) -> PhaseClock {
        PhaseClock::new(self.prot, self.t0, self.theta0)
    }

    pub fn orientation(&self) -> Orientation {
        Orientation {
            inc: self.inc,
            obl: self.obl,
        }
    }

    /// Columns of this body's block in the system design matrix.
    pub fn n_columns(&self) -> usize {
        self.map.n_columns() * self.amp.n_bins()
    }

    /// Phase-curve design matrix of the body at unit amplitude.
    pub fn phase_term(&self, theta: &[Radian]) -> Result<DMatrix<f64>, SyzygyError> {
        if self.kind == BodyKind::Reflected {
            return Err(UnsupportedFeature::ReflectedLight.into());
        }
        let x = self.map.design_matrix(theta, None, &self.orientation())?;
        self.check_shape(&x, theta.len())?;
        Ok(x)
    }

    pub(crate) fn check_shape(&self, x: &DMatrix<f64>, n_rows: usize) -> Result<(), SyzygyError> {
        if x.nrows() != n_rows {
            return Err(SyzygyError::DimensionMismatch {
                expected: n_rows,
                found: x.nrows(),
            });
        }
        if x.ncols() != self.map.n_columns() {
            return Err(SyzygyError::DimensionMismatch {
                expected: self.map.n_columns(),
                found: x.ncols(),
            });
        }
        Ok(())
    }

    /// Reject physically meaningless parameters.
    ///
    /// Arguments
    /// ---------
    /// * `label`: name of the body used in the error message.
    pub fn validate(&self, label: &str) -> Result<(), SyzygyError> {
        let invalid = |what: String| Err(SyzygyError::InvalidConfiguration(format!("{label}: {what}")));

        if !(self.r >= 0.0) {
            return invalid(format!("radius must be non-negative, got {}", self.r));
        }
        if !(self.m >= 0.0) {
            return invalid(format!("mass must be non-negative, got {}", self.m));
        }
        if !(self.prot >= 0.0) {
            return invalid(format!("rotation period must be non-negative, got {}", self.prot));
        }
        if self.amp.n_bins() == 0 {
            return invalid("spectral amplitude needs at least one bin".into());
        }
        if self.amp.values().iter().any(|a| !a.is_finite()) {
            return invalid("amplitude must be finite".into());
        }
        if let BodyKind::Oblate { oblateness } = self.kind {
            if !(0.0..1.0).contains(&oblateness) {
                return invalid(format!("oblateness must be in [0, 1), got {oblateness}"));
            }
        }
        match self.map.validate() {
            Err(SyzygyError::InvalidConfiguration(what)) => invalid(what),
            other => other,
        }
    }
}

/// The central body of a system.
#[derive(Debug, Clone)]
pub struct Primary {
    pub body: Body,
}

impl Primary {
    pub fn new(body: Body) -> Self {
        Primary { body }
    }
}

impl Default for Primary {
    /// Solar-radius, solar-mass, uniform disk.
    fn default() -> Self {
        Primary::new(Body::new(LimbDarkenedKernel::uniform()).with_mass(1.0))
    }
}

/// A companion orbiting the primary.
#[derive(Debug, Clone)]
pub struct Secondary {
    pub body: Body,
    pub orbit: OrbitalElements,
}

impl Secondary {
    pub fn new(body: Body, orbit: OrbitalElements) -> Self {
        Secondary { body, orbit }
    }
}
