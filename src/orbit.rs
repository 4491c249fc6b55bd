//! # Orbital positions of the secondaries
//!
//! The light-curve engine needs, at every requested time, the sky-projected position of each
//! secondary relative to the primary. This module defines the [`OrbitProvider`] seam through
//! which those positions are obtained, and [`KeplerianOrbit`], a two-body reference provider.
//!
//! ## Frame and units
//!
//! - `x`, `y`: sky plane, `z`: **towards the observer** (a body with `z > 0` is in front).
//! - All coordinates in **solar radii**, times in **days**.
//! - Positions are those of the secondary **minus** the primary. The position of secondary `j`
//!   seen from secondary `i` is the difference of their primary-relative positions.
//!
//! ## Orbit sizing
//!
//! Orbits are usually given by their period. When the period field is exactly zero the orbit is
//! sized from the secondary's semi-major axis instead, through Kepler's third law
//! ([`period_from_semi_major_axis`]).
//!
//! ## Light travel time
//!
//! A provider may model the light travel time across the system. Providers that cannot must
//! answer [`SyzygyError::LightDelayUnsupported`]; callers then fall back to geometric positions.

use std::{f64::consts::PI, fmt};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{Day, Radian, SolarMass, SolarRadius, G_GRAV, VLIGHT_RSUN_DAY},
    kepler::{mean_anomaly_at_transit, solve_kepler_equation, true_from_eccentric_anomaly},
    syzygy_errors::SyzygyError,
};

/// Keplerian elements of a secondary around the primary.
///
/// Units
/// -----
/// * `porb`: days (0 means "use `a`").
/// * `a`: solar radii, only read when `porb == 0`.
/// * `t0`: days, time of mid-transit.
/// * `ecc`: unitless, `0 ≤ ecc < 1`.
/// * `w`, `omega`, `iorb`: radians (ω, Ω, i).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitalElements {
    pub porb: Day,
    pub a: Option<SolarRadius>,
    pub t0: Day,
    pub ecc: f64,
    pub w: Radian,
    pub omega: Radian,
    pub iorb: Radian,
}

impl Default for OrbitalElements {
    fn default() -> Self {
        OrbitalElements {
            porb: 1.0,
            a: None,
            t0: 0.0,
            ecc: 0.0,
            w: std::f64::consts::FRAC_PI_2,
            omega: 0.0,
            iorb: std::f64::consts::FRAC_PI_2,
        }
    }
}

impl OrbitalElements {
    /// Orbital period, derived from the semi-major axis when `porb` is zero.
    ///
    /// Arguments
    /// ---------
    /// * `m_total`: primary + secondary mass (M☉).
    ///
    /// Return
    /// ------
    /// * The period in days, or [`SyzygyError::InvalidConfiguration`] when `porb == 0` and no
    ///   positive semi-major axis is available.
    pub fn resolved_period(&self, m_total: SolarMass) -> Result<Day, SyzygyError> {
        if self.porb != 0.0 {
            return Ok(self.porb);
        }
        match self.a {
            Some(a) if a > 0.0 => Ok(period_from_semi_major_axis(a, m_total)),
            _ => Err(SyzygyError::InvalidConfiguration(
                "orbital period is zero and no semi-major axis was given".into(),
            )),
        }
    }

    /// Check that the elements describe a bound orbit.
    ///
    /// Arguments
    /// ---------
    /// * `m_total`: primary + secondary mass (M☉).
    ///
    /// Return
    /// ------
    /// * The resolved orbital period (days), or [`SyzygyError::InvalidConfiguration`] for a
    ///   non-positive total mass, an eccentricity outside `[0, 1)` or a non-positive period.
    pub fn validate(&self, m_total: SolarMass) -> Result<Day, SyzygyError> {
        if !(m_total > 0.0) {
            return Err(SyzygyError::InvalidConfiguration(
                "an orbit needs a positive total mass".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.ecc) {
            return Err(SyzygyError::InvalidConfiguration(format!(
                "eccentricity must be in [0, 1), got {}",
                self.ecc
            )));
        }
        let period = self.resolved_period(m_total)?;
        if !(period > 0.0) {
            return Err(SyzygyError::InvalidConfiguration(format!(
                "orbital period must be positive, got {period}"
            )));
        }
        Ok(period)
    }
}

/// Kepler's third law: `a = (G M P² / 4π²)^(1/3)`.
pub fn semi_major_axis_from_period(period: Day, m_total: SolarMass) -> SolarRadius {
    (G_GRAV * m_total * period.powi(2) / (4.0 * PI * PI)).cbrt()
}

/// Kepler's third law: `P = sqrt(4π² a³ / (G M))`.
pub fn period_from_semi_major_axis(a: SolarRadius, m_total: SolarMass) -> Day {
    (4.0 * PI * PI * a.powi(3) / (G_GRAV * m_total)).sqrt()
}

/// A secondary as seen by an orbit provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitingBody {
    pub elements: OrbitalElements,
    pub mass: SolarMass,
}

/// Everything an [`OrbitProvider`] needs to place the secondaries.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitInputs {
    pub m_primary: SolarMass,
    pub bodies: Vec<OrbitingBody>,
}

/// Time-major relative positions: entry `(k, i)` is secondary `i` at time `t[k]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelativePositions {
    pub x: DMatrix<f64>,
    pub y: DMatrix<f64>,
    pub z: DMatrix<f64>,
}

impl RelativePositions {
    pub fn zeros(n_times: usize, n_bodies: usize) -> Self {
        RelativePositions {
            x: DMatrix::zeros(n_times, n_bodies),
            y: DMatrix::zeros(n_times, n_bodies),
            z: DMatrix::zeros(n_times, n_bodies),
        }
    }

    pub fn n_times(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_bodies(&self) -> usize {
        self.x.ncols()
    }
}

/// Source of secondary positions relative to the primary.
pub trait OrbitProvider: fmt::Debug + Send + Sync {
    /// Positions of every secondary relative to the primary at the times `t`.
    ///
    /// Providers that cannot model light travel time must return
    /// [`SyzygyError::LightDelayUnsupported`] when `light_delay` is set.
    fn relative_positions(
        &self,
        inputs: &OrbitInputs,
        t: &[Day],
        light_delay: bool,
    ) -> Result<RelativePositions, SyzygyError>;

    /// Line-of-sight velocity `dz/dt` (R☉/day) of every secondary relative to the primary.
    fn relative_radial_velocities(
        &self,
        _inputs: &OrbitInputs,
        _t: &[Day],
    ) -> Result<DMatrix<f64>, SyzygyError> {
        Err(SyzygyError::InvalidConfiguration(
            "this orbit provider does not compute velocities".into(),
        ))
    }
}

/// Two-body Keplerian reference provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeplerianOrbit;

/// Elements of one orbit with every derived quantity precomputed.
#[derive(Debug, Clone, Copy)]
struct ResolvedOrbit {
    a: SolarRadius,
    mean_motion: f64,
    ecc: f64,
    w: Radian,
    sin_omega: f64,
    cos_omega: f64,
    sin_i: f64,
    cos_i: f64,
    t0: Day,
    m_transit: Radian,
}

impl ResolvedOrbit {
    fn new(m_primary: SolarMass, body: &OrbitingBody) -> Result<Self, SyzygyError> {
        let el = &body.elements;
        let m_total = m_primary + body.mass;
        let period = el.validate(m_total)?;

        Ok(ResolvedOrbit {
            a: semi_major_axis_from_period(period, m_total),
            mean_motion: 2.0 * PI / period,
            ecc: el.ecc,
            w: el.w,
            sin_omega: el.omega.sin(),
            cos_omega: el.omega.cos(),
            sin_i: el.iorb.sin(),
            cos_i: el.iorb.cos(),
            t0: el.t0,
            m_transit: mean_anomaly_at_transit(el.ecc, el.w),
        })
    }

    /// Argument of latitude `ω + f` and orbital radius at time `t`.
    fn latitude_and_radius(&self, t: Day) -> Result<(Radian, SolarRadius), SyzygyError> {
        let mean_anomaly = self.mean_motion * (t - self.t0) + self.m_transit;
        let e_anom = solve_kepler_equation(mean_anomaly, self.ecc)?;
        let f = true_from_eccentric_anomaly(e_anom, self.ecc);
        Ok((self.w + f, self.a * (1.0 - self.ecc * e_anom.cos())))
    }

    fn position(&self, t: Day) -> Result<[f64; 3], SyzygyError> {
        let (u, r) = self.latitude_and_radius(t)?;
        let (sin_u, cos_u) = u.sin_cos();
        Ok([
            r * (self.cos_omega * cos_u - self.sin_omega * sin_u * self.cos_i),
            r * (self.sin_omega * cos_u + self.cos_omega * sin_u * self.cos_i),
            r * sin_u * self.sin_i,
        ])
    }

    /// Position at the time the observed light left the secondary.
    ///
    /// Relative to the primary, light from a body at height `z` is emitted `z / c` later.
    fn delayed_position(&self, t: Day) -> Result<[f64; 3], SyzygyError> {
        let mut pos = self.position(t)?;
        for _ in 0..2 {
            pos = self.position(t + pos[2] / VLIGHT_RSUN_DAY)?;
        }
        Ok(pos)
    }

    fn radial_velocity(&self, t: Day) -> Result<f64, SyzygyError> {
        let (u, _) = self.latitude_and_radius(t)?;
        let amplitude = self.mean_motion * self.a * self.sin_i / (1.0 - self.ecc.powi(2)).sqrt();
        Ok(amplitude * (u.cos() + self.ecc * self.w.cos()))
    }
}

impl OrbitProvider for KeplerianOrbit {
    fn relative_positions(
        &self,
        inputs: &OrbitInputs,
        t: &[Day],
        light_delay: bool,
    ) -> Result<RelativePositions, SyzygyError> {
        let mut positions = RelativePositions::zeros(t.len(), inputs.bodies.len());

        for (i, body) in inputs.bodies.iter().enumerate() {
            let orbit = ResolvedOrbit::new(inputs.m_primary, body)?;
            for (k, &tk) in t.iter().enumerate() {
                let [x, y, z] = if light_delay {
                    orbit.delayed_position(tk)?
                } else {
                    orbit.position(tk)?
                };
                positions.x[(k, i)] = x;
                positions.y[(k, i)] = y;
                positions.z[(k, i)] = z;
            }
        }

        Ok(positions)
    }

    fn relative_radial_velocities(
        &self,
        inputs: &OrbitInputs,
        t: &[Day],
    ) -> Result<DMatrix<f64>, SyzygyError> {
        let mut vz = DMatrix::zeros(t.len(), inputs.bodies.len());
        for (i, body) in inputs.bodies.iter().enumerate() {
            let orbit = ResolvedOrbit::new(inputs.m_primary, body)?;
            for (k, &tk) in t.iter().enumerate() {
                vz[(k, i)] = orbit.radial_velocity(tk)?;
            }
        }
        Ok(vz)
    }
}
