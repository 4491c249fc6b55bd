//! # Kepler equation and anomaly conversions
//!
//! Elliptic two-body helpers used by the reference
//! [`KeplerianOrbit`](crate::orbit::KeplerianOrbit) provider:
//!
//! - [`principal_angle`] – reduce an angle to `[0, 2π)`.
//! - [`solve_kepler_equation`] – eccentric anomaly `E` from mean anomaly `M`,
//!   solving `E − e·sin(E) = M` with Newton–Raphson (`roots` crate).
//! - [`true_from_eccentric_anomaly`] / [`eccentric_from_true_anomaly`] – anomaly conversions.
//! - [`mean_anomaly_at_transit`] – mean anomaly of the conjunction `f = π/2 − ω`.

use std::f64::consts::{FRAC_PI_2, PI};

use roots::{find_root_newton_raphson, SimpleConvergency};

use crate::{constants::DPI, syzygy_errors::SyzygyError};

/// Eccentricities below this threshold are treated as exactly circular.
const CIRCULAR_ECC: f64 = 1e-12;

/// Return the principal value of an angle in radians, in `[0, 2π)`.
pub fn principal_angle(a: f64) -> f64 {
    a.rem_euclid(DPI)
}

/// Solve Kepler's equation `E − e·sin(E) = M` for the eccentric anomaly.
///
/// Arguments
/// ---------
/// * `mean_anomaly`: mean anomaly `M` (radians, any range).
/// * `eccentricity`: orbital eccentricity, `0 ≤ e < 1`.
///
/// Return
/// ------
/// * The eccentric anomaly `E` (radians), on the same revolution as `M`.
/// * [`SyzygyError::RootFindingError`] if Newton–Raphson does not converge.
pub fn solve_kepler_equation(mean_anomaly: f64, eccentricity: f64) -> Result<f64, SyzygyError> {
    if eccentricity < CIRCULAR_ECC {
        return Ok(mean_anomaly);
    }

    // Solve on [0, 2π) and restore the revolution count afterwards
    let m = principal_angle(mean_anomaly);
    let revolutions = mean_anomaly - m;

    let f = |e_anom: f64| -> f64 { e_anom - eccentricity * e_anom.sin() - m };
    let df = |e_anom: f64| -> f64 { 1.0 - eccentricity * e_anom.cos() };

    // Danby's starting guess is robust up to high eccentricities
    let x0 = if eccentricity > 0.8 {
        PI
    } else {
        m + 0.85 * eccentricity * m.sin().signum()
    };

    let mut tol = SimpleConvergency {
        eps: f64::EPSILON * 1e2,
        max_iter: 50,
    };

    Ok(find_root_newton_raphson(x0, &f, &df, &mut tol)? + revolutions)
}

/// True anomaly from eccentric anomaly.
pub fn true_from_eccentric_anomaly(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    let half = 0.5 * eccentric_anomaly;
    2.0 * ((1.0 + eccentricity).sqrt() * half.sin()).atan2((1.0 - eccentricity).sqrt() * half.cos())
}

/// Eccentric anomaly from true anomaly.
pub fn eccentric_from_true_anomaly(true_anomaly: f64, eccentricity: f64) -> f64 {
    let half = 0.5 * true_anomaly;
    2.0 * ((1.0 - eccentricity).sqrt() * half.sin()).atan2((1.0 + eccentricity).sqrt() * half.cos())
}

/// Mean anomaly at the time of transit.
///
/// The transit (inferior conjunction, body in front of the primary) happens when the
/// argument of latitude `ω + f` equals `π/2`.
pub fn mean_anomaly_at_transit(eccentricity: f64, periastron_argument: f64) -> f64 {
    let f_transit = FRAC_PI_2 - periastron_argument;
    let e_transit = eccentric_from_true_anomaly(f_transit, eccentricity);
    e_transit - eccentricity * e_transit.sin()
}
