//! # Rotational phases
//!
//! A [`PhaseClock`] turns a spin period, a reference epoch and a reference phase into the
//! rotational phase of a body at arbitrary times:
//!
//! ```text
//! θ(t) = 2π / prot · (t − t0) + θ0
//! ```
//!
//! A rotation period of exactly zero means the body does not rotate: the period is replaced by
//! `+∞` before the division, so `θ(t) = θ0` for every `t`.

use nalgebra::{DMatrix, DVector};

use crate::constants::{Day, Radian, DPI};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseClock {
    pub prot: Day,
    pub t0: Day,
    pub theta0: Radian,
}

impl PhaseClock {
    pub fn new(prot: Day, t0: Day, theta0: Radian) -> Self {
        PhaseClock { prot, t0, theta0 }
    }

    /// Spin period with the non-rotating convention applied (`0 → +∞`).
    fn effective_period(&self) -> f64 {
        if self.prot == 0.0 {
            f64::INFINITY
        } else {
            self.prot
        }
    }

    /// Rotational phase at a single time.
    pub fn phase_at(&self, t: Day) -> Radian {
        DPI / self.effective_period() * (t - self.t0) + self.theta0
    }

    /// Rotational phase at every time of `t`, in order.
    pub fn phases(&self, t: &[Day]) -> DVector<Radian> {
        DVector::from_iterator(t.len(), t.iter().map(|&ti| self.phase_at(ti)))
    }
}

/// Rotational phases of several bodies at once.
///
/// Return
/// ------
/// * A `clocks.len() × t.len()` matrix; row `i` holds the phases of body `i`.
pub fn phase_matrix(clocks: &[PhaseClock], t: &[Day]) -> DMatrix<Radian> {
    DMatrix::from_fn(clocks.len(), t.len(), |i, j| clocks[i].phase_at(t[j]))
}
