//! # Per-body flux kernels
//!
//! A [`BodyFluxKernel`] is the numerical core that turns a body's rotational phase and an
//! optional occultor disk into a row of its flux design matrix. The system assembler only relies
//! on this contract; any evaluator (analytic, tabulated, GPU-backed …) can be plugged in.
//!
//! ## Contract
//!
//! - Inputs are expressed in the frame of the **occulted** body: the body is a unit disk centred
//!   on the origin, `z` points towards the observer, and the occultor has radius `ro` in units
//!   of the body's radius.
//! - [`BodyFluxKernel::design_matrix`] returns a `theta.len() × n_columns()` matrix. Row `k` maps
//!   the body's coefficient vector to its flux at the `k`-th phase.
//! - Without an occultor (or with `ro == 0`) the row is the rotational phase curve.
//!
//! ## Provided kernels
//!
//! * [`LimbDarkenedKernel`] – radially symmetric, limb-darkened disk (one column).
//! * [`SphericalHarmonicKernel`] – rotating spherical-harmonic surface map.

pub mod limb_darkened;
pub mod spherical_harmonic;

use std::fmt;

use nalgebra::{DMatrix, DVector};

use crate::{constants::Radian, syzygy_errors::SyzygyError};

pub use limb_darkened::LimbDarkenedKernel;
pub use spherical_harmonic::SphericalHarmonicKernel;

/// Orientation of a body's spin axis on the sky.
///
/// * `inc`: inclination of the spin axis relative to the line of sight (π/2 = equator-on).
/// * `obl`: obliquity, the rotation of the spin axis in the sky plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub inc: Radian,
    pub obl: Radian,
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation {
            inc: std::f64::consts::FRAC_PI_2,
            obl: 0.0,
        }
    }
}

/// Path of an occultor disk across the occulted body, one entry per phase.
#[derive(Debug, Clone, PartialEq)]
pub struct OccultorTrack {
    pub xo: DVector<f64>,
    pub yo: DVector<f64>,
    pub zo: DVector<f64>,
    pub ro: f64,
}

impl OccultorTrack {
    pub fn len(&self) -> usize {
        self.xo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xo.is_empty()
    }

    /// Sky-projected separation between the occultor and the body centre at index `k`.
    pub fn impact_parameter(&self, k: usize) -> f64 {
        self.xo[k].hypot(self.yo[k])
    }

    /// Whether the occultor covers part of the body at index `k`.
    ///
    /// Written as the negation of the "no occultation" test, so a non-finite position is
    /// treated as an occultation rather than silently skipped.
    pub fn overlaps(&self, k: usize) -> bool {
        !(self.impact_parameter(k) >= 1.0 + self.ro || self.zo[k] <= 0.0 || self.ro == 0.0)
    }

    /// Track restricted to the given time indices, in the given order.
    pub fn select(&self, idx: &[usize]) -> OccultorTrack {
        OccultorTrack {
            xo: DVector::from_iterator(idx.len(), idx.iter().map(|&k| self.xo[k])),
            yo: DVector::from_iterator(idx.len(), idx.iter().map(|&k| self.yo[k])),
            zo: DVector::from_iterator(idx.len(), idx.iter().map(|&k| self.zo[k])),
            ro: self.ro,
        }
    }
}

/// Flux design-matrix evaluator of a single body.
pub trait BodyFluxKernel: fmt::Debug + Send + Sync {
    /// Number of coefficients of the body's map, i.e. columns of its design matrix.
    fn n_columns(&self) -> usize;

    /// The body's map coefficient vector (length [`n_columns`](BodyFluxKernel::n_columns)).
    fn coefficients(&self) -> DVector<f64>;

    /// Check the kernel's parameters; called whenever the owning system is validated.
    fn validate(&self) -> Result<(), SyzygyError> {
        Ok(())
    }

    /// Flux design matrix at the phases `theta`.
    ///
    /// Arguments
    /// ---------
    /// * `theta`: rotational phases (radians).
    /// * `occultor`: optional occultor track, same length as `theta`.
    /// * `orientation`: spin-axis orientation of the body.
    ///
    /// Return
    /// ------
    /// * A `theta.len() × n_columns()` matrix, or [`SyzygyError::DimensionMismatch`] when the
    ///   occultor track and the phases disagree in length.
    fn design_matrix(
        &self,
        theta: &[Radian],
        occultor: Option<&OccultorTrack>,
        orientation: &Orientation,
    ) -> Result<DMatrix<f64>, SyzygyError>;
}

/// Shared input check of the provided kernels.
pub(crate) fn check_track(theta: &[Radian], occultor: Option<&OccultorTrack>) -> Result<(), SyzygyError> {
    match occultor {
        Some(track) if track.len() != theta.len() => Err(SyzygyError::DimensionMismatch {
            expected: theta.len(),
            found: track.len(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod kernel_test {
    use super::*;

    #[test]
    fn test_track_overlap_rules() {
        let track = OccultorTrack {
            xo: DVector::from_vec(vec![0.0, 1.05, 1.2, 0.0]),
            yo: DVector::from_vec(vec![0.0, 0.0, 0.0, 0.0]),
            zo: DVector::from_vec(vec![1.0, 1.0, 1.0, -1.0]),
            ro: 0.1,
        };
        assert!(track.overlaps(0));
        assert!(track.overlaps(1));
        assert!(!track.overlaps(2));
        assert!(!track.overlaps(3));
    }

    #[test]
    fn test_check_track_length() {
        let track = OccultorTrack {
            xo: DVector::zeros(2),
            yo: DVector::zeros(2),
            zo: DVector::zeros(2),
            ro: 0.1,
        };
        assert_eq!(
            check_track(&[0.0; 3], Some(&track)),
            Err(SyzygyError::DimensionMismatch {
                expected: 3,
                found: 2
            })
        );
        assert!(check_track(&[0.0; 2], Some(&track)).is_ok());
        assert!(check_track(&[0.0; 3], None).is_ok());
    }
}
