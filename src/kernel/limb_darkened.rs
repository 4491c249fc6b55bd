//! # Limb-darkened disk kernel
//!
//! Flux of a radially symmetric stellar disk with polynomial limb darkening
//!
//! ```text
//! I(μ) ∝ 1 − Σₙ uₙ (1 − μ)ⁿ,    μ = sqrt(1 − r²)
//! ```
//!
//! normalised so that the unocculted disk has unit flux. The map of such a body has a single
//! coefficient (`[1.0]`), so its design matrix is one column equal to the flux.
//!
//! A uniform disk uses the exact lens-area formula. With limb darkening the blocked flux is
//! integrated radially: the annulus of radius `r` loses the arc `2α(r)` covered by the occultor.

use std::{f64::consts::PI, sync::Arc};

use nalgebra::{DMatrix, DVector};
use once_cell::sync::OnceCell;

use super::{check_track, BodyFluxKernel, OccultorTrack, Orientation};
use crate::{
    constants::Radian,
    quadrature::{gauss_legendre, GaussLegendre},
    syzygy_errors::SyzygyError,
};

const RADIAL_NODES: usize = 128;

#[derive(Debug, Clone, Default)]
pub struct LimbDarkenedKernel {
    /// Limb-darkening coefficients `u₁, u₂, …`.
    pub u: Vec<f64>,
    rule: OnceCell<Arc<GaussLegendre>>,
}

impl PartialEq for LimbDarkenedKernel {
    fn eq(&self, other: &Self) -> bool {
        self.u == other.u
    }
}

impl LimbDarkenedKernel {
    pub fn new(u: Vec<f64>) -> Self {
        LimbDarkenedKernel {
            u,
            rule: OnceCell::new(),
        }
    }

    /// Uniform disk, no limb darkening.
    pub fn uniform() -> Self {
        LimbDarkenedKernel::new(Vec::new())
    }

    /// Reject coefficients whose disk-integrated intensity is not positive.
    pub fn validate(&self) -> Result<(), SyzygyError> {
        let total = self.total_flux();
        if !(total > 0.0) {
            return Err(SyzygyError::InvalidConfiguration(format!(
                "limb-darkening coefficients {:?} give a disk flux of {total}",
                self.u
            )));
        }
        Ok(())
    }

    fn is_uniform(&self) -> bool {
        self.u.iter().all(|&un| un == 0.0)
    }

    fn rule(&self) -> &GaussLegendre {
        self.rule.get_or_init(|| gauss_legendre(RADIAL_NODES))
    }

    /// Unnormalised intensity at radius `r` from the disk centre.
    pub fn intensity(&self, r: f64) -> f64 {
        let one_minus_mu = 1.0 - (1.0 - r * r).max(0.0).sqrt();
        let mut term = 1.0;
        let mut darkening = 0.0;
        for &un in &self.u {
            term *= one_minus_mu;
            darkening += un * term;
        }
        1.0 - darkening
    }

    /// Disk-integrated unnormalised intensity: `π − 2π Σₙ uₙ / ((n+1)(n+2))`.
    pub fn total_flux(&self) -> f64 {
        let darkening: f64 = self
            .u
            .iter()
            .enumerate()
            .map(|(i, &un)| {
                let n = (i + 1) as f64;
                un / ((n + 1.0) * (n + 2.0))
            })
            .sum();
        PI - 2.0 * PI * darkening
    }

    /// Normalised flux with an occultor of radius `ro` at impact parameter `b`.
    pub fn occulted_flux(&self, b: f64, ro: f64) -> f64 {
        if ro <= 0.0 || b >= 1.0 + ro {
            return 1.0;
        }
        if self.is_uniform() {
            1.0 - lens_area(b, ro) / PI
        } else {
            1.0 - self.blocked_flux(b, ro) / self.total_flux()
        }
    }

    /// Unnormalised flux hidden by the occultor.
    fn blocked_flux(&self, b: f64, ro: f64) -> f64 {
        let outer = (b + ro).min(1.0);
        let kink = (b - ro).abs();
        let rule = self.rule();

        let integrand = |r: f64| self.intensity(r) * 2.0 * covered_half_angle(r, b, ro) * r;

        if kink > 0.0 && kink < outer {
            rule.integrate(0.0, kink, integrand) + rule.integrate(kink, outer, integrand)
        } else {
            rule.integrate(0.0, outer, integrand)
        }
    }
}

/// Half-angle of the annulus of radius `r` lying inside an occultor of radius `ro` at `b`.
fn covered_half_angle(r: f64, b: f64, ro: f64) -> f64 {
    if r <= ro - b {
        PI
    } else if r >= b + ro || r <= b - ro {
        0.0
    } else {
        ((r * r + b * b - ro * ro) / (2.0 * r * b)).clamp(-1.0, 1.0).acos()
    }
}

/// Area of the intersection of the unit disk with a disk of radius `ro` at distance `b`.
pub fn lens_area(b: f64, ro: f64) -> f64 {
    if b >= 1.0 + ro {
        0.0
    } else if b <= ro - 1.0 {
        PI
    } else if b <= 1.0 - ro {
        PI * ro * ro
    } else {
        let kappa0 = ((ro * ro + b * b - 1.0) / (2.0 * b * ro)).clamp(-1.0, 1.0).acos();
        let kappa1 = ((1.0 - ro * ro + b * b) / (2.0 * b)).clamp(-1.0, 1.0).acos();
        let chord = (4.0 * b * b - (1.0 + b * b - ro * ro).powi(2)).max(0.0).sqrt();
        ro * ro * kappa0 + kappa1 - 0.5 * chord
    }
}

impl BodyFluxKernel for LimbDarkenedKernel {
    fn n_columns(&self) -> usize {
        1
    }

    fn coefficients(&self) -> DVector<f64> {
        DVector::from_element(1, 1.0)
    }

    fn validate(&self) -> Result<(), SyzygyError> {
        LimbDarkenedKernel::validate(self)
    }

    fn design_matrix(
        &self,
        theta: &[Radian],
        occultor: Option<&OccultorTrack>,
        _orientation: &Orientation,
    ) -> Result<DMatrix<f64>, SyzygyError> {
        check_track(theta, occultor)?;
        self.validate()?;
        Ok(match occultor {
            None => DMatrix::from_element(theta.len(), 1, 1.0),
            Some(track) => DMatrix::from_fn(theta.len(), 1, |k, _| {
                if track.overlaps(k) {
                    self.occulted_flux(track.impact_parameter(k), track.ro)
                } else {
                    1.0
                }
            }),
        })
    }
}

#[cfg(test)]
mod limb_darkened_test {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_uniform_central_transit_depth() {
        let kernel = LimbDarkenedKernel::uniform();
        assert_relative_eq!(kernel.occulted_flux(0.0, 0.1), 0.99, max_relative = 1e-14);
        assert_eq!(kernel.occulted_flux(1.2, 0.1), 1.0);
        assert_eq!(kernel.occulted_flux(0.0, 2.0), 0.0);
    }

    #[test]
    fn test_lens_area_is_continuous_at_contact() {
        let ro = 0.3;
        let inside = lens_area(1.0 - ro - 1e-9, ro);
        let partial = lens_area(1.0 - ro + 1e-9, ro);
        assert_abs_diff_eq!(inside, partial, epsilon = 1e-6);
        assert_abs_diff_eq!(lens_area(1.0 + ro - 1e-12, ro), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_radial_integration_matches_lens_area() {
        // A vanishing coefficient forces the numerical path on a uniform disk
        let kernel = LimbDarkenedKernel::new(vec![1e-300]);
        for &(b, ro) in &[(0.0, 0.1), (0.5, 0.2), (0.95, 0.1), (0.3, 1.5)] {
            let numeric = kernel.blocked_flux(b, ro);
            assert_relative_eq!(numeric, lens_area(b, ro), max_relative = 1e-4);
        }
    }

    #[test]
    fn test_total_flux_quadratic() {
        let kernel = LimbDarkenedKernel::new(vec![0.4, 0.26]);
        let rule = GaussLegendre::new(200);
        let numeric = rule.integrate(0.0, 1.0, |r| 2.0 * PI * r * kernel.intensity(r));
        assert_relative_eq!(kernel.total_flux(), numeric, max_relative = 1e-5);
    }

    #[test]
    fn test_small_planet_depth_with_linear_darkening() {
        let u1 = 0.6;
        let kernel = LimbDarkenedKernel::new(vec![u1]);
        let ro = 0.01;
        let depth = 1.0 - kernel.occulted_flux(0.0, ro);
        assert_relative_eq!(depth, ro * ro / (1.0 - u1 / 3.0), max_relative = 1e-3);
    }

    #[test]
    fn test_zero_disk_flux_is_rejected() {
        assert!(LimbDarkenedKernel::new(vec![0.4, 0.26]).validate().is_ok());

        let dark = LimbDarkenedKernel::new(vec![3.0]);
        assert_eq!(dark.total_flux(), 0.0);
        assert!(matches!(
            dark.validate(),
            Err(SyzygyError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            dark.design_matrix(&[0.0], None, &Orientation::default()),
            Err(SyzygyError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_design_matrix_shape_and_baseline() {
        let kernel = LimbDarkenedKernel::new(vec![0.4, 0.26]);
        let theta = [0.0, 1.0, 2.0];
        let phase = kernel
            .design_matrix(&theta, None, &Orientation::default())
            .unwrap();
        assert_eq!(phase.shape(), (3, 1));
        assert!(phase.iter().all(|&v| v == 1.0));

        let track = OccultorTrack {
            xo: DVector::from_vec(vec![0.0, 0.5, 3.0]),
            yo: DVector::zeros(3),
            zo: DVector::from_element(3, 10.0),
            ro: 0.1,
        };
        let occ = kernel
            .design_matrix(&theta, Some(&track), &Orientation::default())
            .unwrap();
        assert!(occ[(0, 0)] < occ[(1, 0)]);
        assert!(occ[(1, 0)] < 1.0);
        assert_eq!(occ[(2, 0)], 1.0);
    }
}
