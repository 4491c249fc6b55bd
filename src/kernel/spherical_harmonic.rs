//! # Spherical-harmonic surface map kernel
//!
//! Flux design matrix of a rotating body whose specific intensity is a truncated expansion in
//! real spherical harmonics,
//!
//! ```text
//! I(p) = L(μ) · F(p) · Σⱼ yⱼ Ỹⱼ(p) / (π · L̄)
//! ```
//!
//! with `L` the polynomial limb-darkening law, `F(p) = Σⱼ fⱼ Ỹⱼ(p)` a multiplicative filter and
//! `L̄` the mean limb-darkening factor over the disk. The harmonics are scaled (`Ỹ = 2√π Y`) so
//! that `Ỹ₀₀ = 1` and a map with `y = [1, 0, …]` has unit disk-integrated flux.
//!
//! Columns are ordered by degree then order: `(0,0), (1,−1), (1,0), (1,1), (2,−2), …`.
//!
//! ## Geometry
//!
//! In the body frame the spin axis is `+y`. A body-frame point `b` is seen on the sky at
//!
//! ```text
//! s = R_z(obl) · R_x(π/2 − inc) · R_y(θ) · b
//! ```
//!
//! so at `θ = 0`, `inc = π/2`, `obl = 0` longitude zero faces the observer.
//!
//! ## Quadrature
//!
//! Disk integrals use polar grids: Gauss–Legendre in radius, midpoint rule in azimuth. The
//! occulted flux is the phase-curve flux minus the integral over the part of the occultor that
//! overlaps the disk. That region is swept by rays from the centre of the smaller of the two
//! disks and each ray is clipped analytically by the larger one.

use std::{f64::consts::PI, sync::Arc};

use nalgebra::{DMatrix, DVector, Rotation3, Vector3};
use once_cell::sync::OnceCell;

use super::{check_track, limb_darkened::LimbDarkenedKernel, BodyFluxKernel, OccultorTrack, Orientation};
use crate::{
    constants::{Radian, DPI},
    quadrature::{gauss_legendre, GaussLegendre},
    syzygy_errors::SyzygyError,
};

/// Radial × azimuthal nodes of the full-disk grid.
const DISK_NODES: (usize, usize) = (48, 96);

/// Radial × azimuthal nodes of the occulted-region grid.
const REGION_NODES: (usize, usize) = (32, 64);

#[derive(Debug, Clone, Copy)]
struct QuadPoint {
    x: f64,
    y: f64,
    w: f64,
}

/// Precomputed full-disk grid with limb-darkening weights folded in.
#[derive(Debug, Clone)]
struct DiskGrid {
    points: Vec<QuadPoint>,
    /// `π · L̄`, the normalisation of the limb-darkened intensity.
    norm: f64,
}

#[derive(Debug, Clone)]
pub struct SphericalHarmonicKernel {
    ydeg: usize,
    y: DVector<f64>,
    limb_darkening: LimbDarkenedKernel,
    f: Vec<f64>,
    lmax: usize,
    ylm_norm: Vec<f64>,
    grid: OnceCell<Arc<DiskGrid>>,
}

impl SphericalHarmonicKernel {
    /// Build a kernel for a degree-`ydeg` map.
    ///
    /// Arguments
    /// ---------
    /// * `ydeg`: maximum spherical-harmonic degree.
    /// * `y`: map coefficients, `(ydeg+1)²` values; `y[0]` must be `1` (the overall scale is
    ///   carried by the body's amplitude).
    /// * `u`: limb-darkening coefficients (may be empty).
    /// * `f`: filter coefficients in the same harmonic basis; a perfect-square length, `[1.0]`
    ///   for no filter.
    ///
    /// Return
    /// ------
    /// * The kernel, or [`SyzygyError::InvalidConfiguration`] on inconsistent coefficient vectors.
    pub fn new(ydeg: usize, y: DVector<f64>, u: Vec<f64>, f: Vec<f64>) -> Result<Self, SyzygyError> {
        let n_y = (ydeg + 1).pow(2);
        if y.len() != n_y {
            return Err(SyzygyError::InvalidConfiguration(format!(
                "a degree {ydeg} map needs {n_y} coefficients, got {}",
                y.len()
            )));
        }
        if y[0] != 1.0 {
            return Err(SyzygyError::InvalidConfiguration(
                "the Y_{0,0} coefficient is fixed to 1; scale the map with its amplitude".into(),
            ));
        }
        let n_f = (f.len() as f64).sqrt().round() as usize;
        if n_f == 0 || n_f * n_f != f.len() {
            return Err(SyzygyError::InvalidConfiguration(format!(
                "filter length {} is not a perfect square",
                f.len()
            )));
        }
        let lmax = ydeg.max(n_f - 1);
        let limb_darkening = LimbDarkenedKernel::new(u);
        limb_darkening.validate()?;

        Ok(SphericalHarmonicKernel {
            ydeg,
            y,
            limb_darkening,
            f,
            lmax,
            ylm_norm: ylm_normalisation(lmax),
            grid: OnceCell::new(),
        })
    }

    /// Map with only the uniform `Y₀₀` term switched on.
    pub fn uniform(ydeg: usize) -> Self {
        let mut y = DVector::zeros((ydeg + 1).pow(2));
        y[0] = 1.0;
        SphericalHarmonicKernel {
            ydeg,
            y,
            limb_darkening: LimbDarkenedKernel::uniform(),
            f: vec![1.0],
            lmax: ydeg,
            ylm_norm: ylm_normalisation(ydeg),
            grid: OnceCell::new(),
        }
    }

    pub fn ydeg(&self) -> usize {
        self.ydeg
    }

    /// Set the coefficient of `Y_{l,m}`.
    pub fn set_coefficient(&mut self, l: usize, m: i64, value: f64) -> Result<(), SyzygyError> {
        if l > self.ydeg || m.unsigned_abs() as usize > l {
            return Err(SyzygyError::InvalidConfiguration(format!(
                "no Y_{{{l},{m}}} term in a degree {} map",
                self.ydeg
            )));
        }
        if l == 0 {
            return Err(SyzygyError::InvalidConfiguration(
                "the Y_{0,0} coefficient is fixed to 1".into(),
            ));
        }
        self.y[ylm_index(l, m)] = value;
        Ok(())
    }

    fn grid(&self) -> Arc<DiskGrid> {
        self.grid
            .get_or_init(|| {
                let rule = gauss_legendre(DISK_NODES.0);
                let mut points = full_disk_points(&rule, DISK_NODES.1);
                let mut norm = 0.0;
                for p in points.iter_mut() {
                    p.w *= self.limb_darkening.intensity(p.x.hypot(p.y));
                    norm += p.w;
                }
                Arc::new(DiskGrid { points, norm })
            })
            .clone()
    }

    /// Accumulate `Σ w · F · Ỹⱼ` over `points` into `row`.
    fn accumulate(
        &self,
        points: &[QuadPoint],
        to_body: &Rotation3<f64>,
        ld_weighted: bool,
        row: &mut [f64],
        scratch: &mut YlmScratch,
    ) {
        let n_y = row.len();
        let YlmScratch { ylm, plm } = scratch;
        for p in points {
            let z = (1.0 - p.x * p.x - p.y * p.y).max(0.0).sqrt();
            let body = to_body * Vector3::new(p.x, p.y, z);
            real_ylm_into(self.lmax, &self.ylm_norm, &body, plm, ylm);

            let filter: f64 = self.f.iter().zip(ylm.iter()).map(|(fj, yj)| fj * yj).sum();
            let mut w = p.w * filter;
            if ld_weighted {
                w *= self.limb_darkening.intensity(p.x.hypot(p.y));
            }
            for (acc, yj) in row.iter_mut().zip(ylm[..n_y].iter()) {
                *acc += w * yj;
            }
        }
    }
}

/// Buffers reused across quadrature points.
struct YlmScratch {
    ylm: Vec<f64>,
    plm: Vec<f64>,
}

impl YlmScratch {
    fn new(lmax: usize) -> Self {
        YlmScratch {
            ylm: vec![0.0; (lmax + 1).pow(2)],
            plm: vec![0.0; (lmax + 1) * (lmax + 2) / 2],
        }
    }
}

/// Rotation taking sky vectors into the body frame.
fn sky_to_body(theta: Radian, orientation: &Orientation) -> Rotation3<f64> {
    let spin = Rotation3::from_axis_angle(&Vector3::y_axis(), theta);
    let tilt = Rotation3::from_axis_angle(&Vector3::x_axis(), 0.5 * PI - orientation.inc);
    let roll = Rotation3::from_axis_angle(&Vector3::z_axis(), orientation.obl);
    (roll * tilt * spin).inverse()
}

/// Polar quadrature points of the unit disk.
///
/// The radius is sampled as `r = sin ρ` so that `μ = cos ρ` is smooth across the limb.
fn full_disk_points(rule: &GaussLegendre, n_phi: usize) -> Vec<QuadPoint> {
    let dphi = DPI / n_phi as f64;
    let radial: Vec<(f64, f64)> = rule
        .mapped(0.0, 0.5 * PI)
        .map(|(rho, w)| (rho.sin(), w * rho.sin() * rho.cos() * dphi))
        .collect();

    (0..n_phi)
        .flat_map(|i| {
            let (sin_phi, cos_phi) = ((i as f64 + 0.5) * dphi).sin_cos();
            radial.iter().map(move |&(r, w)| QuadPoint {
                x: r * cos_phi,
                y: r * sin_phi,
                w,
            })
        })
        .collect()
}

/// Polar quadrature points of the disk `(center, radius)`, optionally clipped to the inside of
/// a second disk `(clip_center, clip_radius)`.
fn polar_points(
    rule: &GaussLegendre,
    n_phi: usize,
    center: (f64, f64),
    radius: f64,
    clip: Option<((f64, f64), f64)>,
) -> Vec<QuadPoint> {
    let dphi = DPI / n_phi as f64;
    let mut points = Vec::with_capacity(n_phi * rule.len());

    for i in 0..n_phi {
        let (sin_phi, cos_phi) = ((i as f64 + 0.5) * dphi).sin_cos();
        let (mut lo, mut hi) = (0.0_f64, radius);

        if let Some(((qx, qy), clip_radius)) = clip {
            // |c + r·d − q|² < s²  ⇔  r² + 2r (c−q)·d + |c−q|² − s² < 0
            let (dx, dy) = (center.0 - qx, center.1 - qy);
            let half_b = dx * cos_phi + dy * sin_phi;
            let c = dx * dx + dy * dy - clip_radius * clip_radius;
            let disc = half_b * half_b - c;
            if disc <= 0.0 {
                continue;
            }
            let sq = disc.sqrt();
            lo = lo.max(-half_b - sq);
            hi = hi.min(-half_b + sq);
            if hi <= lo {
                continue;
            }
        }

        points.extend(rule.mapped(lo, hi).map(|(r, w)| QuadPoint {
            x: center.0 + r * cos_phi,
            y: center.1 + r * sin_phi,
            w: w * r * dphi,
        }));
    }

    points
}

/// Index of `Y_{l,m}` in the coefficient vector.
pub fn ylm_index(l: usize, m: i64) -> usize {
    ((l * l + l) as i64 + m) as usize
}

/// `2√π · N_{l,m}` (times `√2` for `m > 0`), stored at `l(l+1)/2 + m`.
fn ylm_normalisation(lmax: usize) -> Vec<f64> {
    let mut norm = Vec::with_capacity((lmax + 1) * (lmax + 2) / 2);
    for l in 0..=lmax {
        for m in 0..=l {
            // (l−m)! / (l+m)!
            let ratio: f64 = ((l - m + 1)..=(l + m)).map(|k| 1.0 / k as f64).product();
            let n = ((2 * l + 1) as f64 / (4.0 * PI) * ratio).sqrt() * 2.0 * PI.sqrt();
            norm.push(if m == 0 { n } else { n * 2.0_f64.sqrt() });
        }
    }
    norm
}

/// Scaled real spherical harmonics of degree ≤ `lmax` at the unit vector `v` (pole `+y`).
///
/// `plm` is scratch space of length `(lmax+1)(lmax+2)/2`; every entry is overwritten.
fn real_ylm_into(lmax: usize, norm: &[f64], v: &Vector3<f64>, plm: &mut [f64], out: &mut [f64]) {
    let cos_t = v.y.clamp(-1.0, 1.0);
    let sin_t = (1.0 - cos_t * cos_t).max(0.0).sqrt();
    let phi = v.x.atan2(v.z);

    // Associated Legendre functions P_l^m without the Condon–Shortley phase
    let tri = |l: usize, m: usize| l * (l + 1) / 2 + m;
    plm[0] = 1.0;
    for m in 0..=lmax {
        if m > 0 {
            plm[tri(m, m)] = plm[tri(m - 1, m - 1)] * (2 * m - 1) as f64 * sin_t;
        }
        if m < lmax {
            plm[tri(m + 1, m)] = cos_t * (2 * m + 1) as f64 * plm[tri(m, m)];
        }
        for l in (m + 2)..=lmax {
            plm[tri(l, m)] = ((2 * l - 1) as f64 * cos_t * plm[tri(l - 1, m)]
                - (l + m - 1) as f64 * plm[tri(l - 2, m)])
                / (l - m) as f64;
        }
    }

    for l in 0..=lmax {
        out[l * l + l] = norm[tri(l, 0)] * plm[tri(l, 0)];
        for m in 1..=l {
            let (sin_m, cos_m) = (m as f64 * phi).sin_cos();
            let base = norm[tri(l, m)] * plm[tri(l, m)];
            out[l * l + l + m] = base * cos_m;
            out[l * l + l - m] = base * sin_m;
        }
    }
}

impl BodyFluxKernel for SphericalHarmonicKernel {
    fn n_columns(&self) -> usize {
        (self.ydeg + 1).pow(2)
    }

    fn coefficients(&self) -> DVector<f64> {
        self.y.clone()
    }

    fn validate(&self) -> Result<(), SyzygyError> {
        self.limb_darkening.validate()
    }

    fn design_matrix(
        &self,
        theta: &[Radian],
        occultor: Option<&OccultorTrack>,
        orientation: &Orientation,
    ) -> Result<DMatrix<f64>, SyzygyError> {
        check_track(theta, occultor)?;

        let grid = self.grid();
        let region_rule = gauss_legendre(REGION_NODES.0);
        let n_y = self.n_columns();
        let mut x = DMatrix::zeros(theta.len(), n_y);
        let mut row = vec![0.0; n_y];
        let mut hidden = vec![0.0; n_y];
        let mut scratch = YlmScratch::new(self.lmax);

        for (k, &th) in theta.iter().enumerate() {
            let to_body = sky_to_body(th, orientation);
            row.iter_mut().for_each(|v| *v = 0.0);

            // Limb darkening is already folded into the full-disk weights
            self.accumulate(&grid.points, &to_body, false, &mut row, &mut scratch);

            if let Some(track) = occultor.filter(|track| track.overlaps(k)) {
                let occ = (track.xo[k], track.yo[k]);
                let region = if track.ro <= 1.0 {
                    polar_points(&region_rule, REGION_NODES.1, occ, track.ro, Some(((0.0, 0.0), 1.0)))
                } else {
                    polar_points(&region_rule, REGION_NODES.1, (0.0, 0.0), 1.0, Some((occ, track.ro)))
                };
                hidden.iter_mut().for_each(|v| *v = 0.0);
                self.accumulate(&region, &to_body, true, &mut hidden, &mut scratch);
                row.iter_mut().zip(&hidden).for_each(|(v, h)| *v -= h);
            }

            for (j, v) in row.iter().enumerate() {
                x[(k, j)] = v / grid.norm;
            }
        }

        Ok(x)
    }
}

#[cfg(test)]
mod spherical_harmonic_test {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn track(xo: f64, yo: f64, ro: f64) -> OccultorTrack {
        OccultorTrack {
            xo: DVector::from_element(1, xo),
            yo: DVector::from_element(1, yo),
            zo: DVector::from_element(1, 10.0),
            ro,
        }
    }

    #[test]
    fn test_uniform_map_has_unit_flux() {
        let kernel = SphericalHarmonicKernel::uniform(2);
        let x = kernel
            .design_matrix(&[0.0, 1.3], None, &Orientation::default())
            .unwrap();
        assert_eq!(x.shape(), (2, 9));
        assert_relative_eq!(x[(0, 0)], 1.0, max_relative = 1e-12);
        assert_relative_eq!(x[(1, 0)], 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_dipole_phase_curve() {
        let kernel = SphericalHarmonicKernel::uniform(1);
        let x = kernel
            .design_matrix(&[0.0, PI, 0.5 * PI], None, &Orientation::default())
            .unwrap();
        let peak = 2.0 / 3.0_f64.sqrt();

        // Y_{1,1} points at the observer at θ = 0 and away at θ = π
        assert_relative_eq!(x[(0, ylm_index(1, 1))], peak, max_relative = 1e-6);
        assert_relative_eq!(x[(1, ylm_index(1, 1))], -peak, max_relative = 1e-6);
        assert_abs_diff_eq!(x[(2, ylm_index(1, 1))], 0.0, epsilon = 1e-9);

        // Y_{1,0} is aligned with the spin axis, which lies in the sky plane
        assert_abs_diff_eq!(x[(0, ylm_index(1, 0))], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pole_on_dipole_is_constant() {
        let kernel = SphericalHarmonicKernel::uniform(1);
        let orientation = Orientation { inc: 0.0, obl: 0.0 };
        let x = kernel
            .design_matrix(&[0.0, 1.0, 2.0], None, &orientation)
            .unwrap();
        let peak = 2.0 / 3.0_f64.sqrt();
        for k in 0..3 {
            assert_relative_eq!(x[(k, ylm_index(1, 0))], peak, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_uniform_occultation_matches_lens_area() {
        let kernel = SphericalHarmonicKernel::uniform(0);
        for &(xo, ro) in &[(0.0, 0.1), (0.5, 0.2), (0.95, 0.1), (0.3, 1.5)] {
            let x = kernel
                .design_matrix(&[0.0], Some(&track(xo, 0.0, ro)), &Orientation::default())
                .unwrap();
            let expected = 1.0 - super::super::limb_darkened::lens_area(xo, ro) / PI;
            assert_abs_diff_eq!(x[(0, 0)], expected, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_limb_darkened_occultation_matches_radial_kernel() {
        let u = vec![0.4, 0.26];
        let mut y = DVector::zeros(1);
        y[0] = 1.0;
        let kernel = SphericalHarmonicKernel::new(0, y, u.clone(), vec![1.0]).unwrap();
        let radial = LimbDarkenedKernel::new(u);

        let x = kernel
            .design_matrix(&[0.0], Some(&track(0.0, 0.4, 0.15)), &Orientation::default())
            .unwrap();
        assert_abs_diff_eq!(x[(0, 0)], radial.occulted_flux(0.4, 0.15), epsilon = 1e-4);
    }

    #[test]
    fn test_invalid_coefficient_vectors() {
        assert!(SphericalHarmonicKernel::new(1, DVector::zeros(3), vec![], vec![1.0]).is_err());
        assert!(SphericalHarmonicKernel::new(0, DVector::zeros(1), vec![], vec![1.0]).is_err());
        let mut y = DVector::zeros(1);
        y[0] = 1.0;
        assert!(SphericalHarmonicKernel::new(0, y, vec![], vec![1.0, 0.0]).is_err());
    }

    #[test]
    fn test_legendre_scratch_is_fully_overwritten() {
        let lmax = 3;
        let norm = ylm_normalisation(lmax);
        let v = Vector3::new(0.3, -0.5, 0.81).normalize();

        let mut fresh = vec![0.0; 16];
        real_ylm_into(lmax, &norm, &v, &mut vec![0.0; 10], &mut fresh);

        let mut dirty = vec![7.5; 10];
        let mut reused = vec![-1.0; 16];
        real_ylm_into(lmax, &norm, &Vector3::new(0.0, 1.0, 0.0), &mut dirty, &mut reused);
        real_ylm_into(lmax, &norm, &v, &mut dirty, &mut reused);
        assert_eq!(fresh, reused);
    }

    #[test]
    fn test_occulted_rows_do_not_leak_into_each_other() {
        let kernel = SphericalHarmonicKernel::uniform(1);
        let both = OccultorTrack {
            xo: DVector::from_vec(vec![0.2, 0.6, 0.2]),
            yo: DVector::from_vec(vec![0.0, 0.1, 0.0]),
            zo: DVector::from_vec(vec![5.0, 5.0, -5.0]),
            ro: 0.3,
        };
        let theta = [0.4, 0.4, 0.4];
        let x = kernel
            .design_matrix(&theta, Some(&both), &Orientation::default())
            .unwrap();
        let second = kernel
            .design_matrix(&[0.4], Some(&track(0.6, 0.1, 0.3)), &Orientation::default())
            .unwrap();
        let unocculted = kernel
            .design_matrix(&[0.4], None, &Orientation::default())
            .unwrap();

        assert_eq!(x.row(1), second.row(0));
        assert_eq!(x.row(2), unocculted.row(0));
    }

    #[test]
    fn test_unphysical_limb_darkening_is_rejected() {
        let mut y = DVector::zeros(1);
        y[0] = 1.0;
        assert!(matches!(
            SphericalHarmonicKernel::new(0, y, vec![3.0], vec![1.0]),
            Err(SyzygyError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_set_coefficient() {
        let mut kernel = SphericalHarmonicKernel::uniform(2);
        kernel.set_coefficient(2, -1, 0.3).unwrap();
        assert_eq!(kernel.coefficients()[ylm_index(2, -1)], 0.3);
        assert!(kernel.set_coefficient(0, 0, 2.0).is_err());
        assert!(kernel.set_coefficient(3, 0, 2.0).is_err());
    }
}
