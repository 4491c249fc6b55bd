#![allow(dead_code)]

use approx::assert_abs_diff_eq;
use nalgebra::DMatrix;
use syzygy::{
    kernel::LimbDarkenedKernel,
    orbit::{OrbitInputs, OrbitProvider, OrbitalElements, RelativePositions},
    Body, Primary, Secondary, SyzygyError,
};

/// Solar-radius, solar-mass star with a uniform disk.
pub fn sun() -> Primary {
    Primary::new(Body::new(LimbDarkenedKernel::uniform()).with_mass(1.0))
}

/// Massless uniform disk on a circular, edge-on orbit transiting at `t0`.
pub fn planet(r: f64, porb: f64, t0: f64) -> Secondary {
    Secondary::new(
        Body::new(LimbDarkenedKernel::uniform()).with_radius(r),
        OrbitalElements {
            porb,
            t0,
            ..Default::default()
        },
    )
}

pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let step = (stop - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}

pub fn assert_matrix_close(actual: &DMatrix<f64>, expected: &DMatrix<f64>, epsilon: f64) {
    assert_eq!(actual.shape(), expected.shape());
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(a, e, epsilon = epsilon);
    }
}

/// Orbit provider holding every secondary at a fixed position, without light delays.
#[derive(Debug, Clone)]
pub struct FixedPositions {
    pub positions: Vec<[f64; 3]>,
}

impl OrbitProvider for FixedPositions {
    fn relative_positions(
        &self,
        inputs: &OrbitInputs,
        t: &[f64],
        light_delay: bool,
    ) -> Result<RelativePositions, SyzygyError> {
        if light_delay {
            return Err(SyzygyError::LightDelayUnsupported);
        }
        let mut out = RelativePositions::zeros(t.len(), inputs.bodies.len());
        for (i, [x, y, z]) in self.positions.iter().enumerate().take(inputs.bodies.len()) {
            out.x.column_mut(i).fill(*x);
            out.y.column_mut(i).fill(*y);
            out.z.column_mut(i).fill(*z);
        }
        Ok(out)
    }
}
