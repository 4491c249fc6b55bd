//! # System light curves
//!
//! [`System`] ties a [`Primary`] and an ordered list of [`Secondary`] bodies together and
//! assembles the **system design matrix**: the linear map from every body's surface-map
//! coefficients to the total observed flux at each requested time.
//!
//! ## Assembly
//!
//! For each body `B` the block of the design matrix is built in two passes:
//!
//! 1. **Phase term**: `B`'s flux kernel evaluated at its own rotational phase with no occultor,
//!    for every time.
//! 2. **Occultation corrections**: for every body `O` that can hide `B`, on the time indices
//!    where the two disks overlap with `O` in front, the kernel is re-evaluated with `O`'s disk
//!    and the phase term at those indices is subtracted. Corrections are accumulated into a
//!    zero-initialised matrix.
//!
//! The block is `phase + Σ corrections`, scaled by `B`'s amplitude (one copy of the block per
//! wavelength bin). Blocks are concatenated horizontally, primary first, then the secondaries
//! in order.
//!
//! Corrections from different occultors are independent and simply added. When two occultors
//! hide the same body at the same time both corrections are applied, which is exact only if the
//! two occultor disks do not overlap each other.
//!
//! ## Typical usage
//!
//! ```rust, no_run
//! use syzygy::body::{Body, Primary, Secondary};
//! use syzygy::kernel::{LimbDarkenedKernel, SphericalHarmonicKernel};
//! use syzygy::orbit::OrbitalElements;
//! use syzygy::system::System;
//!
//! let star = Primary::new(Body::new(LimbDarkenedKernel::new(vec![0.4, 0.26])).with_mass(1.0));
//! let planet = Secondary::new(
//!     Body::new(SphericalHarmonicKernel::uniform(1)).with_radius(0.1),
//!     OrbitalElements { porb: 1.0, ..Default::default() },
//! );
//! let system = System::new(star, vec![planet]).unwrap();
//!
//! let t: Vec<f64> = (0..100).map(|i| -0.1 + 0.002 * i as f64).collect();
//! let x = system.design_matrix(&t).unwrap();
//! let flux = system.flux(&t).unwrap();
//! ```

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::{
    body::{Body, BodyKind, Primary, Secondary},
    constants::{Day, RSUN_DAY_TO_M_S},
    occultation::{occultation_mask, occultation_pairs, pair_track, BodyRef},
    orbit::{KeplerianOrbit, OrbitInputs, OrbitProvider, OrbitingBody, RelativePositions},
    phase::phase_matrix,
    syzygy_errors::{SyzygyError, UnsupportedFeature},
};

/// Position of a body in the primary-first ordering of blocks.
fn slot(body: BodyRef) -> usize {
    match body {
        BodyRef::Primary => 0,
        BodyRef::Secondary(i) => i + 1,
    }
}

#[derive(Debug, Clone)]
pub struct System {
    primary: Primary,
    secondaries: Vec<Secondary>,
    texp: Day,
    light_delay: bool,
    rv: bool,
    orbit_provider: Arc<dyn OrbitProvider>,
}

/// Step-by-step construction of a [`System`].
#[derive(Debug, Clone)]
pub struct SystemBuilder {
    primary: Primary,
    secondaries: Vec<Secondary>,
    texp: Day,
    light_delay: bool,
    rv: bool,
    orbit_provider: Arc<dyn OrbitProvider>,
}

impl SystemBuilder {
    pub fn secondary(mut self, secondary: Secondary) -> Self {
        self.secondaries.push(secondary);
        self
    }

    pub fn secondaries(mut self, secondaries: Vec<Secondary>) -> Self {
        self.secondaries.extend(secondaries);
        self
    }

    /// Exposure time in days. Any non-zero value makes light-curve evaluation fail, as
    /// exposure integration is not implemented.
    pub fn texp(mut self, texp: Day) -> Self {
        self.texp = texp;
        self
    }

    /// Request light travel time correction of the orbital positions.
    pub fn light_delay(mut self, light_delay: bool) -> Self {
        self.light_delay = light_delay;
        self
    }

    /// Radial-velocity mode; incompatible with reflected-light bodies.
    pub fn rv(mut self, rv: bool) -> Self {
        self.rv = rv;
        self
    }

    pub fn orbit_provider<P: OrbitProvider + 'static>(mut self, provider: P) -> Self {
        self.orbit_provider = Arc::new(provider);
        self
    }

    pub fn build(self) -> Result<System, SyzygyError> {
        let system = System {
            primary: self.primary,
            secondaries: self.secondaries,
            texp: self.texp,
            light_delay: self.light_delay,
            rv: self.rv,
            orbit_provider: self.orbit_provider,
        };
        system.validate()?;
        Ok(system)
    }
}

impl System {
    /// Build a system with default settings and the Keplerian orbit provider.
    pub fn new(primary: Primary, secondaries: Vec<Secondary>) -> Result<Self, SyzygyError> {
        System::builder(primary).secondaries(secondaries).build()
    }

    pub fn builder(primary: Primary) -> SystemBuilder {
        SystemBuilder {
            primary,
            secondaries: Vec::new(),
            texp: 0.0,
            light_delay: false,
            rv: false,
            orbit_provider: Arc::new(KeplerianOrbit),
        }
    }

    pub fn primary(&self) -> &Primary {
        &self.primary
    }

    pub fn primary_mut(&mut self) -> &mut Primary {
        &mut self.primary
    }

    pub fn secondaries(&self) -> &[Secondary] {
        &self.secondaries
    }

    pub fn secondary_mut(&mut self, i: usize) -> Option<&mut Secondary> {
        self.secondaries.get_mut(i)
    }

    pub fn texp(&self) -> Day {
        self.texp
    }

    pub fn light_delay(&self) -> bool {
        self.light_delay
    }

    pub fn is_rv(&self) -> bool {
        self.rv
    }

    fn body(&self, body: BodyRef) -> &Body {
        match body {
            BodyRef::Primary => &self.primary.body,
            BodyRef::Secondary(i) => &self.secondaries[i].body,
        }
    }

    fn bodies(&self) -> impl Iterator<Item = &Body> {
        std::iter::once(&self.primary.body).chain(self.secondaries.iter().map(|s| &s.body))
    }

    /// Number of wavelength bins of the system flux.
    pub fn n_bins(&self) -> usize {
        self.bodies().map(|b| b.amp.n_bins()).max().unwrap_or(1)
    }

    /// Check the configuration before any flux is evaluated.
    ///
    /// Bodies may be mutated between evaluations, so every evaluation validates again.
    pub fn validate(&self) -> Result<(), SyzygyError> {
        self.primary.body.validate("primary")?;
        if self.primary.body.r <= 0.0 {
            return Err(SyzygyError::InvalidConfiguration(
                "primary: radius must be positive".into(),
            ));
        }
        for (i, sec) in self.secondaries.iter().enumerate() {
            let label = format!("secondary #{i}");
            sec.body.validate(&label)?;
            match sec.orbit.validate(self.primary.body.m + sec.body.m) {
                Err(SyzygyError::InvalidConfiguration(what)) => {
                    return Err(SyzygyError::InvalidConfiguration(format!("{label}: {what}")))
                }
                other => {
                    other?;
                }
            }
        }
        if !(self.texp >= 0.0) {
            return Err(SyzygyError::InvalidConfiguration(format!(
                "exposure time must be non-negative, got {}",
                self.texp
            )));
        }

        let n_bins = self.n_bins();
        if self
            .bodies()
            .any(|b| b.amp.n_bins() != 1 && b.amp.n_bins() != n_bins)
        {
            return Err(SyzygyError::InvalidConfiguration(
                "all spectral amplitudes must have the same number of wavelength bins".into(),
            ));
        }

        let reflected = self.bodies().any(|b| b.kind == BodyKind::Reflected);
        if reflected && self.rv {
            return Err(SyzygyError::InvalidConfiguration(
                "radial-velocity mode cannot be combined with reflected-light bodies".into(),
            ));
        }
        if reflected {
            return Err(UnsupportedFeature::ReflectedLight.into());
        }
        Ok(())
    }

    fn orbit_inputs(&self) -> OrbitInputs {
        OrbitInputs {
            m_primary: self.primary.body.m,
            bodies: self
                .secondaries
                .iter()
                .map(|s| OrbitingBody {
                    elements: s.orbit,
                    mass: s.body.m,
                })
                .collect(),
        }
    }

    /// Positions of the secondaries relative to the primary (R☉), `t.len() × n_secondaries`.
    ///
    /// If light travel time was requested but the orbit provider cannot model it, geometric
    /// positions are returned and a warning is logged.
    pub fn relative_positions(&self, t: &[Day]) -> Result<RelativePositions, SyzygyError> {
        let inputs = self.orbit_inputs();
        let positions = match self
            .orbit_provider
            .relative_positions(&inputs, t, self.light_delay)
        {
            Err(SyzygyError::LightDelayUnsupported) if self.light_delay => {
                log::warn!("the orbit provider does not model light delays; using geometric positions");
                self.orbit_provider.relative_positions(&inputs, t, false)?
            }
            other => other?,
        };

        for found in [positions.n_times(), positions.y.nrows(), positions.z.nrows()] {
            if found != t.len() {
                return Err(SyzygyError::DimensionMismatch {
                    expected: t.len(),
                    found,
                });
            }
        }
        for found in [positions.n_bodies(), positions.y.ncols(), positions.z.ncols()] {
            if found != self.secondaries.len() {
                return Err(SyzygyError::DimensionMismatch {
                    expected: self.secondaries.len(),
                    found,
                });
            }
        }
        Ok(positions)
    }

    /// Per-body blocks of the design matrix, at unit amplitude.
    fn unit_blocks(&self, t: &[Day]) -> Result<Vec<DMatrix<f64>>, SyzygyError> {
        self.validate()?;
        if self.texp != 0.0 {
            return Err(UnsupportedFeature::ExposureIntegration.into());
        }

        let positions = self.relative_positions(t)?;

        // Rotational phases: row 0 is the primary, row i + 1 secondary i
        let clocks: Vec<_> = self.bodies().map(Body::phase_clock).collect();
        let theta = phase_matrix(&clocks, t);
        let phases_of = |body: BodyRef| -> Vec<f64> { theta.row(slot(body)).iter().copied().collect() };

        let mut phase_terms = Vec::with_capacity(clocks.len());
        for (row, body) in self.bodies().enumerate() {
            let th: Vec<f64> = theta.row(row).iter().copied().collect();
            phase_terms.push(body.phase_term(&th)?);
        }
        let mut corrections: Vec<DMatrix<f64>> = phase_terms
            .iter()
            .map(|x| DMatrix::zeros(x.nrows(), x.ncols()))
            .collect();

        for pair in occultation_pairs(self.secondaries.len()) {
            let occulted = self.body(pair.occulted);
            let occultor = self.body(pair.occultor);
            if occulted.r == 0.0 {
                log::debug!("skipping {:?} pair: {} has no disk", pair.kind, pair.occulted);
                continue;
            }

            let track = pair_track(&pair, &positions, occulted.r, occultor.r);
            let idx = occultation_mask(&track);
            if idx.is_empty() {
                continue;
            }
            log::debug!(
                "{} occulted by {} at {} of {} times",
                pair.occulted,
                pair.occultor,
                idx.len(),
                t.len()
            );

            if matches!(occulted.kind, BodyKind::Oblate { .. })
                || matches!(occultor.kind, BodyKind::Oblate { .. })
            {
                return Err(UnsupportedFeature::OblateOccultation.into());
            }

            let theta_occulted = phases_of(pair.occulted);
            let theta_idx: Vec<f64> = idx.iter().map(|&k| theta_occulted[k]).collect();
            let x_occ = occulted.map().design_matrix(
                &theta_idx,
                Some(&track.select(&idx)),
                &occulted.orientation(),
            )?;
            occulted.check_shape(&x_occ, idx.len())?;

            let phase = &phase_terms[slot(pair.occulted)];
            let correction = &mut corrections[slot(pair.occulted)];
            for (row, &k) in idx.iter().enumerate() {
                let delta = x_occ.row(row) - phase.row(k);
                let mut target = correction.row_mut(k);
                target += delta;
            }
        }

        Ok(phase_terms
            .into_iter()
            .zip(corrections)
            .map(|(phase, correction)| phase + correction)
            .collect())
    }

    /// Design matrix of each body, primary first, including amplitudes.
    pub fn design_matrix_blocks(&self, t: &[Day]) -> Result<Vec<DMatrix<f64>>, SyzygyError> {
        Ok(self
            .unit_blocks(t)?
            .iter()
            .zip(self.bodies())
            .map(|(unit, body)| body.amp.expand(unit))
            .collect())
    }

    /// System design matrix.
    ///
    /// Arguments
    /// ---------
    /// * `t`: evaluation times (days), in any order; may be empty.
    ///
    /// Return
    /// ------
    /// * A `t.len() × Σ_B n_columns(B)` matrix: the primary's block first, then each secondary's
    ///   block in system order. Each block holds one column per map coefficient and per
    ///   wavelength bin (bin-major).
    /// * [`SyzygyError::Unsupported`] for exposure integration, reflected-light bodies and
    ///   occultations involving oblate bodies; [`SyzygyError::InvalidConfiguration`] for
    ///   inconsistent parameters.
    pub fn design_matrix(&self, t: &[Day]) -> Result<DMatrix<f64>, SyzygyError> {
        let blocks = self.design_matrix_blocks(t)?;
        let n_cols = blocks.iter().map(|b| b.ncols()).sum();
        let mut x = DMatrix::zeros(t.len(), n_cols);
        let mut offset = 0;
        for block in &blocks {
            x.columns_mut(offset, block.ncols()).copy_from(block);
            offset += block.ncols();
        }
        Ok(x)
    }

    /// Flux of each body, `t.len() × n_bins`, primary first.
    pub fn body_fluxes(&self, t: &[Day]) -> Result<Vec<DMatrix<f64>>, SyzygyError> {
        let n_bins = self.n_bins();
        let units = self.unit_blocks(t)?;

        Ok(units
            .iter()
            .zip(self.bodies())
            .map(|(unit, body)| {
                let lc = unit * body.map().coefficients();
                let amp = body.amp.values();
                DMatrix::from_fn(t.len(), n_bins, |k, w| {
                    let a = if amp.len() == 1 { amp[0] } else { amp[w] };
                    a * lc[k]
                })
            })
            .collect())
    }

    /// Total system flux, `t.len() × n_bins`.
    pub fn flux(&self, t: &[Day]) -> Result<DMatrix<f64>, SyzygyError> {
        let mut total = DMatrix::zeros(t.len(), self.n_bins());
        for body_flux in self.body_fluxes(t)? {
            total += body_flux;
        }
        Ok(total)
    }

    /// Keplerian reflex radial velocity of the primary (m/s, positive when receding).
    ///
    /// Only available in radial-velocity mode.
    pub fn rv(&self, t: &[Day]) -> Result<DVector<f64>, SyzygyError> {
        self.validate()?;
        if !self.rv {
            return Err(SyzygyError::InvalidConfiguration(
                "the system was not built in radial-velocity mode".into(),
            ));
        }

        let inputs = self.orbit_inputs();
        let vz = self.orbit_provider.relative_radial_velocities(&inputs, t)?;
        if vz.shape() != (t.len(), self.secondaries.len()) {
            return Err(SyzygyError::DimensionMismatch {
                expected: t.len() * self.secondaries.len(),
                found: vz.len(),
            });
        }
        let m_primary = self.primary.body.m;

        let mut rv = DVector::zeros(t.len());
        for (i, sec) in self.secondaries.iter().enumerate() {
            let weight = sec.body.m / (m_primary + sec.body.m) * RSUN_DAY_TO_M_S;
            rv += vz.column(i) * weight;
        }
        Ok(rv)
    }
}
