//! # Occultation detection
//!
//! For an ordered pair (occulted body, occultor) this module expresses the occultor's path in
//! the frame of the occulted body and selects the time indices at which the two disks overlap
//! on the sky with the occultor in front:
//!
//! ```text
//! occulted ⇔ NOT( b ≥ 1 + ro  OR  zo ≤ 0  OR  ro == 0 ),    b = sqrt(xo² + yo²)
//! ```
//!
//! with `(xo, yo, zo)` the occultor position and `ro` its radius, both in units of the occulted
//! body's radius. Detection never alters the geometry; it only selects indices.
//!
//! ## Pair order
//!
//! [`occultation_pairs`] enumerates, in this order:
//!
//! 1. transits: every secondary in front of the primary;
//! 2. secondary eclipses: the primary in front of every secondary;
//! 3. mutual occultations: every ordered pair of distinct secondaries.

use std::fmt;

use itertools::Itertools;
use nalgebra::{DMatrix, DVector};

use crate::{kernel::OccultorTrack, orbit::RelativePositions};

/// A body of the system, by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyRef {
    Primary,
    Secondary(usize),
}

impl fmt::Display for BodyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyRef::Primary => write!(f, "primary"),
            BodyRef::Secondary(i) => write!(f, "secondary #{i}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairKind {
    Transit,
    SecondaryEclipse,
    Mutual,
}

/// Ordered (occulted, occultor) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccultationPair {
    pub occulted: BodyRef,
    pub occultor: BodyRef,
    pub kind: PairKind,
}

/// Every pair that can produce an occultation in a system with `n_secondaries` companions.
pub fn occultation_pairs(n_secondaries: usize) -> Vec<OccultationPair> {
    let transits = (0..n_secondaries).map(|i| OccultationPair {
        occulted: BodyRef::Primary,
        occultor: BodyRef::Secondary(i),
        kind: PairKind::Transit,
    });
    let eclipses = (0..n_secondaries).map(|i| OccultationPair {
        occulted: BodyRef::Secondary(i),
        occultor: BodyRef::Primary,
        kind: PairKind::SecondaryEclipse,
    });
    let mutual = (0..n_secondaries)
        .cartesian_product(0..n_secondaries)
        .filter(|(i, j)| i != j)
        .map(|(i, j)| OccultationPair {
            occulted: BodyRef::Secondary(i),
            occultor: BodyRef::Secondary(j),
            kind: PairKind::Mutual,
        });

    transits.chain(eclipses).chain(mutual).collect()
}

/// Column `i` of a relative coordinate, or zeros for the primary.
fn coordinate(values: &DMatrix<f64>, body: BodyRef) -> DVector<f64> {
    match body {
        BodyRef::Primary => DVector::zeros(values.nrows()),
        BodyRef::Secondary(i) => values.column(i).into_owned(),
    }
}

/// Path of the occultor in units of the occulted body's radius.
///
/// Arguments
/// ---------
/// * `pair`: the (occulted, occultor) pair.
/// * `positions`: secondary positions relative to the primary.
/// * `r_occulted`, `r_occultor`: radii of the two bodies; `r_occulted` must be positive.
pub fn pair_track(
    pair: &OccultationPair,
    positions: &RelativePositions,
    r_occulted: f64,
    r_occultor: f64,
) -> OccultorTrack {
    let relative = |values: &DMatrix<f64>| {
        (coordinate(values, pair.occultor) - coordinate(values, pair.occulted)) / r_occulted
    };
    OccultorTrack {
        xo: relative(&positions.x),
        yo: relative(&positions.y),
        zo: relative(&positions.z),
        ro: r_occultor / r_occulted,
    }
}

/// Time indices at which the occultor covers part of the occulted body, in increasing order.
pub fn occultation_mask(track: &OccultorTrack) -> Vec<usize> {
    (0..track.len()).filter(|&k| track.overlaps(k)).collect()
}
