//! # syzygy
//!
//! Light curves of multi-body systems (a primary star and any number of companions), built as
//! **design matrices**: for a set of observation times, [`system::System::design_matrix`]
//! returns the linear map from every body's surface-map coefficients to the total observed flux,
//! including transits, secondary eclipses and mutual occultations between companions.
//!
//! The geometry comes from an [`orbit::OrbitProvider`] (Keplerian by default) and the
//! per-body flux from a [`kernel::BodyFluxKernel`] (limb-darkened disk or spherical-harmonic
//! map). Systems can be built in code or from TOML with [`config::SystemConfig`].

pub mod body;
pub mod config;
pub mod constants;
pub mod kepler;
pub mod kernel;
pub mod occultation;
pub mod orbit;
pub mod phase;
pub mod quadrature;
pub mod system;
pub mod syzygy_errors;
pub mod time;

pub use body::{Amplitude, Body, BodyKind, Primary, Secondary};
pub use system::{System, SystemBuilder};
pub use syzygy_errors::SyzygyError;
