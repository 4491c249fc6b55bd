//! # Constants and type definitions for Syzygy
//!
//! This module centralizes the **physical constants**, **unit conversions**, and **common type
//! aliases** used throughout the `syzygy` library.
//!
//! ## Unit system
//!
//! The whole crate works in a single "stellar" unit system so that orbital positions can be
//! compared directly with body radii:
//!
//! - Lengths: **solar radii** (R☉)
//! - Masses: **solar masses** (M☉)
//! - Time: **days**
//! - Angles: **radians**
//!
//! The gravitational constant and the speed of light are therefore expressed in
//! R☉³ M☉⁻¹ day⁻² and R☉ day⁻¹ respectively.

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Nominal solar radius in meters (IAU 2015 Resolution B3)
pub const R_SUN_M: f64 = 6.957e8;

/// Nominal solar mass parameter GM☉ in m³/s² (IAU 2015 Resolution B3)
pub const GM_SUN_M3_S2: f64 = 1.327_124_4e20;

/// Gravitational constant in R☉³ M☉⁻¹ day⁻²
pub const G_GRAV: f64 = GM_SUN_M3_S2 * SECONDS_PER_DAY * SECONDS_PER_DAY / (R_SUN_M * R_SUN_M * R_SUN_M);

/// Speed of light in m/s
pub const VLIGHT_M_S: f64 = 2.997_924_58e8;

/// Speed of light in solar radii per day
pub const VLIGHT_RSUN_DAY: f64 = VLIGHT_M_S * SECONDS_PER_DAY / R_SUN_M;

/// Solar radii per day → meters per second
pub const RSUN_DAY_TO_M_S: f64 = R_SUN_M / SECONDS_PER_DAY;

/// Julian date of the modified julian date origin
pub const MJD_OFFSET: f64 = 2_400_000.5;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in radians
pub type Radian = f64;
/// Time in days
pub type Day = f64;
/// Length in solar radii
pub type SolarRadius = f64;
/// Mass in solar masses
pub type SolarMass = f64;
