use std::fmt;

use thiserror::Error;

/// Features the light-curve engine deliberately refuses to approximate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedFeature {
    /// Occultations where an oblate body is either occulted or the occultor.
    OblateOccultation,
    /// Phase curves and occultations of bodies seen in reflected light.
    ReflectedLight,
    /// Integration of the flux over a finite exposure time.
    ExposureIntegration,
}

impl fmt::Display for UnsupportedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsupportedFeature::OblateOccultation => {
                write!(f, "occultations involving oblate bodies are not implemented")
            }
            UnsupportedFeature::ReflectedLight => {
                write!(f, "reflected-light bodies are not supported in a system light curve")
            }
            UnsupportedFeature::ExposureIntegration => {
                write!(f, "exposure time integration is not implemented")
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum SyzygyError {
    #[error("Unsupported feature: {0}")]
    Unsupported(UnsupportedFeature),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("The orbit provider does not model light travel time delays")]
    LightDelayUnsupported,

    #[error("ROOTS finding error: {0}")]
    RootFindingError(#[from] roots::SearchError),

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Unable to parse the system configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<UnsupportedFeature> for SyzygyError {
    fn from(feature: UnsupportedFeature) -> Self {
        SyzygyError::Unsupported(feature)
    }
}

impl PartialEq for SyzygyError {
    fn eq(&self, other: &Self) -> bool {
        use SyzygyError::*;
        match (self, other) {
            (Unsupported(a), Unsupported(b)) => a == b,
            (InvalidConfiguration(a), InvalidConfiguration(b)) => a == b,
            (RootFindingError(a), RootFindingError(b)) => a == b,
            (
                DimensionMismatch {
                    expected: e1,
                    found: f1,
                },
                DimensionMismatch {
                    expected: e2,
                    found: f2,
                },
            ) => e1 == e2 && f1 == f2,

            // Foreign errors are not comparable: equal when the variant matches
            (ConfigParse(_), ConfigParse(_)) => true,
            (IoError(_), IoError(_)) => true,

            (LightDelayUnsupported, LightDelayUnsupported) => true,

            _ => false,
        }
    }
}
