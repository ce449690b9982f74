// crates/universality-core/src/algorithm.rs
//
// Alignment algorithm selector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UniversalityError;
use crate::scores::DimensionOrder;

/// The four interchangeable alignment strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Algorithm {
    /// Orthogonal Procrustes rotation of the source space onto the target.
    #[serde(rename = "procrustes")]
    Procrustes,
    /// Procrustes with joint inlier/outlier estimation over the anchor pairs.
    #[serde(rename = "noise")]
    NoiseAware,
    /// Pairwise canonical correlation analysis; projects both spaces.
    #[serde(rename = "cca")]
    Cca,
    /// Generalized CCA; projects both spaces into a joint basis.
    #[default]
    #[serde(rename = "gcca")]
    Gcca,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Procrustes,
        Algorithm::NoiseAware,
        Algorithm::Cca,
        Algorithm::Gcca,
    ];

    /// Short name, also used as the output directory for mapped spaces.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Procrustes => "procrustes",
            Algorithm::NoiseAware => "noise",
            Algorithm::Cca => "cca",
            Algorithm::Gcca => "gcca",
        }
    }

    /// Dimension ordering of correlation vectors measured after this alignment.
    pub fn correlation_order(&self) -> DimensionOrder {
        match self {
            Algorithm::Gcca => DimensionOrder::Ascending,
            _ => DimensionOrder::Native,
        }
    }

    /// Whether the target space is transformed too (CCA family).
    pub fn maps_target(&self) -> bool {
        matches!(self, Algorithm::Cca | Algorithm::Gcca)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = UniversalityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "procrustes" => Ok(Algorithm::Procrustes),
            "noise" | "noise-aware" => Ok(Algorithm::NoiseAware),
            "cca" => Ok(Algorithm::Cca),
            "gcca" => Ok(Algorithm::Gcca),
            other => Err(UniversalityError::Config(format!(
                "unknown algorithm '{}' (expected procrustes, noise, cca or gcca)",
                other
            ))),
        }
    }
}
