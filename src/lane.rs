//! Content lanes

use serde::{Deserialize, Serialize};

use crate::classifier::PageArchetype;

/// One of the two independent content categories a chip can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    Commerce,
    Informational,
}

impl Lane {
    pub const ALL: [Lane; 2] = [Lane::Commerce, Lane::Informational];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Commerce => "commerce",
            Lane::Informational => "informational",
        }
    }

    /// Default pass threshold for the lane's intent score.
    pub fn default_threshold(&self) -> f32 {
        match self {
            Lane::Commerce => 0.85,
            Lane::Informational => 0.75,
        }
    }

    /// The only archetype on which this lane may offer a chip.
    pub fn required_archetype(&self) -> PageArchetype {
        match self {
            Lane::Commerce => PageArchetype::Product,
            Lane::Informational => PageArchetype::Article,
        }
    }
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Lane {
    type Err = crate::error::ChipGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "commerce" | "product" => Ok(Lane::Commerce),
            "informational" | "health" | "info" => Ok(Lane::Informational),
            other => Err(crate::error::ChipGateError::Validation {
                message: format!("unknown lane '{other}'"),
            }),
        }
    }
}
