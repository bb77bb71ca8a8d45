//! Render quality tiers and their renderer flags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Rendering fidelity, lowest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Quality {
    #[serde(rename = "low_quality", alias = "low")]
    Low,
    #[default]
    #[serde(rename = "medium_quality", alias = "medium")]
    Medium,
    #[serde(rename = "high_quality", alias = "high")]
    High,
    #[serde(rename = "production_quality", alias = "production")]
    Production,
}

impl Quality {
    pub const ALL: [Quality; 4] = [
        Quality::Low,
        Quality::Medium,
        Quality::High,
        Quality::Production,
    ];

    /// Renderer command-line flag.
    pub fn flag(self) -> &'static str {
        match self {
            Quality::Low => "-ql",
            Quality::Medium => "-qm",
            Quality::High => "-qh",
            Quality::Production => "-qp",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Low => "low_quality",
            Quality::Medium => "medium_quality",
            Quality::High => "high_quality",
            Quality::Production => "production_quality",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = PipelineError;

    /// Accepts `low`, `low_quality`, or the flag letter (`l`), any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let tier = wanted.strip_suffix("_quality").unwrap_or(&wanted);
        match tier {
            "low" | "l" => Ok(Quality::Low),
            "medium" | "m" => Ok(Quality::Medium),
            "high" | "h" => Ok(Quality::High),
            "production" | "p" => Ok(Quality::Production),
            _ => Err(PipelineError::InvalidRequest(format!(
                "unknown quality '{}'",
                s.trim()
            ))),
        }
    }
}
