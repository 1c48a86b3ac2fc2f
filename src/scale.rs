//! Project scale and the phase subset it activates.

use serde::{Deserialize, Serialize};

use crate::phase::PhaseId;
use crate::report::Reporter;

/// Ordinal project size. Declaration order is rank order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Quick,
    Small,
    #[default]
    Medium,
    Large,
}

impl Scale {
    pub fn all() -> &'static [Scale] {
        &[Scale::Quick, Scale::Small, Scale::Medium, Scale::Large]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scale::Quick => "quick",
            Scale::Small => "small",
            Scale::Medium => "medium",
            Scale::Large => "large",
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Scale::Quick => "Quick",
            Scale::Small => "Small",
            Scale::Medium => "Medium",
            Scale::Large => "Large",
        }
    }

    /// Phases active for this scale, in rank order.
    pub fn active_phases(&self) -> &'static [PhaseId] {
        match self {
            Scale::Quick => &[PhaseId::Execution, PhaseId::Validation],
            Scale::Small => &[PhaseId::Planning, PhaseId::Execution, PhaseId::Validation],
            Scale::Medium => &[
                PhaseId::Planning,
                PhaseId::Review,
                PhaseId::Execution,
                PhaseId::Validation,
            ],
            Scale::Large => PhaseId::all(),
        }
    }

    pub fn is_active(&self, phase: PhaseId) -> bool {
        self.active_phases().contains(&phase)
    }

    /// First active phase strictly after `phase` in rank order.
    pub fn next_phase(&self, phase: PhaseId) -> Option<PhaseId> {
        self.active_phases().iter().copied().find(|p| *p > phase)
    }
}

impl std::fmt::Display for Scale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Scale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quick" | "빠른" | "퀵" => Ok(Scale::Quick),
            "small" | "소규모" => Ok(Scale::Small),
            "medium" | "중규모" => Ok(Scale::Medium),
            "large" | "대규모" => Ok(Scale::Large),
            _ => anyhow::bail!(
                "Invalid scale '{}'. Valid values: quick, small, medium, large",
                s
            ),
        }
    }
}

/// Lenient scale parsing: unrecognized input is reported and falls back to
/// `Scale::Medium`.
pub fn parse_scale(text: &str, reporter: &dyn Reporter) -> Scale {
    match text.parse() {
        Ok(scale) => scale,
        Err(_) => {
            reporter.warn(&format!(
                "Unrecognized scale '{}', defaulting to {}",
                text.trim(),
                Scale::Medium.label()
            ));
            Scale::Medium
        }
    }
}

/// Phases active for `scale`, in rank order.
pub fn active_phases(scale: Scale) -> &'static [PhaseId] {
    scale.active_phases()
}
