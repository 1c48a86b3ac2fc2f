//! Phase catalog for the phaseflow orchestrator.
//!
//! This module provides:
//! - `PhaseId`, the five canonical phases in rank order
//! - `PhaseStatus` and `SkipReason`, the per-phase lifecycle values
//! - `PhaseInfo`, the static catalog entry with recommended agents and skills

use serde::{Deserialize, Serialize};

/// One of the five canonical phases.
///
/// Declaration order is rank order, so `Ord` follows the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseId {
    Planning,
    Review,
    Execution,
    Validation,
    Confirmation,
}

impl PhaseId {
    /// Returns all phases in rank order.
    pub fn all() -> &'static [PhaseId] {
        &[
            PhaseId::Planning,
            PhaseId::Review,
            PhaseId::Execution,
            PhaseId::Validation,
            PhaseId::Confirmation,
        ]
    }

    /// Identifier used in the persisted record and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseId::Planning => "planning",
            PhaseId::Review => "review",
            PhaseId::Execution => "execution",
            PhaseId::Validation => "validation",
            PhaseId::Confirmation => "confirmation",
        }
    }

    pub fn info(&self) -> &'static PhaseInfo {
        match self {
            PhaseId::Planning => &CATALOG[0],
            PhaseId::Review => &CATALOG[1],
            PhaseId::Execution => &CATALOG[2],
            PhaseId::Validation => &CATALOG[3],
            PhaseId::Confirmation => &CATALOG[4],
        }
    }

    #[inline]
    pub fn rank(&self) -> u8 {
        self.info().rank
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.info().optional
    }
}

impl std::fmt::Display for PhaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.info().name)
    }
}

impl std::str::FromStr for PhaseId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "planning" | "plan" => Ok(PhaseId::Planning),
            "review" => Ok(PhaseId::Review),
            "execution" | "execute" => Ok(PhaseId::Execution),
            "validation" | "validate" => Ok(PhaseId::Validation),
            "confirmation" | "confirm" => Ok(PhaseId::Confirmation),
            _ => anyhow::bail!(
                "Invalid phase '{}'. Valid values: planning, review, execution, validation, confirmation",
                s
            ),
        }
    }
}

/// Lifecycle status of a single phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::Pending => "pending",
            PhaseStatus::InProgress => "in_progress",
            PhaseStatus::Completed => "completed",
            PhaseStatus::Skipped => "skipped",
        }
    }

    /// Completed or skipped: nothing further happens in this phase.
    pub fn is_done(&self) -> bool {
        matches!(self, PhaseStatus::Completed | PhaseStatus::Skipped)
    }
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PhaseStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(PhaseStatus::Pending),
            "in_progress" | "inprogress" => Ok(PhaseStatus::InProgress),
            "completed" | "complete" => Ok(PhaseStatus::Completed),
            "skipped" => Ok(PhaseStatus::Skipped),
            _ => anyhow::bail!(
                "Invalid phase status '{}'. Valid values: pending, in_progress, completed, skipped",
                s
            ),
        }
    }
}

/// Why a phase carries the `skipped` status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Not part of the active phase set for the workflow's scale
    OutOfScale,
    /// An optional phase the operator chose to skip
    Waived,
}

/// Static catalog entry for a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseInfo {
    pub id: PhaseId,
    /// Human-readable name of the phase
    pub name: &'static str,
    pub description: &'static str,
    /// Agent identifiers recommended while this phase is current
    pub agents: &'static [&'static str],
    /// Skill identifiers recommended while this phase is current
    pub skills: &'static [&'static str],
    /// Catalog position, 1 through 5
    pub rank: u8,
    /// Optional phases may be waived by the operator
    pub optional: bool,
}

static CATALOG: [PhaseInfo; 5] = [
    PhaseInfo {
        id: PhaseId::Planning,
        name: "Planning",
        description: "Capture requirements and write the implementation plan",
        agents: &["product-manager", "architect"],
        skills: &["requirements-analysis", "plan-writing"],
        rank: 1,
        optional: false,
    },
    PhaseInfo {
        id: PhaseId::Review,
        name: "Review",
        description: "Review the plan and design before implementation starts",
        agents: &["architect", "tech-lead"],
        skills: &["design-review", "risk-assessment"],
        rank: 2,
        optional: true,
    },
    PhaseInfo {
        id: PhaseId::Execution,
        name: "Execution",
        description: "Implement the planned changes",
        agents: &["developer"],
        skills: &["implementation", "test-driven-development"],
        rank: 3,
        optional: false,
    },
    PhaseInfo {
        id: PhaseId::Validation,
        name: "Validation",
        description: "Run tests, quality checks and security review",
        agents: &["qa-engineer", "security-auditor"],
        skills: &["testing", "security-audit"],
        rank: 4,
        optional: false,
    },
    PhaseInfo {
        id: PhaseId::Confirmation,
        name: "Confirmation",
        description: "Confirm the delivered result with stakeholders",
        agents: &["product-manager"],
        skills: &["acceptance-review", "release-notes"],
        rank: 5,
        optional: true,
    },
];

/// Get the full catalog in rank order.
pub fn catalog() -> &'static [PhaseInfo] {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_in_rank_order() {
        let ranks: Vec<u8> = catalog().iter().map(|p| p.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        for (info, id) in catalog().iter().zip(PhaseId::all()) {
            assert_eq!(info.id, *id);
            assert_eq!(id.info(), info);
        }
    }

    #[test]
    fn test_phase_ord_matches_rank() {
        for pair in PhaseId::all().windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    #[test]
    fn test_optional_flags() {
        assert!(!PhaseId::Planning.is_optional());
        assert!(PhaseId::Review.is_optional());
        assert!(!PhaseId::Execution.is_optional());
        assert!(!PhaseId::Validation.is_optional());
        assert!(PhaseId::Confirmation.is_optional());
    }

    #[test]
    fn test_phase_id_parse_is_case_insensitive() {
        assert_eq!("Planning".parse::<PhaseId>().unwrap(), PhaseId::Planning);
        assert_eq!(" VALIDATION ".parse::<PhaseId>().unwrap(), PhaseId::Validation);
        assert_eq!("confirm".parse::<PhaseId>().unwrap(), PhaseId::Confirmation);
        let err = "deploy".parse::<PhaseId>().unwrap_err();
        assert!(err.to_string().contains("Invalid phase 'deploy'"));
    }

    #[test]
    fn test_phase_id_serializes_lowercase() {
        let yaml = serde_yaml::to_string(&PhaseId::Execution).unwrap();
        assert_eq!(yaml.trim(), "execution");
        assert_eq!(PhaseId::Execution.to_string(), "Execution");
    }

    #[test]
    fn test_phase_status_parse_and_display() {
        assert_eq!("in-progress".parse::<PhaseStatus>().unwrap(), PhaseStatus::InProgress);
        assert_eq!("Completed".parse::<PhaseStatus>().unwrap(), PhaseStatus::Completed);
        assert!("done".parse::<PhaseStatus>().is_err());
        assert_eq!(PhaseStatus::InProgress.to_string(), "in_progress");
        assert!(PhaseStatus::Skipped.is_done());
        assert!(!PhaseStatus::Pending.is_done());
    }

    #[test]
    fn test_every_phase_recommends_agents_and_skills() {
        for info in catalog() {
            assert!(!info.agents.is_empty(), "{} has no agents", info.name);
            assert!(!info.skills.is_empty(), "{} has no skills", info.name);
        }
    }
}
