//! Typed error hierarchy for the phaseflow core.
//!
//! `WorkflowError` covers the three failure families of the orchestrator:
//! - invalid state (missing workflow, double init, out-of-order operations)
//! - gate rejections, carrying the combined reason and remediation hints
//! - fatal persistence failures while reading or writing the state record
//!
//! Malformed records are not errors: they load as `LoadOutcome::Recovered`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("No workflow found in {}. Run 'phaseflow init' first", .project_dir.display())]
    NotInitialized { project_dir: PathBuf },

    #[error("Workflow '{name}' already exists in {}", .project_dir.display())]
    AlreadyInitialized { name: String, project_dir: PathBuf },

    #[error("Invalid workflow state: {0}")]
    InvalidState(String),

    #[error("Gate check failed: {reason}")]
    GateCheck { reason: String, hints: Vec<String> },

    #[error("Failed to read workflow state at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write workflow state at {path}: {source}")]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize workflow state: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

impl WorkflowError {
    /// True for the errors that mean "the workflow is not in a state that
    /// allows this operation", as opposed to gate or I/O failures.
    pub fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            WorkflowError::NotInitialized { .. }
                | WorkflowError::AlreadyInitialized { .. }
                | WorkflowError::InvalidState(_)
        )
    }

    /// Remediation hints for gate failures; empty for every other kind.
    pub fn hints(&self) -> &[String] {
        match self {
            WorkflowError::GateCheck { hints, .. } => hints,
            _ => &[],
        }
    }
}

pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;
