pub mod state;
pub mod workflow;

pub use state::{LoadOutcome, PhaseState, StateStore, TransitionRecord, WorkflowState};
pub use workflow::{Orchestrator, render_summary};
