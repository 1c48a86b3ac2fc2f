pub mod config;
pub mod errors;
pub mod gates;
pub mod orchestrator;
pub mod phase;
pub mod report;
pub mod scale;
pub mod ui;

pub use errors::{WorkflowError, WorkflowResult};
pub use gates::{Gate, GateCheckResult, GateContext, GateDefinition, GateRegistry};
pub use orchestrator::{LoadOutcome, Orchestrator, WorkflowState};
pub use phase::{PhaseId, PhaseStatus, SkipReason};
pub use report::{MemoryReporter, Reporter, TracingReporter};
pub use scale::{Scale, active_phases, parse_scale};
