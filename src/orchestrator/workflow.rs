//! The workflow state machine.
//!
//! Every operation loads the record, applies one transition and saves it
//! back, so the orchestrator itself holds no workflow state between calls.

use chrono::Utc;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::state::{LoadOutcome, StateStore, TransitionRecord, WorkflowState};
use crate::errors::{WorkflowError, WorkflowResult};
use crate::gates::{GateDefinition, GateRegistry, transition_label};
use crate::phase::{PhaseId, PhaseStatus, SkipReason};
use crate::report::{Reporter, default_reporter};
use crate::scale::Scale;
use crate::ui::icons;

pub struct Orchestrator {
    project_dir: PathBuf,
    store: StateStore,
    registry: GateRegistry,
    gates: Vec<GateDefinition>,
    reporter: Arc<dyn Reporter>,
}

impl Orchestrator {
    /// Orchestrator for `project_dir` with built-in gates, no configured
    /// gate definitions, and warnings sent to `tracing`.
    pub fn new(project_dir: impl AsRef<Path>) -> Self {
        Self::with_reporter(project_dir, default_reporter())
    }

    pub fn with_reporter(project_dir: impl AsRef<Path>, reporter: Arc<dyn Reporter>) -> Self {
        let project_dir = project_dir.as_ref().to_path_buf();
        let store = StateStore::new(&project_dir, reporter.clone());
        Self {
            project_dir,
            store,
            registry: GateRegistry::new(),
            gates: Vec::new(),
            reporter,
        }
    }

    /// Set the gate definitions evaluated on `advance`.
    pub fn with_gates(mut self, gates: Vec<GateDefinition>) -> Self {
        self.gates = gates;
        self
    }

    /// Replace the gate registry (e.g. one with custom handlers).
    pub fn with_registry(mut self, registry: GateRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn registry(&self) -> &GateRegistry {
        &self.registry
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    /// Start a new workflow. Fails if one already exists for the project.
    pub fn init(&self, name: &str, scale: Scale) -> WorkflowResult<WorkflowState> {
        if self.store.exists() {
            let existing = self
                .store
                .load()?
                .map(|outcome| outcome.into_state().name)
                .unwrap_or_default();
            return Err(WorkflowError::AlreadyInitialized {
                name: existing,
                project_dir: self.project_dir.clone(),
            });
        }

        let state = WorkflowState::new(name, scale, Utc::now());
        self.store.save(&state)?;
        tracing::info!(
            workflow = name,
            scale = scale.as_str(),
            phase = state.current_phase.as_str(),
            "Initialized workflow"
        );
        Ok(state)
    }

    /// Current state, or `None` if no workflow exists. Recovered records are
    /// accepted; their warnings have already gone to the reporter.
    pub fn status(&self) -> WorkflowResult<Option<WorkflowState>> {
        Ok(self.store.load()?.map(LoadOutcome::into_state))
    }

    fn require_state(&self) -> WorkflowResult<WorkflowState> {
        self.status()?.ok_or_else(|| WorkflowError::NotInitialized {
            project_dir: self.project_dir.clone(),
        })
    }

    /// Mark the current phase completed.
    pub fn complete_current_phase(&self) -> WorkflowResult<WorkflowState> {
        let mut state = self.require_state()?;
        let current = state.current_phase;
        self.ensure_in_progress(&state, "complete")?;

        state.phase_mut(current).status = PhaseStatus::Completed;
        self.store.save(&state)?;
        tracing::info!(phase = current.as_str(), "Completed phase");
        Ok(state)
    }

    /// Waive the current phase. Only catalog-optional phases can be waived.
    pub fn skip_current_phase(&self) -> WorkflowResult<WorkflowState> {
        let mut state = self.require_state()?;
        let current = state.current_phase;
        self.ensure_in_progress(&state, "skip")?;
        if !current.is_optional() {
            return Err(WorkflowError::InvalidState(format!(
                "{} phase is mandatory and cannot be skipped",
                current
            )));
        }

        let phase = state.phase_mut(current);
        phase.status = PhaseStatus::Skipped;
        phase.skip_reason = Some(SkipReason::Waived);
        self.store.save(&state)?;
        tracing::info!(phase = current.as_str(), "Waived optional phase");
        Ok(state)
    }

    fn ensure_in_progress(&self, state: &WorkflowState, action: &str) -> WorkflowResult<()> {
        if state.is_complete() {
            return Err(WorkflowError::InvalidState(format!(
                "Workflow '{}' is already complete; nothing to {}",
                state.name, action
            )));
        }
        let status = state.status_of(state.current_phase);
        if status != PhaseStatus::InProgress {
            return Err(WorkflowError::InvalidState(format!(
                "Cannot {} {} phase: it is {}, not in_progress",
                action, state.current_phase, status
            )));
        }
        Ok(())
    }

    /// Move to the next active phase.
    ///
    /// Returns the new current phase, or `None` once no phase remains (the
    /// workflow is then complete). Fails with `GateCheck` if any configured
    /// gate rejects the transition; the state is left unchanged.
    pub async fn advance(&self) -> WorkflowResult<Option<PhaseId>> {
        let mut state = self.require_state()?;
        if state.is_complete() {
            return Ok(None);
        }

        let current = state.current_phase;
        let status = state.status_of(current);
        if !status.is_done() {
            return Err(WorkflowError::InvalidState(format!(
                "{} phase is {}; complete it before advancing",
                current, status
            )));
        }

        let Some(next) = state.scale.next_phase(current) else {
            state.completed_at = Some(Utc::now());
            self.store.save(&state)?;
            tracing::info!(workflow = %state.name, "Workflow complete");
            return Ok(None);
        };

        let result = self
            .registry
            .check(&self.gates, &state, current, next, &self.project_dir)
            .await;
        if !result.passed {
            let reason = result
                .reason
                .unwrap_or_else(|| "Gate check failed".to_string());
            tracing::warn!(
                transition = %transition_label(current, next),
                reason = %reason,
                "Transition blocked by gates"
            );
            return Err(WorkflowError::GateCheck {
                reason,
                hints: result.hints,
            });
        }

        state.phase_mut(next).status = PhaseStatus::InProgress;
        state.current_phase = next;
        state.history.push(TransitionRecord {
            from: current,
            to: next,
            at: Utc::now(),
        });
        self.store.save(&state)?;
        tracing::info!(from = current.as_str(), to = next.as_str(), "Advanced phase");
        Ok(Some(next))
    }

    /// Record an artifact reference under any phase, current or not.
    pub fn append_output(&self, phase: PhaseId, reference: &str) -> WorkflowResult<WorkflowState> {
        let mut state = self.require_state()?;
        state.phase_mut(phase).outputs.push(reference.to_string());
        self.store.save(&state)?;
        tracing::debug!(phase = phase.as_str(), reference, "Recorded output");
        Ok(state)
    }

    pub fn recommended_agents(&self) -> WorkflowResult<Vec<String>> {
        let state = self.require_state()?;
        Ok(to_strings(state.current_phase.info().agents))
    }

    pub fn recommended_skills(&self) -> WorkflowResult<Vec<String>> {
        let state = self.require_state()?;
        Ok(to_strings(state.current_phase.info().skills))
    }

    /// True once `advance` has found no phase left.
    pub fn is_complete(&self) -> WorkflowResult<bool> {
        Ok(self.status()?.is_some_and(|state| state.is_complete()))
    }

    pub fn summary(&self) -> WorkflowResult<String> {
        let state = self.require_state()?;
        Ok(render_summary(&state))
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Multi-line human-readable rendering of a workflow.
pub fn render_summary(state: &WorkflowState) -> String {
    let mut out = String::new();
    let current = if state.is_complete() {
        "Complete".to_string()
    } else {
        state.current_phase.to_string()
    };

    let _ = writeln!(out, "Workflow: {}", state.name);
    let _ = writeln!(out, "Scale:    {}", state.scale.label());
    let _ = writeln!(out, "Phase:    {}", current);
    let _ = writeln!(
        out,
        "Started:  {}",
        state.started_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(out, "Phases:");
    for id in state.active_phases() {
        let status = state.status_of(*id);
        let glyph = icons::status_glyph(status);
        let mut line = format!("  {}{:<13} {}", glyph, id.to_string(), status);
        if state.skip_reason(*id) == Some(SkipReason::Waived) {
            line.push_str(" (waived)");
        }
        let outputs = state.outputs(*id).len();
        if outputs > 0 {
            let _ = write!(line, " [{} output{}]", outputs, if outputs == 1 { "" } else { "s" });
        }
        let _ = writeln!(out, "{}", line);
    }
    out
}
