//! Persisted workflow state and the store that reads and writes it.
//!
//! The record lives at `.phaseflow/workflow.yaml`. Writes go through a
//! temporary file and a rename so a crash never leaves a torn record. Reads
//! never fail on bad content: a record that does not parse, or parses into
//! something that breaks the workflow invariants, is repaired field by field
//! and returned as `LoadOutcome::Recovered`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{WorkflowError, WorkflowResult};
use crate::phase::{PhaseId, PhaseStatus, SkipReason};
use crate::report::Reporter;
use crate::scale::Scale;

/// Hidden metadata directory under the project root.
pub const META_DIR: &str = ".phaseflow";
/// File name of the persisted workflow record.
pub const STATE_FILE: &str = "workflow.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseState {
    pub status: PhaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    /// Artifact references, append-only
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl PhaseState {
    fn with_status(status: PhaseStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    fn out_of_scale() -> Self {
        Self {
            status: PhaseStatus::Skipped,
            skip_reason: Some(SkipReason::OutOfScale),
            outputs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: PhaseId,
    pub to: PhaseId,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub name: String,
    pub scale: Scale,
    pub current_phase: PhaseId,
    pub phases: BTreeMap<PhaseId, PhaseState>,
    #[serde(default)]
    pub history: Vec<TransitionRecord>,
    pub started_at: DateTime<Utc>,
    /// Set by the `advance` call that finds no phase left
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    /// Fresh state: inactive phases skipped, first active phase in progress.
    pub fn new(name: impl Into<String>, scale: Scale, started_at: DateTime<Utc>) -> Self {
        let active = scale.active_phases();
        let first = active[0];
        let phases = PhaseId::all()
            .iter()
            .map(|id| {
                let state = if !scale.is_active(*id) {
                    PhaseState::out_of_scale()
                } else if *id == first {
                    PhaseState::with_status(PhaseStatus::InProgress)
                } else {
                    PhaseState::with_status(PhaseStatus::Pending)
                };
                (*id, state)
            })
            .collect();

        Self {
            name: name.into(),
            scale,
            current_phase: first,
            phases,
            history: Vec::new(),
            started_at,
            completed_at: None,
        }
    }

    pub fn outputs(&self, id: PhaseId) -> &[String] {
        self.phases
            .get(&id)
            .map(|p| p.outputs.as_slice())
            .unwrap_or(&[])
    }

    pub fn skip_reason(&self, id: PhaseId) -> Option<SkipReason> {
        self.phases.get(&id).and_then(|p| p.skip_reason)
    }

    pub fn status_of(&self, id: PhaseId) -> PhaseStatus {
        self.phases
            .get(&id)
            .map(|p| p.status)
            .unwrap_or_default()
    }

    pub(crate) fn phase_mut(&mut self, id: PhaseId) -> &mut PhaseState {
        self.phases.entry(id).or_default()
    }

    pub fn active_phases(&self) -> &'static [PhaseId] {
        self.scale.active_phases()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Repair invariant violations in place, describing each repair.
    fn normalize(&mut self, warnings: &mut Vec<String>) {
        let scale = self.scale;

        for id in PhaseId::all() {
            let active = scale.is_active(*id);
            match self.phases.get_mut(id) {
                None => {
                    warnings.push(format!("Phase '{}' missing from record; restored", id.as_str()));
                    let state = if active {
                        PhaseState::default()
                    } else {
                        PhaseState::out_of_scale()
                    };
                    self.phases.insert(*id, state);
                }
                Some(state) if !active && state.status != PhaseStatus::Skipped => {
                    warnings.push(format!(
                        "Phase '{}' is not active for scale {} but was '{}'; marked skipped",
                        id.as_str(),
                        scale.as_str(),
                        state.status
                    ));
                    state.status = PhaseStatus::Skipped;
                    state.skip_reason = Some(SkipReason::OutOfScale);
                }
                Some(state) if !active => {
                    state.skip_reason = Some(SkipReason::OutOfScale);
                }
                Some(state) if state.status == PhaseStatus::Skipped => {
                    if state.skip_reason == Some(SkipReason::OutOfScale) {
                        warnings.push(format!(
                            "Phase '{}' is active for scale {} but was marked out of scale; reset to pending",
                            id.as_str(),
                            scale.as_str()
                        ));
                        *state = PhaseState {
                            outputs: std::mem::take(&mut state.outputs),
                            ..PhaseState::default()
                        };
                    } else if !id.is_optional() {
                        warnings.push(format!(
                            "Phase '{}' is mandatory and cannot be skipped; reset to pending",
                            id.as_str()
                        ));
                        *state = PhaseState {
                            outputs: std::mem::take(&mut state.outputs),
                            ..PhaseState::default()
                        };
                    } else if state.skip_reason.is_none() {
                        warnings.push(format!(
                            "Phase '{}' was skipped without a reason; recorded as waived",
                            id.as_str()
                        ));
                        state.skip_reason = Some(SkipReason::Waived);
                    }
                }
                Some(state) if state.skip_reason.is_some() => {
                    warnings.push(format!(
                        "Phase '{}' is {} but carried a skip reason; cleared",
                        id.as_str(),
                        state.status
                    ));
                    state.skip_reason = None;
                }
                Some(_) => {}
            }
        }

        if !scale.is_active(self.current_phase) {
            let repaired = self.infer_current_phase();
            warnings.push(format!(
                "Current phase '{}' is not active for scale {}; using '{}'",
                self.current_phase.as_str(),
                scale.as_str(),
                repaired.as_str()
            ));
            self.current_phase = repaired;
        }

        if !self.is_complete() && self.status_of(self.current_phase) == PhaseStatus::Pending {
            let inferred = self.infer_current_phase();
            if inferred != self.current_phase
                && self.status_of(inferred) == PhaseStatus::InProgress
            {
                warnings.push(format!(
                    "Current phase '{}' is pending while '{}' is in progress; using the latter",
                    self.current_phase.as_str(),
                    inferred.as_str()
                ));
                self.current_phase = inferred;
            } else {
                warnings.push(format!(
                    "Current phase '{}' was pending; marked in progress",
                    self.current_phase.as_str()
                ));
                let current = self.current_phase;
                self.phase_mut(current).status = PhaseStatus::InProgress;
            }
        }

        let in_progress: Vec<PhaseId> = self
            .active_phases()
            .iter()
            .copied()
            .filter(|id| self.status_of(*id) == PhaseStatus::InProgress)
            .collect();
        let current = self.current_phase;
        for id in in_progress.into_iter().filter(|id| *id != current) {
            warnings.push(format!(
                "Phase '{}' was in progress but is not current; reset to pending",
                id.as_str()
            ));
            self.phase_mut(id).status = PhaseStatus::Pending;
        }
    }

    /// Best guess at the current phase from per-phase statuses.
    fn infer_current_phase(&self) -> PhaseId {
        let active = self.active_phases();
        active
            .iter()
            .copied()
            .find(|id| self.status_of(*id) == PhaseStatus::InProgress)
            .or_else(|| {
                active
                    .iter()
                    .copied()
                    .find(|id| !self.status_of(*id).is_done())
            })
            .unwrap_or(active[active.len() - 1])
    }
}

/// Result of reading a present record.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Valid(WorkflowState),
    /// The record needed repair; `warnings` describes every repair made.
    Recovered {
        state: WorkflowState,
        warnings: Vec<String>,
    },
}

impl LoadOutcome {
    pub fn state(&self) -> &WorkflowState {
        match self {
            LoadOutcome::Valid(state) | LoadOutcome::Recovered { state, .. } => state,
        }
    }

    pub fn into_state(self) -> WorkflowState {
        match self {
            LoadOutcome::Valid(state) | LoadOutcome::Recovered { state, .. } => state,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            LoadOutcome::Valid(_) => &[],
            LoadOutcome::Recovered { warnings, .. } => warnings,
        }
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self, LoadOutcome::Recovered { .. })
    }
}

/// Reads and writes the workflow record for one project directory.
pub struct StateStore {
    state_file: PathBuf,
    reporter: Arc<dyn Reporter>,
}

impl StateStore {
    pub fn new(project_dir: &Path, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            state_file: state_path(project_dir),
            reporter,
        }
    }

    pub fn path(&self) -> &Path {
        &self.state_file
    }

    pub fn exists(&self) -> bool {
        self.state_file.is_file()
    }

    /// Load the record; `None` if there is none.
    pub fn load(&self) -> WorkflowResult<Option<LoadOutcome>> {
        if !self.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&self.state_file).map_err(|source| WorkflowError::ReadFailed {
            path: self.state_file.clone(),
            source,
        })?;

        let outcome = decode_record(bytes);
        for warning in outcome.warnings() {
            self.reporter.warn(&format!(
                "{}: {}",
                self.state_file.display(),
                warning
            ));
        }
        Ok(Some(outcome))
    }

    /// Serialize and atomically replace the record.
    pub fn save(&self, state: &WorkflowState) -> WorkflowResult<()> {
        let content = serde_yaml::to_string(state)?;
        write_atomic(&self.state_file, &content)?;
        tracing::debug!(
            path = %self.state_file.display(),
            phase = state.current_phase.as_str(),
            "Saved workflow state"
        );
        Ok(())
    }

    /// Delete the record if present.
    pub fn remove(&self) -> WorkflowResult<()> {
        if self.state_file.exists() {
            fs::remove_file(&self.state_file).map_err(|source| WorkflowError::PersistFailed {
                path: self.state_file.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

pub fn state_path(project_dir: &Path) -> PathBuf {
    project_dir.join(META_DIR).join(STATE_FILE)
}

/// True if a workflow record exists under `project_dir`.
pub fn exists(project_dir: &Path) -> bool {
    state_path(project_dir).is_file()
}

/// Write to `<path>.tmp`, flush to disk, then rename over `path`.
fn write_atomic(path: &Path, content: &str) -> WorkflowResult<()> {
    let persist_err = |source| WorkflowError::PersistFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(persist_err)?;
    }

    let temp_path = path.with_extension("yaml.tmp");
    let mut file = fs::File::create(&temp_path).map_err(persist_err)?;
    file.write_all(content.as_bytes()).map_err(persist_err)?;
    file.sync_all().map_err(persist_err)?;
    drop(file);

    fs::rename(&temp_path, path).map_err(persist_err)?;
    Ok(())
}

/// Parse raw record bytes. Invalid UTF-8 is replaced and reported.
fn decode_record(bytes: Vec<u8>) -> LoadOutcome {
    match String::from_utf8(bytes) {
        Ok(content) => parse_record(&content),
        Err(err) => {
            let content = String::from_utf8_lossy(err.as_bytes()).into_owned();
            let (state, mut warnings) = match parse_record(&content) {
                LoadOutcome::Valid(state) => (state, Vec::new()),
                LoadOutcome::Recovered { state, warnings } => (state, warnings),
            };
            warnings.insert(
                0,
                format!(
                    "Record is not valid UTF-8 ({}); invalid bytes were replaced",
                    err.utf8_error()
                ),
            );
            LoadOutcome::Recovered { state, warnings }
        }
    }
}

/// Parse record text, falling back to field-level recovery.
pub fn parse_record(content: &str) -> LoadOutcome {
    let mut warnings = Vec::new();

    let mut state = match serde_yaml::from_str::<WorkflowState>(content) {
        Ok(state) => state,
        Err(strict_err) => {
            warnings.push(format!("Record does not match the schema ({})", strict_err));
            let value = match serde_yaml::from_str::<Value>(content) {
                Ok(value) => value,
                Err(e) => {
                    warnings.push(format!("Record is not valid YAML ({}); starting from defaults", e));
                    Value::Null
                }
            };
            recover(&value, &mut warnings)
        }
    };

    state.normalize(&mut warnings);

    if warnings.is_empty() {
        LoadOutcome::Valid(state)
    } else {
        LoadOutcome::Recovered { state, warnings }
    }
}

/// Rebuild a state from whatever fields of `value` are usable.
fn recover(value: &Value, warnings: &mut Vec<String>) -> WorkflowState {
    let name = match value.get("name").and_then(Value::as_str) {
        Some(name) => name.to_string(),
        None => {
            warnings.push("Missing or invalid 'name'; using 'unnamed'".to_string());
            "unnamed".to_string()
        }
    };

    let scale = match value
        .get("scale")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Scale>().ok())
    {
        Some(scale) => scale,
        None => {
            warnings.push(format!(
                "Missing or invalid 'scale'; using {}",
                Scale::Medium.as_str()
            ));
            Scale::Medium
        }
    };

    let started_at = match value.get("started_at").and_then(parse_timestamp) {
        Some(at) => at,
        None => {
            warnings.push("Missing or invalid 'started_at'; using current time".to_string());
            Utc::now()
        }
    };

    let completed_at = match value.get("completed_at") {
        None | Some(Value::Null) => None,
        Some(raw) => {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                warnings.push("Invalid 'completed_at'; treating workflow as not complete".to_string());
            }
            parsed
        }
    };

    let mut state = WorkflowState::new(name, scale, started_at);
    state.completed_at = completed_at;

    let raw_phases = value.get("phases");
    for id in PhaseId::all() {
        match raw_phases.and_then(|p| p.get(id.as_str())) {
            Some(raw) => match recover_phase(raw) {
                Some(phase) => {
                    state.phases.insert(*id, phase);
                }
                None => warnings.push(format!(
                    "Phase '{}' entry is malformed; using its initial status",
                    id.as_str()
                )),
            },
            None => warnings.push(format!(
                "Phase '{}' missing from record; using its initial status",
                id.as_str()
            )),
        }
    }

    match value
        .get("current_phase")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<PhaseId>().ok())
    {
        Some(current) => state.current_phase = current,
        None => {
            let inferred = state.infer_current_phase();
            warnings.push(format!(
                "Missing or invalid 'current_phase'; using '{}'",
                inferred.as_str()
            ));
            state.current_phase = inferred;
        }
    }

    if let Some(entries) = value.get("history").and_then(Value::as_sequence) {
        for (index, entry) in entries.iter().enumerate() {
            match serde_yaml::from_value::<TransitionRecord>(entry.clone()) {
                Ok(record) => state.history.push(record),
                Err(_) => warnings.push(format!("Dropped malformed history entry #{}", index + 1)),
            }
        }
    }

    state
}

fn recover_phase(raw: &Value) -> Option<PhaseState> {
    if let Ok(phase) = serde_yaml::from_value::<PhaseState>(raw.clone()) {
        return Some(phase);
    }

    let status = raw
        .get("status")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<PhaseStatus>().ok())?;
    let outputs = raw
        .get("outputs")
        .and_then(Value::as_sequence)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(PhaseState {
        status,
        skip_reason: None,
        outputs,
    })
}

fn parse_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    raw.as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|at| at.with_timezone(&Utc))
}
