//! Transition gates for the phaseflow orchestrator.
//!
//! A gate is a named predicate that must pass before the workflow may move
//! from one phase to the next. Gates are configured in
//! `.phaseflow/phaseflow.toml`:
//!
//! ```toml
//! [[gates]]
//! type = "require_plan"
//! phases = ["Planning->Review"]
//! config = { min_scale = "medium" }
//!
//! [[gates]]
//! type = "require_tests"
//! phases = ["Execution->Validation"]
//! config = { markers = ["Cargo.toml", "pytest.ini"] }
//! ```
//!
//! Transition labels are matched case-insensitively and accept the `*` and
//! `?` wildcards, so `"*->Validation"` applies to every transition into
//! Validation.
//!
//! Evaluation runs every matching gate even after one fails, so a single
//! `advance` reports all blocking reasons at once.

pub mod builtin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::pattern_matches;
use crate::orchestrator::state::WorkflowState;
use crate::phase::PhaseId;

/// A configured gate: which handler to run, on which transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDefinition {
    /// Registered handler name (e.g. "require_plan")
    #[serde(rename = "type")]
    pub gate_type: String,
    /// Transition labels such as "Planning->Review"
    #[serde(default)]
    pub phases: Vec<String>,
    /// Free-form handler parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl GateDefinition {
    pub fn new(gate_type: impl Into<String>, phases: &[&str]) -> Self {
        Self {
            gate_type: gate_type.into(),
            phases: phases.iter().map(|p| p.to_string()).collect(),
            config: None,
        }
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }

    /// Check if this gate applies to the `from -> to` transition.
    pub fn applies_to(&self, from: PhaseId, to: PhaseId) -> bool {
        let label = transition_label(from, to);
        self.phases
            .iter()
            .any(|pattern| pattern_matches(&normalize_label(pattern), &label))
    }
}

/// Canonical label for a transition, e.g. "Planning->Review".
pub fn transition_label(from: PhaseId, to: PhaseId) -> String {
    format!("{}->{}", from, to)
}

/// Parse a "From->To" label into its endpoint patterns.
///
/// Returns `None` if the label has no arrow or an empty side.
pub fn split_label(label: &str) -> Option<(&str, &str)> {
    let (from, to) = label.split_once("->")?;
    let (from, to) = (from.trim(), to.trim());
    if from.is_empty() || to.is_empty() {
        return None;
    }
    Some((from, to))
}

fn normalize_label(label: &str) -> String {
    match split_label(label) {
        Some((from, to)) => format!("{}->{}", from, to),
        None => label.trim().to_string(),
    }
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GateCheckResult {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

impl GateCheckResult {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: None,
            hints: Vec::new(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
            hints: Vec::new(),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Fold many results into one: passes only if all passed; failing
    /// reasons are joined with "; " and hints concatenated, both de-duplicated
    /// in first-seen order.
    pub fn combine(results: &[GateCheckResult]) -> Self {
        let mut reasons: Vec<&str> = Vec::new();
        let mut hints: Vec<String> = Vec::new();

        for result in results.iter().filter(|r| !r.passed) {
            if let Some(reason) = result.reason.as_deref()
                && !reasons.contains(&reason)
            {
                reasons.push(reason);
            }
            for hint in &result.hints {
                if !hints.contains(hint) {
                    hints.push(hint.clone());
                }
            }
        }

        if results.iter().all(|r| r.passed) {
            return Self::pass();
        }

        Self {
            passed: false,
            reason: Some(if reasons.is_empty() {
                "Gate check failed".to_string()
            } else {
                reasons.join("; ")
            }),
            hints,
        }
    }
}

/// Inputs available to a gate handler.
#[derive(Debug, Clone, Copy)]
pub struct GateContext<'a> {
    pub state: &'a WorkflowState,
    pub from: PhaseId,
    pub to: PhaseId,
    pub project_dir: &'a Path,
}

/// A pluggable transition gate.
#[async_trait]
pub trait Gate: Send + Sync {
    async fn evaluate(
        &self,
        ctx: &GateContext<'_>,
        config: Option<&serde_json::Value>,
    ) -> GateCheckResult;
}

/// Name → handler map, pre-populated with the built-in gates.
#[derive(Clone)]
pub struct GateRegistry {
    gates: HashMap<String, Arc<dyn Gate>>,
}

impl Default for GateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GateRegistry {
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(builtin::REQUIRE_PLAN, Arc::new(builtin::RequirePlan));
        registry.register(builtin::REQUIRE_APPROVAL, Arc::new(builtin::RequireApproval));
        registry.register(builtin::REQUIRE_TESTS, Arc::new(builtin::RequireTests));
        registry.register(builtin::REQUIRE_SECURITY, Arc::new(builtin::RequireSecurity));
        registry
    }

    /// Registry with no handlers at all.
    pub fn empty() -> Self {
        Self {
            gates: HashMap::new(),
        }
    }

    /// Add a handler, replacing any existing one with the same name.
    pub fn register(&mut self, name: impl Into<String>, gate: Arc<dyn Gate>) {
        self.gates.insert(name.into(), gate);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.gates.contains_key(name)
    }

    /// Registered handler names, sorted.
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.gates.keys().cloned().collect();
        names.sort();
        names
    }

    /// Run every definition that applies to `from -> to`, in order.
    ///
    /// An unregistered gate type yields a failing result rather than an error.
    pub async fn evaluate(
        &self,
        definitions: &[GateDefinition],
        state: &WorkflowState,
        from: PhaseId,
        to: PhaseId,
        project_dir: &Path,
    ) -> Vec<GateCheckResult> {
        let ctx = GateContext {
            state,
            from,
            to,
            project_dir,
        };
        let mut results = Vec::new();

        for definition in definitions.iter().filter(|d| d.applies_to(from, to)) {
            let result = match self.gates.get(&definition.gate_type) {
                Some(gate) => gate.evaluate(&ctx, definition.config.as_ref()).await,
                None => GateCheckResult::fail(format!(
                    "Unknown gate type '{}'. Available: {}",
                    definition.gate_type,
                    self.available().join(", ")
                ))
                .with_hint(format!(
                    "Fix the gate type in .phaseflow/phaseflow.toml or register a '{}' handler",
                    definition.gate_type
                )),
            };

            tracing::debug!(
                gate = %definition.gate_type,
                transition = %transition_label(from, to),
                passed = result.passed,
                "Evaluated gate"
            );
            results.push(result);
        }

        results
    }

    /// Evaluate and combine into a single result.
    pub async fn check(
        &self,
        definitions: &[GateDefinition],
        state: &WorkflowState,
        from: PhaseId,
        to: PhaseId,
        project_dir: &Path,
    ) -> GateCheckResult {
        let results = self
            .evaluate(definitions, state, from, to, project_dir)
            .await;
        GateCheckResult::combine(&results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::PhaseStatus;
    use crate::scale::Scale;
    use chrono::Utc;
    use tempfile::tempdir;

    struct AlwaysFail(&'static str);

    #[async_trait]
    impl Gate for AlwaysFail {
        async fn evaluate(
            &self,
            _ctx: &GateContext<'_>,
            _config: Option<&serde_json::Value>,
        ) -> GateCheckResult {
            GateCheckResult::fail(self.0).with_hint("shared hint")
        }
    }

    fn medium_state() -> WorkflowState {
        WorkflowState::new("demo", Scale::Medium, Utc::now())
    }

    #[test]
    fn test_transition_label_format() {
        assert_eq!(
            transition_label(PhaseId::Planning, PhaseId::Review),
            "Planning->Review"
        );
    }

    #[test]
    fn test_applies_to_is_case_insensitive_and_trims() {
        let def = GateDefinition::new("require_plan", &["planning -> REVIEW"]);
        assert!(def.applies_to(PhaseId::Planning, PhaseId::Review));
        assert!(!def.applies_to(PhaseId::Review, PhaseId::Execution));
    }

    #[test]
    fn test_applies_to_supports_wildcards() {
        let def = GateDefinition::new("require_approval", &["*->Validation"]);
        assert!(def.applies_to(PhaseId::Execution, PhaseId::Validation));
        assert!(!def.applies_to(PhaseId::Validation, PhaseId::Confirmation));
    }

    #[test]
    fn test_split_label() {
        assert_eq!(split_label("Planning->Review"), Some(("Planning", "Review")));
        assert_eq!(split_label("Planning"), None);
        assert_eq!(split_label("->Review"), None);
    }

    #[test]
    fn test_combine_all_pass() {
        let combined = GateCheckResult::combine(&[GateCheckResult::pass(), GateCheckResult::pass()]);
        assert!(combined.passed);
        assert!(combined.reason.is_none());
        assert!(GateCheckResult::combine(&[]).passed);
    }

    #[test]
    fn test_combine_joins_and_dedups() {
        let combined = GateCheckResult::combine(&[
            GateCheckResult::fail("a").with_hint("h1").with_hint("h2"),
            GateCheckResult::pass(),
            GateCheckResult::fail("b").with_hint("h2"),
            GateCheckResult::fail("a").with_hint("h3"),
        ]);
        assert!(!combined.passed);
        assert_eq!(combined.reason.as_deref(), Some("a; b"));
        assert_eq!(combined.hints, vec!["h1", "h2", "h3"]);
    }

    #[test]
    fn test_registry_lists_builtins_sorted() {
        let registry = GateRegistry::new();
        assert_eq!(
            registry.available(),
            vec![
                "require_approval",
                "require_plan",
                "require_security",
                "require_tests"
            ]
        );
        assert!(GateRegistry::empty().available().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_gate_type_fails_without_error() {
        let dir = tempdir().unwrap();
        let registry = GateRegistry::new();
        let defs = vec![GateDefinition::new("require_magic", &["Planning->Review"])];

        let results = registry
            .evaluate(&defs, &medium_state(), PhaseId::Planning, PhaseId::Review, dir.path())
            .await;

        assert_eq!(results.len(), 1);
        assert!(!results[0].passed);
        let reason = results[0].reason.as_deref().unwrap();
        assert!(reason.contains("require_magic"));
        assert!(reason.contains("require_plan"));
    }

    #[tokio::test]
    async fn test_evaluate_runs_every_matching_gate() {
        let dir = tempdir().unwrap();
        let mut registry = GateRegistry::new();
        registry.register("first", Arc::new(AlwaysFail("first failed")));
        registry.register("second", Arc::new(AlwaysFail("second failed")));
        let defs = vec![
            GateDefinition::new("first", &["Planning->Review"]),
            GateDefinition::new("second", &["Planning->Review"]),
            GateDefinition::new("first", &["Execution->Validation"]),
        ];

        let results = registry
            .evaluate(&defs, &medium_state(), PhaseId::Planning, PhaseId::Review, dir.path())
            .await;
        assert_eq!(results.len(), 2);

        let combined = registry
            .check(&defs, &medium_state(), PhaseId::Planning, PhaseId::Review, dir.path())
            .await;
        assert_eq!(combined.reason.as_deref(), Some("first failed; second failed"));
        assert_eq!(combined.hints, vec!["shared hint"]);
    }

    #[tokio::test]
    async fn test_require_plan_blocks_until_planning_completed() {
        let dir = tempdir().unwrap();
        let registry = GateRegistry::new();
        let defs = vec![GateDefinition::new("require_plan", &["Planning->Review"])];
        let mut state = medium_state();
        assert_eq!(state.status_of(PhaseId::Planning), PhaseStatus::InProgress);

        let blocked = registry
            .check(&defs, &state, PhaseId::Planning, PhaseId::Review, dir.path())
            .await;
        assert!(!blocked.passed);
        assert!(blocked.reason.unwrap().contains("Planning"));

        state.phase_mut(PhaseId::Planning).status = PhaseStatus::Completed;
        let allowed = registry
            .check(&defs, &state, PhaseId::Planning, PhaseId::Review, dir.path())
            .await;
        assert!(allowed.passed);
    }

    #[tokio::test]
    async fn test_no_definitions_means_pass() {
        let dir = tempdir().unwrap();
        let result = GateRegistry::new()
            .check(&[], &medium_state(), PhaseId::Planning, PhaseId::Review, dir.path())
            .await;
        assert!(result.passed);
    }
}
