//! Built-in gate handlers.
//!
//! | Name               | Passes when                                              |
//! |--------------------|----------------------------------------------------------|
//! | `require_plan`     | Planning is completed (only checked on Planning->Review, and only at or above `min_scale`) |
//! | `require_approval` | The source phase of the transition is completed          |
//! | `require_tests`    | A test-framework marker file exists and Execution is completed |
//! | `require_security` | Validation is completed                                  |

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{Gate, GateCheckResult, GateContext};
use crate::phase::{PhaseId, PhaseStatus};
use crate::scale::Scale;

pub const REQUIRE_PLAN: &str = "require_plan";
pub const REQUIRE_APPROVAL: &str = "require_approval";
pub const REQUIRE_TESTS: &str = "require_tests";
pub const REQUIRE_SECURITY: &str = "require_security";

/// Parse handler config, falling back to defaults when absent or malformed.
fn parse_config<T: DeserializeOwned + Default>(gate: &str, config: Option<&serde_json::Value>) -> T {
    match config {
        None | Some(serde_json::Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            tracing::warn!(gate, error = %e, "Invalid gate config, using defaults");
            T::default()
        }),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequirePlanConfig {
    /// Smallest scale at which a completed plan is required
    pub min_scale: Scale,
}

impl Default for RequirePlanConfig {
    fn default() -> Self {
        Self {
            min_scale: Scale::Medium,
        }
    }
}

pub struct RequirePlan;

#[async_trait]
impl Gate for RequirePlan {
    async fn evaluate(
        &self,
        ctx: &GateContext<'_>,
        config: Option<&serde_json::Value>,
    ) -> GateCheckResult {
        if (ctx.from, ctx.to) != (PhaseId::Planning, PhaseId::Review) {
            return GateCheckResult::pass();
        }

        let config: RequirePlanConfig = parse_config(REQUIRE_PLAN, config);
        if ctx.state.scale < config.min_scale {
            return GateCheckResult::pass();
        }

        if ctx.state.status_of(PhaseId::Planning) == PhaseStatus::Completed {
            return GateCheckResult::pass();
        }

        GateCheckResult::fail(format!(
            "Planning phase is not completed (required for {} scale and above)",
            config.min_scale.label()
        ))
        .with_hint("Write a plan and record it with 'phaseflow output planning <path>'")
        .with_hint("Mark planning complete with 'phaseflow complete'")
    }
}

pub struct RequireApproval;

#[async_trait]
impl Gate for RequireApproval {
    async fn evaluate(
        &self,
        ctx: &GateContext<'_>,
        _config: Option<&serde_json::Value>,
    ) -> GateCheckResult {
        let status = ctx.state.status_of(ctx.from);
        if status == PhaseStatus::Completed {
            return GateCheckResult::pass();
        }

        GateCheckResult::fail(format!(
            "{} phase has not been approved (status: {})",
            ctx.from, status
        ))
        .with_hint(format!(
            "Review the {} outputs and approve with 'phaseflow complete'",
            ctx.from
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequireTestsConfig {
    /// Files whose presence indicates a configured test framework
    pub markers: Vec<String>,
}

impl Default for RequireTestsConfig {
    fn default() -> Self {
        Self {
            markers: default_test_markers(),
        }
    }
}

pub fn default_test_markers() -> Vec<String> {
    [
        "Cargo.toml",
        "jest.config.js",
        "jest.config.ts",
        "vitest.config.ts",
        "vitest.config.js",
        "pytest.ini",
        "pyproject.toml",
        "go.mod",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub struct RequireTests;

#[async_trait]
impl Gate for RequireTests {
    async fn evaluate(
        &self,
        ctx: &GateContext<'_>,
        config: Option<&serde_json::Value>,
    ) -> GateCheckResult {
        let config: RequireTestsConfig = parse_config(REQUIRE_TESTS, config);

        let mut has_marker = false;
        for marker in &config.markers {
            if tokio::fs::try_exists(ctx.project_dir.join(marker))
                .await
                .unwrap_or(false)
            {
                has_marker = true;
                break;
            }
        }
        let executed = ctx.state.status_of(PhaseId::Execution) == PhaseStatus::Completed;

        let mut reasons = Vec::new();
        let mut hints = Vec::new();
        if !has_marker {
            reasons.push(format!(
                "No test framework configuration found (looked for: {})",
                config.markers.join(", ")
            ));
            hints.push("Set up a test framework for the project".to_string());
        }
        if !executed {
            reasons.push("Execution phase is not completed".to_string());
            hints.push("Finish implementation and mark it with 'phaseflow complete'".to_string());
        }

        if reasons.is_empty() {
            return GateCheckResult::pass();
        }
        GateCheckResult {
            passed: false,
            reason: Some(reasons.join("; ")),
            hints,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequireSecurityConfig {
    /// Lowest finding severity the operator should address; display only
    pub min_severity: String,
}

impl Default for RequireSecurityConfig {
    fn default() -> Self {
        Self {
            min_severity: "high".to_string(),
        }
    }
}

pub struct RequireSecurity;

#[async_trait]
impl Gate for RequireSecurity {
    async fn evaluate(
        &self,
        ctx: &GateContext<'_>,
        config: Option<&serde_json::Value>,
    ) -> GateCheckResult {
        if ctx.state.status_of(PhaseId::Validation) == PhaseStatus::Completed {
            return GateCheckResult::pass();
        }

        let config: RequireSecurityConfig = parse_config(REQUIRE_SECURITY, config);
        GateCheckResult::fail("Validation phase (security review) is not completed")
            .with_hint(format!(
                "Resolve security findings of severity '{}' or higher",
                config.min_severity
            ))
            .with_hint("Mark validation complete with 'phaseflow complete'")
    }
}
