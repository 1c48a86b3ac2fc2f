//! Configuration for phaseflow.
//!
//! Reads `.phaseflow/phaseflow.toml` and layers it with the environment and
//! CLI arguments (file → environment → CLI).
//!
//! # Configuration File Format
//!
//! ```toml
//! [workflow]
//! default_scale = "medium"
//!
//! [[gates]]
//! type = "require_plan"
//! phases = ["Planning->Review"]
//! config = { min_scale = "medium" }
//!
//! [[gates]]
//! type = "require_approval"
//! phases = ["Review->Execution", "Validation->Confirmation"]
//! ```
//!
//! With no `[[gates]]` entries no gates run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::gates::{GateDefinition, GateRegistry, split_label};
use crate::orchestrator::state::META_DIR;
use crate::phase::PhaseId;
use crate::scale::Scale;

/// Config file name inside the metadata directory.
pub const CONFIG_FILE: &str = "phaseflow.toml";
/// Environment variable overriding the default scale.
pub const SCALE_ENV: &str = "PHASEFLOW_SCALE";

/// Workflow defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowSection {
    /// Scale used by `init` when none is given (free text, parsed leniently)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_scale: Option<String>,
}

/// The complete phaseflow.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseflowToml {
    #[serde(default)]
    pub workflow: WorkflowSection,
    /// Transition gates, evaluated in file order
    #[serde(default)]
    pub gates: Vec<GateDefinition>,
}

impl PhaseflowToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse phaseflow.toml")
    }

    /// Load `.phaseflow/phaseflow.toml`, or defaults if it doesn't exist.
    pub fn load_or_default(meta_dir: &Path) -> Result<Self> {
        let config_path = meta_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize phaseflow.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Starter configuration written by `phaseflow config init`.
    pub fn starter() -> Self {
        Self {
            workflow: WorkflowSection {
                default_scale: Some(Scale::Medium.as_str().to_string()),
            },
            gates: vec![
                GateDefinition::new("require_plan", &["Planning->Review"]),
                GateDefinition::new("require_approval", &["Review->Execution"]),
                GateDefinition::new("require_tests", &["Execution->Validation"]),
                GateDefinition::new("require_security", &["Validation->Confirmation"]),
            ],
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self, registry: &GateRegistry) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(scale) = &self.workflow.default_scale
            && scale.parse::<Scale>().is_err()
        {
            warnings.push(format!(
                "Invalid default_scale '{}': should be quick, small, medium or large",
                scale
            ));
        }

        for (index, gate) in self.gates.iter().enumerate() {
            let position = index + 1;
            if !registry.contains(&gate.gate_type) {
                warnings.push(format!(
                    "Gate #{} has unknown type '{}'. Available: {}",
                    position,
                    gate.gate_type,
                    registry.available().join(", ")
                ));
            }
            if gate.phases.is_empty() {
                warnings.push(format!(
                    "Gate #{} ('{}') lists no transitions and will never run",
                    position, gate.gate_type
                ));
            }
            for label in &gate.phases {
                if let Some(problem) = label_problem(label) {
                    warnings.push(format!(
                        "Gate #{} ('{}') has invalid transition '{}': {}",
                        position, gate.gate_type, label, problem
                    ));
                }
            }
        }

        warnings
    }
}

/// Describe what is wrong with a transition label, if anything.
fn label_problem(label: &str) -> Option<String> {
    let Some((from, to)) = split_label(label) else {
        return Some("expected 'From->To'".to_string());
    };
    for side in [from, to] {
        let is_pattern = side.contains('*') || side.contains('?');
        if !is_pattern && side.parse::<PhaseId>().is_err() {
            return Some(format!("unknown phase '{}'", side));
        }
    }
    None
}

/// Check if a pattern matches a name, case-insensitively.
/// Supports simple glob patterns:
/// - `*` matches any sequence of characters
/// - `?` matches any single character
pub fn pattern_matches(pattern: &str, name: &str) -> bool {
    let pattern_lower = pattern.to_lowercase();
    let name_lower = name.to_lowercase();

    glob_match(&pattern_lower, &name_lower)
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let mut pattern_chars = pattern.chars().peekable();
    let mut text_chars = text.chars();

    while let Some(p) = pattern_chars.next() {
        match p {
            '*' => {
                while pattern_chars.peek() == Some(&'*') {
                    pattern_chars.next();
                }
                if pattern_chars.peek().is_none() {
                    return true;
                }

                let remaining_pattern: String = pattern_chars.collect();
                let remaining_text = text_chars.as_str();
                return remaining_text
                    .char_indices()
                    .map(|(i, _)| i)
                    .chain(std::iter::once(remaining_text.len()))
                    .any(|i| glob_match(&remaining_pattern, &remaining_text[i..]));
            }
            '?' => {
                if text_chars.next().is_none() {
                    return false;
                }
            }
            c => {
                if text_chars.next() != Some(c) {
                    return false;
                }
            }
        }
    }

    text_chars.next().is_none()
}

/// Runtime configuration: the parsed file plus environment and CLI overrides.
#[derive(Debug, Clone)]
pub struct PhaseflowConfig {
    pub project_dir: PathBuf,
    /// Path to the .phaseflow directory
    pub meta_dir: PathBuf,
    pub toml: PhaseflowToml,
    /// CLI override for the scale (if specified)
    pub cli_scale: Option<String>,
}

impl PhaseflowConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        Self::with_cli_args(project_dir, None)
    }

    pub fn with_cli_args(project_dir: PathBuf, cli_scale: Option<String>) -> Result<Self> {
        let meta_dir = project_dir.join(META_DIR);
        let toml = PhaseflowToml::load_or_default(&meta_dir)?;
        Ok(Self {
            project_dir,
            meta_dir,
            toml,
            cli_scale,
        })
    }

    pub fn config_path(&self) -> PathBuf {
        self.meta_dir.join(CONFIG_FILE)
    }

    /// Scale text to use for `init`: CLI, then environment, then file.
    pub fn scale_text(&self) -> Option<String> {
        self.cli_scale
            .clone()
            .or_else(|| std::env::var(SCALE_ENV).ok().filter(|s| !s.trim().is_empty()))
            .or_else(|| self.toml.workflow.default_scale.clone())
    }

    pub fn gates(&self) -> &[GateDefinition] {
        &self.toml.gates
    }
}
