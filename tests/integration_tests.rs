//! Integration tests for phaseflow
//!
//! These drive the binary end to end against temporary project directories.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a phaseflow Command rooted in `dir`
fn phaseflow(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("phaseflow");
    cmd.current_dir(dir.path()).env_remove("PHASEFLOW_SCALE");
    cmd
}

/// Helper to create a temporary project directory
fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

/// Helper to start a workflow at the given scale
fn init_workflow(dir: &TempDir, scale: &str) {
    phaseflow(dir)
        .args(["init", "demo", "--scale", scale])
        .assert()
        .success();
}

fn state_file(dir: &TempDir) -> String {
    fs::read_to_string(dir.path().join(".phaseflow/workflow.yaml")).unwrap()
}

fn write_config(dir: &TempDir, content: &str) {
    let meta = dir.path().join(".phaseflow");
    fs::create_dir_all(&meta).unwrap();
    fs::write(meta.join("phaseflow.toml"), content).unwrap();
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_phaseflow_help() {
        let dir = create_temp_project();
        phaseflow(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("advance"));
    }

    #[test]
    fn test_phaseflow_version() {
        let dir = create_temp_project();
        phaseflow(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_init_creates_state_file() {
        let dir = create_temp_project();

        phaseflow(&dir)
            .args(["init", "checkout-flow", "--scale", "large"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Initialized workflow 'checkout-flow' (Large scale)",
            ))
            .stdout(predicate::str::contains("Confirmation"));

        let yaml = state_file(&dir);
        assert!(yaml.contains("name: checkout-flow"));
        assert!(yaml.contains("current_phase: planning"));
    }

    #[test]
    fn test_init_twice_fails() {
        let dir = create_temp_project();
        init_workflow(&dir, "small");

        phaseflow(&dir)
            .args(["init", "again"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already"));
    }

    #[test]
    fn test_init_unknown_scale_falls_back_to_medium() {
        let dir = create_temp_project();

        phaseflow(&dir)
            .args(["init", "demo", "--scale", "enormous"])
            .assert()
            .success()
            .stdout(predicate::str::contains("(Medium scale)"));
    }

    #[test]
    fn test_init_accepts_korean_scale() {
        let dir = create_temp_project();

        phaseflow(&dir)
            .args(["init", "demo", "--scale", "대규모"])
            .assert()
            .success()
            .stdout(predicate::str::contains("(Large scale)"));
    }

    #[test]
    fn test_scale_from_environment() {
        let dir = create_temp_project();

        phaseflow(&dir)
            .env("PHASEFLOW_SCALE", "quick")
            .args(["init", "demo"])
            .assert()
            .success()
            .stdout(predicate::str::contains("(Quick scale)"));
    }

    #[test]
    fn test_status_uninitialized() {
        let dir = create_temp_project();

        phaseflow(&dir)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("No workflow in this project."));
    }

    #[test]
    fn test_project_dir_flag() {
        let dir = create_temp_project();
        let other = create_temp_project();

        phaseflow(&other)
            .arg("--project-dir")
            .arg(dir.path())
            .args(["init", "remote", "--scale", "quick"])
            .assert()
            .success();

        assert!(dir.path().join(".phaseflow/workflow.yaml").exists());
        assert!(!other.path().join(".phaseflow").exists());
    }
}

// =============================================================================
// Workflow Tests
// =============================================================================

mod workflow {
    use super::*;

    #[test]
    fn test_quick_workflow_runs_to_completion() {
        let dir = create_temp_project();
        init_workflow(&dir, "quick");

        phaseflow(&dir)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("Phase:    Execution"))
            .stdout(predicate::str::contains("Planning").not());

        phaseflow(&dir)
            .arg("complete")
            .assert()
            .success()
            .stdout(predicate::str::contains("Execution phase completed"));

        phaseflow(&dir)
            .arg("advance")
            .assert()
            .success()
            .stdout(predicate::str::contains("Advanced to Validation phase."))
            .stdout(predicate::str::contains("qa-engineer"));

        phaseflow(&dir).arg("complete").assert().success();

        phaseflow(&dir)
            .arg("advance")
            .assert()
            .success()
            .stdout(predicate::str::contains("Workflow complete"));

        phaseflow(&dir)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("Phase:    Complete"));

        let yaml = state_file(&dir);
        assert!(yaml.contains("completed_at"));
    }

    #[test]
    fn test_advance_requires_finished_phase() {
        let dir = create_temp_project();
        init_workflow(&dir, "small");

        phaseflow(&dir)
            .arg("advance")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Planning"));

        assert!(state_file(&dir).contains("current_phase: planning"));
    }

    #[test]
    fn test_skip_optional_review() {
        let dir = create_temp_project();
        init_workflow(&dir, "medium");

        phaseflow(&dir).arg("complete").assert().success();
        phaseflow(&dir)
            .arg("advance")
            .assert()
            .success()
            .stdout(predicate::str::contains("Advanced to Review phase."));

        phaseflow(&dir)
            .arg("skip")
            .assert()
            .success()
            .stdout(predicate::str::contains("Review phase skipped"));

        phaseflow(&dir)
            .arg("advance")
            .assert()
            .success()
            .stdout(predicate::str::contains("Advanced to Execution phase."));

        phaseflow(&dir)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("(waived)"));
    }

    #[test]
    fn test_skip_required_phase_fails() {
        let dir = create_temp_project();
        init_workflow(&dir, "medium");

        phaseflow(&dir).arg("skip").assert().failure();
        assert!(state_file(&dir).contains("status: in_progress"));
    }

    #[test]
    fn test_output_recorded_in_status() {
        let dir = create_temp_project();
        init_workflow(&dir, "medium");

        phaseflow(&dir)
            .args(["output", "planning", "docs/plan.md"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Recorded 'docs/plan.md' under Planning"));

        phaseflow(&dir)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("[1 output]"));

        assert!(state_file(&dir).contains("docs/plan.md"));
    }

    #[test]
    fn test_output_unknown_phase_fails() {
        let dir = create_temp_project();
        init_workflow(&dir, "medium");

        phaseflow(&dir)
            .args(["output", "deployment", "x.md"])
            .assert()
            .failure();
    }

    #[test]
    fn test_recommend_for_current_phase() {
        let dir = create_temp_project();
        init_workflow(&dir, "large");

        phaseflow(&dir)
            .arg("recommend")
            .assert()
            .success()
            .stdout(predicate::str::contains("architect"))
            .stdout(predicate::str::contains("requirements-analysis"));
    }

    #[test]
    fn test_recommend_without_workflow_fails() {
        let dir = create_temp_project();
        phaseflow(&dir).arg("recommend").assert().failure();
    }

    #[test]
    fn test_reset_force() {
        let dir = create_temp_project();
        init_workflow(&dir, "quick");

        phaseflow(&dir)
            .args(["reset", "--force"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Reset complete"));

        assert!(!dir.path().join(".phaseflow/workflow.yaml").exists());

        phaseflow(&dir)
            .args(["reset", "--force"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No workflow to reset"));
    }

    #[test]
    fn test_corrupt_state_is_recovered() {
        let dir = create_temp_project();
        init_workflow(&dir, "small");

        let path = dir.path().join(".phaseflow/workflow.yaml");
        let yaml = fs::read_to_string(&path)
            .unwrap()
            .replace("scale: small", "scale: gigantic");
        fs::write(&path, yaml).unwrap();

        phaseflow(&dir)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("Scale:    Medium"));
    }

    #[test]
    fn test_recommend_reports_recovery_warnings_once() {
        let dir = create_temp_project();
        init_workflow(&dir, "small");

        let path = dir.path().join(".phaseflow/workflow.yaml");
        let yaml = fs::read_to_string(&path)
            .unwrap()
            .replace("scale: small", "scale: gigantic");
        fs::write(&path, yaml).unwrap();

        phaseflow(&dir)
            .arg("recommend")
            .assert()
            .success()
            .stdout(predicate::str::contains("product-manager"))
            .stderr(predicate::str::contains("Missing or invalid 'scale'").count(1));
    }

    #[test]
    fn test_undecodable_record_blocks_init() {
        let dir = create_temp_project();
        let meta = dir.path().join(".phaseflow");
        fs::create_dir_all(&meta).unwrap();
        fs::write(meta.join("workflow.yaml"), [0xff, 0xfe, b'n', b'a', b'm', b'e']).unwrap();

        phaseflow(&dir)
            .args(["init", "demo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }
}

// =============================================================================
// Gate Tests
// =============================================================================

mod gates {
    use super::*;

    #[test]
    fn test_advance_blocked_by_configured_gate() {
        let dir = create_temp_project();
        write_config(
            &dir,
            r#"
[[gates]]
type = "require_tests"
phases = ["Execution->Validation"]
config = { markers = ["phaseflow-test.marker"] }
"#,
        );
        init_workflow(&dir, "quick");
        phaseflow(&dir).arg("complete").assert().success();

        phaseflow(&dir)
            .arg("advance")
            .assert()
            .failure()
            .stdout(predicate::str::contains("Transition blocked"))
            .stdout(predicate::str::contains("phaseflow-test.marker"))
            .stdout(predicate::str::contains("To unblock:"));

        assert!(state_file(&dir).contains("current_phase: execution"));

        fs::write(dir.path().join("phaseflow-test.marker"), "").unwrap();

        phaseflow(&dir)
            .arg("advance")
            .assert()
            .success()
            .stdout(predicate::str::contains("Advanced to Validation phase."));
    }

    #[test]
    fn test_wildcard_gate_blocks_unknown_type() {
        let dir = create_temp_project();
        write_config(
            &dir,
            r#"
[[gates]]
type = "require_luck"
phases = ["*->Validation"]
"#,
        );
        init_workflow(&dir, "quick");
        phaseflow(&dir).arg("complete").assert().success();

        phaseflow(&dir)
            .arg("advance")
            .assert()
            .failure()
            .stdout(predicate::str::contains("require_luck"));
    }

    #[test]
    fn test_gate_on_other_transition_does_not_run() {
        let dir = create_temp_project();
        write_config(
            &dir,
            r#"
[[gates]]
type = "require_tests"
phases = ["Validation->Confirmation"]
config = { markers = ["missing.marker"] }
"#,
        );
        init_workflow(&dir, "quick");
        phaseflow(&dir).arg("complete").assert().success();
        phaseflow(&dir).arg("advance").assert().success();
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = create_temp_project();

        phaseflow(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No phaseflow.toml found"));
    }

    #[test]
    fn test_config_init_creates_toml() {
        let dir = create_temp_project();

        phaseflow(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created phaseflow.toml"));

        let content = fs::read_to_string(dir.path().join(".phaseflow/phaseflow.toml")).unwrap();
        assert!(content.contains("require_plan"));
        assert!(content.contains("default_scale"));

        phaseflow(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_config_validate_no_config() {
        let dir = create_temp_project();

        phaseflow(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Using defaults (valid)"));
    }

    #[test]
    fn test_config_validate_starter_is_valid() {
        let dir = create_temp_project();
        phaseflow(&dir).args(["config", "init"]).assert().success();

        phaseflow(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = create_temp_project();
        write_config(
            &dir,
            r#"
[[gates]]
type = "require_luck"
phases = ["Planning->Deploy"]
"#,
        );

        phaseflow(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration warnings:"))
            .stdout(predicate::str::contains("unknown type 'require_luck'"))
            .stdout(predicate::str::contains("unknown phase 'Deploy'"));
    }

    #[test]
    fn test_config_show_lists_gates() {
        let dir = create_temp_project();
        phaseflow(&dir).args(["config", "init"]).assert().success();

        phaseflow(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[[gates]]"))
            .stdout(predicate::str::contains("require_security"))
            .stdout(predicate::str::contains("default_scale = \"medium\""));
    }

    #[test]
    fn test_config_default_scale_used_by_init() {
        let dir = create_temp_project();
        write_config(&dir, "[workflow]\ndefault_scale = \"small\"\n");

        phaseflow(&dir)
            .args(["init", "demo"])
            .assert()
            .success()
            .stdout(predicate::str::contains("(Small scale)"));
    }
}
