//! Workflow commands: init, status, complete, skip, advance, output,
//! recommend and reset.

use anyhow::{Context, Result};
use std::path::Path;

use phaseflow::config::PhaseflowConfig;
use phaseflow::orchestrator::Orchestrator;
use phaseflow::phase::PhaseId;
use phaseflow::report::TracingReporter;
use phaseflow::scale::{Scale, parse_scale};
use phaseflow::ui::icons::{BLOCKER, CHECK, SPARKLE};
use phaseflow::WorkflowError;

/// Orchestrator wired with the project's configured gates.
fn orchestrator(project_dir: &Path) -> Result<Orchestrator> {
    let config = PhaseflowConfig::new(project_dir.to_path_buf())?;
    Ok(Orchestrator::new(project_dir).with_gates(config.toml.gates))
}

pub fn cmd_init(project_dir: &Path, name: &str, scale: Option<String>) -> Result<()> {
    let config = PhaseflowConfig::with_cli_args(project_dir.to_path_buf(), scale)?;
    let scale = match config.scale_text() {
        Some(text) => parse_scale(&text, &TracingReporter),
        None => Scale::default(),
    };

    let orch = Orchestrator::new(project_dir).with_gates(config.toml.gates);
    let state = orch.init(name, scale)?;

    println!();
    println!(
        "{}Initialized workflow '{}' ({} scale)",
        SPARKLE,
        state.name,
        state.scale.label()
    );
    println!();
    print!("{}", orch.summary()?);
    println!();
    Ok(())
}

pub fn cmd_status(project_dir: &Path) -> Result<()> {
    let orch = orchestrator(project_dir)?;

    println!();
    match orch.status()? {
        None => {
            println!("No workflow in this project.");
            println!();
            println!("Run 'phaseflow init <name>' to start one.");
        }
        Some(state) => {
            print!("{}", phaseflow::orchestrator::render_summary(&state));
            if state.is_complete() {
                println!();
                println!("{}Workflow complete", CHECK);
            }
        }
    }
    println!();
    Ok(())
}

pub fn cmd_complete(project_dir: &Path) -> Result<()> {
    let orch = orchestrator(project_dir)?;
    let state = orch.complete_current_phase()?;
    println!(
        "{}{} phase completed. Run 'phaseflow advance' to continue.",
        CHECK, state.current_phase
    );
    Ok(())
}

pub fn cmd_skip(project_dir: &Path) -> Result<()> {
    let orch = orchestrator(project_dir)?;
    let state = orch.skip_current_phase()?;
    println!(
        "{} phase skipped. Run 'phaseflow advance' to continue.",
        state.current_phase
    );
    Ok(())
}

pub async fn cmd_advance(project_dir: &Path) -> Result<()> {
    let orch = orchestrator(project_dir)?;

    match orch.advance().await {
        Ok(Some(phase)) => {
            println!("Advanced to {} phase.", phase);
            print_recommendations(phase);
            Ok(())
        }
        Ok(None) => {
            println!("{}Workflow complete. All phases are done.", SPARKLE);
            Ok(())
        }
        Err(err @ WorkflowError::GateCheck { .. }) => {
            println!();
            println!("{}{}", BLOCKER, console::style("Transition blocked").bold().red());
            if let WorkflowError::GateCheck { reason, hints } = &err {
                for part in reason.split("; ") {
                    println!("  - {}", part);
                }
                if !hints.is_empty() {
                    println!();
                    println!("To unblock:");
                    for hint in hints {
                        println!("  {} {}", console::style("→").dim(), hint);
                    }
                }
            }
            println!();
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

pub fn cmd_output(project_dir: &Path, phase: &str, reference: &str) -> Result<()> {
    let phase: PhaseId = phase.parse()?;
    let orch = orchestrator(project_dir)?;
    let state = orch.append_output(phase, reference)?;
    println!(
        "Recorded '{}' under {} ({} output{})",
        reference,
        phase,
        state.outputs(phase).len(),
        if state.outputs(phase).len() == 1 { "" } else { "s" }
    );
    Ok(())
}

pub fn cmd_recommend(project_dir: &Path) -> Result<()> {
    let orch = orchestrator(project_dir)?;
    let state = orch
        .status()?
        .context("No workflow in this project. Run 'phaseflow init <name>' first")?;
    print_recommendations(state.current_phase);
    Ok(())
}

fn print_recommendations(phase: PhaseId) {
    let info = phase.info();
    println!();
    println!("{}: {}", console::style(info.name).bold(), info.description);
    println!("  Agents: {}", info.agents.join(", "));
    println!("  Skills: {}", info.skills.join(", "));
    println!();
}

pub fn cmd_reset(project_dir: &Path, force: bool) -> Result<()> {
    use dialoguer::Confirm;

    let orch = orchestrator(project_dir)?;
    if !orch.store().exists() {
        println!("No workflow to reset");
        return Ok(());
    }

    if !force {
        let confirm = Confirm::new()
            .with_prompt("This will delete all workflow progress. Are you sure?")
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirm {
            println!("Reset cancelled");
            return Ok(());
        }
    }

    orch.store().remove()?;
    println!("Reset complete");
    Ok(())
}
