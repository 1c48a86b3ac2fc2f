//! Configuration view and validation commands: `phaseflow config`.

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use phaseflow::config::{PhaseflowConfig, PhaseflowToml, SCALE_ENV};
    use phaseflow::gates::GateRegistry;

    let config = PhaseflowConfig::new(project_dir.to_path_buf())?;
    let config_path = config.config_path();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Phaseflow Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();

                let toml = &config.toml;
                println!("[workflow]");
                match &toml.workflow.default_scale {
                    Some(scale) => println!("  default_scale = \"{}\"", scale),
                    None => println!("  default_scale = (unset)"),
                }
                println!();

                if toml.gates.is_empty() {
                    println!("No gates configured. Every transition is allowed.");
                    println!();
                }
                for gate in &toml.gates {
                    println!("[[gates]]");
                    println!("  type = \"{}\"", gate.gate_type);
                    println!("  phases = [{}]", quoted(&gate.phases));
                    if let Some(cfg) = &gate.config {
                        println!("  config = {}", cfg);
                    }
                    println!();
                }
            } else {
                println!("No phaseflow.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration: no gates, medium scale.");
                println!();
                println!("Run 'phaseflow config init' to create a phaseflow.toml file.");
                println!();
            }

            println!("Effective values (with env overrides):");
            match config.scale_text() {
                Some(text) => println!("  scale = \"{}\"", text),
                None => println!("  scale = \"medium\" (default)"),
            }
            if std::env::var(SCALE_ENV).is_ok() {
                println!("  ({} is set)", SCALE_ENV);
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No phaseflow.toml found. Using defaults (valid).");
                return Ok(());
            }

            let warnings = config.toml.validate(&GateRegistry::new());

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("phaseflow.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !config.meta_dir.exists() {
                std::fs::create_dir_all(&config.meta_dir)?;
            }

            PhaseflowToml::starter().save(&config_path)?;

            println!("Created phaseflow.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [workflow] default_scale");
            println!("  - [[gates]] type, phases and config");
            println!();
        }
    }

    Ok(())
}

fn quoted(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("\"{}\"", item))
        .collect::<Vec<_>>()
        .join(", ")
}
