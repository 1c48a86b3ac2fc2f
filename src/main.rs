use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "phaseflow")]
#[command(version, about = "Scale-aware project workflow orchestrator")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a new workflow in this project
    Init {
        /// Workflow name
        name: String,
        /// Project scale: quick, small, medium, large (overrides PHASEFLOW_SCALE and phaseflow.toml)
        #[arg(short, long)]
        scale: Option<String>,
    },
    /// Show the workflow summary
    Status,
    /// Mark the current phase completed
    Complete,
    /// Skip the current phase (optional phases only)
    Skip,
    /// Move to the next phase, subject to configured gates
    Advance,
    /// Record an artifact reference under a phase
    Output {
        /// Phase name (planning, review, execution, validation, confirmation)
        phase: String,
        /// Reference to record, e.g. a document path
        reference: String,
    },
    /// Show recommended agents and skills for the current phase
    Recommend,
    /// Delete the workflow record
    Reset {
        #[arg(long)]
        force: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a starter phaseflow.toml file
    Init,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Init { name, scale } => cmd::cmd_init(&project_dir, name, scale.clone())?,
        Commands::Status => cmd::cmd_status(&project_dir)?,
        Commands::Complete => cmd::cmd_complete(&project_dir)?,
        Commands::Skip => cmd::cmd_skip(&project_dir)?,
        Commands::Advance => cmd::cmd_advance(&project_dir).await?,
        Commands::Output { phase, reference } => cmd::cmd_output(&project_dir, phase, reference)?,
        Commands::Recommend => cmd::cmd_recommend(&project_dir)?,
        Commands::Reset { force } => cmd::cmd_reset(&project_dir, *force)?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
