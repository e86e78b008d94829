//! triad CLI, the main entry point.
//!
//! Commands:
//! - `analyze`   Profile a request across all three pillars
//! - `status`    Show settings and subsystem inventory
//! - `doctor`    Diagnose configuration and engine health
//! - `config`    Show, locate or create the settings file
//! - `gates`     List or run validation rules
//! - `profiles`  List or activate activation profiles
//! - `monitor`   Unified monitoring report and integration dashboard

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use triad_config::Settings;

mod commands;

#[derive(Parser)]
#[command(
    name = "triad",
    about = "triad: technical, behavioral and semantic profiling of agent requests",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to configs/{ENVIRONMENT}.yaml)
    #[arg(short, long, global = true, env = "TRIAD_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a free-text request and recommend a configuration
    Analyze {
        /// The request, as a user would phrase it
        text: String,

        /// Target framework (autogen, crewai, semantic_kernel, langgraph, langroid)
        #[arg(short, long)]
        framework: Option<String>,

        /// Print the full response as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Show settings and subsystem inventory
    Status,

    /// Diagnose configuration and engine health
    Doctor,

    /// Settings file management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Validation gate rules
    Gates {
        #[command(subcommand)]
        action: GatesAction,
    },

    /// Activation profiles
    Profiles {
        #[command(subcommand)]
        action: ProfilesAction,
    },

    /// Run unified monitoring and print the integration dashboard
    Monitor {
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective settings as YAML
    Show,
    /// Print the settings file path
    Path,
    /// Write a settings file with defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum GatesAction {
    /// List every registered rule
    List,
    /// Run the rules of one gate, or all of them
    Run {
        /// Gate category (technical_validation, behavioral_integrity, ...)
        #[arg(short, long)]
        gate: Option<String>,

        /// Target as a JSON document
        #[arg(short, long)]
        target: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProfilesAction {
    /// List every registered profile
    List,
    /// Activate every profile of a context (technical, behavioral, semantic, integration)
    Activate {
        context: String,

        /// Gate activation on the frequency predictor
        #[arg(long)]
        predict: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Settings::default_path);

    // These must work even when the settings file is missing or broken.
    match &cli.command {
        Commands::Config { action } => {
            init_tracing(cli.verbose, cli.json_logs, "info");
            return match action {
                ConfigAction::Show => commands::config_cmd::show(&config_path).await,
                ConfigAction::Path => commands::config_cmd::path(&config_path).await,
                ConfigAction::Init { force } => {
                    commands::config_cmd::init(&config_path, *force).await
                }
            };
        }
        Commands::Doctor => {
            init_tracing(cli.verbose, cli.json_logs, "warn");
            return commands::doctor::run(&config_path).await;
        }
        _ => {}
    }

    let settings = load_settings(&config_path)?;
    init_tracing(cli.verbose, cli.json_logs, settings.tracing_directive());

    match cli.command {
        Commands::Analyze {
            text,
            framework,
            json,
        } => commands::analyze::run(settings, &text, framework.as_deref(), json).await?,
        Commands::Status => commands::status::run(settings, &config_path).await?,
        Commands::Gates { action } => match action {
            GatesAction::List => commands::gates::list().await?,
            GatesAction::Run { gate, target } => {
                commands::gates::run(settings, gate.as_deref(), target.as_deref()).await?
            }
        },
        Commands::Profiles { action } => match action {
            ProfilesAction::List => commands::profiles::list(settings).await?,
            ProfilesAction::Activate { context, predict } => {
                commands::profiles::activate(settings, &context, predict).await?
            }
        },
        Commands::Monitor { json } => commands::monitor::run(settings, json).await?,
        Commands::Config { .. } | Commands::Doctor => {}
    }

    Ok(())
}

fn load_settings(path: &Path) -> Result<Settings, Box<dyn std::error::Error>> {
    Ok(Settings::load_from(path).map_err(|e| format!("Failed to load config: {e}"))?)
}

/// `RUST_LOG` wins; otherwise `--verbose` or the configured level.
fn init_tracing(verbose: bool, json: bool, configured: &str) {
    let fallback = if verbose { "debug" } else { configured };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
