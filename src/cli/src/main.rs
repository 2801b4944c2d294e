//! wsaccess - inspect workspace hierarchies and effective access from exported data.
//!
//! Input files are JSON arrays in the console's camelCase wire format.

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{effective, tree, validate};
use output::OutputFormat;
use wsaccess_core::config::Config;
use wsaccess_core::telemetry;

/// Workspace hierarchy and effective access inspector
#[derive(Parser)]
#[command(
    name = "wsaccess",
    version,
    about = "Inspect workspace hierarchies and effective access",
    long_about = "Builds the workspace tree from exported records, then searches it, restricts it \
                  to a caller's permissions, or resolves inherited role bindings.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Configuration file (environment variables with the WSACCESS_ prefix override it)
    #[arg(short, long, global = true, env = "WSACCESS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level for diagnostics on stderr
    #[arg(long, global = true, default_value = "warn", env = "WSACCESS_LOG_LEVEL")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the workspace hierarchy, optionally searched and restricted
    Tree(tree::TreeArgs),

    /// Show the effective role bindings of one workspace
    Effective(effective::EffectiveArgs),

    /// Check that the records form a valid hierarchy
    Validate(validate::ValidateArgs),
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load().context("Failed to load configuration from environment")?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let result = run(cli).await;

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_ref())?;
    config.logging.level = cli.log_level.clone();
    config.logging.ansi = !cli.no_color;
    telemetry::init_telemetry(&config.logging)?;

    let format = cli.output;
    match cli.command {
        Commands::Tree(args) => tree::execute(args, &config, format).await,
        Commands::Effective(args) => effective::execute(args, &config, format).await,
        Commands::Validate(args) => validate::execute(args, &config, format),
    }
}
