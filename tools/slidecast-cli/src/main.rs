//! Slidecast CLI: convert recorded presentations into editing timelines.
//!
//! Usage:
//!   slidecast convert <DIR> <OUTPUT>   Build a timeline project from a presentation
//!   slidecast plan <DIR>               Print each slide's slice plan
//!   slidecast check                    Check external tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use slidecast_common::config::AppConfig;
use slidecast_common::time::{to_ticks, Tick};

mod commands;

#[derive(Parser)]
#[command(
    name = "slidecast",
    about = "Turn recorded web-conference presentations into editable video timelines",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a presentation directory into a timeline project
    Convert(commands::convert::ConvertArgs),

    /// Print the slice plan of every slide without rendering
    Plan {
        /// Path to the presentation directory
        path: PathBuf,

        /// Trim start (seconds)
        #[arg(long, value_parser = parse_seconds)]
        start: Option<Tick>,

        /// Trim end (seconds); defaults to the presentation length
        #[arg(long, value_parser = parse_seconds)]
        end: Option<Tick>,
    },

    /// Check that the external tools are installed
    Check,
}

/// Decimal seconds argument, e.g. `12.5`.
pub(crate) fn parse_seconds(value: &str) -> Result<Tick, String> {
    to_ticks(value).map_err(|e| e.to_string())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.log_json {
        config.logging.json = true;
    }
    slidecast_common::logging::init_logging(&config.logging);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "slidecast starting");

    match cli.command {
        Commands::Convert(args) => commands::convert::run(args, &config),
        Commands::Plan { path, start, end } => commands::plan::run(path, start, end),
        Commands::Check => commands::check::run(&config),
    }
}
