//! Omphalos CLI
//!
//! # Commands
//!
//! - `init`: write the starter systems CSV (or the Guardian stub with `--guardian`)
//! - `score`: rank every system by Raxxla Likelihood Index
//! - `geometry`: repeated distances, colinear triplets, radial spokes
//! - `lore`: acrostics, numbers and word counts in a lore text
//! - `log-jump`: append a witch-space jump to the log
//! - `report-jumps`: summarize anomaly-flagged jumps
//! - `export-viz`: node/link JSON for the 3D viewer
//!
//! Exit code 1 on any error.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use omphalos_cli::commands::{
    self, ExportVizArgs, GeometryArgs, InitArgs, LogJumpArgs, LoreArgs, ReportJumpsArgs,
    ScoreArgs,
};
use omphalos_cli::config::{CliOverrides, OmphalosConfig};

/// Omphalos - Raxxla hunt toolkit
#[derive(Parser)]
#[command(name = "omphalos")]
#[command(version)]
#[command(about = "Rank candidate systems by Raxxla Likelihood Index and examine their geometry")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to ./omphalos.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the hunt data files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the starter systems CSV
    Init(InitArgs),
    /// Score and rank every system
    Score(ScoreArgs),
    /// Look for geometric patterns between systems
    Geometry(GeometryArgs),
    /// Cipher-style analysis of a text under the lore samples directory
    Lore(LoreArgs),
    /// Append a witch-space jump to the log
    LogJump(LogJumpArgs),
    /// Summarize anomaly-flagged jumps
    ReportJumps(ReportJumpsArgs),
    /// Export the viewer document
    ExportViz(ExportVizArgs),
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let overrides = CliOverrides {
        data_dir: cli.data_dir,
        weights: match &cli.command {
            Commands::Score(args) => args.weights,
            _ => None,
        },
    };
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let config = OmphalosConfig::load(cli.config.as_deref(), &cwd, Some(&overrides))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match &cli.command {
        Commands::Init(args) => commands::run_init(&config, args, &mut out),
        Commands::Score(args) => commands::run_score(&config, args, &mut out),
        Commands::Geometry(args) => commands::run_geometry(&config, args, &mut out),
        Commands::Lore(args) => commands::run_lore(&config, args, &mut out),
        Commands::LogJump(args) => {
            commands::run_log_jump(&config, args, chrono::Utc::now(), &mut out)
        }
        Commands::ReportJumps(args) => commands::run_report_jumps(&config, args, &mut out),
        Commands::ExportViz(args) => commands::run_export_viz(&config, args, &mut out),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
