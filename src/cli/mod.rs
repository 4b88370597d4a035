//! CLI argument parsing for bimbridge.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// bimbridge: run the bimto3dprint processor on an exported model.
///
/// Resolves how to launch the processor from a settings file, runs it with
/// live output, and keeps a record of every run in a log directory.
#[derive(Parser, Debug)]
#[command(name = "bimbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for bimbridge.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the processor on one input file.
    ///
    /// Blocks until the processor exits. Exit code 2 means the processor
    /// failed, 3 that it could not be started, 4 that the run was cancelled.
    Run(RunArgs),

    /// Show the resolved pipeline settings and invocation mode.
    Settings(SettingsArgs),

    /// List run records, newest first.
    Logs(LogsArgs),
}

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Exported model to process (e.g. model.ifc).
    pub input: PathBuf,

    /// Conversion preset name.
    #[arg(short, long, default_value = "default")]
    pub preset: String,

    /// Output file. Defaults to the input path with the format's extension.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (stl, obj, 3mf, ...).
    #[arg(short, long, default_value = "stl")]
    pub format: String,

    /// Minimum wall thickness in millimeters.
    #[arg(long, default_value_t = 2.0, conflicts_with = "no_thicken")]
    pub min_wall_mm: f64,

    /// Skip wall thickening.
    #[arg(long)]
    pub no_thicken: bool,

    /// Settings file (default: bimto3dprint.settings.json next to the executable).
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Directory for run records (default: Logs next to the executable).
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Cancel the run after this long (e.g. 90s, 5m).
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// Do not echo the processor's output while it runs.
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the command that would be executed without running it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `settings` command.
#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// Settings file (default: bimto3dprint.settings.json next to the executable).
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Print as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `logs` command.
#[derive(Args, Debug)]
pub struct LogsArgs {
    #[command(subcommand)]
    pub action: Option<LogsAction>,

    /// Directory holding run records (default: Logs next to the executable).
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Show at most this many records.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

/// Subcommands for `logs`.
#[derive(Subcommand, Debug)]
pub enum LogsAction {
    /// Print one run record.
    Show(LogsShowArgs),
}

/// Arguments for `logs show`.
#[derive(Args, Debug)]
pub struct LogsShowArgs {
    /// Record path, file name or run id.
    pub record: String,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
