//! Command implementations for bimbridge.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Every command returns the process exit code on success;
//! errors are mapped to exit codes in `main`.

mod logs;
mod run;
mod settings;

use crate::cli::Command;
use bimbridge::error::Result;

/// Name of the NDJSON activity log kept inside the log directory.
pub const EVENT_LOG_FILE_NAME: &str = "bimbridge.ndjson";

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<i32> {
    match command {
        Command::Run(args) => run::cmd_run(args),
        Command::Settings(args) => settings::cmd_settings(args),
        Command::Logs(args) => logs::cmd_logs(args),
    }
}
