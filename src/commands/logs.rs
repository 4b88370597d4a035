//! Implementation of the `bimbridge logs` command.
//!
//! Lists run records newest first, or prints one record.

use crate::cli::{LogsAction, LogsArgs};
use bimbridge::error::{BridgeError, Result};
use bimbridge::exit_codes;
use bimbridge::run_log::{LOG_FILE_EXTENSION, RunLogger, list_records, read_record};
use std::path::{Path, PathBuf};

/// Execute the `bimbridge logs` command.
pub fn cmd_logs(args: LogsArgs) -> Result<i32> {
    let log_dir = args.log_dir.unwrap_or_else(RunLogger::default_dir);

    match args.action {
        None => cmd_logs_list(&log_dir, args.limit),
        Some(LogsAction::Show(show)) => cmd_logs_show(&log_dir, &show.record),
    }
}

fn cmd_logs_list(log_dir: &Path, limit: usize) -> Result<i32> {
    let records = list_records(log_dir)?;

    if records.is_empty() {
        println!("No run records in {}", log_dir.display());
        return Ok(exit_codes::SUCCESS);
    }

    println!("Run records in {} (newest first):", log_dir.display());
    println!();
    for entry in records.iter().take(limit) {
        // A record that cannot be parsed still shows up, without an exit code.
        let exit = match read_record(&entry.path) {
            Ok(record) => record.exit_code.to_string(),
            Err(_) => "?".to_string(),
        };
        println!("  {:40} exit {:>4}  {:>8} bytes", entry.run_id, exit, entry.size);
    }
    if records.len() > limit {
        println!();
        println!("  ... {} older record(s) not shown", records.len() - limit);
    }

    Ok(exit_codes::SUCCESS)
}

fn cmd_logs_show(log_dir: &Path, record: &str) -> Result<i32> {
    let path = resolve_record_path(log_dir, record).ok_or_else(|| {
        BridgeError::UserError(format!(
            "run record not found: '{}'\n\
             Fix: pass a record path, or a run id listed by `bimbridge logs`.",
            record
        ))
    })?;
    let record = read_record(&path)?;

    println!("Record: {}", path.display());
    print!("{}", record.render());
    Ok(exit_codes::SUCCESS)
}

/// Find a record given as a path, a file name in `log_dir`, or a run id.
fn resolve_record_path(log_dir: &Path, record: &str) -> Option<PathBuf> {
    let candidates = [
        PathBuf::from(record),
        log_dir.join(record),
        log_dir.join(format!("{}.{}", record, LOG_FILE_EXTENSION)),
    ];
    candidates.into_iter().find(|p| p.is_file())
}
