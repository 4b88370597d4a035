//! Typed run outcomes and the classification of finished executions.

use crate::exit_codes;
use crate::executor::{Execution, ProcessState};
use serde::Serialize;
use std::path::PathBuf;

/// Exit code recorded for runs that never produced one.
pub const SENTINEL_EXIT_CODE: i32 = -1;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// The processor exited with code 0.
    Succeeded,
    /// The processor exited nonzero, or the run hit an internal fault.
    Failed { exit_code: i32, stderr: String },
    /// The run was cancelled before the processor exited.
    Cancelled,
    /// Nothing ran: a precondition failed or the OS refused to start the process.
    FailedToStart { reason: String },
}

/// Everything the caller learns about one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub stdout: String,
    pub stderr: String,
    pub output_path: PathBuf,
    /// Short user-facing summary.
    pub message: String,
    /// Run record written for this run, when writing succeeded.
    pub log_path: Option<PathBuf>,
}

impl RunOutcome {
    /// Outcome for a run rejected before anything was spawned.
    pub fn failed_to_start(reason: impl Into<String>, output_path: PathBuf) -> Self {
        let reason = reason.into();
        Self {
            message: format!("Processing could not be started: {}", reason),
            status: RunStatus::FailedToStart { reason },
            stdout: String::new(),
            stderr: String::new(),
            output_path,
            log_path: None,
        }
    }

    /// Outcome for a run cancelled before spawning.
    pub fn cancelled(output_path: PathBuf) -> Self {
        Self {
            status: RunStatus::Cancelled,
            stdout: String::new(),
            stderr: String::new(),
            output_path,
            message: cancelled_message(),
            log_path: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }

    /// Process exit code, or [`SENTINEL_EXIT_CODE`] when none was produced.
    pub fn exit_code(&self) -> i32 {
        match &self.status {
            RunStatus::Succeeded => 0,
            RunStatus::Failed { exit_code, .. } => *exit_code,
            RunStatus::Cancelled | RunStatus::FailedToStart { .. } => SENTINEL_EXIT_CODE,
        }
    }

    /// CLI exit code for this outcome.
    pub fn cli_exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Succeeded => exit_codes::SUCCESS,
            RunStatus::Failed { .. } => exit_codes::PIPELINE_FAILURE,
            RunStatus::Cancelled => exit_codes::CANCELLED,
            RunStatus::FailedToStart { .. } => exit_codes::START_FAILURE,
        }
    }
}

fn cancelled_message() -> String {
    "Processing was cancelled. Child processes started by the processor may still be running."
        .to_string()
}

/// Map a finished execution to a run outcome.
///
/// Cancellation and start failure are taken from the execution state as-is;
/// only a natural exit is judged by its exit code.
pub fn classify(execution: Execution, output_path: PathBuf) -> RunOutcome {
    let Execution {
        state,
        stdout,
        stderr,
        ..
    } = execution;

    let (status, message) = match state {
        ProcessState::Completed(0) => (
            RunStatus::Succeeded,
            "Processing completed successfully.".to_string(),
        ),
        ProcessState::Completed(code) => (
            RunStatus::Failed {
                exit_code: code,
                stderr: stderr.clone(),
            },
            format!("Processing failed with exit code {}.", code),
        ),
        ProcessState::Cancelled => (RunStatus::Cancelled, cancelled_message()),
        ProcessState::FailedToStart(reason) => {
            let message = format!("Processing could not be started: {}", reason);
            (RunStatus::FailedToStart { reason }, message)
        }
        // An execution is only returned in a terminal state.
        ProcessState::NotStarted | ProcessState::Running => (
            RunStatus::Failed {
                exit_code: SENTINEL_EXIT_CODE,
                stderr: stderr.clone(),
            },
            "Processing ended in an unknown state.".to_string(),
        ),
    };

    RunOutcome {
        status,
        stdout,
        stderr,
        output_path,
        message,
        log_path: None,
    }
}
