//! Error types for bimbridge.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Below the orchestrator these errors are converted into a typed `RunOutcome`;
//! only the CLI surfaces them directly.

use crate::exit_codes;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for bimbridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The settings file could not be read or parsed.
    #[error("failed to load pipeline settings from '{path}': {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    /// The configured standalone executable does not exist.
    #[error(
        "configured bimto3dprint executable not found: '{0}'\n\
         Fix: correct `standaloneExecutablePath` in the settings file or clear it to use the interpreter."
    )]
    ExecutableNotFound(PathBuf),

    /// The operating system refused to start the process.
    #[error("failed to start '{program}': {reason}")]
    ProcessStart { program: String, reason: String },

    /// The request violates a precondition checked before spawning.
    #[error("invalid run request: {0}")]
    InvalidRequest(String),

    /// Checking the status of a running child failed.
    #[error("failed to check process status: {0}")]
    ProcessWait(String),

    /// A run record could not be written or read.
    #[error("run log error at '{path}': {reason}")]
    RunLog { path: PathBuf, reason: String },

    /// An invariant inside bimbridge was broken.
    #[error("internal error: {0}")]
    Internal(String),

    /// User provided invalid arguments.
    #[error("{0}")]
    UserError(String),
}

impl BridgeError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            BridgeError::ConfigLoad { .. } => exit_codes::USER_ERROR,
            BridgeError::ExecutableNotFound(_) => exit_codes::START_FAILURE,
            BridgeError::ProcessStart { .. } => exit_codes::START_FAILURE,
            BridgeError::InvalidRequest(_) => exit_codes::START_FAILURE,
            BridgeError::ProcessWait(_) => exit_codes::PIPELINE_FAILURE,
            BridgeError::RunLog { .. } => exit_codes::USER_ERROR,
            BridgeError::Internal(_) => exit_codes::PIPELINE_FAILURE,
            BridgeError::UserError(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for bimbridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
