//! One end-to-end pipeline run.
//!
//! [`Orchestrator::run`] resolves the invocation, validates the request,
//! spawns the external processor, classifies its result and writes a run
//! record. It always returns a [`RunOutcome`]: internal errors and panics are
//! turned into a failure outcome at this boundary.

use crate::args::build_command_line;
use crate::error::{BridgeError, Result};
use crate::events::{Event, EventAction, EventSink};
use crate::executor::{CancelToken, CapturedOutput, OutputLine, ProcessExecutor};
use crate::outcome::{RunOutcome, RunStatus, SENTINEL_EXIT_CODE, classify};
use crate::request::RunRequest;
use crate::run_log::{LogRecord, RunLogger};
use crate::settings::{Invocation, PipelineSettings, resolve_settings};
use serde_json::json;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

/// Sequences settings, arguments, execution, classification and run records.
pub struct Orchestrator {
    settings: PipelineSettings,
    logger: RunLogger,
    events: Arc<dyn EventSink>,
    executor: ProcessExecutor,
}

impl Orchestrator {
    pub fn new(settings: PipelineSettings, logger: RunLogger, events: Arc<dyn EventSink>) -> Self {
        Self {
            settings,
            logger,
            events,
            executor: ProcessExecutor::new(),
        }
    }

    /// Build an orchestrator from a settings file, falling back to defaults.
    pub fn from_settings_file(path: &Path, logger: RunLogger, events: Arc<dyn EventSink>) -> Self {
        let settings = resolve_settings(path, events.as_ref());
        Self::new(settings, logger, events)
    }

    pub fn with_executor(mut self, executor: ProcessExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn logger(&self) -> &RunLogger {
        &self.logger
    }

    /// Run the pipeline for `request`, blocking until it exits or is cancelled.
    pub fn run(&self, request: &RunRequest, cancel: &CancelToken) -> RunOutcome {
        self.run_with_observer(request, cancel, &mut |_| {})
    }

    /// Like [`Orchestrator::run`], passing every output line to `observer` as it arrives.
    pub fn run_with_observer(
        &self,
        request: &RunRequest,
        cancel: &CancelToken,
        observer: &mut dyn FnMut(&OutputLine),
    ) -> RunOutcome {
        // Lines seen so far, kept so a faulted run still records its output.
        let mut seen = CapturedOutput::default();
        let mut tee = |line: &OutputLine| {
            seen.push(line.clone());
            observer(line);
        };

        let result = guarded(|| self.execute(request, cancel, &mut tee));
        let mut outcome = match result {
            Ok(outcome) => outcome,
            Err(fault) => {
                self.report_fault(&fault);
                let (stdout, stderr) = seen.into_text();
                let mut outcome = RunOutcome {
                    status: RunStatus::Succeeded,
                    stdout,
                    stderr,
                    output_path: request.output_path.clone(),
                    message: String::new(),
                    log_path: None,
                };
                apply_fault(&mut outcome, &fault);
                outcome
            }
        };

        let record = LogRecord::from_outcome(&outcome);
        match guarded(|| self.logger.write(&record)) {
            Ok(saved) => {
                self.events.record(
                    &Event::info(
                        EventAction::RecordSaved,
                        format!("pipeline log saved: {}", saved.path.display()),
                    )
                    .with_details(json!({
                        "run_id": saved.run_id,
                        "path": saved.path.display().to_string(),
                        "exit_code": record.exit_code,
                    })),
                );
                outcome.log_path = Some(saved.path);
            }
            Err(fault) => {
                self.report_fault(&fault);
                apply_fault(&mut outcome, &fault);
            }
        }

        outcome
    }

    fn execute(
        &self,
        request: &RunRequest,
        cancel: &CancelToken,
        observer: &mut dyn FnMut(&OutputLine),
    ) -> Result<RunOutcome> {
        let invocation = self.settings.invocation();

        if let Err(e) = self.check_preconditions(request, &invocation) {
            self.events.record(
                &Event::warn(EventAction::RunRejected, e.to_string())
                    .with_details(json!({ "input": request.input_path.display().to_string() })),
            );
            return Ok(RunOutcome::failed_to_start(
                e.to_string(),
                request.output_path.clone(),
            ));
        }

        if cancel.is_cancelled() {
            self.events.record(&Event::warn(
                EventAction::RunCancelled,
                "run cancelled before the pipeline was started",
            ));
            return Ok(RunOutcome::cancelled(request.output_path.clone()));
        }

        let request = match request.absolutized() {
            Ok(request) => request,
            Err(e) => {
                self.events
                    .record(&Event::warn(EventAction::RunRejected, e.to_string()));
                return Ok(RunOutcome::failed_to_start(
                    e.to_string(),
                    request.output_path.clone(),
                ));
            }
        };

        let command = build_command_line(&request, &self.settings, &invocation);
        tracing::debug!(command = %command, "spawning pipeline");
        self.events.record(
            &Event::info(
                EventAction::RunStart,
                format!("starting pipeline: {}", invocation),
            )
            .with_details(json!({
                "invocation": invocation,
                "args": command.args_lossy(),
                "working_dir": command.working_dir.as_ref().map(|d| d.display().to_string()),
                "input": request.input_path.display().to_string(),
                "output": request.output_path.display().to_string(),
            })),
        );

        let execution = self.executor.execute(&command, cancel, observer)?;
        let duration_ms = execution.duration.as_millis() as u64;
        let outcome = classify(execution, request.output_path.clone());
        self.report_outcome(&outcome, duration_ms);
        Ok(outcome)
    }

    fn check_preconditions(&self, request: &RunRequest, invocation: &Invocation) -> Result<()> {
        request.validate()?;

        if let Invocation::Standalone { executable } = invocation
            && !executable.is_file()
        {
            return Err(BridgeError::ExecutableNotFound(executable.clone()));
        }

        Ok(())
    }

    fn report_outcome(&self, outcome: &RunOutcome, duration_ms: u64) {
        let mut details = json!({
            "exit_code": outcome.exit_code(),
            "duration_ms": duration_ms,
            "output": outcome.output_path.display().to_string(),
        });

        let event = match &outcome.status {
            RunStatus::Succeeded => Event::info(EventAction::RunComplete, &outcome.message),
            RunStatus::Failed { stderr, .. } => {
                details["stderr"] = json!(stderr);
                Event::error(EventAction::RunFailed, &outcome.message)
            }
            RunStatus::Cancelled => Event::warn(EventAction::RunCancelled, &outcome.message),
            RunStatus::FailedToStart { reason } => {
                details["reason"] = json!(reason);
                Event::error(EventAction::StartFailed, &outcome.message)
            }
        };

        self.events.record(&event.with_details(details));
    }

    fn report_fault(&self, fault: &str) {
        self.events.record(&Event::error(
            EventAction::Fault,
            format!("unexpected pipeline fault: {}", fault),
        ));
    }
}

/// Turn an internal fault into a reported failure.
///
/// A run that reached the processor becomes `Failed` with the sentinel exit
/// code. Cancelled and start-failed runs keep their status.
fn apply_fault(outcome: &mut RunOutcome, fault: &str) {
    match outcome.status {
        RunStatus::Succeeded | RunStatus::Failed { .. } => {
            if !outcome.stderr.is_empty() {
                outcome.stderr.push('\n');
            }
            outcome.stderr.push_str(fault);
            outcome.status = RunStatus::Failed {
                exit_code: SENTINEL_EXIT_CODE,
                stderr: outcome.stderr.clone(),
            };
            outcome.message = format!("Processing failed: {}", fault);
        }
        RunStatus::Cancelled | RunStatus::FailedToStart { .. } => {
            outcome.message = format!("{} Additionally: {}", outcome.message, fault);
        }
    }
}

/// Run `f`, converting both errors and panics into a fault description.
fn guarded<T>(f: impl FnOnce() -> Result<T>) -> std::result::Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panic: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
