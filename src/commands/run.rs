//! Implementation of the `bimbridge run` command.
//!
//! Resolves settings, runs the processor on one input file with live output,
//! and maps the run outcome to the CLI exit code.

use super::EVENT_LOG_FILE_NAME;
use crate::cli::RunArgs;
use bimbridge::args::build_command_line;
use bimbridge::error::Result;
use bimbridge::events::{EventSink, FileEventLog, TracingEvents};
use bimbridge::executor::{CancelToken, OutputLine, StreamKind};
use bimbridge::exit_codes;
use bimbridge::orchestrator::Orchestrator;
use bimbridge::outcome::{RunOutcome, RunStatus};
use bimbridge::request::{RunRequest, derive_output_path};
use bimbridge::run_log::RunLogger;
use bimbridge::settings::{PipelineSettings, default_settings_path, resolve_settings};
use std::path::Path;
use std::sync::Arc;

/// Execute the `bimbridge run` command.
pub fn cmd_run(args: RunArgs) -> Result<i32> {
    let settings_path = args.settings.clone().unwrap_or_else(default_settings_path);
    let request = build_request(&args);

    if args.dry_run {
        let settings = resolve_settings(&settings_path, &TracingEvents);
        return dry_run(&request, &settings, &settings_path);
    }

    let log_dir = args.log_dir.clone().unwrap_or_else(RunLogger::default_dir);
    let events: Arc<dyn EventSink> = Arc::new(FileEventLog::new(log_dir.join(EVENT_LOG_FILE_NAME)));
    let orchestrator =
        Orchestrator::from_settings_file(&settings_path, RunLogger::new(&log_dir), events);

    let cancel = CancelToken::new();
    if let Err(e) = ctrlc::set_handler(interrupt_handler(cancel.clone())) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }
    if let Some(timeout) = args.timeout {
        // The deadline thread is detached; it exits once the token is cancelled
        // or the process ends.
        let _ = cancel.cancel_after(timeout.into());
    }

    let quiet = args.quiet;
    let outcome = orchestrator.run_with_observer(&request, &cancel, &mut |line: &OutputLine| {
        if quiet {
            return;
        }
        match line.stream {
            StreamKind::Stdout => println!("{}", line.text),
            StreamKind::Stderr => eprintln!("{}", line.text),
        }
    });

    if args.timeout.is_some() && outcome.is_cancelled() {
        eprintln!("Run exceeded the --timeout deadline.");
    }
    print_outcome(&outcome, quiet);
    Ok(outcome.cli_exit_code())
}

/// Ctrl-C cancels the run; the orchestrator then kills the processor and
/// records the cancellation.
fn interrupt_handler(cancel: CancelToken) -> impl FnMut() + Send + 'static {
    move || {
        tracing::debug!("interrupt received, cancelling run");
        cancel.cancel();
    }
}

fn build_request(args: &RunArgs) -> RunRequest {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| derive_output_path(&args.input, &args.format));
    let request = RunRequest::new(&args.input, &args.preset, output, &args.format);

    if args.no_thicken {
        request.with_no_thicken()
    } else {
        request.with_min_wall_mm(args.min_wall_mm)
    }
}

fn dry_run(request: &RunRequest, settings: &PipelineSettings, settings_path: &Path) -> Result<i32> {
    request.validate()?;
    let request = request.absolutized()?;
    let invocation = settings.invocation();
    let command = build_command_line(&request, settings, &invocation);

    println!("Dry run - would execute:");
    println!();
    println!("  Settings:    {}", settings_path.display());
    println!("  Invocation:  {}", invocation);
    println!("  Command:     {}", command);
    if let Some(dir) = &command.working_dir {
        println!("  Working dir: {}", dir.display());
    }
    println!("  Output:      {}", request.output_path.display());

    Ok(exit_codes::SUCCESS)
}

fn print_outcome(outcome: &RunOutcome, quiet: bool) {
    match &outcome.status {
        RunStatus::Succeeded => {
            println!("{}", outcome.message);
            println!("  Output: {}", outcome.output_path.display());
        }
        RunStatus::Failed { stderr, .. } => {
            eprintln!("{}", outcome.message);
            // Live output already showed stderr unless it was suppressed.
            if quiet && !stderr.is_empty() {
                eprintln!();
                eprintln!("{}", stderr);
            }
        }
        RunStatus::Cancelled | RunStatus::FailedToStart { .. } => {
            eprintln!("{}", outcome.message);
        }
    }

    if let Some(log_path) = &outcome.log_path {
        println!("  Log:    {}", log_path.display());
    }
}
