//! Supervised execution of the external processor.
//!
//! This module provides subprocess execution with:
//!
//! - Piped stdout/stderr drained line by line over a channel
//! - Optional live observation of every line as it arrives
//! - Cooperative cancellation through a [`CancelToken`]
//! - Explicit start-failure reporting instead of errors
//!
//! Termination on cancellation is best-effort: the direct child is killed and
//! reaped in the background, but processes it spawned itself are not tracked
//! and may outlive the run.

mod cancel;
mod state;
mod stream;


pub use cancel::CancelToken;
pub use state::{InvalidTransition, ProcessState};
pub(crate) use stream::CapturedOutput;
pub use stream::{OutputLine, StreamKind};

use crate::args::CommandLine;
use crate::error::{BridgeError, Result};
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use stream::spawn_reader;

/// How often a running process is checked for natural exit.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Exit code reported when the OS gives none (e.g. killed by a signal).
pub const SIGNAL_EXIT_CODE: i32 = -1;

/// What happened to one supervised process.
#[derive(Debug, Clone)]
pub struct Execution {
    /// Terminal state reached.
    pub state: ProcessState,
    /// Captured stdout, lines joined with `\n`.
    pub stdout: String,
    /// Captured stderr, lines joined with `\n`.
    pub stderr: String,
    /// Wall-clock time from spawn attempt to return.
    pub duration: Duration,
}

impl Execution {
    fn finish(state: ProcessState, output: CapturedOutput, started: Instant) -> Self {
        let (stdout, stderr) = output.into_text();
        Self {
            state,
            stdout,
            stderr,
            duration: started.elapsed(),
        }
    }
}

/// Spawns and supervises external processes.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    poll_interval: Duration,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Run `command` to completion or cancellation.
    ///
    /// Blocks the calling thread. Each output line is passed to `observer` as
    /// it is drained, then appended to the per-stream buffer. Cancellation is
    /// noticed as soon as `cancel` fires; natural exit within one poll
    /// interval.
    ///
    /// A process that cannot be spawned yields `Ok` with
    /// [`ProcessState::FailedToStart`]. `Err` is reserved for failures while
    /// supervising an already running child.
    ///
    /// If supervision ends early, through an error or a panic in `observer`,
    /// the child is killed before the error or panic propagates.
    ///
    /// The wait has no deadline of its own. Use [`CancelToken::cancel_after`]
    /// to bound it.
    pub fn execute(
        &self,
        command: &CommandLine,
        cancel: &CancelToken,
        observer: &mut dyn FnMut(&OutputLine),
    ) -> Result<Execution> {
        let started = Instant::now();
        let mut output = CapturedOutput::default();
        let state = ProcessState::NotStarted;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let reason = describe_spawn_error(&command.program, &e).to_string();
                let state = advance(state, ProcessState::FailedToStart(reason))?;
                return Ok(Execution::finish(state, output, started));
            }
        };

        let rx = match start_readers(&mut child) {
            Ok(rx) => rx,
            Err(e) => {
                terminate(child);
                return Err(BridgeError::Internal(format!(
                    "failed to start output reader: {}",
                    e
                )));
            }
        };

        // From here on, any early return or unwind kills the child.
        let mut child = SupervisedChild::new(child);
        let state = advance(state, ProcessState::Running)?;

        let exit_code = loop {
            drain_available(&rx, &mut output, observer);

            if cancel.is_cancelled() {
                child.terminate();
                drain_available(&rx, &mut output, observer);
                let state = advance(state, ProcessState::Cancelled)?;
                return Ok(Execution::finish(state, output, started));
            }

            match child.try_wait() {
                Ok(Some(status)) => {
                    child.release();
                    // A cancel that raced the exit (e.g. Ctrl-C reaching the
                    // whole process group) still counts as a cancellation.
                    if cancel.is_cancelled() {
                        drain_available(&rx, &mut output, observer);
                        let state = advance(state, ProcessState::Cancelled)?;
                        return Ok(Execution::finish(state, output, started));
                    }
                    break exit_code_of(status);
                }
                Ok(None) => {
                    cancel.wait_timeout(self.poll_interval);
                }
                Err(e) => {
                    child.terminate();
                    return Err(BridgeError::ProcessWait(e.to_string()));
                }
            }
        };

        // Readers finish at EOF. Descendants that inherited the pipes can hold
        // them open, so keep honoring cancellation while draining.
        loop {
            match rx.recv_timeout(self.poll_interval) {
                Ok(line) => {
                    observer(&line);
                    output.push(line);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let state = advance(state, ProcessState::Completed(exit_code))?;
        Ok(Execution::finish(state, output, started))
    }
}

/// A spawned child that is killed unless it has been released after exiting.
///
/// Dropping it while still armed (an observer panic, a state-machine error)
/// terminates the process instead of leaving it running unsupervised.
struct SupervisedChild {
    child: Option<Child>,
}

impl SupervisedChild {
    fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    /// `Ok(None)` once the child has been terminated or released.
    fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        match self.child.as_mut() {
            Some(child) => child.try_wait(),
            None => Ok(None),
        }
    }

    fn terminate(&mut self) {
        if let Some(child) = self.child.take() {
            terminate(child);
        }
    }

    /// Disarm after the child has been reaped.
    fn release(&mut self) {
        self.child = None;
    }
}

impl Drop for SupervisedChild {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn advance(state: ProcessState, next: ProcessState) -> Result<ProcessState> {
    state
        .advance(next)
        .map_err(|e| BridgeError::Internal(e.to_string()))
}

fn start_readers(child: &mut Child) -> std::io::Result<Receiver<OutputLine>> {
    let (tx, rx) = mpsc::channel();

    if let Some(stdout) = child.stdout.take() {
        spawn_reader(StreamKind::Stdout, stdout, tx.clone())?;
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader(StreamKind::Stderr, stderr, tx)?;
    }

    Ok(rx)
}

fn drain_available(
    rx: &Receiver<OutputLine>,
    output: &mut CapturedOutput,
    observer: &mut dyn FnMut(&OutputLine),
) {
    while let Ok(line) = rx.try_recv() {
        observer(&line);
        output.push(line);
    }
}

fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(SIGNAL_EXIT_CODE)
}

/// Kill the direct child and reap it off the caller's thread.
fn terminate(mut child: Child) {
    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
    if let Err(e) = child.kill()
        && e.kind() != ErrorKind::InvalidInput
    {
        tracing::warn!(pid = child.id(), error = %e, "failed to terminate pipeline process");
    }

    let reaper = thread::Builder::new()
        .name("bimbridge-reaper".to_string())
        .spawn(move || {
            let _ = child.wait();
        });
    if let Err(e) = reaper {
        tracing::warn!(error = %e, "failed to spawn reaper thread");
    }
}

fn describe_spawn_error(program: &Path, e: &std::io::Error) -> BridgeError {
    let reason = match e.kind() {
        ErrorKind::NotFound => format!(
            "not found ({})\n\
             Fix: install it or set interpreterPath / standaloneExecutablePath in the settings file.",
            e
        ),
        ErrorKind::PermissionDenied => format!("permission denied ({})", e),
        _ => e.to_string(),
    };
    BridgeError::ProcessStart {
        program: program.display().to_string(),
        reason,
    }
}
