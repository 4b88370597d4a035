//! Structured activity events for bimbridge.
//!
//! Every component that needs to report what it is doing receives an
//! [`EventSink`] explicitly instead of reaching for a process-wide logger.
//! The file-backed sink appends one JSON object per line (NDJSON) and never
//! rewrites earlier lines.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `level`: `info`, `warn` or `error`
//! - `action`: What happened (settings_fallback, run_start, run_complete, ...)
//! - `actor`: The owner string (e.g., `user@HOST`)
//! - `message`: Human-readable summary
//! - `details`: Freeform object with action-specific details
//!
//! ```no_run
//! use bimbridge::events::{Event, EventAction, EventSink, FileEventLog};
//! use serde_json::json;
//!
//! let sink = FileEventLog::new("Logs/bimbridge.ndjson");
//! sink.record(
//!     &Event::info(EventAction::RunStart, "starting pipeline")
//!         .with_details(json!({"program": "python"})),
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Settings file parsed successfully
    SettingsLoaded,
    /// Settings file missing or malformed; defaults substituted
    SettingsFallback,
    /// Settings parsed but a soft invariant is violated
    SettingsWarning,
    /// Request rejected before anything was spawned
    RunRejected,
    /// External process about to be spawned
    RunStart,
    /// External process exited with code 0
    RunComplete,
    /// External process exited nonzero
    RunFailed,
    /// Run cancelled before the process exited
    RunCancelled,
    /// Process could not be started
    StartFailed,
    /// Run record written
    RecordSaved,
    /// Unexpected internal failure caught at the orchestrator boundary
    Fault,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::SettingsLoaded => write!(f, "settings_loaded"),
            EventAction::SettingsFallback => write!(f, "settings_fallback"),
            EventAction::SettingsWarning => write!(f, "settings_warning"),
            EventAction::RunRejected => write!(f, "run_rejected"),
            EventAction::RunStart => write!(f, "run_start"),
            EventAction::RunComplete => write!(f, "run_complete"),
            EventAction::RunFailed => write!(f, "run_failed"),
            EventAction::RunCancelled => write!(f, "run_cancelled"),
            EventAction::StartFailed => write!(f, "start_failed"),
            EventAction::RecordSaved => write!(f, "record_saved"),
            EventAction::Fault => write!(f, "fault"),
        }
    }
}

/// A single activity event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// Severity.
    pub level: EventLevel,

    /// The action that was performed.
    pub action: EventAction,

    /// The actor who performed the action (e.g., `user@HOST`).
    pub actor: String,

    /// Human-readable summary.
    pub message: String,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event. The timestamp is set to the current time.
    pub fn new(level: EventLevel, action: EventAction, message: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            level,
            action,
            actor: get_actor_string(),
            message: message.into(),
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn info(action: EventAction, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Info, action, message)
    }

    pub fn warn(action: EventAction, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Warn, action, message)
    }

    pub fn error(action: EventAction, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Error, action, message)
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Get the actor string for event metadata.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Destination for activity events.
///
/// Recording is infallible from the caller's point of view: a sink that
/// cannot persist an event reports the problem through `tracing` and moves on.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &Event);
}

fn emit_tracing(event: &Event) {
    match event.level {
        EventLevel::Info => {
            tracing::info!(action = %event.action, details = %event.details, "{}", event.message)
        }
        EventLevel::Warn => {
            tracing::warn!(action = %event.action, details = %event.details, "{}", event.message)
        }
        EventLevel::Error => {
            tracing::error!(action = %event.action, details = %event.details, "{}", event.message)
        }
    }
}

/// Sink that only forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvents;

impl EventSink for TracingEvents {
    fn record(&self, event: &Event) {
        emit_tracing(event);
    }
}

/// Append-only NDJSON event log, mirrored to `tracing`.
#[derive(Debug)]
pub struct FileEventLog {
    path: PathBuf,
    // Serializes appends from threads sharing one sink.
    write_lock: Mutex<()>,
}

impl FileEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, event: &Event) -> std::io::Result<()> {
        let line = event.to_ndjson_line()?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl EventSink for FileEventLog {
    fn record(&self, event: &Event) {
        emit_tracing(event);
        if let Err(e) = self.append(event) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to append event to activity log"
            );
        }
    }
}

/// In-memory sink, useful for hosts that render events themselves and for tests.
#[derive(Debug, Default)]
pub struct MemoryEvents {
    events: Mutex<Vec<Event>>,
}

impl MemoryEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event recorded so far, in order.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    pub fn count_level(&self, level: EventLevel) -> usize {
        self.events().iter().filter(|e| e.level == level).count()
    }

    pub fn actions(&self) -> Vec<EventAction> {
        self.events().iter().map(|e| e.action).collect()
    }
}

impl EventSink for MemoryEvents {
    fn record(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(event.clone());
    }
}
