//! Durable per-run records.
//!
//! Each run writes one plain-text file named
//! `python_run_<UTC yyyyMMdd_HHmmss_fff>.log`:
//!
//! ```text
//! Exit code: 2
//! --- STDOUT ---
//! loading model.ifc
//! --- STDERR ---
//! bad geometry
//! ```
//!
//! Files are created with create-new semantics; a name that is already taken
//! gets a `_1`, `_2`, ... suffix, so an earlier record is never overwritten.

use crate::error::{BridgeError, Result};
use crate::outcome::RunOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Directory name used next to the executable when no log dir is given.
pub const LOG_DIR_NAME: &str = "Logs";
pub const LOG_FILE_PREFIX: &str = "python_run_";
pub const LOG_FILE_EXTENSION: &str = "log";

const EXIT_CODE_HEADER: &str = "Exit code: ";
const STDOUT_MARKER: &str = "--- STDOUT ---";
const STDERR_MARKER: &str = "--- STDERR ---";

/// Upper bound on collision suffixes tried for one timestamp.
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Snapshot of one run: exit code and full output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl LogRecord {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        Self::new(outcome.exit_code(), &outcome.stdout, &outcome.stderr)
    }

    /// Render the on-disk text form.
    pub fn render(&self) -> String {
        format!(
            "{}{}\n{}\n{}\n{}\n{}\n",
            EXIT_CODE_HEADER, self.exit_code, STDOUT_MARKER, self.stdout, STDERR_MARKER, self.stderr
        )
    }

    /// Parse the text form back.
    ///
    /// The first stderr marker line ends stdout, so a stdout that itself
    /// contains that exact line is split there.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.replace("\r\n", "\n");
        let rest = text.strip_prefix(EXIT_CODE_HEADER)?;
        let (code, rest) = rest.split_once('\n')?;
        let exit_code = code.trim().parse().ok()?;

        let rest = rest.strip_prefix(STDOUT_MARKER)?.strip_prefix('\n')?;
        let separator = format!("\n{}\n", STDERR_MARKER);
        let (stdout, stderr) = rest.split_once(&separator)?;
        let stderr = stderr.strip_suffix('\n').unwrap_or(stderr);

        Some(Self::new(exit_code, stdout, stderr))
    }
}

/// A record that has been written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedRecord {
    /// File stem, e.g. `python_run_20261019_081502_117`.
    pub run_id: String,
    pub path: PathBuf,
}

/// Writes run records into one directory.
#[derive(Debug)]
pub struct RunLogger {
    dir: PathBuf,
    last: Mutex<Option<SavedRecord>>,
}

impl RunLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last: Mutex::new(None),
        }
    }

    /// `Logs` next to the running executable.
    pub fn default_dir() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(LOG_DIR_NAME)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `record` under a fresh name stamped with the current time.
    pub fn write(&self, record: &LogRecord) -> Result<SavedRecord> {
        self.write_at(record, Utc::now())
    }

    /// Write `record` under a fresh name stamped with `now`.
    pub fn write_at(&self, record: &LogRecord, now: DateTime<Utc>) -> Result<SavedRecord> {
        fs::create_dir_all(&self.dir).map_err(|e| BridgeError::RunLog {
            path: self.dir.clone(),
            reason: format!("failed to create log directory: {}", e),
        })?;

        let stamp = now.format("%Y%m%d_%H%M%S_%3f").to_string();
        let contents = record.render();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let run_id = if attempt == 0 {
                format!("{}{}", LOG_FILE_PREFIX, stamp)
            } else {
                format!("{}{}_{}", LOG_FILE_PREFIX, stamp, attempt)
            };
            let path = self.dir.join(format!("{}.{}", run_id, LOG_FILE_EXTENSION));

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(BridgeError::RunLog {
                        path,
                        reason: e.to_string(),
                    });
                }
            };

            file.write_all(contents.as_bytes())
                .and_then(|_| file.flush())
                .map_err(|e| BridgeError::RunLog {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;

            let saved = SavedRecord { run_id, path };
            *self.last.lock().unwrap_or_else(|poison| poison.into_inner()) = Some(saved.clone());
            return Ok(saved);
        }

        Err(BridgeError::RunLog {
            path: self.dir.clone(),
            reason: format!("no free log file name for timestamp {}", stamp),
        })
    }

    /// The record most recently written by this logger.
    pub fn last_record(&self) -> Option<SavedRecord> {
        self.last
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

/// One record file found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordEntry {
    pub run_id: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Sort key for record names: timestamp text, then collision suffix.
fn name_order(run_id: &str) -> (String, u32) {
    let stamp = run_id.strip_prefix(LOG_FILE_PREFIX).unwrap_or(run_id);
    // yyyyMMdd_HHmmss_fff
    const STAMP_LEN: usize = 19;
    if let (Some(head), Some(tail)) = (stamp.get(..STAMP_LEN), stamp.get(STAMP_LEN..))
        && let Some(suffix) = tail.strip_prefix('_')
        && let Ok(n) = suffix.parse::<u32>()
    {
        return (head.to_string(), n);
    }
    (stamp.to_string(), 0)
}

/// List run records in `dir`, newest first.
///
/// A missing directory yields an empty list.
pub fn list_records(dir: &Path) -> Result<Vec<RecordEntry>> {
    let read_err = |e: std::io::Error| BridgeError::RunLog {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(read_err(e)),
    };

    let mut records = Vec::new();
    for entry in entries {
        let entry = entry.map_err(read_err)?;
        let path = entry.path();

        let is_log = path.extension().and_then(|e| e.to_str()) == Some(LOG_FILE_EXTENSION);
        let Some(run_id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !is_log || !run_id.starts_with(LOG_FILE_PREFIX) {
            continue;
        }

        let metadata = entry.metadata().map_err(read_err)?;
        if !metadata.is_file() {
            continue;
        }

        records.push(RecordEntry {
            run_id: run_id.to_string(),
            path: path.clone(),
            size: metadata.len(),
        });
    }

    records.sort_by(|a, b| name_order(&b.run_id).cmp(&name_order(&a.run_id)));
    Ok(records)
}

/// Read and parse one record file.
pub fn read_record(path: &Path) -> Result<LogRecord> {
    let text = fs::read_to_string(path).map_err(|e| BridgeError::RunLog {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    LogRecord::parse(&text).ok_or_else(|| BridgeError::RunLog {
        path: path.to_path_buf(),
        reason: "not a run record".to_string(),
    })
}
