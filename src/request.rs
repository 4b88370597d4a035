//! Run request model.
//!
//! A `RunRequest` is built once per invocation by the caller (dialog, CLI or
//! host embedding). Construction normalizes the free-form fields; the
//! orchestrator checks the remaining preconditions before spawning.

use crate::error::{BridgeError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Preset used when the caller leaves the preset blank.
pub const DEFAULT_PRESET: &str = "default";

/// Output format used when the caller leaves the format blank.
pub const DEFAULT_FORMAT: &str = "stl";

/// Minimum wall thickness applied when the caller does not choose one.
pub const DEFAULT_MIN_WALL_MM: f64 = 2.0;

/// Wall thickening control. Thickening to a minimum and skipping it are
/// mutually exclusive, so both live in one field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Thickening {
    /// Thicken walls to at least this many millimeters.
    MinWall(f64),
    /// Leave walls untouched.
    NoThicken,
}

impl Default for Thickening {
    fn default() -> Self {
        Thickening::MinWall(DEFAULT_MIN_WALL_MM)
    }
}

/// One end-to-end request for the external processor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRequest {
    pub input_path: PathBuf,
    pub preset: String,
    pub output_path: PathBuf,
    pub format: String,
    pub thickening: Thickening,
}

impl RunRequest {
    /// Build a request, normalizing preset and format.
    ///
    /// The output path is taken as given; see [`RunRequest::with_derived_output`]
    /// when the caller has none.
    pub fn new(
        input_path: impl Into<PathBuf>,
        preset: &str,
        output_path: impl Into<PathBuf>,
        format: &str,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            preset: normalize_preset(preset),
            output_path: output_path.into(),
            format: normalize_format(format),
            thickening: Thickening::default(),
        }
    }

    /// Build a request whose output sits next to the input with the format's extension.
    pub fn with_derived_output(input_path: impl Into<PathBuf>, preset: &str, format: &str) -> Self {
        let input_path = input_path.into();
        let format = normalize_format(format);
        let output_path = derive_output_path(&input_path, &format);
        Self {
            input_path,
            preset: normalize_preset(preset),
            output_path,
            format,
            thickening: Thickening::default(),
        }
    }

    pub fn with_min_wall_mm(mut self, mm: f64) -> Self {
        self.thickening = Thickening::MinWall(mm);
        self
    }

    pub fn with_no_thicken(mut self) -> Self {
        self.thickening = Thickening::NoThicken;
        self
    }

    /// Check the preconditions that must hold before anything is spawned.
    pub fn validate(&self) -> Result<()> {
        if self.input_path.as_os_str().is_empty() || !self.input_path.is_file() {
            return Err(BridgeError::InvalidRequest(format!(
                "input file not found: '{}'",
                self.input_path.display()
            )));
        }

        if self.output_path.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(BridgeError::InvalidRequest(
                "output path is required".to_string(),
            ));
        }

        if let Thickening::MinWall(mm) = self.thickening
            && !(mm.is_finite() && mm > 0.0)
        {
            return Err(BridgeError::InvalidRequest(format!(
                "minimum wall thickness must be a positive number of millimeters (got {})",
                mm
            )));
        }

        Ok(())
    }

    /// Copy of this request with input and output made absolute against the
    /// current directory, so the processor can run from the input's directory.
    pub fn absolutized(&self) -> Result<Self> {
        let absolute = |path: &Path| {
            std::path::absolute(path).map_err(|e| {
                BridgeError::InvalidRequest(format!(
                    "failed to resolve path '{}': {}",
                    path.display(),
                    e
                ))
            })
        };

        Ok(Self {
            input_path: absolute(&self.input_path)?,
            output_path: absolute(&self.output_path)?,
            ..self.clone()
        })
    }
}

/// Trimmed preset name, or `default` when blank.
pub fn normalize_preset(preset: &str) -> String {
    let preset = preset.trim();
    if preset.is_empty() {
        DEFAULT_PRESET.to_string()
    } else {
        preset.to_string()
    }
}

/// Lowercase format without a leading dot, or `stl` when blank.
pub fn normalize_format(format: &str) -> String {
    let format = format.trim().trim_start_matches('.').to_lowercase();
    if format.is_empty() {
        DEFAULT_FORMAT.to_string()
    } else {
        format
    }
}

/// Replace the input's extension with the output format.
pub fn derive_output_path(input_path: &Path, format: &str) -> PathBuf {
    input_path.with_extension(normalize_format(format))
}
