//! Settings loading, validation and invocation resolution.

use super::model::{
    DEFAULT_MODULE, FALLBACK_INTERPRETER, INTERPRETER_ENV_VAR, Invocation, PipelineSettings,
    SETTINGS_FILE_NAME,
};
use crate::error::{BridgeError, Result};
use crate::events::{Event, EventAction, EventSink};
use serde_json::json;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

fn non_blank(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref()
        .filter(|p| !p.as_os_str().to_string_lossy().trim().is_empty())
}

impl PipelineSettings {
    /// Load settings from a JSON or YAML file.
    ///
    /// Unknown fields are silently ignored. A missing file is an error here;
    /// use [`resolve_settings`] for the never-failing variant.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| BridgeError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&content).map_err(|reason| BridgeError::ConfigLoad {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse settings from a YAML (or JSON) string.
    fn from_yaml(yaml: &str) -> std::result::Result<Self, String> {
        // An empty document deserializes to unit, not to a map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| e.to_string())
    }

    /// Check soft invariants. Returns one message per violation; never fails.
    ///
    /// - `useExternalExtractor` without an `extractorPath` is passed through,
    ///   leaving the processor to locate the extractor itself.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.use_external_extractor && self.extractor_path().is_none() {
            warnings.push(
                "useExternalExtractor is enabled but extractorPath is empty; \
                 the processor will be asked to locate the extractor itself"
                    .to_string(),
            );
        }

        if non_blank(&self.standalone_executable_path).is_some()
            && non_blank(&self.interpreter_path).is_some()
        {
            warnings.push(
                "both standaloneExecutablePath and interpreterPath are set; \
                 the standalone executable takes precedence"
                    .to_string(),
            );
        }

        warnings
    }

    /// Module entry point, falling back to the default when blank.
    pub fn effective_module(&self) -> &str {
        let module = self.module_entry_point.trim();
        if module.is_empty() {
            DEFAULT_MODULE
        } else {
            module
        }
    }

    /// Configured extractor path, if non-blank.
    pub fn extractor_path(&self) -> Option<&Path> {
        non_blank(&self.extractor_path)
    }

    /// Resolve the invocation mode using the process environment.
    pub fn invocation(&self) -> Invocation {
        self.invocation_with(|key| std::env::var_os(key))
    }

    /// Resolve the invocation mode with an explicit environment lookup.
    ///
    /// Precedence:
    /// 1. `standaloneExecutablePath` if set
    /// 2. otherwise module mode with `interpreterPath`, else the
    ///    `BIMTO3DPRINT_PYTHON` override, else `python`
    pub fn invocation_with<F>(&self, env: F) -> Invocation
    where
        F: Fn(&str) -> Option<OsString>,
    {
        if let Some(executable) = non_blank(&self.standalone_executable_path) {
            return Invocation::Standalone {
                executable: executable.to_path_buf(),
            };
        }

        let interpreter = non_blank(&self.interpreter_path)
            .map(Path::to_path_buf)
            .or_else(|| {
                env(INTERPRETER_ENV_VAR)
                    .filter(|value| !value.to_string_lossy().trim().is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| PathBuf::from(FALLBACK_INTERPRETER));

        Invocation::Module {
            interpreter,
            module: self.effective_module().to_string(),
        }
    }
}

/// Default settings location: next to the running executable.
pub fn default_settings_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(SETTINGS_FILE_NAME)
}

/// Load settings for an orchestrator, never failing.
///
/// A missing or malformed file produces exactly one warning event and
/// all-default settings. A file that parses but violates a soft invariant
/// produces one warning per violation and is used as-is.
pub fn resolve_settings(path: &Path, events: &dyn EventSink) -> PipelineSettings {
    if !path.exists() {
        events.record(
            &Event::warn(
                EventAction::SettingsFallback,
                format!(
                    "pipeline settings file not found: {}. Using defaults.",
                    path.display()
                ),
            )
            .with_details(json!({ "path": path.display().to_string() })),
        );
        return PipelineSettings::default();
    }

    match PipelineSettings::load(path) {
        Ok(settings) => {
            events.record(
                &Event::info(
                    EventAction::SettingsLoaded,
                    format!("loaded pipeline settings from {}", path.display()),
                )
                .with_details(json!({ "invocation": settings.invocation() })),
            );
            for warning in settings.validate() {
                events.record(&Event::warn(EventAction::SettingsWarning, warning));
            }
            settings
        }
        Err(e) => {
            events.record(
                &Event::warn(
                    EventAction::SettingsFallback,
                    format!("{}. Using defaults.", e),
                )
                .with_details(json!({ "path": path.display().to_string() })),
            );
            PipelineSettings::default()
        }
    }
}
