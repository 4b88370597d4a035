//! Settings struct definition, defaults and the resolved invocation mode.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up next to the running executable.
pub const SETTINGS_FILE_NAME: &str = "bimto3dprint.settings.json";

/// Module run with `-m` when no standalone executable is configured.
pub const DEFAULT_MODULE: &str = "bimto3dprint.main";

/// Environment variable consulted when no interpreter is configured.
pub const INTERPRETER_ENV_VAR: &str = "BIMTO3DPRINT_PYTHON";

/// Interpreter name used when neither settings nor environment provide one.
pub const FALLBACK_INTERPRETER: &str = "python";

/// Settings for locating and configuring the external processor.
///
/// Blank strings are treated as "not set" for every optional path, matching
/// settings files that carry `""` placeholders. Files written by the Revit
/// plugin (`pythonExecutable`, `bimto3dprintExecutable`, `bimto3dprintModule`,
/// `useTudelftExtractor`, `tudelftExtractorPath`) load through field aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineSettings {
    /// Interpreter used for module invocation.
    #[serde(alias = "pythonExecutable", skip_serializing_if = "Option::is_none")]
    pub interpreter_path: Option<PathBuf>,

    /// Standalone processor executable. Wins over the interpreter when set.
    #[serde(alias = "bimto3dprintExecutable", skip_serializing_if = "Option::is_none")]
    pub standalone_executable_path: Option<PathBuf>,

    /// Module entry point run with `-m` (default: "bimto3dprint.main").
    #[serde(alias = "bimto3dprintModule", default = "default_module_entry_point")]
    pub module_entry_point: String,

    /// Whether to hand extraction to the external extractor tool.
    #[serde(alias = "useTudelftExtractor")]
    pub use_external_extractor: bool,

    /// Path to the external extractor. Expected when `use_external_extractor` is set.
    #[serde(alias = "tudelftExtractorPath", skip_serializing_if = "Option::is_none")]
    pub extractor_path: Option<PathBuf>,
}

fn default_module_entry_point() -> String {
    DEFAULT_MODULE.to_string()
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            interpreter_path: None,
            standalone_executable_path: None,
            module_entry_point: default_module_entry_point(),
            use_external_extractor: false,
            extractor_path: None,
        }
    }
}

/// How the external processor is launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Invocation {
    /// Run the processor executable directly.
    Standalone { executable: PathBuf },
    /// Run `<interpreter> -m <module>`.
    Module { interpreter: PathBuf, module: String },
}

impl Invocation {
    /// The program handed to the OS.
    pub fn program(&self) -> &Path {
        match self {
            Invocation::Standalone { executable } => executable,
            Invocation::Module { interpreter, .. } => interpreter,
        }
    }

    pub fn is_module(&self) -> bool {
        matches!(self, Invocation::Module { .. })
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Invocation::Standalone { executable } => {
                write!(f, "standalone executable {}", executable.display())
            }
            Invocation::Module {
                interpreter,
                module,
            } => write!(f, "{} -m {}", interpreter.display(), module),
        }
    }
}
