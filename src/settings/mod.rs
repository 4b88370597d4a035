//! Pipeline invocation settings.
//!
//! This module defines `PipelineSettings`, the contents of
//! `bimto3dprint.settings.json`, and the resolution of how the external
//! processor is invoked. Parsing goes through `serde_yaml`, which accepts the
//! JSON files written by the plugin installer as well as hand-written YAML.
//! Unknown fields are ignored for forward compatibility.

mod model;
mod operations;

#[cfg(test)]
mod tests;

// Re-export public API
pub use model::{
    DEFAULT_MODULE, FALLBACK_INTERPRETER, INTERPRETER_ENV_VAR, Invocation, PipelineSettings,
    SETTINGS_FILE_NAME,
};
pub use operations::{default_settings_path, resolve_settings};
