//! Tests for settings loading and invocation resolution.

use crate::events::{EventAction, EventLevel, MemoryEvents};
use crate::settings::{
    DEFAULT_MODULE, FALLBACK_INTERPRETER, INTERPRETER_ENV_VAR, Invocation, PipelineSettings,
    resolve_settings,
};
use serial_test::serial;
use std::ffi::OsString;
use std::path::PathBuf;
use tempfile::TempDir;

fn no_env(_: &str) -> Option<OsString> {
    None
}

fn write_settings(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("bimto3dprint.settings.json");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_default_settings() {
    let settings = PipelineSettings::default();

    assert!(settings.interpreter_path.is_none());
    assert!(settings.standalone_executable_path.is_none());
    assert_eq!(settings.module_entry_point, DEFAULT_MODULE);
    assert!(!settings.use_external_extractor);
    assert!(settings.extractor_path.is_none());
}

#[test]
fn test_load_json_settings() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_settings(
        &temp_dir,
        r#"{
  "interpreterPath": "/usr/bin/python3",
  "standaloneExecutablePath": "",
  "moduleEntryPoint": "bimto3dprint.cli",
  "useExternalExtractor": true,
  "extractorPath": "/opt/ifc-extractor/bin/extract"
}"#,
    );

    let settings = PipelineSettings::load(&path).unwrap();

    assert_eq!(
        settings.interpreter_path,
        Some(PathBuf::from("/usr/bin/python3"))
    );
    assert_eq!(settings.module_entry_point, "bimto3dprint.cli");
    assert!(settings.use_external_extractor);
    assert_eq!(
        settings.extractor_path(),
        Some(PathBuf::from("/opt/ifc-extractor/bin/extract").as_path())
    );
}

#[test]
fn test_load_yaml_settings_with_unknown_fields() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_settings(
        &temp_dir,
        r#"
standaloneExecutablePath: /opt/b3p/bimto3dprint
futureOption: 42
"#,
    );

    let settings = PipelineSettings::load(&path).unwrap();
    assert_eq!(
        settings.standalone_executable_path,
        Some(PathBuf::from("/opt/b3p/bimto3dprint"))
    );
    assert_eq!(settings.module_entry_point, DEFAULT_MODULE);
}

#[test]
fn test_plugin_format_keys_are_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_settings(
        &temp_dir,
        r#"{
  "pythonExecutable": "C:/Python311/python.exe",
  "bimto3dprintExecutable": "",
  "bimto3dprintModule": "bimto3dprint.cli",
  "useTudelftExtractor": true,
  "tudelftExtractorPath": "C:/tools/ifc-extract.exe"
}"#,
    );
    let events = MemoryEvents::new();

    let settings = resolve_settings(&path, &events);

    assert_eq!(
        settings.invocation_with(no_env),
        Invocation::Module {
            interpreter: PathBuf::from("C:/Python311/python.exe"),
            module: "bimto3dprint.cli".to_string(),
        }
    );
    assert!(settings.use_external_extractor);
    assert_eq!(
        settings.extractor_path(),
        Some(PathBuf::from("C:/tools/ifc-extract.exe").as_path())
    );
    assert_eq!(events.actions(), vec![EventAction::SettingsLoaded]);
    assert_eq!(events.count_level(EventLevel::Warn), 0);
}

#[test]
fn test_plugin_format_standalone_executable() {
    let settings: PipelineSettings =
        serde_yaml::from_str(r#"{"bimto3dprintExecutable": "C:/b3p/bimto3dprint.exe"}"#).unwrap();

    assert_eq!(
        settings.invocation_with(no_env),
        Invocation::Standalone {
            executable: PathBuf::from("C:/b3p/bimto3dprint.exe")
        }
    );
}

#[test]
fn test_empty_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_settings(&temp_dir, "");

    let settings = PipelineSettings::load(&path).unwrap();
    assert_eq!(settings, PipelineSettings::default());
}

#[test]
fn test_standalone_wins_over_interpreter() {
    let settings = PipelineSettings {
        interpreter_path: Some(PathBuf::from("/usr/bin/python3")),
        standalone_executable_path: Some(PathBuf::from("/opt/b3p/bimto3dprint")),
        ..Default::default()
    };

    assert_eq!(
        settings.invocation_with(no_env),
        Invocation::Standalone {
            executable: PathBuf::from("/opt/b3p/bimto3dprint")
        }
    );
}

#[test]
fn test_standalone_wins_regardless_of_field_order() {
    let standalone_first = r#"{"standaloneExecutablePath": "b3p.exe", "interpreterPath": "py.exe"}"#;
    let interpreter_first = r#"{"interpreterPath": "py.exe", "standaloneExecutablePath": "b3p.exe"}"#;

    let a: PipelineSettings = serde_yaml::from_str(standalone_first).unwrap();
    let b: PipelineSettings = serde_yaml::from_str(interpreter_first).unwrap();

    let expected = Invocation::Standalone {
        executable: PathBuf::from("b3p.exe"),
    };
    assert_eq!(a.invocation_with(no_env), expected);
    assert_eq!(b.invocation_with(no_env), expected);
}

#[test]
fn test_blank_standalone_falls_back_to_module() {
    let settings = PipelineSettings {
        standalone_executable_path: Some(PathBuf::from("  ")),
        ..Default::default()
    };

    assert!(settings.invocation_with(no_env).is_module());
}

#[test]
fn test_interpreter_precedence_setting_then_env_then_fallback() {
    let env = |key: &str| {
        (key == INTERPRETER_ENV_VAR).then(|| OsString::from("/env/python"))
    };

    let configured = PipelineSettings {
        interpreter_path: Some(PathBuf::from("/cfg/python")),
        ..Default::default()
    };
    assert_eq!(
        configured.invocation_with(env).program(),
        PathBuf::from("/cfg/python").as_path()
    );

    let unconfigured = PipelineSettings::default();
    assert_eq!(
        unconfigured.invocation_with(env).program(),
        PathBuf::from("/env/python").as_path()
    );
    assert_eq!(
        unconfigured.invocation_with(no_env),
        Invocation::Module {
            interpreter: PathBuf::from(FALLBACK_INTERPRETER),
            module: DEFAULT_MODULE.to_string(),
        }
    );
}

#[test]
fn test_blank_module_uses_default() {
    let settings = PipelineSettings {
        module_entry_point: "   ".to_string(),
        ..Default::default()
    };
    assert_eq!(settings.effective_module(), DEFAULT_MODULE);
}

#[test]
#[serial]
fn test_invocation_reads_process_environment() {
    // SAFETY: serialized with other environment-touching tests.
    unsafe { std::env::set_var(INTERPRETER_ENV_VAR, "/from/env/python3") };
    let invocation = PipelineSettings::default().invocation();
    unsafe { std::env::remove_var(INTERPRETER_ENV_VAR) };

    assert_eq!(
        invocation.program(),
        PathBuf::from("/from/env/python3").as_path()
    );
}

#[test]
fn test_validate_flags_extractor_without_path() {
    let settings = PipelineSettings {
        use_external_extractor: true,
        extractor_path: Some(PathBuf::from("")),
        ..Default::default()
    };

    let warnings = settings.validate();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("extractorPath"));
    assert!(PipelineSettings::default().validate().is_empty());
}

#[test]
fn test_resolve_missing_file_warns_once() {
    let temp_dir = TempDir::new().unwrap();
    let events = MemoryEvents::new();

    let settings = resolve_settings(&temp_dir.path().join("missing.json"), &events);

    assert_eq!(settings, PipelineSettings::default());
    assert_eq!(events.count_level(EventLevel::Warn), 1);
    assert_eq!(events.actions(), vec![EventAction::SettingsFallback]);
}

#[test]
fn test_resolve_corrupt_file_warns_once() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_settings(&temp_dir, "{ \"interpreterPath\": [unterminated");
    let events = MemoryEvents::new();

    let settings = resolve_settings(&path, &events);

    assert_eq!(settings, PipelineSettings::default());
    assert_eq!(events.count_level(EventLevel::Warn), 1);
    let warning = &events.events()[0];
    assert_eq!(warning.action, EventAction::SettingsFallback);
    assert!(warning.message.contains("Using defaults"));
}

#[test]
fn test_resolve_wrong_type_falls_back() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_settings(&temp_dir, r#"{"useExternalExtractor": "sometimes"}"#);
    let events = MemoryEvents::new();

    let settings = resolve_settings(&path, &events);

    assert_eq!(settings, PipelineSettings::default());
    assert_eq!(events.count_level(EventLevel::Warn), 1);
}

#[test]
fn test_resolve_valid_file_reports_soft_warnings() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_settings(&temp_dir, r#"{"useExternalExtractor": true}"#);
    let events = MemoryEvents::new();

    let settings = resolve_settings(&path, &events);

    assert!(settings.use_external_extractor);
    assert_eq!(
        events.actions(),
        vec![EventAction::SettingsLoaded, EventAction::SettingsWarning]
    );
}
