//! Implementation of the `bimbridge settings` command.

use crate::cli::SettingsArgs;
use bimbridge::error::{BridgeError, Result};
use bimbridge::events::{EventLevel, MemoryEvents};
use bimbridge::exit_codes;
use bimbridge::settings::{default_settings_path, resolve_settings};
use serde_json::json;

/// Execute the `bimbridge settings` command.
///
/// Settings problems are reported as warnings, never as errors, because a
/// run would fall back to the same defaults.
pub fn cmd_settings(args: SettingsArgs) -> Result<i32> {
    let path = args.settings.unwrap_or_else(default_settings_path);
    let events = MemoryEvents::new();
    let settings = resolve_settings(&path, &events);
    let invocation = settings.invocation();
    let warnings: Vec<String> = events
        .events()
        .into_iter()
        .filter(|e| e.level == EventLevel::Warn)
        .map(|e| e.message)
        .collect();

    if args.json {
        let report = json!({
            "path": path.display().to_string(),
            "exists": path.is_file(),
            "settings": settings,
            "invocation": invocation,
            "warnings": warnings,
        });
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| BridgeError::Internal(format!("failed to serialize settings: {}", e)))?;
        println!("{}", text);
        return Ok(exit_codes::SUCCESS);
    }

    println!("Pipeline Settings");
    println!("=================");
    println!();
    println!("  File:        {}", path.display());
    println!("  Invocation:  {}", invocation);
    println!(
        "  Mode:        {}",
        if invocation.is_module() {
            "interpreter module"
        } else {
            "standalone executable"
        }
    );
    println!(
        "  Extractor:   {}",
        match (settings.use_external_extractor, settings.extractor_path()) {
            (false, _) => "disabled".to_string(),
            (true, Some(path)) => path.display().to_string(),
            (true, None) => "enabled (no path)".to_string(),
        }
    );

    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &warnings {
            println!("  - {}", warning);
        }
    }

    Ok(exit_codes::SUCCESS)
}
