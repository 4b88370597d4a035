//! Argument vector construction for the external processor.
//!
//! Every value becomes its own argv element and reaches the OS without a
//! shell, so paths with spaces or quotes cannot split or merge arguments.
//! [`CommandLine::display`] renders a shell-quoted string for logs only; it is
//! never parsed back into a command.

use crate::request::{RunRequest, Thickening};
use crate::settings::{Invocation, PipelineSettings};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

/// Program plus arguments, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Working directory for the process; inherits the caller's when `None`.
    pub working_dir: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Arguments as lossy UTF-8 strings, for assertions and structured logs.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Shell-quoted rendering for humans.
    pub fn display(&self) -> String {
        let program = self.program.to_string_lossy();
        let args = self.args_lossy();
        shell_words::join(std::iter::once(program.as_ref()).chain(args.iter().map(String::as_str)))
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// Locale-independent rendering with exactly two fractional digits.
pub fn format_millimeters(mm: f64) -> String {
    format!("{:.2}", mm)
}

/// Build the argument vector for one run.
///
/// Order is fixed: invocation prefix (module mode only), `process`, input,
/// `--preset`, `--output`, `--format`, thickening option, extractor options.
/// Identical inputs always produce an identical vector.
pub fn build_arguments(
    request: &RunRequest,
    settings: &PipelineSettings,
    invocation: &Invocation,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();

    if let Invocation::Module { module, .. } = invocation {
        args.push("-m".into());
        args.push(module.into());
    }

    args.push("process".into());
    args.push(request.input_path.clone().into_os_string());
    args.push("--preset".into());
    args.push((&request.preset).into());
    args.push("--output".into());
    args.push(request.output_path.clone().into_os_string());
    args.push("--format".into());
    args.push((&request.format).into());

    match request.thickening {
        Thickening::MinWall(mm) => {
            args.push("--min-wall-mm".into());
            args.push(format_millimeters(mm).into());
        }
        Thickening::NoThicken => args.push("--no-thicken".into()),
    }

    if settings.use_external_extractor {
        args.push("--use-external-extractor".into());
        if let Some(path) = settings.extractor_path() {
            args.push("--extractor-path".into());
            args.push(path.as_os_str().to_os_string());
        }
    }

    args
}

/// Build the full command line, running from the input file's directory.
pub fn build_command_line(
    request: &RunRequest,
    settings: &PipelineSettings,
    invocation: &Invocation,
) -> CommandLine {
    let command = CommandLine::new(invocation.program())
        .args(build_arguments(request, settings, invocation));

    match request.input_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => command.current_dir(dir),
        None => command,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_main() -> Invocation {
        Invocation::Module {
            interpreter: PathBuf::from("python"),
            module: "main".to_string(),
        }
    }

    fn sample_request() -> RunRequest {
        RunRequest::new("model.ifc", "shell_only", "model.stl", "stl").with_min_wall_mm(2.0)
    }

    #[test]
    fn test_reference_argument_vector() {
        let args = build_arguments(&sample_request(), &PipelineSettings::default(), &module_main());
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(
            args,
            vec![
                "-m",
                "main",
                "process",
                "model.ifc",
                "--preset",
                "shell_only",
                "--output",
                "model.stl",
                "--format",
                "stl",
                "--min-wall-mm",
                "2.00",
            ]
        );
    }

    #[test]
    fn test_no_thicken_replaces_min_wall() {
        let request = sample_request().with_no_thicken();
        let args = build_arguments(&request, &PipelineSettings::default(), &module_main());

        assert!(!args.iter().any(|a| a == "--min-wall-mm"));
        assert_eq!(args.last().unwrap(), "--no-thicken");
    }

    #[test]
    fn test_thickening_flags_never_both() {
        for request in [sample_request(), sample_request().with_no_thicken()] {
            let args = build_arguments(&request, &PipelineSettings::default(), &module_main());
            let min_wall = args.iter().filter(|a| *a == "--min-wall-mm").count();
            let no_thicken = args.iter().filter(|a| *a == "--no-thicken").count();
            assert_eq!(min_wall + no_thicken, 1);
        }
    }

    #[test]
    fn test_standalone_has_no_module_prefix() {
        let invocation = Invocation::Standalone {
            executable: PathBuf::from("/opt/b3p/bimto3dprint"),
        };
        let args = build_arguments(&sample_request(), &PipelineSettings::default(), &invocation);
        assert_eq!(args[0], "process");
    }

    #[test]
    fn test_extractor_flags() {
        let settings = PipelineSettings {
            use_external_extractor: true,
            extractor_path: Some(PathBuf::from("/opt/ifc extractor/extract")),
            ..Default::default()
        };
        let args = build_arguments(&sample_request(), &settings, &module_main());
        let tail: Vec<_> = args[args.len() - 3..].to_vec();
        assert_eq!(
            tail,
            vec![
                OsString::from("--use-external-extractor"),
                OsString::from("--extractor-path"),
                OsString::from("/opt/ifc extractor/extract"),
            ]
        );

        let settings = PipelineSettings {
            use_external_extractor: true,
            ..Default::default()
        };
        let args = build_arguments(&sample_request(), &settings, &module_main());
        assert_eq!(args.last().unwrap(), "--use-external-extractor");
        assert!(!args.iter().any(|a| a == "--extractor-path"));
    }

    #[test]
    fn test_extractor_path_ignored_when_disabled() {
        let settings = PipelineSettings {
            extractor_path: Some(PathBuf::from("/opt/extract")),
            ..Default::default()
        };
        let args = build_arguments(&sample_request(), &settings, &module_main());
        assert!(!args.iter().any(|a| a == "--extractor-path"));
    }

    #[test]
    fn test_paths_with_spaces_and_quotes_stay_single_arguments() {
        let request = RunRequest::new(
            "C:/Users/Jo Smith/My \"Models\"/tower.ifc",
            "shell_only",
            "C:/out dir/tower.stl",
            "stl",
        );
        let args = build_arguments(&request, &PipelineSettings::default(), &module_main());

        assert_eq!(args[3], "C:/Users/Jo Smith/My \"Models\"/tower.ifc");
        assert_eq!(args[7], "C:/out dir/tower.stl");
    }

    #[test]
    fn test_arguments_are_deterministic() {
        let settings = PipelineSettings {
            use_external_extractor: true,
            extractor_path: Some(PathBuf::from("/opt/extract")),
            ..Default::default()
        };
        let first = build_arguments(&sample_request(), &settings, &module_main());
        let second = build_arguments(&sample_request(), &settings, &module_main());
        assert_eq!(first, second);
    }

    #[test]
    fn test_millimeters_use_two_digits() {
        assert_eq!(format_millimeters(2.0), "2.00");
        assert_eq!(format_millimeters(0.5), "0.50");
        assert_eq!(format_millimeters(3.14159), "3.14");
        assert_eq!(format_millimeters(2.499), "2.50");
    }

    #[test]
    fn test_command_line_display_quotes_values() {
        let request = RunRequest::new("/data/my model.ifc", "shell_only", "/data/out.stl", "stl");
        let command = build_command_line(&request, &PipelineSettings::default(), &module_main());

        let rendered = command.display();
        assert!(rendered.starts_with("python -m main process '/data/my model.ifc'"));
        assert_eq!(command.working_dir, Some(PathBuf::from("/data")));
    }

    #[test]
    fn test_relative_input_keeps_caller_directory() {
        let command =
            build_command_line(&sample_request(), &PipelineSettings::default(), &module_main());
        assert_eq!(command.working_dir, None);
    }
}
