//! Closure Compiler adapter.
//!
//! Sources go in as a JSON stream on stdin, compiled code comes back as a
//! JSON stream on stdout. Externs are written to a temp dir and passed by
//! path. Diagnostics are parsed from stderr and run through the suppression
//! guard before deciding success.

use super::SourceFile;
use super::optimizer::{Compiled, Diagnostic, Optimizer, OptimizerConfig, SCRIPT_DELIMITER};
use super::suppress::CheckLevel;
use crate::error::{BundleError, BundleResult};
use crate::utils::exec::{FilterRule, exec_with_input, format_error, strip_ansi};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tempfile::TempDir;

/// JSDoc tags used by Polymer elements that Closure does not know.
const EXTRA_ANNOTATIONS: &[&str] = &["attribute", "hero", "group", "required"];

/// Summary and banner lines on stderr that carry no diagnostic.
const CLOSURE_FILTER: FilterRule =
    FilterRule::new(&["0 error(s)", "The compiler is waiting for input"]);

pub struct ClosureCompiler {
    command: Vec<String>,
}

impl ClosureCompiler {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[derive(Serialize)]
struct JsonInput<'a> {
    path: &'a str,
    src: &'a str,
}

#[derive(Deserialize)]
struct JsonOutput {
    #[serde(default)]
    src: String,
}

impl Optimizer for ClosureCompiler {
    fn optimize(
        &self,
        externs: &[SourceFile],
        sources: &[SourceFile],
        config: &OptimizerConfig<'_>,
    ) -> BundleResult<Compiled> {
        let compile_error = |message: String| BundleError::Compile {
            errors: 1,
            diagnostics: vec![message],
        };

        let externs_dir = TempDir::new().map_err(|err| BundleError::io("externs", err))?;
        let extern_paths = write_externs(externs_dir.path(), externs)?;

        let inputs: Vec<JsonInput<'_>> = sources
            .iter()
            .map(|s| JsonInput {
                path: &s.name,
                src: &s.code,
            })
            .collect();
        let stdin = serde_json::to_vec(&inputs).map_err(|err| compile_error(err.to_string()))?;

        let args = build_args(config, &extern_paths);
        let output = exec_with_input(&self.command, &args, stdin)
            .map_err(|err| compile_error(format!("{err:#}")))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let (diagnostics, other) = parse_diagnostics(&stderr);

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for mut diagnostic in diagnostics {
            match config.check_level(&diagnostic) {
                CheckLevel::Off => {}
                CheckLevel::Warning => {
                    diagnostic.level = CheckLevel::Warning;
                    warnings.push(diagnostic);
                }
                CheckLevel::Error => {
                    diagnostic.level = CheckLevel::Error;
                    errors.push(diagnostic.to_string());
                }
            }
        }

        if config.quiet {
            warnings.clear();
            errors.clear();
        } else {
            CLOSURE_FILTER.log("compile", &other.join("\n"));
        }

        if !errors.is_empty() {
            return Err(BundleError::Compile {
                errors: errors.len(),
                diagnostics: errors,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_output(&stdout) {
            Some(code) => Ok(Compiled { code, warnings }),
            None => Err(compile_error(format_error(
                &self.command.join(" "),
                &output,
                &CLOSURE_FILTER,
            ))),
        }
    }
}

/// Command-line flags for one invocation.
fn build_args(config: &OptimizerConfig<'_>, externs: &[String]) -> Vec<OsString> {
    let mut args: Vec<String> = vec![
        "--json_streams=BOTH".into(),
        format!("--compilation_level={}", config.level.closure_flag()),
        format!("--language_in={}", config.language_in),
        format!("--language_out={}", config.language_out),
        "--continue-after-errors".into(),
        "--strict_mode_input=false".into(),
        "--emit_use_strict=false".into(),
    ];

    if config.print_input_delimiter {
        args.extend([
            "--dependency_mode=SORT_ONLY".into(),
            "--module_resolution=NODE".into(),
            "--process_closure_primitives".into(),
            "--polymer_version=2".into(),
            "--generate_exports".into(),
            "--print_input_delimiter".into(),
            format!("--input_delimiter={SCRIPT_DELIMITER}"),
        ]);
        args.extend(EXTRA_ANNOTATIONS.iter().map(|a| format!("--extra_annotation_name={a}")));
    }
    if config.disable_unsafe_passes {
        args.extend([
            "--use_types_for_optimization=false".into(),
            "--jscomp_off=globalThis".into(),
        ]);
    }
    if config.pretty {
        args.extend(["--formatting=PRETTY_PRINT".into(), "--debug".into()]);
        if config.print_input_delimiter {
            args.push("--export_test_functions".into());
        }
    }
    if config.quiet {
        args.push("--warning_level=QUIET".into());
    }
    args.extend(externs.iter().map(|path| format!("--externs={path}")));

    args.into_iter().map(OsString::from).collect()
}

/// Write externs to `dir`, returning the paths to pass on the command line.
fn write_externs(dir: &Path, externs: &[SourceFile]) -> BundleResult<Vec<String>> {
    externs
        .iter()
        .enumerate()
        .map(|(i, source)| {
            let base = Path::new(&source.name)
                .file_name()
                .map_or_else(|| "externs.js".into(), |n| n.to_string_lossy());
            let path = dir.join(format!("{i:03}-{base}"));
            fs::write(&path, &source.code).map_err(|err| BundleError::io(&path, err))?;
            Ok(path.to_string_lossy().into_owned())
        })
        .collect()
}

/// Split stderr into recognized diagnostics and everything else.
///
/// Recognized lines look like `path:12:4: WARNING - [JSC_KEY] message`; the
/// source position is optional.
fn parse_diagnostics(stderr: &str) -> (Vec<Diagnostic>, Vec<String>) {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^(?:(.+?):(\d+)(?::\d+)?: )?(WARNING|ERROR) - \[(\w+)\] (.*)$")
            .expect("static regex")
    });

    let mut diagnostics = Vec::new();
    let mut other = Vec::new();
    for line in stderr.lines() {
        let line = strip_ansi(line);
        let Some(caps) = re.captures(&line) else {
            other.push(line.into_owned());
            continue;
        };
        diagnostics.push(Diagnostic {
            source: caps.get(1).map(|m| m.as_str().to_owned()),
            line: caps.get(2).and_then(|m| m.as_str().parse().ok()),
            level: if &caps[3] == "ERROR" {
                CheckLevel::Error
            } else {
                CheckLevel::Warning
            },
            key: caps[4].to_owned(),
            message: caps[5].to_owned(),
        });
    }
    (diagnostics, other)
}

/// Concatenated `src` of the JSON output stream, or `None` if stdout is not
/// one.
fn parse_output(stdout: &str) -> Option<String> {
    let outputs: Vec<JsonOutput> = serde_json::from_str(stdout.trim()).ok()?;
    Some(outputs.into_iter().map(|o| o.src).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::SuppressionGuard;
    use crate::config::{CompileConfig, OptimizationLevel};
    use tempfile::TempDir;

    fn has(args: &[OsString], flag: &str) -> bool {
        args.iter().any(|a| a == flag)
    }

    #[test]
    fn test_build_args_bundle() {
        let guard = SuppressionGuard::default();
        let mut compile = CompileConfig::default();
        compile.level = OptimizationLevel::Advanced;
        let config = OptimizerConfig::bundle(&compile, &guard);
        let args = build_args(&config, &["/tmp/x/000-e.js".into()]);

        assert!(has(&args, "--compilation_level=ADVANCED"));
        assert!(has(&args, "--print_input_delimiter"));
        assert!(has(&args, "--input_delimiter=//# sourceURL=build:/%name%"));
        assert!(has(&args, "--dependency_mode=SORT_ONLY"));
        assert!(has(&args, "--externs=/tmp/x/000-e.js"));
        assert!(has(&args, "--extra_annotation_name=hero"));
        assert!(!has(&args, "--warning_level=QUIET"));
        assert!(!has(&args, "--formatting=PRETTY_PRINT"));
    }

    #[test]
    fn test_build_args_minify() {
        let mut compile = CompileConfig::default();
        compile.test_only = true;
        let config = OptimizerConfig::minify(&compile);
        let args = build_args(&config, &[]);

        assert!(has(&args, "--compilation_level=SIMPLE"));
        assert!(has(&args, "--warning_level=QUIET"));
        assert!(has(&args, "--formatting=PRETTY_PRINT"));
        assert!(!has(&args, "--print_input_delimiter"));
        assert!(!has(&args, "--export_test_functions"));
    }

    #[test]
    fn test_parse_diagnostics() {
        let stderr = "\x1b[31m/tf-a.js:12:4: ERROR - [JSC_UNDEFINED_VARIABLE] variable x is undeclared\x1b[0m\n\
                      \x20 x();\n\
                      lib.js:3: WARNING - [JSC_USELESS_CODE] useless\n\
                      WARNING - [JSC_UNKNOWN] no position\n\
                      1 error(s), 2 warning(s)\n";
        let (diagnostics, other) = parse_diagnostics(stderr);

        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics[0].source.as_deref(), Some("/tf-a.js"));
        assert_eq!(diagnostics[0].line, Some(12));
        assert_eq!(diagnostics[0].level, CheckLevel::Error);
        assert_eq!(diagnostics[0].key, "JSC_UNDEFINED_VARIABLE");
        assert_eq!(diagnostics[1].level, CheckLevel::Warning);
        assert_eq!(diagnostics[2].source, None);
        assert_eq!(other, vec!["  x();", "1 error(s), 2 warning(s)"]);
    }

    #[test]
    fn test_parse_output() {
        let stdout = r#"[{"path":"compiled.js","src":"a();b();","source_map":""}]"#;
        assert_eq!(parse_output(stdout).as_deref(), Some("a();b();"));
        assert_eq!(parse_output("not json"), None);
    }

    #[test]
    fn test_write_externs() {
        let dir = TempDir::new().unwrap();
        let externs = [
            SourceFile::new("third_party/a/externs.js", "/** @externs */ var a;"),
            SourceFile::new("b.js", "/** @externs */ var b;"),
        ];
        let paths = write_externs(dir.path(), &externs).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("000-externs.js"));
        assert_eq!(fs::read_to_string(&paths[1]).unwrap(), "/** @externs */ var b;");
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_command_is_compile_error() {
        let compiler = ClosureCompiler::new(vec!["weld-no-such-compiler-xyz".into()]);
        let config = OptimizerConfig::minify(&CompileConfig::default());
        let err = compiler
            .optimize(&[], &[SourceFile::new("/a.js", "a()")], &config)
            .unwrap_err();
        assert!(matches!(err, BundleError::Compile { .. }));
    }
}
