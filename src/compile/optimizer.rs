//! The narrow seam between the bundler and a JS optimizer.
//!
//! Segmentation only relies on what is declared here: every source is emitted
//! behind a delimiter line naming it, and tag-bound sources keep their
//! relative order. Anything that honours that can be plugged in.

use super::SourceFile;
use super::suppress::{CheckLevel, SuppressionGuard};
use crate::config::{CompileConfig, OptimizationLevel};
use crate::error::BundleResult;
use std::fmt;

/// Header the optimizer writes before each input; `%name%` is the source name.
pub const SCRIPT_DELIMITER: &str = "//# sourceURL=build:/%name%";

/// Everything an optimizer invocation is told besides its inputs.
#[derive(Debug, Clone)]
pub struct OptimizerConfig<'a> {
    pub level: OptimizationLevel,
    /// Emit [`SCRIPT_DELIMITER`] before every input.
    pub print_input_delimiter: bool,
    pub language_in: String,
    pub language_out: String,
    /// Keep off the passes that break framework conventions (property
    /// renaming, function inlining, prototype pruning).
    pub disable_unsafe_passes: bool,
    pub pretty: bool,
    /// Do not report diagnostics at all.
    pub quiet: bool,
    pub guard: Option<&'a SuppressionGuard>,
}

impl<'a> OptimizerConfig<'a> {
    /// Settings for the whole-document pass that feeds segmentation.
    pub fn bundle(config: &CompileConfig, guard: &'a SuppressionGuard) -> Self {
        Self {
            level: config.level,
            print_input_delimiter: true,
            language_in: config.language_in.clone(),
            language_out: config.language_out.clone(),
            disable_unsafe_passes: config.disable_unsafe_passes,
            pretty: config.test_only,
            quiet: false,
            guard: Some(guard),
        }
    }

    /// Settings for a standalone single-file minification (`jscomp-minify`).
    pub fn minify(config: &CompileConfig) -> Self {
        Self {
            level: OptimizationLevel::Simple,
            print_input_delimiter: false,
            language_in: "ECMASCRIPT_2016".into(),
            language_out: "ECMASCRIPT5".into(),
            disable_unsafe_passes: false,
            pretty: config.test_only,
            quiet: true,
            guard: None,
        }
    }

    /// The delimiter line for `name`.
    pub fn delimiter(name: &str) -> String {
        SCRIPT_DELIMITER.replace("%name%", name)
    }

    /// Effective level of `diagnostic` after suppressions.
    pub fn check_level(&self, diagnostic: &Diagnostic) -> CheckLevel {
        self.guard
            .and_then(|guard| guard.level(diagnostic))
            .unwrap_or(diagnostic.level)
    }
}

/// One message reported by the optimizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Source name as given to the optimizer, if the message has one.
    pub source: Option<String>,
    pub line: Option<usize>,
    pub level: CheckLevel,
    /// Diagnostic key such as `JSC_UNDEFINED_VARIABLE`.
    pub key: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, self.line) {
            (Some(source), Some(line)) => write!(f, "{source}:{line}: ")?,
            (Some(source), None) => write!(f, "{source}: ")?,
            _ => {}
        }
        write!(f, "{} - [{}] {}", self.level, self.key, self.message)
    }
}

/// Successful optimizer output.
#[derive(Debug, Default)]
pub struct Compiled {
    pub code: String,
    /// Warnings that survived suppression.
    pub warnings: Vec<Diagnostic>,
}

pub trait Optimizer {
    fn optimize(
        &self,
        externs: &[SourceFile],
        sources: &[SourceFile],
        config: &OptimizerConfig<'_>,
    ) -> BundleResult<Compiled>;
}

/// Joins sources behind their delimiters without touching the code.
///
/// Used when no external compiler is wanted; also the reference behavior the
/// segmentation tests are written against.
#[derive(Debug, Default, Clone, Copy)]
pub struct Concat;

impl Optimizer for Concat {
    fn optimize(
        &self,
        _externs: &[SourceFile],
        sources: &[SourceFile],
        config: &OptimizerConfig<'_>,
    ) -> BundleResult<Compiled> {
        let capacity = sources.iter().map(|s| s.code.len() + s.name.len() + 32).sum();
        let mut code = String::with_capacity(capacity);
        for source in sources {
            if config.print_input_delimiter {
                code.push_str(&OptimizerConfig::delimiter(&source.name));
                code.push('\n');
            }
            code.push_str(&source.code);
            if !source.code.ends_with('\n') {
                code.push('\n');
            }
        }
        Ok(Compiled {
            code,
            warnings: Vec::new(),
        })
    }
}
