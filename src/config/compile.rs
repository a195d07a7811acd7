//! `[compile]` section configuration.
//!
//! Controls whether deferred scripts go through the JS optimizer and how the
//! optimizer is invoked.

use super::defaults;
use clap::ValueEnum;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Enums
// ============================================================================

/// How aggressively the optimizer may rewrite code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    /// Whitespace-level changes only.
    None,
    /// Local renaming and dead-code removal (default).
    #[default]
    Simple,
    /// Whole-program optimization.
    Advanced,
}

/// Backend used to turn the aggregated scripts into one blob.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// Closure Compiler, run as an external process (default).
    #[default]
    Closure,
    /// Plain concatenation behind input delimiters; no external tool.
    Concat,
}

// ============================================================================
// CompileConfig
// ============================================================================

/// `[compile]` section in weld.toml.
///
/// # Example
/// ```toml
/// [compile]
/// enable = true
/// level = "advanced"
/// command = ["npx", "google-closure-compiler"]
///
/// [compile.groups]
/// polymerBehavior = ["JSC_POLYMER_MISPLACED_BEHAVIOR"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct CompileConfig {
    /// Aggregate and optimize scripts instead of inlining them one by one.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub enable: bool,

    #[serde(default = "defaults::compile::level")]
    #[educe(Default = defaults::compile::level())]
    pub level: OptimizationLevel,

    #[serde(default = "defaults::compile::optimizer")]
    #[educe(Default = defaults::compile::optimizer())]
    pub optimizer: OptimizerKind,

    /// Closure Compiler command line prefix.
    #[serde(default = "defaults::compile::command")]
    #[educe(Default = defaults::compile::command())]
    pub command: Vec<String>,

    #[serde(default = "defaults::compile::language_in")]
    #[educe(Default = defaults::compile::language_in())]
    pub language_in: String,

    #[serde(default = "defaults::compile::language_out")]
    #[educe(Default = defaults::compile::language_out())]
    pub language_out: String,

    /// Turn off optimizations that break Polymer-style code (property
    /// renaming, function inlining, devirtualization).
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub disable_unsafe_passes: bool,

    /// Pretty-print output with pseudo names, for debugging tests.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub test_only: bool,

    /// Extra diagnostic groups usable in `jscomp-suppress`, as
    /// group name → diagnostic keys.
    #[serde(default = "defaults::compile::groups")]
    #[educe(Default = defaults::compile::groups())]
    pub groups: BTreeMap<String, Vec<String>>,
}

impl OptimizationLevel {
    /// Closure Compiler's `--compilation_level` value.
    pub const fn closure_flag(self) -> &'static str {
        match self {
            Self::None => "WHITESPACE_ONLY",
            Self::Simple => "SIMPLE",
            Self::Advanced => "ADVANCED",
        }
    }
}
