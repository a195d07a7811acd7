//! Command-line interface definitions.

use crate::config::{OptimizationLevel, OptimizerKind};
use clap::Parser;
use std::path::PathBuf;

/// Bundle an HTML document and everything it imports into one file
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Webpath of the entry document, e.g. /index.html
    #[arg(long, value_name = "WEBPATH")]
    pub input: String,

    /// Webpath the bundled document will be served from
    #[arg(long, value_name = "WEBPATH")]
    pub output_path: String,

    /// File to write the bundled document to
    #[arg(long, value_name = "FILE")]
    pub output: PathBuf,

    /// File to write the CSP script hashes to
    #[arg(long, value_name = "FILE")]
    pub shasum: PathBuf,

    /// Optimization level for compiled scripts
    #[arg(short, long, value_enum)]
    pub level: Option<OptimizationLevel>,

    /// Aggregate scripts and run them through the optimizer
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub compile: Option<bool>,

    /// Pretty-print optimizer output for debugging
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub test_only: Option<bool>,

    /// File of regexes (one per line) for references that must not be inlined
    #[arg(long, value_name = "FILE")]
    pub ignore_file: Option<PathBuf>,

    /// Config file name (default: weld.toml)
    #[arg(short = 'C', long, default_value = "weld.toml")]
    pub config: PathBuf,

    /// Minify the bundled document
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub minify: Option<bool>,

    /// Optimizer backend
    #[arg(long, value_enum)]
    pub optimizer: Option<OptimizerKind>,

    /// Webfiles manifests (.pbtxt, .json) and JS libraries or externs (.js)
    #[arg(value_name = "INPUTS")]
    pub inputs: Vec<PathBuf>,
}
