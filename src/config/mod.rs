//! Bundler configuration from `weld.toml`.
//!
//! # Sections
//!
//! | Section      | Purpose                                          |
//! |--------------|--------------------------------------------------|
//! | `[bundle]`   | Inlining (passthrough tags, licenses, minify)    |
//! | `[compile]`  | Script optimizer (level, command, languages)     |
//!
//! The file is optional. Every field has a default and CLI flags override
//! whatever the file says.
//!
//! # Example
//!
//! ```toml
//! [bundle]
//! minify = true
//! ignore_file = "noinline.txt"
//!
//! [compile]
//! enable = true
//! level = "simple"
//! language_out = "ECMASCRIPT_2017"
//! ```

mod bundle;
mod compile;
pub mod defaults;
mod error;

pub use bundle::BundleConfig;
pub use compile::{CompileConfig, OptimizationLevel, OptimizerKind};
pub use error::ConfigError;

use crate::cli::Cli;
use anyhow::{Context, Result, bail};
use educe::Educe;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Root configuration structure representing weld.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct WeldConfig {
    /// Path of the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub bundle: BundleConfig,

    #[serde(default)]
    pub compile: CompileConfig,
}

impl WeldConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: WeldConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)
            .with_context(|| format!("failed to parse `{}`", path.display()))?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Load `cli.config` if it exists, fall back to defaults otherwise, then
    /// apply CLI overrides and validate.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = if cli.config.exists() {
            Self::from_path(&cli.config)?
        } else {
            Self::default()
        };
        config.update_with_cli(cli);
        config.validate(cli)?;
        Ok(config)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        Self::update_option(&mut self.bundle.minify, cli.minify.as_ref());
        Self::update_option(&mut self.compile.enable, cli.compile.as_ref());
        Self::update_option(&mut self.compile.level, cli.level.as_ref());
        Self::update_option(&mut self.compile.test_only, cli.test_only.as_ref());
        Self::update_option(&mut self.compile.optimizer, cli.optimizer.as_ref());

        if cli.ignore_file.is_some() {
            self.bundle.ignore_file = cli.ignore_file.clone();
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Validate configuration for the current invocation
    pub fn validate(&self, cli: &Cli) -> Result<()> {
        for (flag, webpath) in [("--input", &cli.input), ("--output-path", &cli.output_path)] {
            if !webpath.starts_with('/') {
                bail!(ConfigError::Validation(format!(
                    "{flag} must be an absolute webpath, got `{webpath}`"
                )));
            }
        }

        if self.compile.enable && self.compile.optimizer == OptimizerKind::Closure {
            Self::check_command_installed("[compile.command]", &self.compile.command)?;
        }

        if !self.compile.enable && cli.level.is_some() {
            bail!(ConfigError::Validation(
                "--level has no effect without --compile".into()
            ));
        }

        for (field, value) in [
            ("[compile.language_in]", &self.compile.language_in),
            ("[compile.language_out]", &self.compile.language_out),
            ("[bundle.license_marker]", &self.bundle.license_marker),
        ] {
            if value.trim().is_empty() {
                bail!(ConfigError::Validation(format!("{field} must not be empty")));
            }
        }

        Ok(())
    }

    /// Compile the ignore-file regexes. Blank lines are skipped.
    pub fn ignore_patterns(&self) -> Result<Vec<Regex>> {
        let Some(path) = &self.bundle.ignore_file else {
            return Ok(Vec::new());
        };
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.clone(), err))?;
        parse_ignore_patterns(&content)
            .with_context(|| format!("bad pattern in `{}`", path.display()))
    }

    /// Check if a command is installed and available
    fn check_command_installed(field: &str, command: &[String]) -> Result<()> {
        if command.is_empty() {
            bail!(ConfigError::Validation(format!(
                "{field} must have at least one element"
            )));
        }

        let cmd = &command[0];
        which::which(cmd)
            .with_context(|| format!("`{cmd}` not found. Please install it first."))?;

        Ok(())
    }
}

fn parse_ignore_patterns(content: &str) -> Result<Vec<Regex>> {
    content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(|line| {
            Regex::new(line)
                .map_err(|err| anyhow::Error::from(ConfigError::Validation(err.to_string())))
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(extra: &[&str]) -> Cli {
        let base = [
            "weld",
            "--input",
            "/index.html",
            "--output-path",
            "/index.html",
            "--output",
            "out.html",
            "--shasum",
            "out.sha",
        ];
        Cli::try_parse_from(base.iter().chain(extra)).unwrap()
    }

    #[test]
    fn test_from_str() {
        let config = WeldConfig::from_str(
            r#"
            [bundle]
            minify = true
            passthrough = ["demo-snippet", "code-sample"]

            [compile]
            level = "none"
            "#,
        )
        .unwrap();
        assert!(config.bundle.minify);
        assert_eq!(config.bundle.passthrough.len(), 2);
        assert_eq!(config.compile.level, OptimizationLevel::None);
        assert_eq!(config.bundle.license_marker, "@license");
    }

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(WeldConfig::from_str("[bundle").is_err());
        assert!(WeldConfig::from_str("[site]\nname = 1").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = WeldConfig::default();
        assert!(!config.bundle.minify);
        assert_eq!(config.bundle.passthrough, vec!["demo-snippet"]);
        assert!(config.bundle.ignore_file.is_none());
        assert!(!config.compile.enable);
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config = WeldConfig::from_str("[bundle]\nminify = true").unwrap();
        config.update_with_cli(&cli(&["--minify", "false", "--optimizer", "concat"]));
        assert!(!config.bundle.minify);
        assert_eq!(config.compile.optimizer, OptimizerKind::Concat);
    }

    #[test]
    fn test_cli_keeps_file_values_when_absent() {
        let mut config = WeldConfig::from_str("[compile]\nlevel = \"advanced\"").unwrap();
        config.update_with_cli(&cli(&[]));
        assert_eq!(config.compile.level, OptimizationLevel::Advanced);
    }

    #[test]
    fn test_validate_relative_webpath() {
        let cli = Cli::try_parse_from([
            "weld",
            "--input",
            "index.html",
            "--output-path",
            "/index.html",
            "--output",
            "o",
            "--shasum",
            "s",
        ])
        .unwrap();
        assert!(WeldConfig::default().validate(&cli).is_err());
    }

    #[test]
    fn test_validate_level_without_compile() {
        let cli = cli(&["--level", "advanced"]);
        let mut config = WeldConfig::default();
        config.update_with_cli(&cli);
        assert!(config.validate(&cli).is_err());
    }

    #[test]
    fn test_validate_concat_needs_no_command() {
        let cli = cli(&["--compile", "--optimizer", "concat"]);
        let mut config = WeldConfig::default();
        config.compile.command.clear();
        config.update_with_cli(&cli);
        assert!(config.validate(&cli).is_ok());
    }

    #[test]
    fn test_validate_missing_closure_command() {
        let cli = cli(&["--compile"]);
        let mut config = WeldConfig::default();
        config.compile.command = vec!["weld-no-such-compiler-xyz".into()];
        config.update_with_cli(&cli);
        assert!(config.validate(&cli).is_err());
    }

    #[test]
    fn test_ignore_patterns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("noinline.txt");
        fs::write(&path, "^/vendor/\n\n\\.min\\.js$\n").unwrap();

        let mut config = WeldConfig::default();
        config.bundle.ignore_file = Some(path);
        let patterns = config.ignore_patterns().unwrap();
        assert_eq!(patterns.len(), 2);
        assert!(patterns[0].is_match("/vendor/x.js"));
        assert!(patterns[1].is_match("a.min.js"));
    }

    #[test]
    fn test_ignore_patterns_bad_regex() {
        assert!(parse_ignore_patterns("(unclosed").is_err());
    }

    #[test]
    fn test_load_without_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("weld.toml");
        let cli = cli(&["-C", missing.to_str().unwrap()]);
        let config = WeldConfig::load(&cli).unwrap();
        assert_eq!(config.config_path, PathBuf::new());
    }
}
