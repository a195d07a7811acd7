//! Weld - bundles a graph of HTML imports into one self-contained document.

mod bundle;
mod cli;
mod compile;
mod config;
mod dom;
mod error;
mod inline;
mod logger;
mod shasum;
mod utils;
mod webfiles;
mod webpath;

use anyhow::{Context, Result};
use bundle::{Inputs, Job};
use clap::Parser;
use cli::Cli;
use compile::{ClosureCompiler, Concat, Optimizer};
use config::{OptimizerKind, WeldConfig};
use error::BundleError;
use webpath::Webpath;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = WeldConfig::load(&cli)?;
    let ignore = config.ignore_patterns()?;

    let inputs = Inputs::load(&cli.inputs).context("Failed to load inputs")?;
    log!("bundle"; "{} webfile(s), {} librar(ies), {} externs", inputs.webfiles.len(), inputs.libraries.len(), inputs.externs.len());

    let optimizer: Box<dyn Optimizer> = match config.compile.optimizer {
        OptimizerKind::Closure => Box::new(ClosureCompiler::new(config.compile.command.clone())),
        OptimizerKind::Concat => Box::new(Concat),
    };

    let job = Job {
        input: Webpath::new(cli.input.as_str()).normalize(),
        output_path: Webpath::new(cli.output_path.as_str()).normalize(),
        config: &config,
        ignore: &ignore,
    };

    let artifacts = bundle::run(&job, &inputs, optimizer.as_ref()).inspect_err(report)?;
    bundle::write_artifacts(&artifacts, &cli.output, &cli.shasum)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    log!("bundle"; "wrote {} and {}", cli.output.display(), cli.shasum.display());
    Ok(())
}

/// Print compiler diagnostics, which the error's message only counts.
fn report(err: &BundleError) {
    if let BundleError::Compile { diagnostics, .. } = err {
        for diagnostic in diagnostics {
            log!("error"; "{diagnostic}");
        }
    }
}
