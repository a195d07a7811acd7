//! One bundling run, from the input webpath to the written artifacts.
//!
//! ```text
//! parse ─► inline walk ─► compile + segment ─► combine ─► licenses ─► serialize
//!                      └► (or) library insertion ┘                     │
//!                                                      shasum ◄────────┤
//!                                                      minify ◄────────┘
//! ```
//!
//! Nothing is written until every stage succeeded.

use crate::compile::{Aggregator, Optimizer, SourceFile, combine_scripts};
use crate::config::WeldConfig;
use crate::dom::{Attributes, Dom, NodeId, parse_document, serialize};
use crate::error::{BundleError, BundleResult};
use crate::inline::{Compiling, InlineSettings, escape_script_close, inline};
use crate::log;
use crate::shasum;
use crate::utils::minify::minify;
use crate::webfiles::{Webfiles, is_manifest};
use crate::webpath::Webpath;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Prepended to the library scripts when they are not compiled, so that
/// Closure's base.js does not try to load dependencies on its own.
const CLOSURE_NO_DEPS: &str = "var CLOSURE_NO_DEPS = true;";

/// Everything named on the command line after the options.
#[derive(Debug, Default)]
pub struct Inputs {
    pub webfiles: Webfiles,
    /// Scripts placed ahead of every deferred tag, in supplied order.
    pub libraries: Vec<SourceFile>,
    pub externs: Vec<SourceFile>,
}

impl Inputs {
    /// Sort `paths` into manifests, libraries and externs. Anything else is
    /// skipped with a warning.
    pub fn load(paths: &[PathBuf]) -> BundleResult<Self> {
        let mut manifests = Vec::new();
        let mut libraries = Vec::new();
        let mut externs = Vec::new();

        for path in paths {
            if is_manifest(path) {
                manifests.push(path.as_path());
            } else if path.extension().is_some_and(|ext| ext == "js") {
                let code = fs::read_to_string(path).map_err(|err| BundleError::io(path, err))?;
                let source = SourceFile::new(path.to_string_lossy(), code);
                if source.is_externs() {
                    externs.push(source);
                } else {
                    libraries.push(source);
                }
            } else {
                log!("warn"; "ignoring input {}", path.display());
            }
        }

        Ok(Self {
            webfiles: Webfiles::from_manifests(&manifests)?,
            libraries,
            externs,
        })
    }
}

/// What a run produces.
#[derive(Debug)]
pub struct Artifacts {
    pub html: Vec<u8>,
    pub shasum: String,
}

/// Parameters of one run.
pub struct Job<'a> {
    pub input: Webpath,
    pub output_path: Webpath,
    pub config: &'a WeldConfig,
    pub ignore: &'a [Regex],
}

/// Bundle `job.input` into one document and its hash listing.
pub fn run(job: &Job<'_>, inputs: &Inputs, optimizer: &dyn Optimizer) -> BundleResult<Artifacts> {
    let config = job.config;
    let webfiles = &inputs.webfiles;

    let mut dom = Dom::new();
    let content = webfiles.read(&job.input, &job.input)?;
    let root = parse_document(&mut dom, job.input.as_str(), content.as_bytes())?;

    let compiling = config.compile.enable.then(|| Compiling {
        aggregator: Aggregator::new(inputs.libraries.clone(), inputs.externs.clone()),
        optimizer,
        config: &config.compile,
    });
    let settings = InlineSettings {
        output_path: &job.output_path,
        bundle: &config.bundle,
        ignore: job.ignore,
    };
    let inlined = inline(&mut dom, root, &job.input, webfiles, &settings, compiling)?;
    let root = inlined.root;

    match inlined.aggregator {
        Some(aggregator) => aggregator.compile(&mut dom, optimizer, &config.compile, webfiles)?,
        None => {
            if let Some(first) = inlined.first_script {
                insert_libraries(&mut dom, first, &inputs.libraries);
            }
        }
    }

    combine_scripts(&mut dom, root, &config.bundle.passthrough);
    inlined.licenses.finish(&mut dom);

    let html = serialize(&dom, root).map_err(|err| BundleError::io(job.output_path.as_str(), err))?;
    let hashes = shasum::compute(&dom, root, &job.output_path, webfiles)?;
    let html = minify(&html, config.bundle.minify).into_owned();

    log!("bundle"; "{} -> {} ({} bytes, {} script hash(es))", job.input, job.output_path, html.len(), hashes.len());
    Ok(Artifacts {
        html,
        shasum: shasum::listing(&hashes),
    })
}

/// Put the libraries, uncompiled, in front of the first script.
fn insert_libraries(dom: &mut Dom, first: NodeId, libraries: &[SourceFile]) {
    let bodies = std::iter::once(CLOSURE_NO_DEPS.to_owned())
        .chain(libraries.iter().map(|lib| escape_script_close(&lib.code)));
    for body in bodies {
        let script = dom.create_raw_element("script", Attributes::new(), body);
        dom.insert_before(first, script);
    }
}

/// Write both artifacts, creating parent directories as needed.
pub fn write_artifacts(artifacts: &Artifacts, output: &Path, shasum: &Path) -> BundleResult<()> {
    write_file(output, &artifacts.html)?;
    write_file(shasum, artifacts.shasum.as_bytes())
}

fn write_file(path: &Path, content: &[u8]) -> BundleResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| BundleError::io(parent, err))?;
    }
    fs::write(path, content).map_err(|err| BundleError::io(path, err))
}
