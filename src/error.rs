//! Bundling error types.

use crate::webpath::Webpath;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions that abort a bundling run.
///
/// There is no partial-success mode: any of these discards the run before an
/// output artifact is written.
#[derive(Debug, Error)]
pub enum BundleError {
    /// A referenced webpath is not declared in any manifest.
    #[error("bad ref: {from} -> {path} is not a declared webfile")]
    Resolution { from: Webpath, path: Webpath },

    /// The optimizer output does not line up with the queued script tags.
    #[error("consistency error: {0}")]
    Consistency(String),

    /// The optimizer reported errors (after suppressions were applied).
    #[error("compilation failed with {errors} error(s)")]
    Compile {
        errors: usize,
        diagnostics: Vec<String>,
    },

    #[error("parse error in `{path}` at byte {position}: {message}")]
    Parse {
        path: String,
        position: usize,
        message: String,
    },

    #[error("IO error on `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad manifest `{}`: {message}", .path.display())]
    Manifest { path: PathBuf, message: String },
}

impl BundleError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type BundleResult<T> = Result<T, BundleError>;
