//! Virtual file table: webpath → physical file.
//!
//! Populated from manifests before traversal starts and never mutated
//! afterwards. Two manifest formats are understood:
//!
//! ```text
//! # webfiles.pbtxt
//! src {
//!   path: "tensorboard/components/tf_backend/tf-backend.html"
//!   longpath: "tensorboard/components/tf_backend/tf-backend.html"
//!   webpath: "/tf-backend/tf-backend.html"
//! }
//! ```
//!
//! ```json
//! { "src": [{ "path": "lib/d3.js", "webpath": "/d3/d3.js" }] }
//! ```

use crate::error::{BundleError, BundleResult};
use crate::webpath::Webpath;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Immutable lookup from webpath to the file holding its bytes.
#[derive(Debug, Default)]
pub struct Webfiles {
    files: FxHashMap<Webpath, PathBuf>,
}

impl Webfiles {
    /// Load and merge all manifests. Later manifests win on duplicate webpaths.
    pub fn from_manifests<P: AsRef<Path>>(manifests: &[P]) -> BundleResult<Self> {
        let mut files = FxHashMap::default();
        for manifest in manifests {
            for (webpath, path) in load_manifest(manifest.as_ref())? {
                files.insert(webpath, path);
            }
        }
        Ok(Self { files })
    }

    #[inline]
    pub fn contains(&self, path: &Webpath) -> bool {
        self.files.contains_key(path)
    }

    #[inline]
    pub fn get(&self, path: &Webpath) -> Option<&Path> {
        self.files.get(path).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Physical location of `path`, referenced from the document at `from`.
    pub fn locate(&self, from: &Webpath, path: &Webpath) -> BundleResult<&Path> {
        self.get(path).ok_or_else(|| BundleError::Resolution {
            from: from.clone(),
            path: path.clone(),
        })
    }

    /// Read the content behind `path` as UTF-8 text.
    pub fn read(&self, from: &Webpath, path: &Webpath) -> BundleResult<String> {
        let file = self.locate(from, path)?;
        fs::read_to_string(file).map_err(|err| BundleError::io(file, err))
    }

    /// Webpaths ending in `.js` whose `.d.ts` sibling is also declared,
    /// i.e. JS emitted by the TypeScript compiler.
    pub fn is_transpiled_typescript(&self, name: &str) -> bool {
        name.strip_suffix(".js")
            .is_some_and(|stem| self.contains(&Webpath::new(format!("{stem}.d.ts"))))
    }
}

impl FromIterator<(Webpath, PathBuf)> for Webfiles {
    fn from_iter<I: IntoIterator<Item = (Webpath, PathBuf)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Manifest Loading
// ============================================================================

/// Returns true if `path` looks like a manifest this module can load.
pub fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| matches!(ext, "pbtxt" | "json"))
}

/// Parse one manifest into `(webpath, physical path)` pairs.
pub fn load_manifest(path: &Path) -> BundleResult<Vec<(Webpath, PathBuf)>> {
    let content = fs::read_to_string(path).map_err(|err| BundleError::io(path, err))?;
    let entries = match path.extension().and_then(|e| e.to_str()) {
        Some("pbtxt") => parse_pbtxt(&content),
        Some("json") => parse_json(&content),
        _ => Err("unsupported manifest extension".to_string()),
    };
    entries.map_err(|message| BundleError::Manifest {
        path: path.to_path_buf(),
        message,
    })
}

#[derive(Deserialize)]
struct JsonManifest {
    #[serde(default)]
    src: Vec<JsonSource>,
}

#[derive(Deserialize)]
struct JsonSource {
    path: PathBuf,
    webpath: String,
}

fn parse_json(content: &str) -> Result<Vec<(Webpath, PathBuf)>, String> {
    let manifest: JsonManifest = serde_json::from_str(content).map_err(|e| e.to_string())?;
    manifest
        .src
        .into_iter()
        .map(|src| Ok((checked_webpath(&src.webpath)?, src.path)))
        .collect()
}

/// Parse the subset of protobuf text format used by webfiles manifests:
/// repeated `src { key: "value" ... }` blocks. Unknown keys are ignored.
fn parse_pbtxt(content: &str) -> Result<Vec<(Webpath, PathBuf)>, String> {
    static BLOCK: OnceLock<Regex> = OnceLock::new();
    static FIELD: OnceLock<Regex> = OnceLock::new();
    let block = BLOCK.get_or_init(|| Regex::new(r"\bsrc\s*\{([^}]*)\}").expect("static regex"));
    let field = FIELD.get_or_init(|| {
        Regex::new(r#"(\w+)\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("static regex")
    });

    let mut entries = Vec::new();
    for caps in block.captures_iter(content) {
        let mut path = None;
        let mut webpath = None;
        for field_caps in field.captures_iter(&caps[1]) {
            let value = unescape_pbtxt(&field_caps[2]);
            match &field_caps[1] {
                "path" => path = Some(PathBuf::from(value)),
                "webpath" => webpath = Some(value),
                _ => {}
            }
        }
        match (webpath, path) {
            (Some(webpath), Some(path)) => entries.push((checked_webpath(&webpath)?, path)),
            _ => return Err(format!("src block without path/webpath: `{}`", caps[1].trim())),
        }
    }
    Ok(entries)
}

fn unescape_pbtxt(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn checked_webpath(raw: &str) -> Result<Webpath, String> {
    let webpath = Webpath::new(raw);
    if !webpath.is_absolute() {
        return Err(format!("webpath `{raw}` must start with `/`"));
    }
    Ok(webpath.normalize())
}

// ============================================================================
// Tests
// ============================================================================
