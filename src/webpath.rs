//! Virtual paths and reference resolution.
//!
//! A [`Webpath`] is the logical, slash-separated name of a bundlable resource,
//! independent of where its bytes live on disk.
//!
//! # Reference Types
//!
//! | Reference | Kind | Handling |
//! |-----------|------|----------|
//! | `/tf-foo/foo.html` | Absolute | normalized as-is |
//! | `https:foo`, `data:..` | Absolute URI | returned unchanged |
//! | `../lib/lib.js` | Relative | resolved against the parent of the current document |
//! | `#top`, `dir/`, `//cdn/x.js` | Ignorable | never inlined, never rootified |
//! | `[[src]]`, `{{url}}` | Ignorable | template interpolation |

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Canonical logical path of a resource, e.g. `/tf-backend/tf-backend.html`.
///
/// Equality is structural, so callers normalize before comparing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Webpath(String);

impl Webpath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_absolute(&self) -> bool {
        self.0.starts_with('/')
    }

    /// Collapse `.`, `..` and empty segments.
    ///
    /// `..` above the root of an absolute path is dropped; leading `..` of a
    /// relative path is kept.
    pub fn normalize(&self) -> Self {
        let absolute = self.is_absolute();
        let mut segments: Vec<&str> = Vec::new();
        for segment in self.0.split('/') {
            match segment {
                "" | "." => {}
                ".." => match segments.last() {
                    Some(&last) if last != ".." => {
                        segments.pop();
                    }
                    _ if absolute => {}
                    _ => segments.push(".."),
                },
                _ => segments.push(segment),
            }
        }

        let joined = segments.join("/");
        match (absolute, joined.is_empty()) {
            (true, _) => Self(format!("/{joined}")),
            (false, true) => Self(String::new()),
            (false, false) => Self(joined),
        }
    }

    /// Directory portion of the path: `/a/b.html` -> `/a`, `/a.html` -> `/`.
    pub fn parent(&self) -> Self {
        match self.0.trim_end_matches('/').rfind('/') {
            Some(0) => Self::new("/"),
            Some(pos) => Self::new(&self.0[..pos]),
            None => Self::new(""),
        }
    }

    /// Join `other` onto this path unless `other` is already absolute.
    pub fn resolve(&self, other: &str) -> Self {
        if other.starts_with('/') || self.0.is_empty() {
            return Self::new(other);
        }
        if self.0.ends_with('/') {
            Self(format!("{}{other}", self.0))
        } else {
            Self(format!("{}/{other}", self.0))
        }
    }

    /// Path of `target` as seen from the directory `self`.
    ///
    /// Both paths are normalized first, so `/a/b` relativizing `/a/c/d.js`
    /// yields `../c/d.js`.
    pub fn relativize(&self, target: &Webpath) -> Self {
        let base = self.normalize();
        let target = target.normalize();
        let base: Vec<&str> = base.0.split('/').filter(|s| !s.is_empty()).collect();
        let target: Vec<&str> = target.0.split('/').filter(|s| !s.is_empty()).collect();

        let common = base
            .iter()
            .zip(&target)
            .take_while(|(a, b)| a == b)
            .count();

        let mut parts: Vec<&str> = std::iter::repeat_n("..", base.len() - common).collect();
        parts.extend_from_slice(&target[common..]);
        Self(parts.join("/"))
    }
}

impl fmt::Display for Webpath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Webpath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// Reference Classification
// ============================================================================

/// True for references that are already absolute: a leading `/` or any
/// `scheme:` prefix (`https:`, `data:`, ...).
pub fn is_absolute_reference(reference: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^(?:/|[A-Za-z][A-Za-z0-9+.-]*:)").expect("static regex")
    });
    re.is_match(reference)
}

/// True for references that inlining and rootification must leave alone.
pub fn is_ignorable(reference: &str) -> bool {
    reference.starts_with('#')
        || reference.ends_with('/')
        || reference.contains("//")
        || reference.starts_with("data:")
        || reference.starts_with("javascript:")
        || reference.starts_with("mailto:")
        // Polymer data binding
        || (reference.contains("[[") && reference.contains("]]"))
        || (reference.contains("{{") && reference.contains("}}"))
}

/// Resolve `reference` as written inside the document at `current`.
pub fn resolve(current: &Webpath, reference: &str) -> Webpath {
    if is_absolute_reference(reference) {
        if reference.starts_with('/') {
            Webpath::new(reference).normalize()
        } else {
            Webpath::new(reference)
        }
    } else {
        current.parent().resolve(reference).normalize()
    }
}

// ============================================================================
// Tests
// ============================================================================
