//! `[bundle]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[bundle]` section in weld.toml - inlining behavior.
///
/// # Example
/// ```toml
/// [bundle]
/// minify = true
/// passthrough = ["demo-snippet", "code-sample"]
/// ignore_file = "noinline.txt"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BundleConfig {
    /// Minify the output document.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub minify: bool,

    /// Elements whose subtree is copied through without inlining,
    /// comment removal or rootification.
    #[serde(default = "defaults::bundle::passthrough")]
    #[educe(Default = defaults::bundle::passthrough())]
    pub passthrough: Vec<String>,

    /// Comments containing this marker are merged into one license block.
    #[serde(default = "defaults::bundle::license_marker")]
    #[educe(Default = defaults::bundle::license_marker())]
    pub license_marker: String,

    /// File with one regex per line; matching `href`/`src` values are
    /// neither inlined nor rootified.
    #[serde(default = "defaults::bundle::ignore_file")]
    #[educe(Default = defaults::bundle::ignore_file())]
    pub ignore_file: Option<PathBuf>,
}
