//! CSP hash listing for the scripts of the output document.
//!
//! Each line is `base64(sha256(body))`, which is what a
//! `script-src 'sha256-...'` source expects.

use crate::dom::{Dom, NodeId};
use crate::error::{BundleError, BundleResult};
use crate::log;
use crate::webfiles::Webfiles;
use crate::webpath::{Webpath, is_absolute_reference, is_ignorable, resolve};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use std::fs;

/// Hash every `<script>` under `root`, in document order.
///
/// External scripts are looked up relative to `output_path`, i.e. as the
/// browser would request them from the bundled document.
pub fn compute(
    dom: &Dom,
    root: NodeId,
    output_path: &Webpath,
    webfiles: &Webfiles,
) -> BundleResult<Vec<String>> {
    let mut hashes = Vec::new();
    for script in dom.elements_by_tag(root, "script") {
        let src = dom.attr(script, "src");
        if src.is_empty() {
            hashes.push(digest(dom.inner_data(script).as_bytes()));
            continue;
        }
        if is_absolute_reference(src) || is_ignorable(src) {
            log!("warn"; "not hashing external script {src}");
            continue;
        }

        let path = resolve(output_path, src);
        let file = webfiles.get(&path).ok_or_else(|| {
            BundleError::Consistency(format!(
                "<script src=\"{src}\"> resolves to {path}, which is not a declared file"
            ))
        })?;
        let content = fs::read(file).map_err(|err| BundleError::io(file, err))?;
        hashes.push(digest(&content));
    }
    Ok(hashes)
}

/// The listing as written to disk.
pub fn listing(hashes: &[String]) -> String {
    hashes.join("\n")
}

fn digest(content: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(content))
}
