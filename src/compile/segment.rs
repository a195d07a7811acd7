//! Cutting the optimizer blob back into per-tag bodies.
//!
//! The blob is partitioned at every delimiter. Segments named after a queued
//! tag are handed out in queue order; segments named after a library are
//! carried into the next tag-bound body. The optimizer may move libraries
//! around freely, but tag-bound scripts must come out in the order they went
//! in.

use super::PendingScript;
use crate::dom::NodeId;
use crate::error::{BundleError, BundleResult};
use crate::webpath::Webpath;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::OnceLock;

fn delimiter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"//# sourceURL=build:/([^\n]+)").expect("static regex"))
}

/// Split `blob` and pair each piece with the tag it belongs to.
///
/// `pending` must be in document order. Every entry is consumed exactly
/// once or the whole call fails.
pub fn segment(
    blob: &str,
    pending: Vec<PendingScript>,
    libraries: &FxHashSet<&str>,
) -> BundleResult<Vec<(NodeId, String)>> {
    let delimiters: Vec<(usize, &str)> = delimiter_regex()
        .captures_iter(blob)
        .filter_map(|caps| Some((caps.get(0)?.start(), caps.get(1)?.as_str().trim_end())))
        .collect();
    if delimiters.is_empty() {
        return Err(BundleError::Consistency(
            "nothing found in compiled JS blob".into(),
        ));
    }

    let bound: FxHashSet<Webpath> = pending.iter().map(|p| p.path.clone()).collect();
    let mut queue: VecDeque<PendingScript> = pending.into();
    let mut out: Vec<(NodeId, String)> = Vec::with_capacity(queue.len());
    // Start of the body being accumulated; text before the first delimiter
    // and carried library segments land in the next tag-bound body.
    let mut body_start = 0;

    for (i, &(_, name)) in delimiters.iter().enumerate() {
        let end = delimiters.get(i + 1).map_or(blob.len(), |&(start, _)| start);
        let path = Webpath::new(name);

        if bound.contains(&path) {
            let Some(head) = queue.pop_front() else {
                return Err(BundleError::Consistency(format!(
                    "optimizer emitted {path} after the last <script>"
                )));
            };
            if head.path != path {
                return Err(BundleError::Consistency(format!(
                    "<script> tag for {path} should come before {}",
                    head.path
                )));
            }
            out.push((head.tag, blob[body_start..end].to_owned()));
            body_start = end;
        } else if !libraries.contains(name) {
            return Err(BundleError::Consistency(format!(
                "unexpected segment {path} in compiled JS blob"
            )));
        }
    }

    if let Some(remaining) = queue.front() {
        let names: Vec<&str> = queue.iter().map(|p| p.path.as_str()).collect();
        return Err(BundleError::Consistency(format!(
            "<script> for {} wasn't compiled (missing: {})",
            remaining.path,
            names.join(", ")
        )));
    }

    // Libraries emitted after the last tag-bound script.
    if body_start < blob.len()
        && let Some((_, last)) = out.last_mut()
    {
        last.push_str(&blob[body_start..]);
    }

    Ok(out)
}
