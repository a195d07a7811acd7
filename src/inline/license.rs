//! License comment merging.
//!
//! The first license comment in the document survives as the carrier; every
//! other one is dropped from the tree and its text folded into the carrier
//! when the run ends.

use crate::dom::{Dom, NodeData, NodeId};
use rustc_hash::FxHashSet;

#[derive(Debug, Default)]
pub struct LicenseMerger {
    /// Whitespace-free form of every recorded text.
    seen: FxHashSet<String>,
    licenses: Vec<String>,
    carrier: Option<NodeId>,
}

impl LicenseMerger {
    /// Record `text`. Texts equal up to whitespace are kept once, in the
    /// form first seen (minus leading and trailing line breaks).
    pub fn record(&mut self, text: &str) -> bool {
        let key: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if !self.seen.insert(key) {
            return false;
        }
        self.licenses
            .push(text.trim_matches(['\r', '\n']).to_owned());
        true
    }

    /// Make `node` the carrier unless one was already chosen.
    pub fn claim_carrier(&mut self, node: NodeId) -> bool {
        if self.carrier.is_some() {
            return false;
        }
        self.carrier = Some(node);
        true
    }

    #[cfg(test)]
    pub fn licenses(&self) -> &[String] {
        &self.licenses
    }

    /// Write the merged text into the carrier comment.
    pub fn finish(self, dom: &mut Dom) {
        let Some(carrier) = self.carrier else {
            return;
        };
        if let NodeData::Comment(text) = dom.data_mut(carrier) {
            *text = format!("\n{}\n", self.licenses.join("\n\n"));
        }
    }
}
