//! Mutable document tree.
//!
//! All documents of one run (the entry document and every import spliced into
//! it) live in a single arena. Nodes refer to each other through [`NodeId`]s;
//! parent and child links are owned here and updated together on every
//! mutation, so the walker never has to trust stale back-references.
//!
//! Detached nodes stay in the arena until the run ends. Nothing reachable from
//! the root points at them.

pub mod parse;
pub mod serialize;
pub mod walk;

use smallvec::SmallVec;

pub use parse::parse_document;
pub use serialize::serialize;
pub use walk::{Visit, Visitor, walk};

/// Index of a node in a [`Dom`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Ordered attribute list. Values are kept exactly as written in the source
/// (entity references are not decoded).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(SmallVec<[(String, String); 4]>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    /// Set `key` in place, or append it if absent.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.0.push((key.to_owned(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// Root of a parsed file. Carries the attributes of the import link it
    /// replaced so that `jscomp-*` flags are inherited by its descendants.
    Document { attrs: Attributes },
    Element { name: String, attrs: Attributes },
    Comment(String),
    /// Markup text, kept escaped as in the source.
    Text(String),
    /// Raw body of a `<script>` or `<style>`; never escaped.
    Data(String),
    Doctype(String),
}

#[derive(Debug)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    /// Position among the parent's children; stale while detached.
    index: usize,
    children: Vec<NodeId>,
}

/// Arena holding every node of one bundling run.
#[derive(Debug, Default)]
pub struct Dom {
    nodes: Vec<Node>,
}

impl Dom {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    pub fn create(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            index: 0,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, name: &str, attrs: Attributes) -> NodeId {
        self.create(NodeData::Element {
            name: name.to_owned(),
            attrs,
        })
    }

    /// `<script>` (or `<style>`) element holding `body` as raw data.
    pub fn create_raw_element(&mut self, name: &str, attrs: Attributes, body: String) -> NodeId {
        let element = self.create_element(name, attrs);
        let data = self.create(NodeData::Data(body));
        self.append_child(element, data);
        element
    }

    /// An empty text node, used wherever a node is removed mid-walk.
    pub fn create_placeholder(&mut self) -> NodeId {
        self.create(NodeData::Text(String::new()))
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    #[inline]
    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    #[inline]
    pub fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0].data
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.children(parent).get(self.nodes[id.0].index + 1).copied()
    }

    /// Lowercase tag name for elements, `None` for every other kind.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    #[inline]
    pub fn is_element(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id) == Some(tag)
    }

    pub fn attrs(&self, id: NodeId) -> Option<&Attributes> {
        match self.data(id) {
            NodeData::Element { attrs, .. } | NodeData::Document { attrs } => Some(attrs),
            _ => None,
        }
    }

    pub fn attrs_mut(&mut self, id: NodeId) -> Option<&mut Attributes> {
        match self.data_mut(id) {
            NodeData::Element { attrs, .. } | NodeData::Document { attrs } => Some(attrs),
            _ => None,
        }
    }

    /// Attribute value, or `""` when absent (including non-element nodes).
    pub fn attr(&self, id: NodeId, key: &str) -> &str {
        self.attrs(id).and_then(|a| a.get(key)).unwrap_or_default()
    }

    pub fn has_attr(&self, id: NodeId, key: &str) -> bool {
        self.attrs(id).is_some_and(|a| a.contains(key))
    }

    /// Look `key` up on the node, then on each ancestor.
    pub fn attr_transitive(&self, id: NodeId, key: &str) -> Option<&str> {
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            if let Some(value) = self.attrs(node).and_then(|a| a.get(key)) {
                return Some(value);
            }
            cursor = self.parent(node);
        }
        None
    }

    /// Concatenated raw data of the direct children (the body of a script).
    pub fn inner_data(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|&child| match self.data(child) {
                NodeData::Data(data) | NodeData::Text(data) => Some(data.as_str()),
                _ => None,
            })
            .collect()
    }

    /// True if any ancestor of `id` (not `id` itself) is an element named
    /// in `tags`.
    pub fn has_ancestor_named(&self, id: NodeId, tags: &[String]) -> bool {
        let mut cursor = self.parent(id);
        while let Some(node) = cursor {
            if self.tag_name(node).is_some_and(|t| tags.iter().any(|n| n == t)) {
                return true;
            }
            cursor = self.parent(node);
        }
        false
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Append a detached `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let index = children.len();
        children.push(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[child.0].index = index;
    }

    /// Insert `new` right before `reference` among its siblings.
    pub fn insert_before(&mut self, reference: NodeId, new: NodeId) {
        self.detach(new);
        let Some(parent) = self.parent(reference) else {
            return;
        };
        let pos = self.nodes[reference.0].index;
        self.nodes[parent.0].children.insert(pos, new);
        self.nodes[new.0].parent = Some(parent);
        self.reindex(parent, pos);
    }

    /// Put `new` at the position of `old`, detaching `old`.
    ///
    /// If `old` has no parent, `new` simply becomes a detached root.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        self.detach(new);
        let Some(parent) = self.parent(old) else {
            return;
        };
        // Read after detaching `new`, which may have been an earlier sibling.
        let pos = self.nodes[old.0].index;
        self.nodes[parent.0].children[pos] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[new.0].index = pos;
        self.nodes[old.0].parent = None;
    }

    /// Remove `id` from its parent, if any. Later siblings shift down.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            let pos = self.nodes[id.0].index;
            self.nodes[parent.0].children.remove(pos);
            self.reindex(parent, pos);
        }
    }

    /// Refresh the stored positions of `parent`'s children from `from` on.
    fn reindex(&mut self, parent: NodeId, from: usize) {
        for pos in from..self.nodes[parent.0].children.len() {
            let child = self.nodes[parent.0].children[pos];
            self.nodes[child.0].index = pos;
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// All nodes under `root` (inclusive) in document order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Elements named `tag` under `root`, in document order.
    pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&id| self.is_element(id, tag))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Dom, NodeId, NodeId, NodeId) {
        let mut dom = Dom::new();
        let root = dom.create(NodeData::Document {
            attrs: Attributes::new(),
        });
        let a = dom.create_element("a", Attributes::new());
        let b = dom.create_element("b", [("x", "1")].into_iter().collect());
        dom.append_child(root, a);
        dom.append_child(root, b);
        (dom, root, a, b)
    }

    #[test]
    fn test_replace_keeps_position() {
        let (mut dom, root, a, b) = sample();
        let c = dom.create_element("c", Attributes::new());
        dom.replace(a, c);

        assert_eq!(dom.children(root), &[c, b]);
        assert_eq!(dom.parent(c), Some(root));
        assert_eq!(dom.parent(a), None);
        assert_eq!(dom.next_sibling(c), Some(b));
    }

    #[test]
    fn test_insert_before_and_detach() {
        let (mut dom, root, a, b) = sample();
        let c = dom.create_element("c", Attributes::new());
        dom.insert_before(b, c);
        assert_eq!(dom.children(root), &[a, c, b]);

        dom.detach(a);
        assert_eq!(dom.children(root), &[c, b]);
        assert_eq!(dom.next_sibling(b), None);
    }

    #[test]
    fn test_attr_transitive_reaches_document() {
        let (mut dom, root, a, _) = sample();
        dom.attrs_mut(root).unwrap().set("jscomp-nocompile", "");
        assert_eq!(dom.attr_transitive(a, "jscomp-nocompile"), Some(""));
        assert_eq!(dom.attr_transitive(a, "jscomp-minify"), None);
    }

    #[test]
    fn test_attributes_set_in_place() {
        let mut attrs: Attributes = [("src", "a.js"), ("defer", "")].into_iter().collect();
        attrs.set("src", "b.js");
        attrs.set("async", "");
        let pairs: Vec<_> = attrs.iter().collect();
        assert_eq!(pairs, vec![("src", "b.js"), ("defer", ""), ("async", "")]);
    }

    #[test]
    fn test_siblings_follow_every_mutation() {
        let (mut dom, root, a, b) = sample();
        let c = dom.create_element("c", Attributes::new());
        let d = dom.create_element("d", Attributes::new());

        dom.insert_before(b, c);
        assert_eq!(dom.next_sibling(a), Some(c));
        assert_eq!(dom.next_sibling(c), Some(b));

        dom.detach(a);
        assert_eq!(dom.first_child(root), Some(c));
        assert_eq!(dom.next_sibling(c), Some(b));

        dom.replace(c, d);
        assert_eq!(dom.next_sibling(d), Some(b));
        assert_eq!(dom.next_sibling(c), None);

        dom.append_child(root, a);
        assert_eq!(dom.next_sibling(b), Some(a));

        dom.replace(d, a);
        assert_eq!(dom.children(root), &[a, b]);
        assert_eq!(dom.next_sibling(a), Some(b));
        assert_eq!(dom.next_sibling(b), None);

        // Moving an earlier sibling shifts the replaced node down first.
        dom.replace(b, a);
        assert_eq!(dom.children(root), &[a]);
        assert_eq!(dom.parent(b), None);
        assert_eq!(dom.next_sibling(a), None);
    }

    #[test]
    fn test_next_sibling_across_wide_parent() {
        let mut dom = Dom::new();
        let root = dom.create(NodeData::Document {
            attrs: Attributes::new(),
        });
        for _ in 0..10_000 {
            let child = dom.create_element("i", Attributes::new());
            dom.append_child(root, child);
        }

        let mut count = 0;
        let mut cursor = dom.first_child(root);
        while let Some(node) = cursor {
            count += 1;
            cursor = dom.next_sibling(node);
        }
        assert_eq!(count, 10_000);
    }

    #[test]
    fn test_descendants_document_order() {
        let (mut dom, root, a, b) = sample();
        let inner = dom.create(NodeData::Text("t".into()));
        dom.append_child(a, inner);
        assert_eq!(dom.descendants(root), vec![root, a, inner, b]);
        assert_eq!(dom.elements_by_tag(root, "b"), vec![b]);
    }

    #[test]
    fn test_inner_data() {
        let mut dom = Dom::new();
        let script = dom.create_raw_element("script", Attributes::new(), "var a;".into());
        assert_eq!(dom.inner_data(script), "var a;");
    }
}
