//! Pre/post-order traversal that lets the visitor swap nodes mid-walk.
//!
//! The cursor moves over the arena's parent/sibling links instead of the call
//! stack, so import chains of any depth walk in constant stack space. After a
//! replacement the cursor sits on the new node: an entered replacement is
//! descended into next, which is how spliced imports get inlined
//! transitively.

use super::{Dom, NodeId};

/// What the visitor wants done with the node it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Keep,
    /// Splice this (detached) node into the position of the visited one.
    Replace(NodeId),
}

pub trait Visitor {
    type Error;

    fn enter(&mut self, dom: &mut Dom, node: NodeId) -> Result<Visit, Self::Error>;

    fn leave(&mut self, dom: &mut Dom, node: NodeId) -> Result<Visit, Self::Error> {
        let _ = (dom, node);
        Ok(Visit::Keep)
    }
}

/// Walk the tree under `root`. Returns the root after the walk, which differs
/// from `root` when the visitor replaced it.
pub fn walk<V: Visitor>(dom: &mut Dom, root: NodeId, visitor: &mut V) -> Result<NodeId, V::Error> {
    let mut root = root;
    let mut node = root;

    loop {
        let visit = visitor.enter(dom, node)?;
        node = step(dom, &mut root, node, visit);

        if let Some(child) = dom.first_child(node) {
            node = child;
            continue;
        }

        // Climb until a node with a next sibling is found.
        loop {
            let visit = visitor.leave(dom, node)?;
            node = step(dom, &mut root, node, visit);
            if node == root {
                return Ok(root);
            }
            match (dom.next_sibling(node), dom.parent(node)) {
                (Some(next), _) => {
                    node = next;
                    break;
                }
                (None, Some(parent)) => node = parent,
                (None, None) => return Ok(root),
            }
        }
    }
}

/// Apply `visit` to `node` and return where the cursor now sits.
fn step(dom: &mut Dom, root: &mut NodeId, node: NodeId, visit: Visit) -> NodeId {
    let current = match visit {
        Visit::Keep => node,
        Visit::Replace(new) => {
            dom.replace(node, new);
            new
        }
    };
    if node == *root {
        *root = current;
    }
    current
}
