use firetest_types::DbPath;
use serde_json::Value;
use tracing::trace;

use crate::codec::decode;
use crate::node::Node;

/// Owns the root node and applies path-addressed mutations.
///
/// Paths are sanitized [`DbPath`]s; the root path addresses the whole tree.
/// Every mutation leaves each reachable node holding exactly one of a scalar
/// or at least one child. The root is never removed, only replaced.
///
/// `PathTree` is not synchronized. Callers that share it across threads wrap
/// it in a lock and hold the write side for every mutation.
#[derive(Debug, Default)]
pub struct PathTree {
    root: Node,
}

impl PathTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The node at `path`, or `None` if any segment is missing.
    pub fn get(&self, path: &DbPath) -> Option<&Node> {
        self.root.descendant(path.segments())
    }

    /// Decoded value at `path`, or `None` if the path does not exist.
    pub fn read(&self, path: &DbPath) -> Option<Value> {
        self.get(path).map(decode)
    }

    /// Overwrite the subtree at `path` with `node`.
    ///
    /// Missing intermediate nodes are created and any scalar on the way is
    /// discarded. The previous subtree at `path` is replaced, not merged. A
    /// node that holds nothing after compaction deletes `path` instead.
    pub fn add(&mut self, path: &DbPath, node: Node) {
        let node = node.compacted();
        let segments: Vec<&str> = path.segments().collect();
        let Some((last, parents)) = segments.split_last() else {
            self.root = node;
            return;
        };
        if node.is_empty() {
            self.del(path);
            return;
        }

        let parent = descend_or_create(&mut self.root, parents);
        *parent.child_entry(last) = node;
    }

    /// Merge `node` into the subtree at `path`.
    ///
    /// Only the direct children named by `node` are replaced; others are left
    /// untouched. Nested children are not merged further. If the merge leaves
    /// the terminal node holding nothing it is pruned like a delete.
    pub fn update(&mut self, path: &DbPath, node: Node) {
        let segments: Vec<&str> = path.segments().collect();
        let terminal = descend_or_create(&mut self.root, &segments);
        terminal.merge(node);

        if terminal.is_empty() && !segments.is_empty() {
            self.del(path);
        }
    }

    /// Remove the subtree at `path` and prune ancestors left empty.
    ///
    /// Pruning stops at the first ancestor with another child, and never
    /// removes the root. Deleting the root path resets it to an empty node.
    /// Returns `false` when nothing existed at `path`.
    pub fn del(&mut self, path: &DbPath) -> bool {
        let segments: Vec<&str> = path.segments().collect();
        if segments.is_empty() {
            let existed = !self.root.is_empty();
            self.root = Node::empty();
            return existed;
        }
        let removed = remove_and_prune(&mut self.root, &segments);
        if self.root.is_empty() {
            self.root = Node::empty();
        }
        removed
    }

    /// Decoded value of the whole tree.
    pub fn snapshot(&self) -> Value {
        decode(&self.root)
    }
}

/// Walk `segments` from `node`, creating missing children. Every node passed
/// through gains a child and so loses its scalar.
fn descend_or_create<'a>(mut node: &'a mut Node, segments: &[&str]) -> &'a mut Node {
    for segment in segments {
        node = node.child_entry(segment);
    }
    node
}

fn remove_and_prune(node: &mut Node, segments: &[&str]) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        return false;
    };
    if rest.is_empty() {
        return node.children.remove(*head).is_some();
    }

    let Some(child) = node.children.get_mut(*head) else {
        return false;
    };
    let removed = remove_and_prune(child, rest);
    if removed && child.is_empty() {
        node.children.remove(*head);
        trace!(segment = %head, "pruned empty node");
    }
    removed
}
