use std::collections::HashMap;

use serde_json::Number;

/// A scalar stored on a leaf node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scalar {
    Bool(bool),
    Number(Number),
    String(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Number(v.into())
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Self::Number(v.into())
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// The unit of stored data.
///
/// A persisted node holds either a scalar value or at least one named child,
/// never both. A node with neither is transient: it exists only while a
/// mutation is in flight and is pruned before the mutation returns (the root
/// is the one node allowed to stay empty).
///
/// `is_array` records that the children came from an ordered list, so that
/// decoding rebuilds a list instead of a map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    pub(crate) value: Option<Scalar>,
    pub(crate) children: HashMap<String, Node>,
    pub(crate) is_array: bool,
}

impl Node {
    /// A node with no value and no children.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn leaf(value: impl Into<Scalar>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// An object node built from named children.
    pub fn branch<K: Into<String>>(children: impl IntoIterator<Item = (K, Node)>) -> Self {
        Self {
            value: None,
            children: children.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            is_array: false,
        }
    }

    /// An array node whose children are keyed by their position.
    pub fn array(items: impl IntoIterator<Item = Node>) -> Self {
        Self {
            value: None,
            children: items
                .into_iter()
                .enumerate()
                .map(|(i, n)| (i.to_string(), n))
                .collect(),
            is_array: true,
        }
    }

    pub fn value(&self) -> Option<&Scalar> {
        self.value.as_ref()
    }

    pub fn children(&self) -> &HashMap<String, Node> {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// No value and no children.
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        self.value.is_some()
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Walk down `segments`, returning the node at the end if every step exists.
    pub fn descendant<'a, I>(&self, segments: I) -> Option<&Node>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut current = self;
        for segment in segments {
            current = current.children.get(segment)?;
        }
        Some(current)
    }

    /// Check exclusivity on every descendant: each holds exactly one of a
    /// scalar value or a non-empty child map. The node itself may be empty
    /// (the root case) but may not hold both, and an empty node carries no
    /// array flag.
    pub fn is_well_formed(&self) -> bool {
        if self.value.is_some() && !self.children.is_empty() {
            return false;
        }
        if self.children.is_empty() && self.is_array {
            return false;
        }
        self.children
            .values()
            .all(|child| !child.is_empty() && child.is_well_formed())
    }

    /// Recursively drop children that hold nothing.
    ///
    /// Encoded `null`s, empty maps, and empty lists all become empty nodes;
    /// compaction removes them so the subtree can be persisted. A node left
    /// without children loses its array flag.
    pub fn compact(&mut self) {
        self.children.retain(|_, child| {
            child.compact();
            !child.is_empty()
        });
        if self.children.is_empty() {
            self.is_array = false;
        }
    }

    /// Consuming form of [`Node::compact`].
    pub fn compacted(mut self) -> Self {
        self.compact();
        self
    }

    /// Make room for a child: a node that gains children loses its scalar.
    pub(crate) fn child_entry(&mut self, name: &str) -> &mut Node {
        self.value = None;
        self.children.entry(name.to_string()).or_default()
    }

    /// Shallow merge of `incoming` into `self`.
    ///
    /// Direct children of `incoming` replace identically keyed children
    /// wholesale; an incoming child that compacts to nothing removes the key.
    /// Children not named in `incoming` are kept. The scalar value is always
    /// overwritten with the incoming one; a scalar arriving here replaces the
    /// existing children so the node stays a leaf.
    pub(crate) fn merge(&mut self, incoming: Node) {
        let Node {
            value,
            children,
            is_array,
        } = incoming;

        if value.is_some() {
            self.children.clear();
            self.is_array = false;
            self.value = value;
            return;
        }

        self.value = None;
        if self.children.is_empty() {
            self.is_array = is_array;
        }
        for (key, child) in children {
            let child = child.compacted();
            if child.is_empty() {
                self.children.remove(&key);
            } else {
                self.children.insert(key, child);
            }
        }
        if self.children.is_empty() {
            self.is_array = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_holds_value_only() {
        let n = Node::leaf("bar");
        assert!(n.is_leaf());
        assert!(!n.is_empty());
        assert_eq!(n.len(), 0);
        assert_eq!(n.value(), Some(&Scalar::from("bar")));
    }

    #[test]
    fn empty_node() {
        let n = Node::empty();
        assert!(n.is_empty());
        assert!(!n.is_leaf());
        assert!(n.is_well_formed());
    }

    #[test]
    fn array_keys_are_indices() {
        let n = Node::array([Node::leaf(1i64), Node::leaf(2i64)]);
        assert!(n.is_array());
        assert!(n.child("0").is_some());
        assert!(n.child("1").is_some());
        assert!(n.child("2").is_none());
    }

    #[test]
    fn descendant_walks_segments() {
        let n = Node::branch([("a", Node::branch([("b", Node::leaf(true))]))]);
        assert_eq!(n.descendant(["a", "b"]), Some(&Node::leaf(true)));
        assert!(n.descendant(["a", "c"]).is_none());
        assert_eq!(n.descendant(std::iter::empty()), Some(&n));
    }

    #[test]
    fn well_formed_rejects_value_and_children() {
        let mut n = Node::branch([("a", Node::leaf(1i64))]);
        assert!(n.is_well_formed());
        n.value = Some(Scalar::from(true));
        assert!(!n.is_well_formed());
    }

    #[test]
    fn well_formed_rejects_empty_descendant() {
        let n = Node::branch([("a", Node::empty())]);
        assert!(!n.is_well_formed());
    }

    #[test]
    fn compact_removes_empty_chains() {
        let mut n = Node::branch([
            ("keep", Node::leaf("x")),
            ("drop", Node::branch([("deeper", Node::empty())])),
        ]);
        n.compact();
        assert_eq!(n.len(), 1);
        assert!(n.child("keep").is_some());
        assert!(n.is_well_formed());
    }

    #[test]
    fn child_entry_clears_scalar() {
        let mut n = Node::leaf("bar");
        n.child_entry("baz").value = Some(Scalar::from(1i64));
        assert!(n.value().is_none());
        assert!(n.is_well_formed());
    }

    #[test]
    fn merge_overwrites_named_children_only() {
        let mut n = Node::branch([
            ("1", Node::leaf("one")),
            ("2", Node::leaf("two")),
            ("3", Node::leaf("three")),
        ]);
        n.merge(Node::branch([("1", Node::leaf("three")), ("3", Node::leaf("one"))]));
        assert_eq!(n.child("1"), Some(&Node::leaf("three")));
        assert_eq!(n.child("2"), Some(&Node::leaf("two")));
        assert_eq!(n.child("3"), Some(&Node::leaf("one")));
    }

    #[test]
    fn merge_is_not_recursive() {
        let mut n = Node::branch([("a", Node::branch([("x", Node::leaf(1i64))]))]);
        n.merge(Node::branch([("a", Node::branch([("y", Node::leaf(2i64))]))]));
        let a = n.child("a").unwrap();
        assert!(a.child("x").is_none());
        assert_eq!(a.child("y"), Some(&Node::leaf(2i64)));
    }

    #[test]
    fn merge_empty_child_removes_key() {
        let mut n = Node::branch([("a", Node::leaf(1i64)), ("b", Node::leaf(2i64))]);
        n.merge(Node::branch([("a", Node::empty())]));
        assert!(n.child("a").is_none());
        assert!(n.child("b").is_some());
    }

    #[test]
    fn merge_scalar_replaces_children() {
        let mut n = Node::branch([("a", Node::leaf(1i64))]);
        n.merge(Node::leaf("flat"));
        assert_eq!(n, Node::leaf("flat"));
        assert!(n.is_well_formed());
    }

    #[test]
    fn merge_adopts_array_flag_only_when_childless() {
        let mut fresh = Node::empty();
        fresh.merge(Node::array([Node::leaf(1i64)]));
        assert!(fresh.is_array());

        let mut object = Node::branch([("k", Node::leaf(1i64))]);
        object.merge(Node::array([Node::leaf(2i64)]));
        assert!(!object.is_array());
        assert_eq!(object.len(), 2);
    }

    #[test]
    fn compaction_to_nothing_clears_array_flag() {
        let n = Node::array([Node::empty(), Node::empty()]).compacted();
        assert!(n.is_empty());
        assert!(!n.is_array());
        assert_eq!(n, Node::empty());
    }

    #[test]
    fn merge_leaving_no_children_clears_array_flag() {
        let mut n = Node::empty();
        n.merge(Node::array(std::iter::empty::<Node>()));
        assert_eq!(n, Node::empty());

        let mut list = Node::array([Node::leaf(1i64)]);
        list.merge(Node::branch([("0", Node::empty())]));
        assert_eq!(list, Node::empty());
    }

    #[test]
    fn flagged_empty_node_is_not_well_formed() {
        let n = Node {
            is_array: true,
            ..Node::empty()
        };
        assert!(!n.is_well_formed());
    }

    #[test]
    fn scalar_display() {
        assert_eq!(Scalar::from(true).to_string(), "true");
        assert_eq!(Scalar::from(7i64).to_string(), "7");
        assert_eq!(Scalar::from("x").to_string(), "\"x\"");
    }
}
