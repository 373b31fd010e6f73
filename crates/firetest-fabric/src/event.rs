use serde::{Deserialize, Serialize};
use serde_json::Value;

use firetest_store::Node;
use firetest_types::{DbPath, TemporalAnchor};

/// Classification of change events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// The subtree at the path was overwritten or removed.
    Put,
    /// Direct children at the path were merged.
    Patch,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Patch => "patch",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single successful mutation, as seen by subscribers.
///
/// `node` is the subtree at `path` after the mutation, or `None` when the
/// path no longer exists (deletes, or writes that removed everything).
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    pub kind: EventKind,
    pub path: DbPath,
    pub node: Option<Node>,
    /// Clock reading taken while the mutation held the tree.
    pub timestamp: TemporalAnchor,
}

impl ChangeEvent {
    pub fn put(path: DbPath, node: Option<Node>, timestamp: TemporalAnchor) -> Self {
        Self {
            kind: EventKind::Put,
            path,
            node,
            timestamp,
        }
    }

    pub fn patch(path: DbPath, node: Option<Node>, timestamp: TemporalAnchor) -> Self {
        Self {
            kind: EventKind::Patch,
            path,
            node,
            timestamp,
        }
    }

    /// The resulting data as a dynamic value; `null` for removals.
    pub fn data(&self) -> Value {
        self.node.as_ref().map(Node::to_value).unwrap_or(Value::Null)
    }

    pub fn is_removal(&self) -> bool {
        self.node.is_none()
    }
}
