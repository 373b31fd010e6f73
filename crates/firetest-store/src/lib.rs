//! Hierarchical in-memory tree for Firetest.
//!
//! Data lives in a tree of [`Node`]s addressed by `/`-delimited paths. Each
//! node is either a leaf holding a [`Scalar`] or an interior node holding
//! named children. Lists are stored as interior nodes keyed by index and
//! flagged so they decode back into lists.
//!
//! # Operations
//!
//! - [`PathTree::get`] -- look up a node by path
//! - [`PathTree::add`] -- overwrite a subtree, creating intermediates
//! - [`PathTree::update`] -- shallow merge of direct children
//! - [`PathTree::del`] -- remove a subtree and prune empty ancestors
//!
//! # Invariants
//!
//! 1. A reachable node holds a scalar or at least one child, never both.
//! 2. Deletes prune nodes left empty, stopping at the first ancestor with
//!    another child. The root is never removed.
//! 3. Writing through a scalar discards it (last write wins).
//! 4. Encoding never fails: `null` and empty containers become empty nodes,
//!    which the tree compacts away.

pub mod codec;
pub mod node;
pub mod tree;

pub use codec::{decode, encode};
pub use node::{Node, Scalar};
pub use tree::PathTree;
