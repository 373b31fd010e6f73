//! High-level SDK for Firetest.
//!
//! [`Database`] is the single entry point collaborators use: it owns the
//! tree and the change notifier and exposes the operation set of a realtime
//! database (read, write, merge, delete, push a child, subscribe).

pub mod database;

pub use database::Database;

// Re-export key types
pub use firetest_fabric::{
    ChangeEvent, DeliveryReport, EventKind, NotifierConfig, PrefixMatch, Subscription,
};
pub use firetest_store::{Node, PathTree, Scalar};
pub use firetest_types::{DbPath, PushName, PUSH_SENTINEL};
