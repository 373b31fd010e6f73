//! Foundation types for Firetest.
//!
//! Firetest is an in-memory, path-addressed realtime database that speaks the
//! same REST and streaming contract as a hosted realtime database, so client
//! code can be tested locally against deterministic state. Every other
//! Firetest crate depends on `firetest-types`.
//!
//! # Key Types
//!
//! - [`DbPath`]: sanitized, `/`-delimited location in the tree (empty = root)
//! - [`TemporalAnchor`]: monotonic clock reading used to stamp changes
//! - [`PushName`]: auto-generated child key, prefixed with [`PUSH_SENTINEL`]

pub mod path;
pub mod push;
pub mod temporal;

pub use path::DbPath;
pub use push::{is_push_name, PushName, PUSH_SENTINEL};
pub use temporal::TemporalAnchor;
