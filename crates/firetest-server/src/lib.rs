//! HTTP server for Firetest.
//!
//! Serves a [`firetest_sdk::Database`] over the realtime database REST
//! surface: `<path>.json` with GET, PUT, PATCH, POST and DELETE, plus
//! server-sent event streams for GET requests that accept
//! `text/event-stream`. Requests may be gated on the server secret or a
//! token signed with it.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;
pub mod stream;

pub use auth::{AuthProvider, Credentials, Identity, SecretAuth};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{FiretestServer, RunningServer};
pub use state::AppState;
