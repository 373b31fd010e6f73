use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use firetest_sdk::Database;

use crate::auth::{AuthProvider, Credentials, Identity};
use crate::error::{ServerError, ServerResult};

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<dyn AuthProvider>,
    require_auth: Arc<AtomicBool>,
    keep_alive: Duration,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        auth: Arc<dyn AuthProvider>,
        require_auth: bool,
        keep_alive: Duration,
    ) -> Self {
        Self {
            db,
            auth,
            require_auth: Arc::new(AtomicBool::new(require_auth)),
            keep_alive,
        }
    }

    pub fn require_auth(&self) -> bool {
        self.require_auth.load(Ordering::SeqCst)
    }

    pub fn set_require_auth(&self, required: bool) {
        self.require_auth.store(required, Ordering::SeqCst);
    }

    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Check the `auth` query parameter when enforcement is on.
    pub async fn authorize(&self, params: &HashMap<String, String>) -> ServerResult<Identity> {
        if !self.require_auth() {
            return Ok(Identity::Anonymous);
        }
        let credentials = Credentials::from_query(params.get("auth").map(String::as_str));
        self.auth.authenticate(&credentials).await.map_err(|err| {
            tracing::debug!(error = %err, "authentication failed");
            ServerError::InvalidAuth
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("require_auth", &self.require_auth())
            .field("keep_alive", &self.keep_alive)
            .finish_non_exhaustive()
    }
}
