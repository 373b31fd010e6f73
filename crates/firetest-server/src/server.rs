use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use firetest_sdk::Database;

use crate::auth::SecretAuth;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Firetest database server.
pub struct FiretestServer {
    config: ServerConfig,
    secret: String,
    state: AppState,
}

impl FiretestServer {
    pub fn new(config: ServerConfig) -> Self {
        let db = Arc::new(Database::with_config(config.notifier_config()));
        Self::with_database(config, db)
    }

    /// Serve an existing database, e.g. one a test already populated.
    pub fn with_database(config: ServerConfig, db: Arc<Database>) -> Self {
        let secret = config.secret.clone().unwrap_or_else(generate_secret);
        let auth = Arc::new(SecretAuth::new(secret.clone()));
        let state = AppState::new(db, auth, config.require_auth, config.keep_alive());
        Self { config, secret, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.state.db
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Toggle auth enforcement. Takes effect on the next request.
    pub fn set_require_auth(&self, required: bool) {
        self.state.set_require_auth(required);
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Bind and serve in the background.
    pub async fn start(&self) -> ServerResult<RunningServer> {
        let listener = self.bind().await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = signal.await;
                })
                .await
        });
        tracing::info!(%addr, "firetest server listening");
        Ok(RunningServer {
            url: format!("http://{addr}"),
            addr,
            secret: self.secret.clone(),
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }

    async fn bind(&self) -> ServerResult<TcpListener> {
        match TcpListener::bind(self.config.bind_addr).await {
            Ok(listener) => Ok(listener),
            Err(err) if self.config.bind_addr == ServerConfig::default().bind_addr => {
                tracing::warn!(error = %err, "IPv4 loopback unavailable, trying IPv6");
                Ok(TcpListener::bind(SocketAddr::from((std::net::Ipv6Addr::LOCALHOST, 0))).await?)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Handle to a server started with [`FiretestServer::start`].
#[derive(Debug)]
pub struct RunningServer {
    url: String,
    addr: SocketAddr,
    secret: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl RunningServer {
    /// Base URL, e.g. `http://127.0.0.1:53211`.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Stop accepting connections. Open event streams are cut after a short
    /// grace period. Fails if the server was already closed.
    pub async fn close(&mut self) -> ServerResult<()> {
        let shutdown = self.shutdown.take().ok_or(ServerError::AlreadyClosed)?;
        let _ = shutdown.send(());
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(joined) => joined.map_err(|e| ServerError::Internal(e.to_string()))??,
            Err(_) => {
                tracing::debug!(addr = %self.addr, "grace period elapsed, aborting");
                task.abort();
            }
        }
        tracing::info!(addr = %self.addr, "firetest server closed");
        Ok(())
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_construction() {
        let server = FiretestServer::new(ServerConfig::default());
        assert_eq!(server.config().bind_addr, "127.0.0.1:0".parse().unwrap());
        assert_eq!(server.secret().len(), 43);
    }

    #[test]
    fn configured_secret_is_used() {
        let config = ServerConfig {
            secret: Some("fixed".into()),
            ..ServerConfig::default()
        };
        assert_eq!(FiretestServer::new(config).secret(), "fixed");
    }

    #[test]
    fn generated_secrets_differ() {
        assert_ne!(generate_secret(), generate_secret());
    }

    #[test]
    fn router_builds() {
        let server = FiretestServer::new(ServerConfig::default());
        let _router = server.router();
    }

    #[tokio::test]
    async fn start_then_close_twice() {
        let server = FiretestServer::new(ServerConfig::default());
        let mut running = server.start().await.unwrap();
        assert!(running.url().starts_with("http://"));
        assert_ne!(running.addr().port(), 0);
        running.close().await.unwrap();
        assert!(matches!(running.close().await, Err(ServerError::AlreadyClosed)));
    }
}
