use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use firetest_fabric::{NotifierConfig, PrefixMatch};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port 0 picks a free port.
    pub bind_addr: SocketAddr,
    pub require_auth: bool,
    /// Generated at startup when absent.
    pub secret: Option<String>,
    pub delivery_timeout_ms: u64,
    pub prefix_match: PrefixMatch,
    pub keep_alive_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            require_auth: false,
            secret: None,
            delivery_timeout_ms: 250,
            prefix_match: PrefixMatch::Segment,
            keep_alive_secs: 15,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn notifier_config(&self) -> NotifierConfig {
        NotifierConfig {
            delivery_timeout: Duration::from_millis(self.delivery_timeout_ms),
            prefix_match: self.prefix_match,
            ..NotifierConfig::default()
        }
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:0".parse::<SocketAddr>().unwrap());
        assert!(!c.require_auth);
        assert!(c.secret.is_none());
        assert_eq!(c.delivery_timeout_ms, 250);
        assert_eq!(c.prefix_match, PrefixMatch::Segment);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ServerConfig::from_toml_str(
            r#"
            require_auth = true
            secret = "s3cret"
            prefix_match = "raw"
            "#,
        )
        .unwrap();
        assert!(c.require_auth);
        assert_eq!(c.secret.as_deref(), Some("s3cret"));
        assert_eq!(c.prefix_match, PrefixMatch::Raw);
        assert_eq!(c.delivery_timeout_ms, 250);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = ServerConfig::from_toml_str("require_auth = \"maybe\"").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_addr = \"127.0.0.1:9000\"\ndelivery_timeout_ms = 50").unwrap();
        let c = ServerConfig::load(file.path()).unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.notifier_config().delivery_timeout, Duration::from_millis(50));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ServerConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ServerError::Io(_)));
    }
}
