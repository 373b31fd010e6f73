use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use firetest_types::temporal::wall_clock_ms;

use crate::error::{ServerError, ServerResult};

/// Who a request acts as once its credentials check out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identity {
    /// Auth enforcement is off.
    Anonymous,
    /// The request presented the server secret itself.
    Admin,
    /// A signed token carrying this uid.
    User { uid: String },
}

/// Credentials as they arrive on the `auth` query parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Token(String),
    Anonymous,
}

impl Credentials {
    pub fn from_query(token: Option<&str>) -> Self {
        match token {
            Some(t) if !t.is_empty() => Self::Token(t.to_string()),
            _ => Self::Anonymous,
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ClaimData {
    /// Any JSON value; it only has to be present.
    #[serde(default)]
    uid: serde_json::Value,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Claims {
    d: ClaimData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<u64>,
    #[serde(default)]
    v: u32,
}

/// Accepts either the raw secret or an HS256 token signed with it.
pub struct SecretAuth {
    secret: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SecretAuth {
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims::<&str>(&[]);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            secret,
            validation,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Sign a token for `uid`. Without a ttl the token does not expire.
    pub fn issue_token(&self, uid: &str, ttl: Option<Duration>) -> ServerResult<String> {
        let now = wall_clock_ms() / 1000;
        let claims = Claims {
            d: ClaimData {
                uid: uid.into(),
                extra: serde_json::Map::new(),
            },
            exp: ttl.map(|t| now + t.as_secs()),
            iat: Some(now),
            v: 0,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ServerError::Internal(format!("signing token: {e}")))
    }

    fn verify_token(&self, token: &str) -> ServerResult<Identity> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "malformed token header");
            ServerError::InvalidAuth
        })?;
        if header.typ.as_deref().is_some_and(|typ| typ != "JWT") {
            return Err(ServerError::InvalidAuth);
        }
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            ServerError::InvalidAuth
        })?;
        let uid = match data.claims.d.uid {
            serde_json::Value::Null => return Err(ServerError::InvalidAuth),
            serde_json::Value::String(uid) if uid.is_empty() => return Err(ServerError::InvalidAuth),
            serde_json::Value::String(uid) => uid,
            other => other.to_string(),
        };
        Ok(Identity::User { uid })
    }
}

#[async_trait]
impl AuthProvider for SecretAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Token(token) if *token == self.secret => Ok(Identity::Admin),
            Credentials::Token(token) if token.contains('.') => self.verify_token(token),
            Credentials::Token(_) | Credentials::Anonymous => Err(ServerError::InvalidAuth),
        }
    }
}
