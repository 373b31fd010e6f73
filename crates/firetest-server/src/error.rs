use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("append .json to your request URI to use the REST API")]
    MissingJsonExtension,

    #[error("Error: No data supplied.")]
    MissingBody,

    #[error("Invalid data; couldn't parse JSON object, array, or value. Perhaps you're using invalid characters in your key names.")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Could not parse auth token.")]
    InvalidAuth,

    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("server already closed")]
    AlreadyClosed,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingJsonExtension => StatusCode::FORBIDDEN,
            Self::MissingBody | Self::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Self::InvalidAuth => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::AlreadyClosed | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::MissingJsonExtension => (status, self.to_string()).into_response(),
            Self::MethodNotAllowed(method) => {
                tracing::debug!(%method, "method not implemented");
                status.into_response()
            }
            Self::InvalidJson(ref source) => {
                tracing::debug!(error = %source, "rejecting request body");
                (status, Json(json!({ "error": self.to_string() }))).into_response()
            }
            Self::MissingBody | Self::InvalidAuth => {
                (status, Json(json!({ "error": self.to_string() }))).into_response()
            }
            other => {
                tracing::warn!(error = %other, "request failed");
                status.into_response()
            }
        }
    }
}
