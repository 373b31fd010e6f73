use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Value};

use firetest_types::path::JSON_SUFFIX;
use firetest_types::DbPath;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;
use crate::stream;

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": "firetest-server",
        "version": env!("CARGO_PKG_VERSION"),
        "require_auth": state.require_auth(),
    }))
}

/// Every data request lands here: `<path>.json` with GET, PUT, PATCH, POST
/// or DELETE.
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    if !uri.path().ends_with(JSON_SUFFIX) {
        return Err(ServerError::MissingJsonExtension);
    }
    state.authorize(&params).await?;
    let path = DbPath::sanitize(uri.path());
    tracing::debug!(%method, %path, "dispatch");

    match method {
        Method::GET if wants_event_stream(&headers) => Ok(stream::open(state, path).await),
        Method::GET => {
            let value = state.db.read(path.as_str()).unwrap_or(Value::Null);
            Ok(Json(value).into_response())
        }
        Method::PUT => {
            let value = parse_body(&body)?;
            state.db.write(path.as_str(), value);
            Ok(echo(body))
        }
        Method::PATCH => {
            let value = parse_body(&body)?;
            state.db.merge(path.as_str(), value);
            Ok(echo(body))
        }
        Method::POST => {
            let value = parse_body(&body)?;
            let name = state.db.create_child(path.as_str(), value);
            Ok(Json(json!({ "name": name.as_str() })).into_response())
        }
        Method::DELETE => {
            state.db.delete(path.as_str());
            Ok(StatusCode::OK.into_response())
        }
        other => Err(ServerError::MethodNotAllowed(other.to_string())),
    }
}

fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"))
}

fn parse_body(body: &Bytes) -> ServerResult<Value> {
    if body.is_empty() {
        return Err(ServerError::MissingBody);
    }
    serde_json::from_slice(body).map_err(ServerError::InvalidJson)
}

fn echo(body: Bytes) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_stream_detection() {
        let mut headers = HeaderMap::new();
        assert!(!wants_event_stream(&headers));
        headers.insert(header::ACCEPT, "text/event-stream".parse().unwrap());
        assert!(wants_event_stream(&headers));
        headers.insert(header::ACCEPT, "application/json".parse().unwrap());
        assert!(!wants_event_stream(&headers));
    }

    #[test]
    fn body_parsing() {
        assert!(matches!(parse_body(&Bytes::new()), Err(ServerError::MissingBody)));
        assert!(matches!(
            parse_body(&Bytes::from_static(b"{nope")),
            Err(ServerError::InvalidJson(_))
        ));
        assert_eq!(parse_body(&Bytes::from_static(b"[1,2]")).unwrap(), json!([1, 2]));
        assert_eq!(parse_body(&Bytes::from_static(b"null")).unwrap(), Value::Null);
    }
}
