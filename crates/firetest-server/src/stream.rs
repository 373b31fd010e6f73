//! Realtime event streams over server-sent events.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};

use firetest_fabric::EventKind;
use firetest_types::DbPath;

use crate::state::AppState;

/// Open a stream at `location`: one `put` of the current value at "/",
/// then every change under it with paths relative to `location`.
pub async fn open(state: AppState, location: DbPath) -> Response {
    // Subscribe before reading so no change between the two is lost.
    let subscription = state.db.subscribe(location.as_str()).await;
    let initial = state.db.read(location.as_str()).unwrap_or(Value::Null);
    tracing::debug!(path = %location, subscription = %subscription.id(), "event stream opened");

    let first = stream::once(async move { Ok::<_, Infallible>(frame(EventKind::Put, "/", initial)) });
    let updates = stream::unfold(subscription, |mut sub| async move {
        let event = sub.recv().await?;
        let path = relative_path(sub.prefix(), &event.path);
        let item = frame(event.kind, &path, event.data());
        Some((Ok::<_, Infallible>(item), sub))
    });

    Sse::new(first.chain(updates))
        .keep_alive(KeepAlive::new().interval(state.keep_alive()))
        .into_response()
}

fn frame(kind: EventKind, path: &str, data: Value) -> Event {
    Event::default()
        .event(kind.as_str())
        .data(json!({ "path": path, "data": data }).to_string())
}

/// `path` expressed relative to `base`, always with a leading "/".
///
/// The prefix is only stripped on a segment boundary. A path that merely
/// shares leading characters with `base` (raw prefix matching) is reported
/// in full.
pub fn relative_path(base: &DbPath, path: &DbPath) -> String {
    if base.is_root() {
        return path.to_absolute();
    }
    if path == base {
        return DbPath::root().to_absolute();
    }
    match path
        .as_str()
        .strip_prefix(base.as_str())
        .and_then(|rest| rest.strip_prefix('/'))
    {
        Some(rest) => DbPath::new(rest).to_absolute(),
        None => path.to_absolute(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths() {
        let root = DbPath::root();
        assert_eq!(relative_path(&root, &DbPath::new("a/b")), "/a/b");
        assert_eq!(relative_path(&DbPath::new("a"), &DbPath::new("a/b/c")), "/b/c");
        assert_eq!(relative_path(&DbPath::new("a/b"), &DbPath::new("a/b")), "/");
        assert_eq!(relative_path(&root, &root), "/");
    }

    #[test]
    fn shared_leading_characters_are_not_stripped() {
        let base = DbPath::new("foo");
        assert_eq!(relative_path(&base, &DbPath::new("foobar/baz")), "/foobar/baz");
        assert_eq!(relative_path(&base, &DbPath::new("foo/baz")), "/baz");
    }
}
