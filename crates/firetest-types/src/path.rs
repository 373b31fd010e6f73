use std::fmt;

use serde::{Deserialize, Serialize};

/// Suffix the REST surface requires on every request path.
pub const JSON_SUFFIX: &str = ".json";

/// A sanitized location in the database tree.
///
/// Paths carry no leading or trailing `/` and no `.json` suffix. The empty
/// path addresses the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DbPath(String);

impl DbPath {
    /// The root path.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Wrap an already-sanitized path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Sanitize a raw request path.
    ///
    /// `/foo/.json` -> `foo`, `/foo/bar.json` -> `foo/bar`, `/.json` -> root.
    pub fn sanitize(raw: &str) -> Self {
        let trimmed = raw.trim_matches('/');
        let trimmed = trimmed.strip_suffix(JSON_SUFFIX).unwrap_or(trimmed);
        Self(trimmed.trim_end_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path segments in order. Empty segments from doubled slashes are skipped.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Append a single segment.
    pub fn child(&self, name: &str) -> Self {
        if self.is_root() {
            Self(name.to_string())
        } else {
            Self(format!("{}/{}", self.0, name))
        }
    }

    /// Render with a leading slash, as the streaming protocol reports paths.
    pub fn to_absolute(&self) -> String {
        format!("/{}", self.0)
    }
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl From<&str> for DbPath {
    fn from(raw: &str) -> Self {
        Self::sanitize(raw)
    }
}

impl AsRef<str> for DbPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_slashes_and_extension() {
        let cases = [
            ("/foo/.json", "foo"),
            ("/foo/bar.json", "foo/bar"),
            ("foo/bar/", "foo/bar"),
            ("/.json", ""),
            ("/", ""),
            ("", ""),
            ("/foo.json/", "foo"),
            ("foo", "foo"),
        ];
        for (raw, expected) in cases {
            assert_eq!(DbPath::sanitize(raw).as_str(), expected, "raw = {raw:?}");
        }
    }

    #[test]
    fn segments_skip_empty() {
        let path = DbPath::new("a//b/c");
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn child_appends_segment() {
        let root = DbPath::root();
        let foo = root.child("foo");
        assert_eq!(foo.as_str(), "foo");
        let bar = foo.child("bar");
        assert_eq!(bar.as_str(), "foo/bar");
    }

    #[test]
    fn display_is_absolute() {
        assert_eq!(format!("{}", DbPath::new("a/b")), "/a/b");
        assert_eq!(format!("{}", DbPath::root()), "/");
        assert_eq!(DbPath::new("x").to_absolute(), "/x");
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&DbPath::new("a/b")).unwrap();
        assert_eq!(json, "\"a/b\"");
    }
}
