use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::temporal::TemporalAnchor;

/// Leading character that marks a child key as server-generated.
pub const PUSH_SENTINEL: char = '~';

/// A generated child name: the sentinel followed by an encoded clock reading.
///
/// Names drawn from a strictly monotonic clock never collide. Names built
/// from equal anchors are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PushName(String);

impl PushName {
    /// Encode an anchor as `~` + URL-safe base64 of its decimal rendering.
    ///
    /// The alphabet never contains `/`, so the name is always one segment.
    pub fn from_anchor(anchor: TemporalAnchor) -> Self {
        let text = format!("{}{:010}", anchor.physical_ms, anchor.logical);
        Self(format!("{PUSH_SENTINEL}{}", URL_SAFE_NO_PAD.encode(text)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PushName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether `name` carries the generated-key sentinel.
pub fn is_push_name(name: &str) -> bool {
    name.starts_with(PUSH_SENTINEL)
}
