//! Canonical player/clan tag handling.
//!
//! Every source spells tags differently: the official API wants `%23XXXX`
//! in the URL path, the community site wants a bare `XXXX` path segment,
//! and user input arrives as any mix of `#abc`, `ABC` or `%23abc`. All
//! comparisons inside the crate go through the canonical form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A player or clan tag in canonical form: trimmed, uppercased, with any
/// leading `#` or percent-encoded `#` stripped.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag(String);

impl Tag {
    /// Normalize a raw tag string into canonical form.
    ///
    /// Total function: never fails, empty or whitespace-only input yields
    /// an empty tag (callers check [`Tag::is_empty`] before hitting the
    /// network).
    pub fn normalize(raw: &str) -> Self {
        let mut t = raw.trim().to_uppercase();
        if let Some(rest) = t.strip_prefix('#') {
            t = rest.to_string();
        }
        if let Some(rest) = t.strip_prefix("%23") {
            t = rest.to_string();
        }
        Self(t)
    }

    /// Whether normalization produced an empty tag (invalid identifier).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical form without the `#` prefix.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Encoding for the official API URL path: `%23XXXX`.
    ///
    /// Safe against double encoding: the canonical form never carries a
    /// `#` or `%23` prefix, so exactly one is added here.
    pub fn api_encoded(&self) -> String {
        format!("%23{}", self.0)
    }

    /// Encoding for the community site URL path: bare `XXXX`.
    pub fn path_segment(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag(#{})", self.0)
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        Self::normalize(s)
    }
}
