//! Validated resource pointers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CenterError;

/// Longest URI accepted, in bytes.
pub const MAX_URI_LENGTH: usize = 256;

/// An opaque resource pointer (host + path).
///
/// The center never dereferences a URI; it only checks that the pointer is
/// non-empty, at most [`MAX_URI_LENGTH`] bytes and free of whitespace and
/// control characters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Uri(String);

impl Uri {
    pub fn parse(raw: impl Into<String>) -> Result<Self, CenterError> {
        let raw = raw.into();
        if raw.is_empty()
            || raw.len() > MAX_URI_LENGTH
            || raw.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(CenterError::InvalidUri(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for Uri {
    type Error = CenterError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}
