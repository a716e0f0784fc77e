//! Fetch tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque value whose *change* - not its literal value - signals that
/// the native side wants a fresh pull of the peer's content.
///
/// The embedding rotates the token (any fresh string works: a UUID, a
/// counter, a timestamp) and hands it to the coordinator; the coordinator
/// only ever compares tokens for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchToken(String);

impl FetchToken {
    /// Create a token from any opaque string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// View the token's underlying value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FetchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FetchToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FetchToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}
