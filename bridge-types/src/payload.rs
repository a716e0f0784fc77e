//! Typed payloads carried on editor events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of `editor.contentChange`: the full document plus the line
/// count the editor currently renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChange {
    /// The editor's full content.
    pub content: String,
    /// Number of rendered lines; informational only.
    #[serde(default)]
    pub lines: u64,
}

impl ContentChange {
    /// Create a payload.
    pub fn new(content: impl Into<String>, lines: u64) -> Self {
        Self {
            content: content.into(),
            lines,
        }
    }

    /// Lenient decode from an event payload.
    ///
    /// Accepts the canonical `{content, lines}` object or a bare string
    /// (older peer builds send the document directly). Anything else is
    /// `None` and the event is dropped by the caller.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(content) => Some(Self {
                content: content.clone(),
                lines: 0,
            }),
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }
}
