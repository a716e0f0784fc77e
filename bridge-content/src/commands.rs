//! Editor command passthrough.
//!
//! The editor's text-formatting behavior belongs to the peer; the native
//! side only names a command and hands over its argument.

use crate::ContentSync;
use quill_bridge_types::events;
use serde_json::{json, Value};

impl ContentSync {
    /// Forward a formatting command to the editor (fire-and-forget).
    ///
    /// `name` is the command as the editor understands it ("bold",
    /// "italic", "header", ...); `value` is its argument, passed through
    /// verbatim.
    pub async fn format(&self, name: &str, value: Value) {
        self.bridge
            .trigger(
                events::EDITOR_FORMAT,
                Some(json!({ "name": name, "value": value })),
            )
            .await;
    }
}
