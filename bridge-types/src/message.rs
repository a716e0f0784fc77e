//! The bridge message exchanged between native and the web-view peer.
//!
//! One shape serves both directions. Native→peer messages carry a
//! `callbackId` when a response is expected; the peer echoes that id when
//! answering. Any inbound message with a non-null `callbackId` is routed
//! through the correlation path, never as a subscribable event.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single message on the native ⇄ peer wire.
///
/// Serialized as JSON with camelCase keys, matching what the script side
/// of the bridge parses. Absent fields are omitted entirely rather than
/// serialized as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeMessage {
    /// Name of the event this message carries or answers.
    pub event_name: String,
    /// Correlation id; present only when a response is expected (outbound)
    /// or when the message answers a correlated exchange (inbound).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
    /// Message payload, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl BridgeMessage {
    /// Create a fire-and-forget event message with no payload.
    pub fn event(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            callback_id: None,
            data: None,
        }
    }

    /// Create a fire-and-forget event message carrying a payload.
    pub fn with_data(event_name: impl Into<String>, data: Value) -> Self {
        Self {
            event_name: event_name.into(),
            callback_id: None,
            data: Some(data),
        }
    }

    /// Create a correlated message: a request expecting a response, or a
    /// response echoing the request's callback id.
    pub fn with_callback(
        event_name: impl Into<String>,
        callback_id: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            callback_id: Some(callback_id.into()),
            data,
        }
    }

    /// Whether this message participates in request/response correlation.
    pub fn is_correlated(&self) -> bool {
        self.callback_id.is_some()
    }
}
