//! Well-known event names on the editor bridge.
//!
//! These are the protocol's public vocabulary; native and peer must agree
//! on them exactly.

/// Peer→native: the peer finished loading and mounted the editor.
pub const EDITOR_READY: &str = "editor.ready";

/// Native→peer: replace the editor's content (fire-and-forget).
pub const EDITOR_SET_CONTENT: &str = "editor.setContent";

/// Peer→native: the user edited the content. Carries a
/// [`ContentChange`](crate::ContentChange)-shaped payload.
pub const EDITOR_CONTENT_CHANGE: &str = "editor.contentChange";

/// Native→peer request for the editor's current content
/// (request/response via `callbackId`).
pub const EDITOR_FETCH_CONTENT: &str = "editor.fetchContent";

/// Native→peer: apply a formatting command (fire-and-forget).
pub const EDITOR_FORMAT: &str = "editor.format";
