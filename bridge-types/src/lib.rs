//! # bridge-types
//!
//! Wire format types for the quill-bridge native ⇄ web-view editor protocol.
//!
//! This crate provides the foundational types used across all quill-bridge
//! crates:
//! - [`BridgeMessage`] - the JSON message exchanged with the peer
//! - [`codec`] - script-literal-safe encoding and decoding
//! - [`CallId`], [`CallIdGenerator`] - request/response correlation ids
//! - [`ContentChange`] - the payload of editor content-change events
//! - [`events`] - the well-known event names both sides agree on

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod events;
mod ids;
mod message;
mod payload;

pub use ids::{CallId, CallIdGenerator};
pub use message::BridgeMessage;
pub use payload::ContentChange;
