//! # bridge-content
//!
//! Content synchronization between a native-held rich-text value and the
//! editor living inside the web-view peer.
//!
//! [`ContentSync`] is the coordinator: the UI layer binds a value to it
//! with [`set_value`](ContentSync::set_value), rotates a fetch token to
//! force pulls with [`set_fetch_token`](ContentSync::set_fetch_token),
//! and observes peer edits through the change callback given at
//! [`attach`](ContentSync::attach) time.
//!
//! The reconciliation rules (echo suppression, deferred pushes, stale and
//! superseded pull rejection) live in `bridge-core`'s pure state machine;
//! this crate wires that machine to a live [`Bridge`](quill_bridge_host::Bridge).

#![warn(missing_docs)]
#![warn(clippy::all)]

mod commands;
mod sync;

pub use sync::ContentSync;
