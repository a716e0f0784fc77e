//! # bridge-host
//!
//! The native-side message engine for quill-bridge.
//!
//! [`Bridge`] is the single integration point between native code and the
//! web-view peer: it owns the correlation table and the event registries,
//! and reaches the peer through a pluggable [`ScriptTransport`].
//!
//! ```text
//! UI layer → bridge-content → Bridge → ScriptTransport → peer runtime
//!                               ↑
//!                    transport glue calls receive_raw
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod bridge;
mod correlation;
mod events;
pub mod transport;

pub use bridge::{Bridge, BridgeConfig, BridgeError};
pub use correlation::CorrelationTable;
pub use events::{EventBus, RequestHandlers, Subscription};
pub use transport::{MockTransport, ScriptTransport, TransportError};
