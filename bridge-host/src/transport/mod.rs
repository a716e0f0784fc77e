//! Transport abstraction for the web-view bridge.
//!
//! The peer is reached through exactly one primitive: evaluating a script
//! string inside the embedded runtime. This module abstracts that
//! primitive so the engine works against a real web view, a worker
//! message port, or a mock for testing.
//!
//! # Design
//!
//! Ownership points one way: the hosting view owns the transport, and the
//! [`Bridge`](crate::Bridge) holds only a weak handle back to it, set via
//! `Bridge::attach`. Inbound traffic does not flow through this trait -
//! the transport glue calls `Bridge::receive_raw` with whatever raw
//! string the peer handed it.
//!
//! # Example
//!
//! ```ignore
//! let transport: Arc<dyn ScriptTransport> = Arc::new(MockTransport::new());
//! bridge.attach(&transport);
//! bridge.trigger("editor.setContent", Some(json!("# Hi"))).await;
//! ```

mod mock;

pub use mock::MockTransport;

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer view is gone or was never attached.
    #[error("peer not attached")]
    NotAttached,

    /// Script evaluation failed inside the peer runtime.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The transport was closed.
    #[error("transport closed")]
    Closed,
}

/// The "evaluate script in peer" primitive.
///
/// Implementations wrap the embedded runtime's script-injection call
/// (web-view evaluate, worker postMessage, mock capture).
#[async_trait]
pub trait ScriptTransport: Send + Sync {
    /// Evaluate a script string inside the peer runtime.
    ///
    /// Delivery is best-effort and inherently asynchronous; the peer is a
    /// different runtime. Implementations must not block the calling
    /// context waiting on it.
    async fn send_script(&self, script: &str) -> Result<(), TransportError>;

    /// Whether the peer runtime is currently reachable.
    fn is_attached(&self) -> bool;

    /// Tear the transport down gracefully.
    async fn close(&self) -> Result<(), TransportError>;
}
