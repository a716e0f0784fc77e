//! The bridge core - the single integration point between native code and
//! the web-view peer.
//!
//! # Architecture
//!
//! Outbound, every operation funnels into one send path: encode the
//! message, wrap it in the peer's well-known entry point invocation, and
//! hand the script to the transport. Inbound, the transport glue calls
//! [`Bridge::receive_raw`] with the raw string the peer delivered, and the
//! bridge routes it: correlated messages to the pending-call table,
//! everything else onto the event bus.
//!
//! ```text
//! trigger/call/respond → encode → `<handler>('<escaped JSON>')` → transport
//! receive_raw → decode → callbackId? → CorrelationTable / RequestHandlers
//!                      → otherwise  → EventBus
//! ```

use crate::correlation::CorrelationTable;
use crate::events::{EventBus, RequestHandlers, Subscription};
use crate::transport::{ScriptTransport, TransportError};
use quill_bridge_types::{codec, BridgeMessage, CallId};
use serde_json::Value;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Bridge-level errors.
///
/// These stay inside the engine: callers of the public API observe soft
/// failure only (dropped messages, `None` results), per the protocol's
/// degraded-mode contract.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The message could not be encoded for the wire.
    #[error("message could not be encoded")]
    Encode,

    /// No transport attached, or the peer view is gone.
    #[error("no transport attached")]
    Detached,

    /// The transport rejected the send.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration for a [`Bridge`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// The peer's well-known entry point for inbound messages, invoked as
    /// `<handler>('<escaped JSON>')`.
    pub peer_handler: String,
}

impl BridgeConfig {
    /// Create a configuration with the default peer entry point.
    pub fn new() -> Self {
        Self {
            peer_handler: "WebBridge.handleMessageFromNative".to_string(),
        }
    }

    /// Set the peer's entry point name.
    pub fn with_peer_handler(mut self, name: &str) -> Self {
        self.peer_handler = name.to_string();
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The message-passing engine for one peer view.
///
/// Owns the correlation table and both event registries. Holds only a
/// weak handle to the transport: the hosting view owns the transport and
/// a long-lived reference to this bridge, so no reference cycle forms and
/// a torn-down view lets the transport drop naturally.
pub struct Bridge {
    config: BridgeConfig,
    calls: CorrelationTable,
    events: EventBus,
    requests: RequestHandlers,
    transport: Mutex<Option<Weak<dyn ScriptTransport>>>,
}

impl Bridge {
    /// Create a bridge with the given configuration, not yet attached to
    /// any transport.
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            calls: CorrelationTable::new(),
            events: EventBus::new(),
            requests: RequestHandlers::new(),
            transport: Mutex::new(None),
        }
    }

    /// Attach the transport. The bridge keeps only a weak handle; the
    /// caller remains the owner.
    pub fn attach(&self, transport: &Arc<dyn ScriptTransport>) {
        let mut slot = self.transport.lock().unwrap();
        *slot = Some(Arc::downgrade(transport));
    }

    /// Detach from the transport and resolve every in-flight call with
    /// `None`. Call when the hosting view is torn down.
    pub fn detach(&self) {
        {
            let mut slot = self.transport.lock().unwrap();
            *slot = None;
        }
        self.calls.cancel_all();
    }

    /// Fire a message with no callback id. No response is expected and
    /// delivery is best-effort: failures are logged and swallowed, so
    /// from the caller's perspective this always succeeds.
    pub async fn trigger(&self, event: &str, data: Option<Value>) {
        let message = match data {
            Some(data) => BridgeMessage::with_data(event, data),
            None => BridgeMessage::event(event),
        };
        if let Err(err) = self.send_message(&message).await {
            tracing::debug!(event, %err, "trigger dropped");
        }
    }

    /// Send a request and suspend until the peer responds or the call is
    /// cancelled.
    ///
    /// Resolves to `None` on send failure, cancellation via
    /// [`cancel_all`](Self::cancel_all)/[`detach`](Self::detach), or a
    /// peer that answered with no data. A peer that never answers keeps
    /// the future pending until teardown; use
    /// [`call_timeout`](Self::call_timeout) for a bounded wait.
    ///
    /// Calls may be issued concurrently; each resolves independently,
    /// whatever order the responses arrive in.
    pub async fn call(&self, event: &str, data: Option<Value>) -> Option<Value> {
        let (_id, rx) = self.start_call(event, data).await;
        rx.await.unwrap_or(None)
    }

    /// [`call`](Self::call) with an explicit upper bound on the wait.
    ///
    /// On expiry the pending entry is consumed and the call yields
    /// `None`; a response arriving later hits the usual unknown-id no-op
    /// path.
    pub async fn call_timeout(
        &self,
        event: &str,
        data: Option<Value>,
        limit: Duration,
    ) -> Option<Value> {
        let (id, rx) = self.start_call(event, data).await;
        match tokio::time::timeout(limit, rx).await {
            Ok(result) => result.unwrap_or(None),
            Err(_) => {
                self.calls.resolve(id.as_str(), None);
                tracing::debug!(event, id = id.as_str(), "call timed out");
                None
            }
        }
    }

    /// Answer an inbound peer-initiated request.
    ///
    /// Native is the responder here, so nothing is correlation-tracked;
    /// delivery failures are soft, like [`trigger`](Self::trigger).
    pub async fn respond(&self, event: &str, callback_id: &str, data: Option<Value>) {
        let message = BridgeMessage::with_callback(event, callback_id, data);
        if let Err(err) = self.send_message(&message).await {
            tracing::debug!(event, callback_id, %err, "respond dropped");
        }
    }

    /// The single inbound entry point, invoked by the transport glue with
    /// the raw string the peer delivered.
    ///
    /// Malformed input is dropped silently. A message carrying a
    /// `callbackId` is routed as a response to the matching pending call;
    /// if no call matches, it is treated as a peer-initiated request for
    /// the registered handler (answered via [`respond`](Self::respond)),
    /// and failing that, dropped as a response that outlived its call.
    /// Messages without a `callbackId` fan out on the event bus.
    pub async fn receive_raw(&self, raw: &str) {
        let Some(message) = codec::decode(raw) else {
            tracing::debug!("dropping malformed inbound message");
            return;
        };
        match message.callback_id {
            Some(id) => {
                if self.calls.resolve(&id, message.data.clone()) {
                    return;
                }
                match self.requests.invoke(&message.event_name, message.data.as_ref()) {
                    Some(result) => self.respond(&message.event_name, &id, result).await,
                    None => tracing::debug!(
                        event = %message.event_name,
                        "unmatched response id dropped"
                    ),
                }
            }
            None => self.events.emit(&message.event_name, message.data.as_ref()),
        }
    }

    /// Subscribe to a peer-originated event. See [`EventBus::on`].
    pub fn on(
        &self,
        event: &str,
        listener: impl Fn(Option<&Value>) + Send + Sync + 'static,
    ) -> Subscription {
        self.events.on(event, listener)
    }

    /// Register the handler answering peer-initiated `event` requests,
    /// replacing any previous one. See [`RequestHandlers::set`].
    pub fn handle_requests(
        &self,
        event: &str,
        handler: impl Fn(Option<&Value>) -> Option<Value> + Send + Sync + 'static,
    ) {
        self.requests.set(event, handler)
    }

    /// Remove the request handler for `event`.
    pub fn remove_request_handler(&self, event: &str) -> bool {
        self.requests.remove(event)
    }

    /// Resolve every in-flight call with `None`. Call at view teardown
    /// (also part of [`detach`](Self::detach)).
    pub fn cancel_all(&self) {
        self.calls.cancel_all();
    }

    /// Number of calls currently awaiting a response.
    pub fn pending_calls(&self) -> usize {
        self.calls.len()
    }

    /// Register the call and put the request on the wire. On send
    /// failure the entry is resolved with `None` immediately so the
    /// returned receiver never hangs on a message that was never sent.
    async fn start_call(
        &self,
        event: &str,
        data: Option<Value>,
    ) -> (CallId, oneshot::Receiver<Option<Value>>) {
        let (id, rx) = self.calls.register();
        let message = BridgeMessage::with_callback(event, id.as_str(), data);
        if let Err(err) = self.send_message(&message).await {
            tracing::debug!(event, %err, "call send failed");
            self.calls.resolve(id.as_str(), None);
        }
        (id, rx)
    }

    async fn send_message(&self, message: &BridgeMessage) -> Result<(), BridgeError> {
        let payload = codec::encode(message).ok_or(BridgeError::Encode)?;
        let script = format!("{}('{}')", self.config.peer_handler, payload);
        let transport = {
            let slot = self.transport.lock().unwrap();
            slot.as_ref().and_then(Weak::upgrade)
        };
        let transport = transport.ok_or(BridgeError::Detached)?;
        transport.send_script(&script).await?;
        Ok(())
    }
}
