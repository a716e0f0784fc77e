//! Event registries for inbound peer traffic.
//!
//! Two registries with deliberately different contracts:
//! - [`EventBus`]: many listeners per event name, append semantics,
//!   fire-and-forget fan-out.
//! - [`RequestHandlers`]: at most one handler per event name, overwrite
//!   semantics, produces the response data for a peer-initiated request.
//!
//! They are kept separate because callers depend on the difference.

use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

/// A fire-and-forget event listener.
pub type EventListener = dyn Fn(Option<&Value>) + Send + Sync;

/// A handler producing the response data for a peer-initiated request.
pub type RequestHandler = dyn Fn(Option<&Value>) -> Option<Value> + Send + Sync;

/// Fan-out registry for peer-originated, non-correlated messages.
///
/// Listeners for a name are invoked synchronously, in registration order.
/// Messages carrying a `callbackId` never reach this bus; the
/// [`Bridge`](crate::Bridge) routes them through the correlation path.
#[derive(Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

#[derive(Default)]
struct BusInner {
    listeners: HashMap<String, Vec<Registration>>,
    next_id: u64,
}

struct Registration {
    id: u64,
    listener: Arc<EventListener>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `event`.
    ///
    /// Multiple listeners per name are allowed. The returned
    /// [`Subscription`] removes exactly this registration when disposed;
    /// forgetting to dispose leaves the listener registered for the life
    /// of the bus.
    pub fn on(
        &self,
        event: &str,
        listener: impl Fn(Option<&Value>) + Send + Sync + 'static,
    ) -> Subscription {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner
            .listeners
            .entry(event.to_string())
            .or_default()
            .push(Registration {
                id,
                listener: Arc::new(listener),
            });
        Subscription {
            bus: Arc::downgrade(&self.inner),
            event: event.to_string(),
            id,
        }
    }

    /// Synchronously invoke every listener registered for `event`, in
    /// registration order.
    ///
    /// Listeners run outside the registry lock, so they may re-register
    /// or dispose freely. A panicking listener is caught and logged; the
    /// remaining listeners for this emit still run.
    pub fn emit(&self, event: &str, data: Option<&Value>) {
        let listeners: Vec<Arc<EventListener>> = {
            let inner = self.inner.lock().unwrap();
            inner
                .listeners
                .get(event)
                .map(|regs| regs.iter().map(|r| Arc::clone(&r.listener)).collect())
                .unwrap_or_default()
        };
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(data))).is_err() {
                tracing::warn!(event, "event listener panicked");
            }
        }
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.listeners.get(event).map_or(0, Vec::len)
    }
}

/// Removes one specific listener registration when disposed.
#[must_use = "dropping a Subscription without dispose() leaves the listener registered"]
pub struct Subscription {
    bus: Weak<Mutex<BusInner>>,
    event: String,
    id: u64,
}

impl Subscription {
    /// Remove exactly this registration.
    ///
    /// Other listeners on the same event name are unaffected. A no-op if
    /// the bus is already gone.
    pub fn dispose(self) {
        if let Some(bus) = self.bus.upgrade() {
            let mut inner = bus.lock().unwrap();
            if let Some(regs) = inner.listeners.get_mut(&self.event) {
                regs.retain(|r| r.id != self.id);
                if regs.is_empty() {
                    inner.listeners.remove(&self.event);
                }
            }
        }
    }
}

/// Singleton request handlers, at most one per event name.
///
/// Re-registering for a name overwrites the previous handler. This is the
/// native side's mechanism for answering peer-initiated requests; the
/// handler's return value travels back over `Bridge::respond`.
#[derive(Default)]
pub struct RequestHandlers {
    inner: Mutex<HashMap<String, Arc<RequestHandler>>>,
}

impl RequestHandlers {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `event`, replacing any previous one.
    pub fn set(
        &self,
        event: &str,
        handler: impl Fn(Option<&Value>) -> Option<Value> + Send + Sync + 'static,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner.insert(event.to_string(), Arc::new(handler));
    }

    /// Remove the handler for `event`. Returns whether one was present.
    pub fn remove(&self, event: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.remove(event).is_some()
    }

    /// Whether a handler is registered for `event`.
    pub fn contains(&self, event: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.contains_key(event)
    }

    /// Invoke the handler for `event`, if one is registered.
    ///
    /// The outer `None` means "no handler"; the inner option is the
    /// handler's response data. The handler runs outside the registry
    /// lock.
    pub fn invoke(&self, event: &str, data: Option<&Value>) -> Option<Option<Value>> {
        let handler = {
            let inner = self.inner.lock().unwrap();
            inner.get(event).cloned()
        };
        handler.map(|h| h(data))
    }
}
