//! Pending-call correlation.
//!
//! Maps generated call ids to response continuations. Each entry holds the
//! sending half of a oneshot channel; resolving an id fulfills the waiting
//! `Bridge::call` future exactly once and removes the entry. Responses may
//! arrive in any order - per-id matching re-associates them regardless.

use quill_bridge_types::{CallId, CallIdGenerator};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Table of calls awaiting a response from the peer.
///
/// Exclusively owned by one [`Bridge`](crate::Bridge) instance; there is
/// no cross-instance sharing.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    inner: Mutex<TableInner>,
}

#[derive(Debug, Default)]
struct TableInner {
    pending: HashMap<String, oneshot::Sender<Option<Value>>>,
    ids: CallIdGenerator,
}

impl CorrelationTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending call.
    ///
    /// Returns the generated id (collision-free within this table's
    /// lifetime) and the receiving half the caller awaits on.
    pub fn register(&self) -> (CallId, oneshot::Receiver<Option<Value>>) {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock().unwrap();
        let id = inner.ids.next_id();
        inner.pending.insert(id.as_str().to_string(), tx);
        (id, rx)
    }

    /// Fulfill the pending call for `id` and remove its entry.
    ///
    /// Returns whether a match was found. Resolving an unknown id is a
    /// no-op, not an error - the peer may legitimately respond after
    /// native-side cancellation. A receiver the caller already dropped
    /// still counts as matched; the entry is consumed either way.
    pub fn resolve(&self, id: &str, data: Option<Value>) -> bool {
        let sender = {
            let mut inner = self.inner.lock().unwrap();
            inner.pending.remove(id)
        };
        match sender {
            Some(tx) => {
                let _ = tx.send(data);
                true
            }
            None => false,
        }
    }

    /// Resolve every pending call with `None`.
    ///
    /// Used at transport teardown so no continuation leaks or hangs
    /// forever.
    pub fn cancel_all(&self) {
        let drained: Vec<_> = {
            let mut inner = self.inner.lock().unwrap();
            inner.pending.drain().collect()
        };
        for (_, tx) in drained {
            let _ = tx.send(None);
        }
    }

    /// Number of calls currently awaiting a response.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    /// Whether no calls are outstanding.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn resolve_delivers_to_registered_receiver() {
        let table = CorrelationTable::new();
        let (id, rx) = table.register();

        assert!(table.resolve(id.as_str(), Some(json!("answer"))));

        assert_eq!(rx.await.unwrap(), Some(json!("answer")));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn resolve_matches_at_most_once() {
        let table = CorrelationTable::new();
        let (id, _rx) = table.register();

        assert!(table.resolve(id.as_str(), Some(json!(1))));
        assert!(!table.resolve(id.as_str(), Some(json!(2))));
    }

    #[test]
    fn resolve_unknown_id_is_a_no_op() {
        let table = CorrelationTable::new();
        assert!(!table.resolve("never-registered", None));
    }

    #[tokio::test]
    async fn resolve_with_dropped_receiver_still_consumes_entry() {
        let table = CorrelationTable::new();
        let (id, rx) = table.register();
        drop(rx);

        assert!(table.resolve(id.as_str(), Some(json!("late"))));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn concurrent_calls_resolve_independently_in_any_order() {
        let table = CorrelationTable::new();
        let (id_a, rx_a) = table.register();
        let (id_b, rx_b) = table.register();
        let (id_c, rx_c) = table.register();
        assert_eq!(table.len(), 3);

        // Permuted resolution order.
        assert!(table.resolve(id_b.as_str(), Some(json!("b"))));
        assert!(table.resolve(id_c.as_str(), Some(json!("c"))));
        assert!(table.resolve(id_a.as_str(), Some(json!("a"))));

        assert_eq!(rx_a.await.unwrap(), Some(json!("a")));
        assert_eq!(rx_b.await.unwrap(), Some(json!("b")));
        assert_eq!(rx_c.await.unwrap(), Some(json!("c")));
    }

    #[tokio::test]
    async fn cancel_all_resolves_everything_with_none() {
        let table = CorrelationTable::new();
        let (_, rx_a) = table.register();
        let (_, rx_b) = table.register();

        table.cancel_all();

        assert_eq!(rx_a.await.unwrap(), None);
        assert_eq!(rx_b.await.unwrap(), None);
        assert!(table.is_empty());
    }

    #[test]
    fn generated_ids_are_distinct() {
        let table = CorrelationTable::new();
        let (id_a, _rx_a) = table.register();
        let (id_b, _rx_b) = table.register();

        assert_ne!(id_a.as_str(), id_b.as_str());
        assert_eq!(table.len(), 2);
    }
}
