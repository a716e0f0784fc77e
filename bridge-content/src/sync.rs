//! The content sync coordinator.
//!
//! Keeps a native-owned rich-text value and the peer's copy eventually
//! consistent across both directions: programmatic native writes are
//! pushed into the editor, user edits flow back through the change
//! callback, and rotating a fetch token forces an explicit pull.
//!
//! All reconciliation decisions are made by the pure state machine in
//! `bridge-core`; this module feeds it events and executes the actions it
//! returns against the live bridge. State mutations are applied
//! synchronously under one lock (never held across an await), so events
//! take effect in arrival order no matter which context delivers them.

use quill_bridge_core::{ContentAction, ContentEvent, ContentState, FetchToken};
use quill_bridge_host::{Bridge, Subscription};
use quill_bridge_types::{events, ContentChange};
use serde_json::Value;
use std::sync::{Arc, Mutex, Weak};

/// Coordinates content between the native side and the editor peer.
///
/// One coordinator per editor view. Create it with
/// [`attach`](Self::attach) and tear it down with [`close`](Self::close);
/// in between, the coordinator must be driven from within the tokio
/// runtime that owns the bridge (pushes and pulls spawn bridge traffic).
pub struct ContentSync {
    pub(crate) bridge: Arc<Bridge>,
    state: Mutex<ContentState>,
    on_change: Box<dyn Fn(&str) + Send + Sync>,
    subscriptions: Mutex<Vec<Subscription>>,
    // Handed to spawned fetch tasks so they never keep a closed
    // coordinator alive.
    weak_self: Weak<ContentSync>,
}

impl ContentSync {
    /// Create a coordinator bound to `bridge` and wire it to the peer's
    /// ready and content-change events.
    ///
    /// `on_change` fires whenever the native-observable value actually
    /// changes (peer edits and applied pull results - never echoes of a
    /// native push). The event subscriptions hold only weak handles back
    /// to the coordinator, so dropping the returned `Arc` ends delivery.
    pub fn attach(
        bridge: Arc<Bridge>,
        on_change: impl Fn(&str) + Send + Sync + 'static,
    ) -> Arc<Self> {
        let sync = Arc::new_cyclic(|weak| Self {
            bridge: Arc::clone(&bridge),
            state: Mutex::new(ContentState::new()),
            on_change: Box::new(on_change),
            subscriptions: Mutex::new(Vec::new()),
            weak_self: Weak::clone(weak),
        });

        let ready = {
            let weak = Arc::downgrade(&sync);
            bridge.on(events::EDITOR_READY, move |_| {
                if let Some(sync) = weak.upgrade() {
                    sync.dispatch(ContentEvent::PeerReady);
                }
            })
        };
        let changed = {
            let weak = Arc::downgrade(&sync);
            bridge.on(events::EDITOR_CONTENT_CHANGE, move |data| {
                let Some(sync) = weak.upgrade() else { return };
                match data.and_then(ContentChange::from_value) {
                    Some(change) => sync.dispatch(ContentEvent::PeerChange {
                        value: change.content,
                    }),
                    None => tracing::debug!("dropping malformed contentChange payload"),
                }
            })
        };
        sync.subscriptions.lock().unwrap().extend([ready, changed]);
        sync
    }

    /// The native-held value changed programmatically (the Push side).
    ///
    /// Deferred until the peer signals ready; suppressed entirely when
    /// the peer already holds this value.
    pub async fn set_value(&self, value: impl Into<String>) {
        self.dispatch_async(ContentEvent::NativePush {
            value: value.into(),
        })
        .await;
    }

    /// Rotate the fetch token (the Pull trigger).
    ///
    /// The first token a fresh coordinator observes only primes it; every
    /// later *change* of token issues an `editor.fetchContent` call whose
    /// result is applied unless a newer pull or a value change supersedes
    /// it. Passing the current token again is a no-op.
    pub async fn set_fetch_token(&self, token: impl Into<FetchToken>) {
        self.dispatch_async(ContentEvent::TokenChanged {
            token: token.into(),
        })
        .await;
    }

    /// The current best-known value, if any content has been seen yet.
    pub fn value(&self) -> Option<String> {
        self.state.lock().unwrap().last_known().map(str::to_string)
    }

    /// Whether the peer has signalled readiness.
    pub fn is_peer_ready(&self) -> bool {
        self.state.lock().unwrap().is_peer_ready()
    }

    /// Tear down: dispose the event subscriptions and resolve every
    /// in-flight bridge call with `None` so nothing hangs.
    pub fn close(&self) {
        for sub in self.subscriptions.lock().unwrap().drain(..) {
            sub.dispose();
        }
        self.bridge.cancel_all();
    }

    /// Run one event through the state machine. The lock is released
    /// before any action executes.
    fn apply(&self, event: ContentEvent) -> Vec<ContentAction> {
        let mut state = self.state.lock().unwrap();
        let (next, actions) = state.clone().on_event(event);
        *state = next;
        actions
    }

    /// Event entry from synchronous contexts (bus listeners, resolved
    /// fetches). Sends are handed to a task; notifications run inline.
    fn dispatch(&self, event: ContentEvent) {
        for action in self.apply(event) {
            match action {
                ContentAction::SendContent { value } => {
                    let bridge = Arc::clone(&self.bridge);
                    tokio::spawn(async move {
                        bridge
                            .trigger(events::EDITOR_SET_CONTENT, Some(Value::String(value)))
                            .await;
                    });
                }
                ContentAction::IssueFetch { token } => self.spawn_fetch(token),
                ContentAction::NotifyNative { value } => (self.on_change)(&value),
            }
        }
    }

    /// Event entry from async callers; sends are awaited in caller order.
    async fn dispatch_async(&self, event: ContentEvent) {
        for action in self.apply(event) {
            match action {
                ContentAction::SendContent { value } => {
                    self.bridge
                        .trigger(events::EDITOR_SET_CONTENT, Some(Value::String(value)))
                        .await;
                }
                ContentAction::IssueFetch { token } => self.spawn_fetch(token),
                ContentAction::NotifyNative { value } => (self.on_change)(&value),
            }
        }
    }

    /// Issue the `editor.fetchContent` call on a task and feed its result
    /// back through the machine. The task holds only a weak handle: a
    /// closed coordinator lets the resolution fall on the floor, and
    /// `cancel_all` guarantees the call itself cannot hang.
    fn spawn_fetch(&self, token: FetchToken) {
        let weak = Weak::clone(&self.weak_self);
        let bridge = Arc::clone(&self.bridge);
        tokio::spawn(async move {
            let result = bridge.call(events::EDITOR_FETCH_CONTENT, None).await;
            let content = result
                .as_ref()
                .and_then(ContentChange::from_value)
                .map(|change| change.content);
            if result.is_some() && content.is_none() {
                tracing::debug!("dropping malformed fetchContent result");
            }
            if let Some(sync) = weak.upgrade() {
                sync.dispatch(ContentEvent::PullResolved {
                    token,
                    result: content,
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_bridge_host::{BridgeConfig, MockTransport, ScriptTransport};
    use serde_json::json;

    struct Harness {
        sync: Arc<ContentSync>,
        bridge: Arc<Bridge>,
        mock: MockTransport,
        changes: Arc<Mutex<Vec<String>>>,
        // Keeps the weak-attached transport alive for the test's duration.
        _transport: Arc<dyn ScriptTransport>,
    }

    fn harness() -> Harness {
        let bridge = Arc::new(Bridge::new(BridgeConfig::new()));
        let mock = MockTransport::new();
        let transport: Arc<dyn ScriptTransport> = Arc::new(mock.clone());
        bridge.attach(&transport);

        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&changes);
        let sync = ContentSync::attach(Arc::clone(&bridge), move |value| {
            sink.lock().unwrap().push(value.to_string());
        });

        Harness {
            sync,
            bridge,
            mock,
            changes,
            _transport: transport,
        }
    }

    /// Let spawned bridge traffic run to completion on the test runtime.
    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    async fn peer_ready(harness: &Harness) {
        harness
            .bridge
            .receive_raw(r#"{"eventName":"editor.ready"}"#)
            .await;
        settle().await;
    }

    async fn peer_types(harness: &Harness, content: &str) {
        let raw = serde_json::to_string(&serde_json::json!({
            "eventName": "editor.contentChange",
            "data": { "content": content, "lines": 1 },
        }))
        .unwrap();
        harness.bridge.receive_raw(&raw).await;
        settle().await;
    }

    fn set_content_values(mock: &MockTransport) -> Vec<String> {
        mock.sent_messages()
            .into_iter()
            .filter(|m| m.event_name == events::EDITOR_SET_CONTENT)
            .filter_map(|m| m.data.and_then(|d| d.as_str().map(str::to_string)))
            .collect()
    }

    fn last_fetch_id(mock: &MockTransport) -> String {
        mock.sent_messages()
            .into_iter()
            .rev()
            .find(|m| m.event_name == events::EDITOR_FETCH_CONTENT)
            .and_then(|m| m.callback_id)
            .expect("no fetchContent on the wire")
    }

    async fn answer_fetch(harness: &Harness, callback_id: &str, data: Value) {
        let raw = serde_json::to_string(&serde_json::json!({
            "eventName": "editor.fetchContent",
            "callbackId": callback_id,
            "data": data,
        }))
        .unwrap();
        harness.bridge.receive_raw(&raw).await;
        settle().await;
    }

    // ===========================================
    // Push
    // ===========================================

    #[tokio::test]
    async fn push_sends_set_content() {
        let harness = harness();
        peer_ready(&harness).await;

        harness.sync.set_value("# Title").await;

        assert_eq!(set_content_values(&harness.mock), vec!["# Title"]);
        assert_eq!(harness.sync.value().as_deref(), Some("# Title"));
    }

    #[tokio::test]
    async fn push_of_same_value_sends_nothing() {
        let harness = harness();
        peer_ready(&harness).await;

        harness.sync.set_value("same").await;
        harness.sync.set_value("same").await;

        assert_eq!(set_content_values(&harness.mock), vec!["same"]);
    }

    #[tokio::test]
    async fn push_before_ready_is_deferred_until_ready() {
        let harness = harness();

        harness.sync.set_value("early draft").await;
        assert!(set_content_values(&harness.mock).is_empty());
        assert!(!harness.sync.is_peer_ready());

        peer_ready(&harness).await;

        assert_eq!(set_content_values(&harness.mock), vec!["early draft"]);
        assert!(harness.sync.is_peer_ready());
    }

    // ===========================================
    // Peer-originated changes
    // ===========================================

    #[tokio::test]
    async fn peer_edit_updates_value_and_notifies() {
        let harness = harness();
        peer_ready(&harness).await;

        peer_types(&harness, "user typed this").await;

        assert_eq!(harness.sync.value().as_deref(), Some("user typed this"));
        assert_eq!(*harness.changes.lock().unwrap(), vec!["user typed this"]);
        // Nothing flows back out - that would be an echo loop.
        assert!(set_content_values(&harness.mock).is_empty());
    }

    #[tokio::test]
    async fn echo_of_pushed_value_does_not_renotify() {
        let harness = harness();
        peer_ready(&harness).await;

        harness.sync.set_value("X").await;
        peer_types(&harness, "X").await;

        assert_eq!(harness.sync.value().as_deref(), Some("X"));
        assert!(harness.changes.lock().unwrap().is_empty());
        assert_eq!(set_content_values(&harness.mock), vec!["X"]);
    }

    #[tokio::test]
    async fn malformed_peer_change_is_dropped() {
        let harness = harness();
        peer_ready(&harness).await;

        harness
            .bridge
            .receive_raw(r#"{"eventName":"editor.contentChange","data":42}"#)
            .await;
        settle().await;

        assert!(harness.sync.value().is_none());
        assert!(harness.changes.lock().unwrap().is_empty());
    }

    // ===========================================
    // Pull
    // ===========================================

    #[tokio::test]
    async fn first_token_primes_without_fetching() {
        let harness = harness();
        peer_ready(&harness).await;

        harness.sync.set_fetch_token("t1").await;
        settle().await;

        assert!(harness.mock.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn token_rotation_fetches_and_applies_result() {
        let harness = harness();
        peer_ready(&harness).await;

        harness.sync.set_fetch_token("t1").await;
        harness.sync.set_fetch_token("t2").await;
        settle().await;

        let id = last_fetch_id(&harness.mock);
        answer_fetch(&harness, &id, json!("fetched content")).await;

        assert_eq!(harness.sync.value().as_deref(), Some("fetched content"));
        assert_eq!(*harness.changes.lock().unwrap(), vec!["fetched content"]);
    }

    #[tokio::test]
    async fn fetch_result_as_object_is_accepted() {
        let harness = harness();
        peer_ready(&harness).await;

        harness.sync.set_fetch_token("t1").await;
        harness.sync.set_fetch_token("t2").await;
        settle().await;

        let id = last_fetch_id(&harness.mock);
        answer_fetch(&harness, &id, json!({"content": "from object", "lines": 4})).await;

        assert_eq!(harness.sync.value().as_deref(), Some("from object"));
    }

    #[tokio::test]
    async fn unchanged_token_does_not_fetch_again() {
        let harness = harness();
        peer_ready(&harness).await;

        harness.sync.set_fetch_token("t1").await;
        harness.sync.set_fetch_token("t2").await;
        harness.sync.set_fetch_token("t2").await;
        settle().await;

        let fetches = harness
            .mock
            .sent_messages()
            .into_iter()
            .filter(|m| m.event_name == events::EDITOR_FETCH_CONTENT)
            .count();
        assert_eq!(fetches, 1);
    }

    #[tokio::test]
    async fn stale_pull_result_is_discarded_after_push() {
        let harness = harness();
        peer_ready(&harness).await;

        harness.sync.set_value("A").await;
        harness.sync.set_fetch_token("t1").await;
        harness.sync.set_fetch_token("t2").await;
        settle().await;
        let id = last_fetch_id(&harness.mock);

        // The native value moves on before the pull resolves.
        harness.sync.set_value("B").await;

        answer_fetch(&harness, &id, json!("A_old_from_peer")).await;

        assert_eq!(harness.sync.value().as_deref(), Some("B"));
        assert!(harness.changes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn superseded_pull_result_is_discarded() {
        let harness = harness();
        peer_ready(&harness).await;

        harness.sync.set_fetch_token("t1").await;
        harness.sync.set_fetch_token("t2").await;
        settle().await;
        let first_id = last_fetch_id(&harness.mock);

        harness.sync.set_fetch_token("t3").await;
        settle().await;
        let second_id = last_fetch_id(&harness.mock);
        assert_ne!(first_id, second_id);

        // The superseded pull resolves first - and changes nothing.
        answer_fetch(&harness, &first_id, json!("from t2")).await;
        assert!(harness.sync.value().is_none());

        // Only the newest pull's result lands.
        answer_fetch(&harness, &second_id, json!("from t3")).await;
        assert_eq!(harness.sync.value().as_deref(), Some("from t3"));
    }

    #[tokio::test]
    async fn unresolved_fetch_leaves_value_after_cancel() {
        let harness = harness();
        peer_ready(&harness).await;

        harness.sync.set_value("kept").await;
        harness.sync.set_fetch_token("t1").await;
        harness.sync.set_fetch_token("t2").await;
        settle().await;
        assert_eq!(harness.bridge.pending_calls(), 1);

        // Teardown resolves the call with no data; "no data" means
        // "no change", never "clear the content".
        harness.bridge.cancel_all();
        settle().await;

        assert_eq!(harness.sync.value().as_deref(), Some("kept"));
        assert_eq!(harness.bridge.pending_calls(), 0);
    }

    // ===========================================
    // Teardown
    // ===========================================

    #[tokio::test]
    async fn close_disposes_subscriptions_and_cancels() {
        let harness = harness();
        peer_ready(&harness).await;

        harness.sync.set_fetch_token("t1").await;
        harness.sync.set_fetch_token("t2").await;
        settle().await;

        harness.sync.close();
        settle().await;
        assert_eq!(harness.bridge.pending_calls(), 0);

        // Peer edits no longer reach the coordinator.
        peer_types(&harness, "after close").await;
        assert!(harness.sync.value().is_none());
        assert!(harness.changes.lock().unwrap().is_empty());
    }

    // ===========================================
    // End to end
    // ===========================================

    #[tokio::test]
    async fn push_then_echo_full_scenario() {
        let harness = harness();
        peer_ready(&harness).await;

        // Native sets content to X: exactly one setContent goes out.
        harness.sync.set_value("X").await;
        assert_eq!(set_content_values(&harness.mock), vec!["X"]);

        // The peer renders and echoes X back.
        peer_types(&harness, "X").await;

        // The value stays X and no redundant notification fired.
        assert_eq!(harness.sync.value().as_deref(), Some("X"));
        assert!(harness.changes.lock().unwrap().is_empty());
        assert_eq!(set_content_values(&harness.mock), vec!["X"]);
    }
}
