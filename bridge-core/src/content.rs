//! Content synchronization state machine.
//!
//! This module provides a pure, side-effect-free state machine that keeps
//! a native-held editor value and the copy living inside the web-view peer
//! eventually consistent. The machine takes events as input and produces a
//! new state plus a list of actions to execute.
//!
//! The actual I/O (sending `editor.setContent`, issuing fetch calls,
//! notifying native observers) is performed by bridge-content, not by this
//! module. This enables instant unit testing without bridge mocks.
//!
//! Two races are handled here rather than by the caller:
//! - an echo (the peer reporting back a value the native side just pushed)
//!   must not re-notify observers or be re-pushed;
//! - a pull whose result arrives after the native value moved on, or after
//!   a newer pull was issued, must be discarded, never applied.

use crate::FetchToken;

/// Content sync state for one editor view - NO I/O, just transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentState {
    /// Whether the peer has signalled it finished initializing.
    peer_ready: bool,
    /// Best-known value the peer currently displays.
    last_known: Option<String>,
    /// Value pushed before the peer was ready; latest wins.
    deferred: Option<String>,
    /// Most recently observed fetch token.
    token: Option<FetchToken>,
    /// The one pull whose eventual result will be honored.
    pull: Option<PendingPull>,
}

/// A pull in flight: the token that triggered it and what the native side
/// held when it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingPull {
    token: FetchToken,
    value_at_issue: Option<String>,
}

/// Events that can occur in the content sync lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEvent {
    /// The peer finished loading and mounted the editor.
    PeerReady,
    /// The native-held value changed programmatically (the Push side).
    NativePush {
        /// The new native value.
        value: String,
    },
    /// The peer reported a user edit.
    PeerChange {
        /// The peer's current content.
        value: String,
    },
    /// The native side rotated its fetch token (the Pull trigger).
    TokenChanged {
        /// The new token.
        token: FetchToken,
    },
    /// A previously issued pull resolved.
    PullResolved {
        /// Token of the pull that resolved.
        token: FetchToken,
        /// The peer's content, or `None` if the peer was unreachable.
        result: Option<String>,
    },
}

/// Actions to be executed by bridge-content.
///
/// These are instructions, not side effects. The coordinator interprets
/// them and performs the actual bridge traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentAction {
    /// Send `editor.setContent` with this value to the peer.
    SendContent {
        /// The value to push.
        value: String,
    },
    /// Issue an `editor.fetchContent` call tagged with this token.
    IssueFetch {
        /// The token identifying the pull.
        token: FetchToken,
    },
    /// The native-observable value changed; notify observers.
    NotifyNative {
        /// The new value.
        value: String,
    },
}

impl ContentState {
    /// Create a fresh machine: peer not ready, no value, no token.
    pub fn new() -> Self {
        Self {
            peer_ready: false,
            last_known: None,
            deferred: None,
            token: None,
            pull: None,
        }
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller
    /// (bridge-content) is responsible for executing the returned actions.
    pub fn on_event(mut self, event: ContentEvent) -> (Self, Vec<ContentAction>) {
        match event {
            ContentEvent::PeerReady => {
                self.peer_ready = true;
                match self.deferred.take() {
                    Some(value) if self.last_known.as_deref() != Some(value.as_str()) => {
                        self.last_known = Some(value.clone());
                        (self, vec![ContentAction::SendContent { value }])
                    }
                    _ => (self, vec![]),
                }
            }

            ContentEvent::NativePush { value } => {
                if !self.peer_ready {
                    // Nothing to push into yet; latest value wins.
                    self.deferred = Some(value);
                    return (self, vec![]);
                }
                if self.last_known.as_deref() == Some(value.as_str()) {
                    // Echo suppression: the peer already holds this value.
                    return (self, vec![]);
                }
                // Optimistic: assume the peer applies it. A later
                // contentChange event corrects us if it did not.
                self.last_known = Some(value.clone());
                (self, vec![ContentAction::SendContent { value }])
            }

            ContentEvent::PeerChange { value } => self.apply_peer_value(value),

            ContentEvent::TokenChanged { token } => match &self.token {
                None => {
                    // The first token a fresh machine observes is priming:
                    // there is nothing to fetch yet.
                    self.token = Some(token);
                    (self, vec![])
                }
                Some(current) if *current == token => (self, vec![]),
                Some(_) => {
                    self.token = Some(token.clone());
                    // Replaces any outstanding pull: only the newest pull's
                    // result will be honored.
                    self.pull = Some(PendingPull {
                        token: token.clone(),
                        value_at_issue: self.last_known.clone(),
                    });
                    (self, vec![ContentAction::IssueFetch { token }])
                }
            },

            ContentEvent::PullResolved { token, result } => match self.pull.take() {
                Some(pending) if pending.token == token => {
                    let Some(value) = result else {
                        // Peer unreachable or answered with nothing: an
                        // absent result never clears the native value.
                        return (self, vec![]);
                    };
                    if pending.value_at_issue != self.last_known {
                        // The native value moved while the pull was in
                        // flight; the result is stale.
                        return (self, vec![]);
                    }
                    self.apply_peer_value(value)
                }
                other => {
                    // Superseded or unknown pull; completion is a no-op.
                    self.pull = other;
                    (self, vec![])
                }
            },
        }
    }

    /// Record a value the peer is known to hold, notifying only on a real
    /// change. `last_known` is updated before the notification is emitted.
    fn apply_peer_value(mut self, value: String) -> (Self, Vec<ContentAction>) {
        let changed = self.last_known.as_deref() != Some(value.as_str());
        self.last_known = Some(value.clone());
        if changed {
            (self, vec![ContentAction::NotifyNative { value }])
        } else {
            (self, vec![])
        }
    }

    /// Whether the peer has signalled readiness.
    pub fn is_peer_ready(&self) -> bool {
        self.peer_ready
    }

    /// The best-known value the peer currently displays.
    pub fn last_known(&self) -> Option<&str> {
        self.last_known.as_deref()
    }

    /// Whether a pull is outstanding.
    pub fn has_pending_pull(&self) -> bool {
        self.pull.is_some()
    }

    /// The most recently observed fetch token.
    pub fn current_token(&self) -> Option<&FetchToken> {
        self.token.as_ref()
    }
}

impl Default for ContentState {
    fn default() -> Self {
        Self::new()
    }
}
