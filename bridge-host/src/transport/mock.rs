//! Mock transport for testing.
//!
//! Captures evaluated scripts for verification and supports forced
//! failures.

use super::{ScriptTransport, TransportError};
use async_trait::async_trait;
use quill_bridge_types::{codec, BridgeMessage};
use std::sync::{Arc, Mutex};

/// Mock transport for testing.
///
/// Captures every script the bridge evaluates and supports forced
/// failures. `Clone` shares state, so a test can keep one handle while
/// the bridge holds another.
#[derive(Debug)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug)]
struct MockTransportInner {
    attached: bool,
    sent_scripts: Vec<String>,
    fail_next_send: Option<String>,
}

impl Default for MockTransportInner {
    fn default() -> Self {
        Self {
            // A fresh mock plays an already-loaded peer view.
            attached: true,
            sent_scripts: Vec::new(),
            fail_next_send: None,
        }
    }
}

impl MockTransport {
    /// Create a new mock transport, attached from the start.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockTransportInner::default())),
        }
    }

    /// Get all scripts that were evaluated, in send order.
    pub fn sent_scripts(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.sent_scripts.clone()
    }

    /// Get the last script that was evaluated.
    pub fn last_sent(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.sent_scripts.last().cloned()
    }

    /// Decode every captured script back into the message it carried.
    ///
    /// Scripts that are not bridge invocations are skipped.
    pub fn sent_messages(&self) -> Vec<BridgeMessage> {
        self.sent_scripts()
            .iter()
            .filter_map(|script| payload_of(script))
            .filter_map(|raw| codec::decode(&raw))
            .collect()
    }

    /// Decode the last captured script back into its message.
    pub fn last_message(&self) -> Option<BridgeMessage> {
        self.last_sent()
            .and_then(|script| payload_of(&script))
            .and_then(|raw| codec::decode(&raw))
    }

    /// Cause the next `send_script()` to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_send = Some(error.to_string());
    }

    /// Simulate the peer view going away.
    pub fn detach(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.attached = false;
    }

    /// Clear all state (captures, forced failures, attachment).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Extract and unescape the payload of a `handler('<escaped>')` script.
fn payload_of(script: &str) -> Option<String> {
    let start = script.find("('")? + 2;
    let end = script.rfind("')")?;
    (start <= end).then(|| codec::unescape(&script[start..end]))
}

#[async_trait]
impl ScriptTransport for MockTransport {
    async fn send_script(&self, script: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.attached {
            return Err(TransportError::NotAttached);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent_scripts.push(script.to_string());
        Ok(())
    }

    fn is_attached(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.attached
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.attached = false;
        Ok(())
    }
}
