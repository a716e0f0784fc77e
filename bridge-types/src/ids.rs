//! Correlation id generation.

use std::collections::HashSet;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// How many recently issued ids are remembered for collision detection
/// before the set is evicted wholesale. A tuning knob, not a correctness
/// requirement: uniqueness only has to hold across the window in which
/// two calls can be outstanding together.
const RECENT_ID_CAPACITY: usize = 500;

/// An opaque correlation token pairing a request with its eventual
/// response.
///
/// The peer echoes the id verbatim in its `callbackId` field; nothing on
/// either side interprets its structure.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CallId(String);

impl CallId {
    /// View the id as a string slice (what goes on the wire).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallId({})", self.0)
    }
}

impl From<CallId> for String {
    fn from(id: CallId) -> Self {
        id.0
    }
}

/// Generates collision-free call ids.
///
/// Ids are unix-milliseconds plus a random hex suffix. A bounded set of
/// recently issued ids detects collisions (same millisecond, same random
/// draw) and retries until the candidate is fresh.
#[derive(Debug, Default)]
pub struct CallIdGenerator {
    recent: HashSet<String>,
}

impl CallIdGenerator {
    /// Create a new generator with an empty recent-id set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate the next id, unique among all ids this generator has
    /// issued within the current eviction window.
    pub fn next_id(&mut self) -> CallId {
        if self.recent.len() >= RECENT_ID_CAPACITY {
            self.recent.clear();
        }
        loop {
            let candidate = candidate();
            if self.recent.insert(candidate.clone()) {
                return CallId(candidate);
            }
        }
    }
}

fn candidate() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let mut bytes = [0u8; 4];
    getrandom::getrandom(&mut bytes).expect("getrandom failed");
    format!("{}-{:08x}", millis, u32::from_le_bytes(bytes))
}
