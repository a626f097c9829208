use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

use super::message::TranscriptEntry;

/// Number of messages a session keeps unless configured otherwise.
pub const DEFAULT_HISTORY_BOUND: usize = 10;

fn default_bound() -> usize {
    DEFAULT_HISTORY_BOUND
}

// =============================================================================
// Conversation State
// =============================================================================

/// Bounded, append-only conversation history.
///
/// Once the bound is reached every push evicts the oldest message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default = "default_bound")]
    bound: usize,
    messages: VecDeque<TranscriptEntry>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::with_bound(DEFAULT_HISTORY_BOUND)
    }
}

impl ConversationState {
    /// Create an empty history with the given bound (at least 1).
    pub fn with_bound(bound: usize) -> Self {
        let bound = bound.max(1);
        Self {
            bound,
            messages: VecDeque::with_capacity(bound),
        }
    }

    /// Append a message, evicting from the front when over the bound.
    pub fn push(&mut self, entry: TranscriptEntry) {
        self.messages.push_back(entry);
        self.enforce_bound();
    }

    /// Change the bound and drop the oldest messages that no longer fit.
    pub fn set_bound(&mut self, bound: usize) {
        self.bound = bound.max(1);
        self.enforce_bound();
    }

    fn enforce_bound(&mut self) {
        while self.messages.len() > self.bound {
            self.messages.pop_front();
        }
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.messages.back()
    }

    /// The `n` most recent messages, oldest first.
    pub fn recent(&self, n: usize) -> Vec<TranscriptEntry> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(skip).cloned().collect()
    }
}

// =============================================================================
// Session
// =============================================================================

/// Per-client conversation record persisted across requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque caller-supplied id, used verbatim as the storage key.
    pub id: String,

    /// Bounded message history.
    pub history: ConversationState,

    /// Free-form context shared between agents (e.g. `userquery`).
    #[serde(default)]
    pub context_variables: HashMap<String, Value>,

    /// Creation timestamp.
    pub created_at: i64,

    /// Last updated timestamp.
    pub updated_at: i64,
}

impl Session {
    /// Create an empty session.
    pub fn new(id: impl Into<String>, bound: usize) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: id.into(),
            history: ConversationState::with_bound(bound),
            context_variables: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the session as modified.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp();
    }

    /// True when the session has been idle for longer than `ttl_secs`.
    pub fn is_expired(&self, ttl_secs: u64, now: i64) -> bool {
        // TTLs beyond i64::MAX seconds never expire.
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        ttl > 0 && now.saturating_sub(self.updated_at) > ttl
    }
}
