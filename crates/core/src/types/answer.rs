use serde::{Deserialize, Serialize};

use super::message::TranscriptEntry;

/// Why a conversation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The terminal proxy closed the exchange.
    Completed,
    /// An agent emitted the `TERMINATE` sentinel.
    Sentinel,
    /// The round cap was reached.
    RoundCap,
    /// An agent reached its reply cap.
    ReplyCap,
    /// The run failed; see [`AgentHistory::error`].
    Failed,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Sentinel => "sentinel",
            Self::RoundCap => "round_cap",
            Self::ReplyCap => "reply_cap",
            Self::Failed => "failed",
        }
    }
}

/// Transcript and outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentHistory {
    pub messages: Vec<TranscriptEntry>,
    pub termination: Termination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Final result returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Natural-language answer.
    pub message: String,
    /// Transcript of the exchange, when one took place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_history: Option<AgentHistory>,
}

impl Answer {
    /// True when the run ended in an error.
    pub fn is_error(&self) -> bool {
        self.agent_history
            .as_ref()
            .is_some_and(|h| h.error.is_some())
    }

    /// Number of transcript entries, zero when no history was recorded.
    pub fn turns(&self) -> usize {
        self.agent_history.as_ref().map_or(0, |h| h.messages.len())
    }
}
