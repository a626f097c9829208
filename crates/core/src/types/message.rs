use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::role::{AgentRole, NextSpeaker};

// =============================================================================
// Wire Format
// =============================================================================

/// The user's question together with the plan for answering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Query {
    /// The original user request, copied without edits.
    pub query: String,
    /// Summary of what the user is asking and which agents will answer it.
    /// Written by the first agent; later agents carry it forward unchanged.
    pub workplan: String,
}

impl Query {
    /// Create a query with an empty workplan.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            workplan: String::new(),
        }
    }
}

/// Message contract every agent emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct IndividualAgentResponse {
    /// The original query and the workplan.
    pub userquery: Query,
    /// True if the proposed solve actually addresses the question.
    pub query_solved: bool,
    /// The proposed answer, search results or routing rationale.
    pub proposed_solve: String,
    /// Name of the agent that should speak next, or `TERMINATE`.
    pub next_speaker: String,
    /// Instructions for the next speaker.
    pub next_speaker_question: String,
}

impl IndividualAgentResponse {
    /// Wrap a raw user question into the envelope that starts a conversation.
    pub fn envelope(query: Query) -> Self {
        Self {
            userquery: query,
            query_solved: false,
            proposed_solve: String::new(),
            next_speaker: AgentRole::Router.name().to_string(),
            next_speaker_question: "Please categorise this legal question and route it to the right specialist."
                .to_string(),
        }
    }

    /// Resolve the `next_speaker` field.
    pub fn next(&self) -> NextSpeaker {
        NextSpeaker::resolve(&self.next_speaker)
    }

    /// JSON Schema describing the wire format, used for structured output.
    pub fn json_schema() -> Value {
        serde_json::to_value(schemars::schema_for!(IndividualAgentResponse))
            .unwrap_or(Value::Null)
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Why a message could not be read as an [`IndividualAgentResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("message is empty")]
    Empty,

    #[error("message is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("message does not match the agent response schema: {0}")]
    Schema(String),
}

/// Strictly parse model output as an [`IndividualAgentResponse`].
///
/// A surrounding Markdown code fence is tolerated; anything else that is not
/// exactly the five wire fields is rejected.
pub fn parse_agent_response(text: &str) -> Result<IndividualAgentResponse, ParseError> {
    parse_agent_value(extract_json(text)?)
}

/// Decode model output as JSON, tolerating a surrounding code fence.
pub fn extract_json(text: &str) -> Result<Value, ParseError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(ParseError::Empty);
    }
    serde_json::from_str(body).map_err(|e| ParseError::InvalidJson(e.to_string()))
}

/// Validate an already-decoded JSON value against the wire format.
pub fn parse_agent_value(value: Value) -> Result<IndividualAgentResponse, ParseError> {
    serde_json::from_value(value).map_err(|e| ParseError::Schema(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

// =============================================================================
// Transcript
// =============================================================================

/// Content of a single exchanged message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Free text as returned by a model.
    Text(String),
    /// A structured object (usually an [`IndividualAgentResponse`]).
    Structured(Value),
}

impl MessageContent {
    /// Render the content as text for prompts and logs.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(value) => value.to_string(),
        }
    }

    /// Read the content as an agent response, parsing text strictly.
    pub fn agent_response(&self) -> Result<IndividualAgentResponse, ParseError> {
        match self {
            Self::Text(text) => parse_agent_response(text),
            Self::Structured(value) => parse_agent_value(value.clone()),
        }
    }
}

/// A message in the conversation, tagged with its sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Agent that authored the message.
    pub sender: AgentRole,
    /// Message body.
    pub content: MessageContent,
    /// Unix timestamp (seconds).
    pub timestamp: i64,
}

impl TranscriptEntry {
    /// Create an entry stamped with the current time.
    pub fn new(sender: AgentRole, content: MessageContent) -> Self {
        Self {
            sender,
            content,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Create a free-text entry.
    pub fn text(sender: AgentRole, text: impl Into<String>) -> Self {
        Self::new(sender, MessageContent::Text(text.into()))
    }

    /// Create a structured entry from an agent response.
    pub fn structured(sender: AgentRole, response: &IndividualAgentResponse) -> Self {
        let value = serde_json::to_value(response).unwrap_or(Value::Null);
        Self::new(sender, MessageContent::Structured(value))
    }
}
