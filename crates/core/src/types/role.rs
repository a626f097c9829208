use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel value an agent places in `next_speaker` to end the exchange.
pub const TERMINATE: &str = "TERMINATE";

// =============================================================================
// Agent Roles
// =============================================================================

/// Closed set of agent roles taking part in a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum AgentRole {
    /// Categorises legal questions (`legal_paralegal`).
    #[serde(rename = "legal_paralegal")]
    Router,
    /// Tax domain triage (`tax_paralegal`).
    #[serde(rename = "tax_paralegal")]
    Tax,
    /// Rewrites the question for vector search (`question_formulation`).
    #[serde(rename = "question_formulation")]
    Reformulator,
    /// Searches the legal corpus (`information_retrieval`).
    #[serde(rename = "information_retrieval")]
    Retriever,
    /// Writes the cited final answer (`response`).
    #[serde(rename = "response")]
    Synthesizer,
    /// Stands in for the end user (`user_proxy`).
    #[serde(rename = "user_proxy")]
    UserProxy,
}

impl AgentRole {
    /// Every role, in pipeline order.
    pub const ALL: [AgentRole; 6] = [
        AgentRole::Router,
        AgentRole::Tax,
        AgentRole::Reformulator,
        AgentRole::Retriever,
        AgentRole::Synthesizer,
        AgentRole::UserProxy,
    ];

    /// Canonical agent name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Router => "legal_paralegal",
            Self::Tax => "tax_paralegal",
            Self::Reformulator => "question_formulation",
            Self::Retriever => "information_retrieval",
            Self::Synthesizer => "response",
            Self::UserProxy => "user_proxy",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a name does not match any role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent name: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for AgentRole {
    type Err = UnknownRole;

    /// Accepts the canonical name as well as the `_agent` suffixed form
    /// (`tax_paralegal_agent`, `response_agent`, ...), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let base = normalized
            .strip_suffix("_agent")
            .unwrap_or(normalized.as_str());

        AgentRole::ALL
            .iter()
            .copied()
            .find(|role| role.name() == base)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

// =============================================================================
// Next Speaker
// =============================================================================

/// Resolved value of a message's `next_speaker` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextSpeaker {
    /// A known agent role.
    Agent(AgentRole),
    /// The termination sentinel.
    Terminate,
    /// A name that matches no role.
    Unknown(String),
}

impl NextSpeaker {
    /// Resolve a raw `next_speaker` string.
    pub fn resolve(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case(TERMINATE) {
            return Self::Terminate;
        }
        match raw.parse::<AgentRole>() {
            Ok(role) => Self::Agent(role),
            Err(UnknownRole(name)) => Self::Unknown(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names_round_trip() {
        for role in AgentRole::ALL {
            assert_eq!(role.name().parse::<AgentRole>().unwrap(), role);
        }
    }

    #[test]
    fn test_agent_suffix_alias() {
        assert_eq!("tax_paralegal_agent".parse::<AgentRole>().unwrap(), AgentRole::Tax);
        assert_eq!("response_agent".parse::<AgentRole>().unwrap(), AgentRole::Synthesizer);
        assert_eq!("User_Proxy_Agent".parse::<AgentRole>().unwrap(), AgentRole::UserProxy);
    }

    #[test]
    fn test_unknown_role() {
        assert!("company_law_agent".parse::<AgentRole>().is_err());
    }

    #[test]
    fn test_resolve_next_speaker() {
        assert_eq!(NextSpeaker::resolve("TERMINATE"), NextSpeaker::Terminate);
        assert_eq!(NextSpeaker::resolve(" terminate "), NextSpeaker::Terminate);
        assert_eq!(
            NextSpeaker::resolve("information_retrieval_agent"),
            NextSpeaker::Agent(AgentRole::Retriever)
        );
        assert_eq!(
            NextSpeaker::resolve("criminal_law_agent"),
            NextSpeaker::Unknown("criminal_law_agent".to_string())
        );
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&AgentRole::Reformulator).unwrap();
        assert_eq!(json, "\"question_formulation\"");
    }
}
