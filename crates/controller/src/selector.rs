//! Speaker selection.
//!
//! After every turn the selector reads the `next_speaker` the agent asked
//! for and checks it against the allowed-transition graph. Requests outside
//! the graph, unknown names and unreadable messages go to an [`AutoSpeaker`],
//! which can only ever answer with a successor the graph allows.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use paralegal_core::{
    traits::{ChatMessage, LlmClient},
    types::{AgentRole, MessageContent, NextSpeaker, TranscriptEntry},
    Error, Result,
};

// =============================================================================
// Transition Graph
// =============================================================================

/// Static map from each role to the roles allowed to speak after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionGraph {
    edges: HashMap<AgentRole, Vec<AgentRole>>,
}

impl Default for TransitionGraph {
    fn default() -> Self {
        use AgentRole::*;
        Self::with_edges([
            (UserProxy, vec![Router, Synthesizer]),
            (Router, vec![Tax]),
            (Tax, vec![Reformulator]),
            (Reformulator, vec![Retriever]),
            (Retriever, vec![Synthesizer]),
            (Synthesizer, vec![UserProxy]),
        ])
    }
}

impl TransitionGraph {
    /// Build a graph from explicit edges. Roles without an entry have no
    /// successors.
    pub fn with_edges(edges: impl IntoIterator<Item = (AgentRole, Vec<AgentRole>)>) -> Self {
        Self {
            edges: edges.into_iter().collect(),
        }
    }

    /// Successors of `from`, in preference order.
    pub fn allowed(&self, from: AgentRole) -> &[AgentRole] {
        self.edges.get(&from).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_allowed(&self, from: AgentRole, to: AgentRole) -> bool {
        self.allowed(from).contains(&to)
    }

    /// Fewest transitions from `from` to `to`, if reachable.
    pub fn hops(&self, from: AgentRole, to: AgentRole) -> Option<usize> {
        let mut queue = VecDeque::from([(from, 0usize)]);
        let mut seen = HashSet::from([from]);
        while let Some((role, depth)) = queue.pop_front() {
            if role == to {
                return Some(depth);
            }
            for &next in self.allowed(role) {
                if seen.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        None
    }
}

// =============================================================================
// Selection Result
// =============================================================================

/// How the next speaker was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// The agent's `next_speaker` was allowed and used as is.
    Declared,
    /// The automatic chooser picked among the allowed successors.
    Auto,
    /// A phrase in an unparseable message named the next agent.
    Textual,
}

impl SelectionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Declared => "declared",
            Self::Auto => "auto",
            Self::Textual => "textual",
        }
    }
}

/// Outcome of one selection step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Hand the turn to `role`.
    Speaker {
        role: AgentRole,
        strategy: SelectionStrategy,
    },
    /// End the conversation.
    Terminate,
}

// =============================================================================
// Automatic Chooser
// =============================================================================

/// Picks a speaker when the last message does not name a usable one.
#[async_trait]
pub trait AutoSpeaker: Send + Sync {
    /// Choose among `allowed` (never empty). Answers outside `allowed` are
    /// discarded by the selector.
    async fn choose(
        &self,
        current: AgentRole,
        allowed: &[AgentRole],
        transcript: &[TranscriptEntry],
    ) -> Result<AgentRole>;
}

fn first_allowed(allowed: &[AgentRole]) -> Result<AgentRole> {
    allowed
        .first()
        .copied()
        .ok_or_else(|| Error::controller("no allowed successor to choose from"))
}

/// Deterministic chooser: the first allowed successor.
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphAutoSpeaker;

#[async_trait]
impl AutoSpeaker for GraphAutoSpeaker {
    async fn choose(
        &self,
        _current: AgentRole,
        allowed: &[AgentRole],
        _transcript: &[TranscriptEntry],
    ) -> Result<AgentRole> {
        first_allowed(allowed)
    }
}

/// Model-driven chooser: asks the LLM which allowed agent should speak next
/// and matches the answer against agent names.
pub struct LlmAutoSpeaker {
    llm: Arc<dyn LlmClient>,
    /// Messages of recent history shown to the model.
    window: usize,
}

impl LlmAutoSpeaker {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm, window: 4 }
    }

    fn build_prompt(allowed: &[AgentRole], transcript: &[TranscriptEntry]) -> Vec<ChatMessage> {
        let candidates = allowed
            .iter()
            .map(|role| format!("- {}: {}", role.name(), crate::prompts::description(*role)))
            .collect::<Vec<_>>()
            .join("\n");

        let mut messages = vec![ChatMessage::system(format!(
            "You choose which agent speaks next in a legal question-answering workflow.\n\n\
             Available agents:\n{}\n\nRespond with ONLY the agent name.",
            candidates
        ))];
        messages.extend(
            transcript
                .iter()
                .map(|entry| ChatMessage::user(format!("[{}]: {}", entry.sender, entry.content.to_text()))),
        );
        messages.push(ChatMessage::user("Which agent should speak next?"));
        messages
    }

    /// Find the allowed role named in free text; longest names first so
    /// `information_retrieval` is not mistaken for a shorter match.
    fn match_role(selection: &str, allowed: &[AgentRole]) -> Option<AgentRole> {
        let selection = selection.to_lowercase();
        let mut candidates = allowed.to_vec();
        candidates.sort_by_key(|role| std::cmp::Reverse(role.name().len()));
        candidates.into_iter().find(|role| {
            selection.contains(role.name()) || selection.contains(&role.name().replace('_', " "))
        })
    }
}

#[async_trait]
impl AutoSpeaker for LlmAutoSpeaker {
    async fn choose(
        &self,
        current: AgentRole,
        allowed: &[AgentRole],
        transcript: &[TranscriptEntry],
    ) -> Result<AgentRole> {
        let first = first_allowed(allowed)?;
        if allowed.len() == 1 {
            return Ok(first);
        }

        let skip = transcript.len().saturating_sub(self.window);
        let messages = Self::build_prompt(allowed, &transcript[skip..]);
        let response = self.llm.chat(&messages).await?;

        let chosen = Self::match_role(&response.content, allowed).unwrap_or(first);
        tracing::debug!(
            current = %current,
            chosen = %chosen,
            raw = %response.content.trim(),
            "Automatic speaker choice"
        );
        Ok(chosen)
    }
}

// =============================================================================
// Textual Fallback
// =============================================================================

/// Last-resort routing for messages that are not valid agent responses:
/// look for a phrase naming the next stage. The graph is not consulted.
pub fn textual_fallback(text: &str) -> Option<AgentRole> {
    const PHRASES: [(&str, AgentRole); 3] = [
        ("question formulation", AgentRole::Reformulator),
        ("information retrieval", AgentRole::Retriever),
        ("response agent", AgentRole::Synthesizer),
    ];

    let lowered = text.to_lowercase();
    PHRASES
        .iter()
        .find(|(phrase, _)| lowered.contains(phrase))
        .map(|&(_, role)| role)
}

// =============================================================================
// Selector
// =============================================================================

/// Chooses the next speaker after each turn.
pub struct SpeakerSelector {
    graph: TransitionGraph,
    auto: Arc<dyn AutoSpeaker>,
}

impl Default for SpeakerSelector {
    fn default() -> Self {
        Self::new(TransitionGraph::default(), Arc::new(GraphAutoSpeaker))
    }
}

impl SpeakerSelector {
    pub fn new(graph: TransitionGraph, auto: Arc<dyn AutoSpeaker>) -> Self {
        Self { graph, auto }
    }

    pub fn graph(&self) -> &TransitionGraph {
        &self.graph
    }

    /// Select who speaks after `current`, whose message is `last`.
    ///
    /// `transcript` is the conversation so far (including `last`) and is only
    /// shown to the automatic chooser.
    pub async fn select(
        &self,
        current: AgentRole,
        last: &TranscriptEntry,
        transcript: &[TranscriptEntry],
    ) -> Result<Selection> {
        match Self::requested(&last.content) {
            Ok(NextSpeaker::Terminate) => Ok(Selection::Terminate),
            Ok(NextSpeaker::Agent(role)) if self.graph.is_allowed(current, role) => {
                Ok(Selection::Speaker {
                    role,
                    strategy: SelectionStrategy::Declared,
                })
            }
            Ok(NextSpeaker::Agent(role)) => {
                tracing::warn!(
                    current = %current,
                    requested = %role,
                    "Requested speaker is not an allowed successor"
                );
                self.auto_select(current, transcript).await
            }
            Ok(NextSpeaker::Unknown(name)) => {
                tracing::warn!(current = %current, requested = %name, "Unknown next speaker");
                self.auto_select(current, transcript).await
            }
            Err(text) => match textual_fallback(&text) {
                Some(role) => {
                    tracing::warn!(
                        current = %current,
                        chosen = %role,
                        "Unparseable message, routed by textual fallback"
                    );
                    Ok(Selection::Speaker {
                        role,
                        strategy: SelectionStrategy::Textual,
                    })
                }
                None => {
                    tracing::warn!(current = %current, "Unparseable message, choosing automatically");
                    self.auto_select(current, transcript).await
                }
            },
        }
    }

    /// Read the requested next speaker, or return the message text when it
    /// carries none.
    fn requested(content: &MessageContent) -> std::result::Result<NextSpeaker, String> {
        match content {
            MessageContent::Structured(value) => value
                .get("next_speaker")
                .and_then(|v| v.as_str())
                .map(NextSpeaker::resolve)
                .ok_or_else(|| value.to_string()),
            MessageContent::Text(text) => paralegal_core::types::parse_agent_response(text)
                .map(|response| response.next())
                .map_err(|_| text.clone()),
        }
    }

    async fn auto_select(
        &self,
        current: AgentRole,
        transcript: &[TranscriptEntry],
    ) -> Result<Selection> {
        let allowed = self.graph.allowed(current);
        let Some(&first) = allowed.first() else {
            tracing::warn!(current = %current, "No allowed successor, ending conversation");
            return Ok(Selection::Terminate);
        };

        let chosen = self.auto.choose(current, allowed, transcript).await?;
        let role = if allowed.contains(&chosen) {
            chosen
        } else {
            tracing::warn!(current = %current, chosen = %chosen, "Automatic choice outside graph");
            first
        };

        Ok(Selection::Speaker {
            role,
            strategy: SelectionStrategy::Auto,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paralegal_core::mocks::MockLlm;
    use serde_json::json;

    fn structured(sender: AgentRole, next: &str) -> TranscriptEntry {
        TranscriptEntry {
            sender,
            content: MessageContent::Structured(json!({
                "userquery": {"query": "q", "workplan": ""},
                "query_solved": false,
                "proposed_solve": "",
                "next_speaker": next,
                "next_speaker_question": ""
            })),
            timestamp: 0,
        }
    }

    #[test]
    fn test_default_graph_reaches_proxy_quickly() {
        let graph = TransitionGraph::default();
        assert_eq!(graph.hops(AgentRole::Router, AgentRole::UserProxy), Some(5));
        for role in AgentRole::ALL {
            assert!(graph.hops(role, AgentRole::UserProxy).unwrap() <= 6);
        }
    }

    #[tokio::test]
    async fn test_allowed_request_is_followed() {
        let selector = SpeakerSelector::default();
        let entry = structured(AgentRole::Tax, "question_formulation");
        let selection = selector.select(AgentRole::Tax, &entry, &[]).await.unwrap();
        assert_eq!(
            selection,
            Selection::Speaker {
                role: AgentRole::Reformulator,
                strategy: SelectionStrategy::Declared
            }
        );
    }

    #[tokio::test]
    async fn test_text_is_parsed_strictly() {
        let selector = SpeakerSelector::default();
        let entry = TranscriptEntry::text(
            AgentRole::Retriever,
            r#"{"userquery":{"query":"q","workplan":""},"query_solved":true,"proposed_solve":"hits","next_speaker":"response_agent","next_speaker_question":"go"}"#,
        );
        let selection = selector.select(AgentRole::Retriever, &entry, &[]).await.unwrap();
        assert_eq!(
            selection,
            Selection::Speaker {
                role: AgentRole::Synthesizer,
                strategy: SelectionStrategy::Declared
            }
        );
    }

    #[tokio::test]
    async fn test_disallowed_request_is_contained() {
        let selector = SpeakerSelector::default();
        let entry = structured(AgentRole::Router, "response");
        let selection = selector.select(AgentRole::Router, &entry, &[]).await.unwrap();
        assert_eq!(
            selection,
            Selection::Speaker {
                role: AgentRole::Tax,
                strategy: SelectionStrategy::Auto
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_name_goes_to_auto() {
        let selector = SpeakerSelector::default();
        let entry = structured(AgentRole::Router, "company_law_agent");
        let selection = selector.select(AgentRole::Router, &entry, &[]).await.unwrap();
        assert!(matches!(
            selection,
            Selection::Speaker { role: AgentRole::Tax, strategy: SelectionStrategy::Auto }
        ));
    }

    #[tokio::test]
    async fn test_terminate_sentinel() {
        let selector = SpeakerSelector::default();
        let entry = structured(AgentRole::Synthesizer, "TERMINATE");
        assert_eq!(
            selector.select(AgentRole::Synthesizer, &entry, &[]).await.unwrap(),
            Selection::Terminate
        );
    }

    #[tokio::test]
    async fn test_textual_fallback_ignores_graph() {
        let selector = SpeakerSelector::default();
        let entry = TranscriptEntry::text(
            AgentRole::Router,
            "Passing this to the Information Retrieval agent now.",
        );
        let selection = selector.select(AgentRole::Router, &entry, &[]).await.unwrap();
        assert_eq!(
            selection,
            Selection::Speaker {
                role: AgentRole::Retriever,
                strategy: SelectionStrategy::Textual
            }
        );
    }

    #[tokio::test]
    async fn test_garbage_goes_to_auto() {
        let selector = SpeakerSelector::default();
        let entry = TranscriptEntry::text(AgentRole::Reformulator, "no idea");
        let selection = selector.select(AgentRole::Reformulator, &entry, &[]).await.unwrap();
        assert_eq!(
            selection,
            Selection::Speaker {
                role: AgentRole::Retriever,
                strategy: SelectionStrategy::Auto
            }
        );
    }

    #[tokio::test]
    async fn test_role_without_successors_terminates() {
        let graph = TransitionGraph::with_edges([(AgentRole::Router, vec![])]);
        let selector = SpeakerSelector::new(graph, Arc::new(GraphAutoSpeaker));
        let entry = TranscriptEntry::text(AgentRole::Router, "???");
        assert_eq!(
            selector.select(AgentRole::Router, &entry, &[]).await.unwrap(),
            Selection::Terminate
        );
    }

    #[tokio::test]
    async fn test_llm_auto_speaker_matches_names() {
        let llm = Arc::new(MockLlm::new(["I think the Synthesizer: response should answer."]));
        let auto = LlmAutoSpeaker::new(llm.clone());
        let allowed = [AgentRole::Router, AgentRole::Synthesizer];
        let chosen = auto.choose(AgentRole::UserProxy, &allowed, &[]).await.unwrap();
        assert_eq!(chosen, AgentRole::Synthesizer);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_llm_auto_speaker_falls_back_to_first_allowed() {
        let llm = Arc::new(MockLlm::new(["criminal_law"]));
        let auto = LlmAutoSpeaker::new(llm);
        let allowed = [AgentRole::Router, AgentRole::Synthesizer];
        let chosen = auto.choose(AgentRole::UserProxy, &allowed, &[]).await.unwrap();
        assert_eq!(chosen, AgentRole::Router);
    }

    struct RogueAuto;

    #[async_trait]
    impl AutoSpeaker for RogueAuto {
        async fn choose(
            &self,
            _current: AgentRole,
            _allowed: &[AgentRole],
            _transcript: &[TranscriptEntry],
        ) -> Result<AgentRole> {
            Ok(AgentRole::Synthesizer)
        }
    }

    #[tokio::test]
    async fn test_auto_choice_outside_graph_is_discarded() {
        let selector = SpeakerSelector::new(TransitionGraph::default(), Arc::new(RogueAuto));
        let entry = structured(AgentRole::Router, "response");
        let selection = selector.select(AgentRole::Router, &entry, &[]).await.unwrap();
        assert!(matches!(selection, Selection::Speaker { role: AgentRole::Tax, .. }));
    }
}
