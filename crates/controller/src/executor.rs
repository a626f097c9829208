//! Turn execution.
//!
//! A [`TurnExecutor`] produces one agent's message given the conversation so
//! far. The driver only sees the trait, so tests can script turns without
//! any network access.

use async_trait::async_trait;
use std::sync::Arc;

use paralegal_core::{
    traits::{ChatMessage, LlmClient, Retriever, SearchHit},
    types::{
        parse_agent_response, AgentRole, IndividualAgentResponse, MessageContent, Query,
        TranscriptEntry,
    },
    Error, Result,
};

use crate::registry::Agent;

/// Hits requested from the retriever unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 12;

/// Everything an agent needs to take its turn.
pub struct TurnContext<'a> {
    /// The agent speaking.
    pub agent: &'a Agent,
    /// Replayed session history followed by this run's transcript.
    pub history: &'a [TranscriptEntry],
    /// The user's question with the current workplan.
    pub query: &'a Query,
}

impl TurnContext<'_> {
    /// Most recent well-formed agent response in the history.
    fn last_response(&self) -> Option<IndividualAgentResponse> {
        self.history
            .iter()
            .rev()
            .find_map(|entry| entry.content.agent_response().ok())
    }
}

/// Produces one agent's reply.
#[async_trait]
pub trait TurnExecutor: Send + Sync {
    async fn execute(&self, ctx: TurnContext<'_>) -> Result<MessageContent>;
}

// =============================================================================
// LLM Executor
// =============================================================================

/// Executes turns with an LLM; the retrieval agent searches the corpus
/// directly instead of calling the model.
pub struct LlmTurnExecutor {
    llm: Arc<dyn LlmClient>,
    retriever: Option<Arc<dyn Retriever>>,
    top_k: usize,
}

impl LlmTurnExecutor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            retriever: None,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Chat transcript for the model: the agent's own messages become
    /// assistant turns, everything else is attributed user input.
    fn build_messages(ctx: &TurnContext<'_>) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(ctx.history.len() + 2);
        messages.push(ChatMessage::system(&ctx.agent.system_prompt));

        for entry in ctx.history {
            let text = entry.content.to_text();
            if entry.sender == ctx.agent.role {
                messages.push(ChatMessage::assistant(text));
            } else {
                messages.push(ChatMessage::user(format!("{}: {}", entry.sender, text)));
            }
        }

        let instruction = ctx
            .last_response()
            .map(|r| r.next_speaker_question)
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| format!("Answer the question: {}", ctx.query.query));
        messages.push(ChatMessage::user(format!(
            "{}, it is your turn. {}",
            ctx.agent.name(),
            instruction
        )));
        messages
    }

    async fn llm_turn(&self, ctx: &TurnContext<'_>) -> Result<MessageContent> {
        let messages = Self::build_messages(ctx);
        let response = self.llm.chat(&messages).await?;

        paralegal_governance::track_tokens(
            ctx.agent.name(),
            response.usage.prompt_tokens,
            response.usage.completion_tokens,
        );

        match parse_agent_response(&response.content) {
            Ok(parsed) => Ok(MessageContent::Structured(serde_json::to_value(&parsed)?)),
            Err(e) => {
                tracing::debug!(agent = %ctx.agent.role, error = %e, "Reply is not a structured response");
                Ok(MessageContent::Text(response.content))
            }
        }
    }

    async fn retrieval_turn(&self, ctx: &TurnContext<'_>) -> Result<MessageContent> {
        let retriever = self
            .retriever
            .as_ref()
            .ok_or_else(|| Error::retrieval("no retriever configured"))?;

        // Search with the reformulated question when there is one.
        let search_text = ctx
            .last_response()
            .map(|r| r.proposed_solve)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| ctx.query.query.clone());

        let hits = retriever.search(&search_text, self.top_k).await?;
        tracing::info!(hits = hits.len(), top_k = self.top_k, "Corpus searched");

        let response = IndividualAgentResponse {
            userquery: ctx.query.clone(),
            query_solved: !hits.is_empty(),
            proposed_solve: format_hits(&hits),
            next_speaker: AgentRole::Synthesizer.name().to_string(),
            next_speaker_question:
                "Please synthesize these search results into a comprehensive answer".to_string(),
        };
        Ok(MessageContent::Structured(serde_json::to_value(&response)?))
    }
}

#[async_trait]
impl TurnExecutor for LlmTurnExecutor {
    async fn execute(&self, ctx: TurnContext<'_>) -> Result<MessageContent> {
        match ctx.agent.role {
            AgentRole::Retriever => self.retrieval_turn(&ctx).await,
            _ => self.llm_turn(&ctx).await,
        }
    }
}

/// Render hits as numbered passages with their source.
pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No relevant passages found.".to_string();
    }

    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let doc = hit.metadata.get("document_id").map_or("unknown", String::as_str);
            let page = hit.metadata.get("page").map_or("-", String::as_str);
            format!(
                "{}. [doc: {}, page: {}, score: {:.3}] {}",
                i + 1,
                doc,
                page,
                hit.score,
                hit.content.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AgentRegistry;
    use paralegal_core::mocks::{MockLlm, StaticRetriever};

    fn tax_reply() -> String {
        r#"{"userquery":{"query":"What is TDS on salary?","workplan":"tax"},"query_solved":false,"proposed_solve":"Tax question","next_speaker":"question_formulation","next_speaker_question":"Reformulate for search"}"#.to_string()
    }

    #[tokio::test]
    async fn test_llm_turn_parses_structured_reply() {
        let llm = Arc::new(MockLlm::new([tax_reply()]));
        let executor = LlmTurnExecutor::new(llm.clone());
        let registry = AgentRegistry::register_all(20).unwrap();
        let query = Query::new("What is TDS on salary?");
        let history = vec![TranscriptEntry::structured(
            AgentRole::UserProxy,
            &IndividualAgentResponse::envelope(query.clone()),
        )];

        let content = executor
            .execute(TurnContext {
                agent: registry.get(AgentRole::Tax).unwrap(),
                history: &history,
                query: &query,
            })
            .await
            .unwrap();

        let response = content.agent_response().unwrap();
        assert_eq!(response.next_speaker, "question_formulation");

        let calls = llm.calls();
        assert_eq!(calls[0][0].role, "system");
        assert!(calls[0][1].content.starts_with("user_proxy: "));
        assert!(calls[0].last().unwrap().content.contains("categorise"));
    }

    #[tokio::test]
    async fn test_llm_turn_keeps_free_text() {
        let llm = Arc::new(MockLlm::new(["Over to Question Formulation."]));
        let executor = LlmTurnExecutor::new(llm);
        let registry = AgentRegistry::register_all(20).unwrap();
        let query = Query::new("q");

        let content = executor
            .execute(TurnContext {
                agent: registry.get(AgentRole::Tax).unwrap(),
                history: &[],
                query: &query,
            })
            .await
            .unwrap();
        assert_eq!(content, MessageContent::Text("Over to Question Formulation.".into()));
    }

    #[tokio::test]
    async fn test_retrieval_turn_searches_reformulated_question() {
        let llm = Arc::new(MockLlm::new(Vec::<String>::new()));
        let retriever = Arc::new(StaticRetriever::new(vec![
            StaticRetriever::hit("Section 192: TDS on salary", 0.91, "ita-1961", 143),
        ]));
        let executor = LlmTurnExecutor::new(llm.clone()).with_retriever(retriever.clone());
        let registry = AgentRegistry::register_all(20).unwrap();
        let query = Query::new("What is TDS on salary?");

        let mut reformulated = IndividualAgentResponse::envelope(query.clone());
        reformulated.proposed_solve = "Tax Deducted at Source on salary section 192".into();
        let history = vec![TranscriptEntry::structured(AgentRole::Reformulator, &reformulated)];

        let content = executor
            .execute(TurnContext {
                agent: registry.get(AgentRole::Retriever).unwrap(),
                history: &history,
                query: &query,
            })
            .await
            .unwrap();

        let response = content.agent_response().unwrap();
        assert!(response.query_solved);
        assert_eq!(response.next_speaker, "response");
        assert!(response.proposed_solve.contains("[doc: ita-1961, page: 143"));
        assert_eq!(
            retriever.queries(),
            vec![("Tax Deducted at Source on salary section 192".to_string(), 12)]
        );
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_retrieval_turn_without_hits() {
        let executor = LlmTurnExecutor::new(Arc::new(MockLlm::new(Vec::<String>::new())))
            .with_retriever(Arc::new(StaticRetriever::new(vec![])));
        let registry = AgentRegistry::register_all(20).unwrap();
        let query = Query::new("q");

        let content = executor
            .execute(TurnContext {
                agent: registry.get(AgentRole::Retriever).unwrap(),
                history: &[],
                query: &query,
            })
            .await
            .unwrap();
        assert!(!content.agent_response().unwrap().query_solved);
    }

    #[tokio::test]
    async fn test_retrieval_failure_propagates() {
        let executor = LlmTurnExecutor::new(Arc::new(MockLlm::new(Vec::<String>::new())))
            .with_retriever(Arc::new(StaticRetriever::failing()));
        let registry = AgentRegistry::register_all(20).unwrap();
        let query = Query::new("q");

        let result = executor
            .execute(TurnContext {
                agent: registry.get(AgentRole::Retriever).unwrap(),
                history: &[],
                query: &query,
            })
            .await;
        assert!(matches!(result, Err(Error::Retrieval(_))));
    }
}
