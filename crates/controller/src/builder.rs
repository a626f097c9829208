//! Builder for ConversationDriver.

use std::sync::Arc;

use paralegal_core::{
    config::OrchestratorConfig,
    traits::{LlmClient, Retriever, SessionStore},
    Error, Result,
};
use paralegal_store::{InMemorySessionStore, SessionCache};

use crate::driver::ConversationDriver;
use crate::executor::{LlmTurnExecutor, TurnExecutor};
use crate::normalize::Normalizer;
use crate::registry::AgentSpec;
use crate::selector::{AutoSpeaker, GraphAutoSpeaker, LlmAutoSpeaker, SpeakerSelector, TransitionGraph};

/// Builder for constructing a ConversationDriver.
pub struct DriverBuilder {
    config: OrchestratorConfig,
    ttl_secs: u64,
    llm: Option<Arc<dyn LlmClient>>,
    retriever: Option<Arc<dyn Retriever>>,
    executor: Option<Arc<dyn TurnExecutor>>,
    session_store: Option<Arc<dyn SessionStore>>,
    cache: Option<Arc<SessionCache>>,
    graph: TransitionGraph,
    auto_speaker: Option<Arc<dyn AutoSpeaker>>,
    overrides: Vec<AgentSpec>,
}

impl Default for DriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: OrchestratorConfig::default(),
            ttl_secs: 0,
            llm: None,
            retriever: None,
            executor: None,
            session_store: None,
            cache: None,
            graph: TransitionGraph::default(),
            auto_speaker: None,
            overrides: Vec::new(),
        }
    }

    /// Set caps, history bound and retrieval depth.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Idle time after which a session is discarded (0 disables).
    pub fn with_session_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Set the LLM client used for turns, speaker choice and normalisation.
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Set the corpus searched by the retrieval agent.
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Replace the LLM executor, e.g. with a scripted one.
    pub fn with_executor(mut self, executor: Arc<dyn TurnExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Persist sessions in `store`.
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Share an existing cache; takes precedence over a session store.
    pub fn with_cache(mut self, cache: Arc<SessionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_graph(mut self, graph: TransitionGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_auto_speaker(mut self, auto: Arc<dyn AutoSpeaker>) -> Self {
        self.auto_speaker = Some(auto);
        self
    }

    /// Override agent prompts or descriptions. Overrides are validated when
    /// the agents are registered at the start of each run.
    pub fn with_overrides(mut self, overrides: Vec<AgentSpec>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Build the driver.
    pub fn build(self) -> Result<ConversationDriver> {
        if self.config.round_cap == 0 {
            return Err(Error::configuration("round_cap must be at least 1"));
        }

        let executor: Arc<dyn TurnExecutor> = match (self.executor, &self.llm) {
            (Some(executor), _) => executor,
            (None, Some(llm)) => {
                let mut executor =
                    LlmTurnExecutor::new(llm.clone()).with_top_k(self.config.retrieval_top_k);
                if let Some(retriever) = self.retriever {
                    executor = executor.with_retriever(retriever);
                }
                Arc::new(executor)
            }
            (None, None) => {
                return Err(Error::configuration(
                    "an LLM client or a turn executor is required",
                ))
            }
        };

        let auto: Arc<dyn AutoSpeaker> = match (self.auto_speaker, &self.llm) {
            (Some(auto), _) => auto,
            (None, Some(llm)) => Arc::new(LlmAutoSpeaker::new(llm.clone())),
            (None, None) => Arc::new(GraphAutoSpeaker),
        };

        let normalizer = match &self.llm {
            Some(llm) => Normalizer::new(llm.clone()),
            None => Normalizer::passthrough(),
        };

        let cache = match self.cache {
            Some(cache) => cache,
            None => {
                let store = self
                    .session_store
                    .unwrap_or_else(|| Arc::new(InMemorySessionStore::new()));
                Arc::new(
                    SessionCache::new(store)
                        .with_bound(self.config.history_bound)
                        .with_ttl(self.ttl_secs),
                )
            }
        };

        tracing::debug!(
            round_cap = self.config.round_cap,
            reply_cap = self.config.reply_cap,
            history_bound = cache.bound(),
            "Conversation driver built"
        );

        Ok(ConversationDriver::new(
            self.overrides,
            SpeakerSelector::new(self.graph, auto),
            executor,
            cache,
            normalizer,
            self.config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paralegal_core::mocks::MockLlm;

    #[test]
    fn test_build_requires_llm_or_executor() {
        assert!(matches!(
            DriverBuilder::new().build(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_build_with_llm() {
        let driver = DriverBuilder::new()
            .with_llm(Arc::new(MockLlm::constant("{}")))
            .build()
            .unwrap();
        assert_eq!(driver.register_agents().unwrap().len(), 6);
        assert_eq!(driver.cache().bound(), 10);
    }

    #[test]
    fn test_zero_round_cap_rejected() {
        let config = OrchestratorConfig {
            round_cap: 0,
            ..OrchestratorConfig::default()
        };
        let result = DriverBuilder::new()
            .with_llm(Arc::new(MockLlm::constant("{}")))
            .with_config(config)
            .build();
        assert!(result.is_err());
    }
}
