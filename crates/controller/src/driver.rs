//! Conversation driver.
//!
//! Runs one question through the agent group: seeds the exchange with the
//! user's envelope, alternates turns and speaker selection until the group
//! closes or a cap is hit, persists the transcript and extracts the answer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use paralegal_core::{
    config::OrchestratorConfig,
    types::{
        AgentHistory, AgentRole, Answer, IndividualAgentResponse, Query, Termination,
        TranscriptEntry,
    },
    Result,
};
use paralegal_governance::{redact, track_run, track_selection, track_turn};
use paralegal_store::SessionCache;

use crate::executor::{TurnContext, TurnExecutor};
use crate::normalize::Normalizer;
use crate::registry::{AgentRegistry, AgentSpec};
use crate::selector::{Selection, SpeakerSelector};

/// Message returned when no agent produced an answer.
pub const NO_ANSWER: &str =
    "Sorry, we could not process your question. Please try again with more details.";

/// Drives conversations between the registered agents.
pub struct ConversationDriver {
    overrides: Vec<AgentSpec>,
    selector: SpeakerSelector,
    executor: Arc<dyn TurnExecutor>,
    cache: Arc<SessionCache>,
    normalizer: Normalizer,
    config: OrchestratorConfig,
}

impl ConversationDriver {
    pub(crate) fn new(
        overrides: Vec<AgentSpec>,
        selector: SpeakerSelector,
        executor: Arc<dyn TurnExecutor>,
        cache: Arc<SessionCache>,
        normalizer: Normalizer,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            overrides,
            selector,
            executor,
            cache,
            normalizer,
            config,
        }
    }

    /// Build the agent set for one run.
    pub fn register_agents(&self) -> Result<AgentRegistry> {
        AgentRegistry::with_overrides(self.overrides.clone(), self.config.reply_cap)
    }

    pub fn cache(&self) -> &Arc<SessionCache> {
        &self.cache
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Answer a one-off question in a fresh session.
    pub async fn ask(&self, query: &str) -> Answer {
        let session_id = uuid::Uuid::new_v4().to_string();
        self.run(query, &session_id).await
    }

    /// Answer a question within a session.
    ///
    /// Never fails: errors are reported in the returned [`Answer`] along with
    /// the transcript produced before the failure.
    pub async fn run(&self, query: &str, session_id: &str) -> Answer {
        let span = tracing::info_span!("conversation", session_id = %session_id);
        self.run_exclusive(query, session_id).instrument(span).await
    }

    async fn run_exclusive(&self, query: &str, session_id: &str) -> Answer {
        let started = Instant::now();
        let _guard = self.cache.lock(session_id).await;
        tracing::info!(query = %redact(query), "Conversation started");

        let mut transcript = Vec::new();
        let answer = match self.converse(query, session_id, &mut transcript).await {
            Ok((message, termination)) => {
                tracing::info!(
                    turns = transcript.len(),
                    termination = termination.as_str(),
                    "Conversation finished"
                );
                Answer {
                    message,
                    agent_history: Some(AgentHistory {
                        messages: transcript,
                        termination,
                        error: None,
                    }),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, turns = transcript.len(), "Conversation failed");
                Answer {
                    message: format!("I'm sorry, I could not answer your question: {}", e),
                    agent_history: Some(AgentHistory {
                        messages: transcript,
                        termination: Termination::Failed,
                        error: Some(e.to_string()),
                    }),
                }
            }
        };

        let termination = answer
            .agent_history
            .as_ref()
            .map_or(Termination::Failed, |h| h.termination);
        track_run(
            termination.as_str(),
            answer.turns(),
            started.elapsed().as_secs_f64(),
        );
        answer
    }

    async fn converse(
        &self,
        query: &str,
        session_id: &str,
        transcript: &mut Vec<TranscriptEntry>,
    ) -> Result<(String, Termination)> {
        let registry = self.register_agents()?;
        let mut session = self.cache.session(session_id).await?;
        let prior = session.history.recent(self.config.resume_window);
        if !prior.is_empty() {
            tracing::info!(replayed = prior.len(), "Resuming session");
        }

        let mut query = Query::new(query);
        transcript.push(TranscriptEntry::structured(
            AgentRole::UserProxy,
            &IndividualAgentResponse::envelope(query.clone()),
        ));

        let termination = self.drive(&registry, prior, &mut query, transcript).await?;

        for entry in transcript.iter() {
            session.history.push(entry.clone());
        }
        session
            .context_variables
            .insert("userquery".to_string(), serde_json::to_value(&query)?);
        self.cache.save(&mut session).await?;

        let Some(last) = transcript
            .iter()
            .rev()
            .find(|entry| entry.sender == AgentRole::Synthesizer)
        else {
            tracing::warn!(termination = termination.as_str(), "No answer was produced");
            return Ok((NO_ANSWER.to_string(), termination));
        };

        let normalized = self.normalizer.normalize(&last.content, &query).await?;
        Ok((normalized.message().to_string(), termination))
    }

    /// The turn loop. Appends every executed turn to `transcript`.
    async fn drive(
        &self,
        registry: &AgentRegistry,
        prior: Vec<TranscriptEntry>,
        query: &mut Query,
        transcript: &mut Vec<TranscriptEntry>,
    ) -> Result<Termination> {
        // What agents see: replayed history, then this run.
        let mut context = prior;
        context.extend(transcript.iter().cloned());

        let mut current = AgentRole::Router;
        let mut turns = 0usize;
        let mut replies: HashMap<AgentRole, usize> = HashMap::new();

        loop {
            if current == AgentRole::UserProxy {
                return Ok(Termination::Completed);
            }
            if turns >= self.config.round_cap {
                tracing::warn!(round_cap = self.config.round_cap, "Round cap reached");
                return Ok(Termination::RoundCap);
            }

            let agent = registry.get(current)?;
            let given = replies.entry(current).or_default();
            if *given >= agent.reply_cap {
                tracing::warn!(agent = %current, reply_cap = agent.reply_cap, "Reply cap reached");
                return Ok(Termination::ReplyCap);
            }
            *given += 1;
            turns += 1;

            tracing::debug!(agent = %current, turn = turns, "Agent turn");
            let content = self
                .executor
                .execute(TurnContext {
                    agent,
                    history: &context,
                    query: &*query,
                })
                .await?;
            track_turn(agent.name());

            if let Ok(response) = content.agent_response() {
                let workplan = response.userquery.workplan;
                if !workplan.trim().is_empty() && workplan != query.workplan {
                    tracing::debug!(agent = %current, "Workplan updated");
                    query.workplan = workplan;
                }
            }

            let entry = TranscriptEntry::new(current, content);
            transcript.push(entry.clone());
            context.push(entry);

            let last = &context[context.len() - 1];
            match self.selector.select(current, last, &context).await? {
                Selection::Terminate => {
                    track_selection("terminate");
                    tracing::info!(agent = %current, "Termination requested");
                    return Ok(Termination::Sentinel);
                }
                Selection::Speaker { role, strategy } => {
                    track_selection(strategy.as_str());
                    tracing::debug!(
                        from = %current,
                        to = %role,
                        strategy = strategy.as_str(),
                        "Next speaker selected"
                    );
                    current = role;
                }
            }
        }
    }
}
