use async_trait::async_trait;
use paralegal_controller::{DriverBuilder, TransitionGraph, TurnContext, TurnExecutor, NO_ANSWER};
use paralegal_core::config::OrchestratorConfig;
use paralegal_core::types::{AgentRole, MessageContent, Termination};
use paralegal_core::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// An agent that never follows the message contract.
#[derive(Default)]
struct Babbler {
    turns: AtomicUsize,
}

#[async_trait]
impl TurnExecutor for Babbler {
    async fn execute(&self, ctx: TurnContext<'_>) -> Result<MessageContent> {
        self.turns.fetch_add(1, Ordering::SeqCst);
        Ok(MessageContent::Text(format!("{} has no idea", ctx.agent.name())))
    }
}

fn cyclic_graph() -> TransitionGraph {
    TransitionGraph::with_edges([
        (AgentRole::Router, vec![AgentRole::Tax]),
        (AgentRole::Tax, vec![AgentRole::Router]),
    ])
}

#[tokio::test]
async fn test_round_cap_bounds_misbehaving_agents() -> anyhow::Result<()> {
    let executor = Arc::new(Babbler::default());
    let driver = DriverBuilder::new()
        .with_executor(executor.clone())
        .with_graph(cyclic_graph())
        .with_config(OrchestratorConfig {
            round_cap: 7,
            reply_cap: 100,
            ..OrchestratorConfig::default()
        })
        .build()?;

    let answer = driver.run("What is TDS on salary?", "loop").await;

    assert_eq!(executor.turns.load(Ordering::SeqCst), 7);
    let history = answer.agent_history.expect("history");
    assert_eq!(history.termination, Termination::RoundCap);
    assert_eq!(history.messages.len(), 8);
    assert_eq!(answer.message, NO_ANSWER);
    Ok(())
}

#[tokio::test]
async fn test_reply_cap_stops_repeating_agent() -> anyhow::Result<()> {
    let executor = Arc::new(Babbler::default());
    let driver = DriverBuilder::new()
        .with_executor(executor.clone())
        .with_graph(cyclic_graph())
        .with_config(OrchestratorConfig {
            reply_cap: 2,
            ..OrchestratorConfig::default()
        })
        .build()?;

    let answer = driver.run("What is TDS on salary?", "loop").await;

    assert_eq!(executor.turns.load(Ordering::SeqCst), 4);
    assert_eq!(
        answer.agent_history.map(|h| h.termination),
        Some(Termination::ReplyCap)
    );
    Ok(())
}

#[tokio::test]
async fn test_default_graph_reaches_proxy_with_babbling_agents() -> anyhow::Result<()> {
    let executor = Arc::new(Babbler::default());
    let driver = DriverBuilder::new().with_executor(executor.clone()).build()?;

    let answer = driver.run("What is TDS on salary?", "babble").await;

    // Every unreadable message is routed along the graph to the proxy.
    assert_eq!(executor.turns.load(Ordering::SeqCst), 5);
    assert_eq!(
        answer.agent_history.as_ref().map(|h| h.termination),
        Some(Termination::Completed)
    );
    assert_eq!(answer.message, "response has no idea");
    Ok(())
}
