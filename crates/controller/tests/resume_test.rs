use paralegal_controller::DriverBuilder;
use paralegal_core::mocks::{MockLlm, StaticRetriever};
use paralegal_core::traits::SessionStore;
use paralegal_core::types::{AgentRole, Session, TranscriptEntry};
use paralegal_store::InMemorySessionStore;
use serde_json::json;
use std::sync::Arc;

fn reply(proposed: &str, next: &str) -> String {
    json!({
        "userquery": {"query": "Is TDS deducted on HRA?", "workplan": "tax"},
        "query_solved": false,
        "proposed_solve": proposed,
        "next_speaker": next,
        "next_speaker_question": "Continue"
    })
    .to_string()
}

#[tokio::test]
async fn test_resume_keeps_history_bounded() -> anyhow::Result<()> {
    let store = Arc::new(InMemorySessionStore::new());

    // A session that already holds ten messages.
    let mut session = Session::new("client-42", 10);
    for i in 0..10 {
        session
            .history
            .push(TranscriptEntry::text(AgentRole::Synthesizer, format!("earlier answer {i}")));
    }
    store.save(&session).await?;

    let llm = Arc::new(MockLlm::new([
        reply("Tax question", "tax_paralegal"),
        reply("HRA exemption", "question_formulation"),
        reply("House Rent Allowance exemption section 10(13A)", "information_retrieval"),
        reply("HRA is partly exempt under section 10(13A).", "user_proxy"),
    ]));
    let retriever = Arc::new(StaticRetriever::new(vec![StaticRetriever::hit(
        "Section 10(13A). House rent allowance...",
        0.88,
        "ita-1961",
        21,
    )]));

    let driver = DriverBuilder::new()
        .with_llm(llm.clone())
        .with_retriever(retriever)
        .with_session_store(store.clone())
        .build()?;

    let answer = driver.run("Is TDS deducted on HRA?", "client-42").await;
    assert!(!answer.is_error(), "unexpected error: {}", answer.message);
    assert_eq!(answer.turns(), 6);

    // The router saw the replayed history before the new envelope.
    let router_call = &llm.calls()[0];
    assert_eq!(router_call.len(), 1 + 10 + 1 + 1);
    assert!(router_call[1].content.contains("earlier answer 0"));

    let stored = store.load("client-42").await?.expect("session");
    assert_eq!(stored.history.len(), 10);
    assert_eq!(
        stored.history.last().map(|m| m.sender),
        Some(AgentRole::Synthesizer)
    );
    // Oldest messages were evicted first: 6..9 survive ahead of the new run.
    let first = stored.history.iter().next().expect("first message");
    assert_eq!(first.content.to_text(), "earlier answer 6");
    Ok(())
}
