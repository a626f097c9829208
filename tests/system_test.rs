//! End-to-end runs over the on-disk session store and the in-memory corpus.

use paralegal_controller::DriverBuilder;
use paralegal_core::mocks::MockLlm;
use paralegal_core::traits::{LlmClient, Retriever};
use paralegal_core::types::{AgentRole, Termination};
use paralegal_store::{FileSessionStore, SimpleVectorStore};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

fn reply(query: &str, proposed: &str, next: &str) -> String {
    json!({
        "userquery": {"query": query, "workplan": "Salary TDS: tax, reformulate, retrieve, respond"},
        "query_solved": next == "user_proxy",
        "proposed_solve": proposed,
        "next_speaker": next,
        "next_speaker_question": "Continue"
    })
    .to_string()
}

fn script(query: &str, answer: &str) -> Vec<String> {
    vec![
        reply(query, "Tax question", "tax_paralegal"),
        reply(query, "Salary TDS", "question_formulation"),
        reply(query, "tax deducted at source on salary section 192", "information_retrieval"),
        reply(query, answer, "user_proxy"),
    ]
}

async fn corpus(embedder: Arc<dyn LlmClient>) -> anyhow::Result<Arc<SimpleVectorStore>> {
    let store = SimpleVectorStore::new(embedder);
    let docs = [
        ("ita-192", "section 192 tax deducted at source on salary paid by the employer"),
        ("ita-194a", "section 194A interest other than interest on securities"),
        ("wta-3", "wealth tax charge on net wealth of individuals"),
    ];
    for (id, text) in docs {
        let mut metadata = HashMap::new();
        metadata.insert("document_id".to_string(), id.to_string());
        metadata.insert("page".to_string(), "1".to_string());
        store.add_document(id, text, metadata).await?;
    }
    Ok(Arc::new(store))
}

#[tokio::test]
async fn test_answer_cites_best_matching_document() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let query = "What is TDS on salary?";
    let llm = Arc::new(MockLlm::new(script(query, "Section 192 requires the employer to deduct TDS.")));
    let retriever = corpus(llm.clone()).await?;

    let hits = retriever
        .search("tax deducted at source on salary section 192", 1)
        .await?;
    assert_eq!(hits[0].metadata["document_id"], "ita-192");

    let driver = DriverBuilder::new()
        .with_llm(llm.clone())
        .with_retriever(retriever)
        .with_session_store(Arc::new(FileSessionStore::new(dir.path())?))
        .build()?;

    let answer = driver.run(query, "client-42").await;
    assert_eq!(answer.message, "Section 192 requires the employer to deduct TDS.");

    let history = answer.agent_history.expect("history");
    assert_eq!(history.termination, Termination::Completed);
    let retrieval = history
        .messages
        .iter()
        .find(|m| m.sender == AgentRole::Retriever)
        .expect("retrieval turn")
        .content
        .agent_response()?;
    assert!(retrieval.query_solved);
    assert!(retrieval.proposed_solve.starts_with("1. [doc: ita-192"));

    // The synthesizer saw the retrieved passages.
    let synth_call = llm.calls().last().cloned().expect("synthesizer call");
    assert!(synth_call.iter().any(|m| m.content.contains("ita-192")));
    Ok(())
}

#[tokio::test]
async fn test_session_survives_restart() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    let first = "What is TDS on salary?";
    let llm = Arc::new(MockLlm::new(script(first, "Deducted under section 192.")));
    let driver = DriverBuilder::new()
        .with_llm(llm.clone())
        .with_retriever(corpus(llm).await?)
        .with_session_store(Arc::new(FileSessionStore::new(dir.path())?))
        .build()?;
    assert!(!driver.run(first, "client-42").await.is_error());
    drop(driver);

    // A new process reading the same directory.
    let second = "Does it apply to pensions?";
    let llm = Arc::new(MockLlm::new(script(second, "Pensions are salary under section 17.")));
    let driver = DriverBuilder::new()
        .with_llm(llm.clone())
        .with_retriever(corpus(llm.clone()).await?)
        .with_session_store(Arc::new(FileSessionStore::new(dir.path())?))
        .build()?;
    let answer = driver.run(second, "client-42").await;
    assert_eq!(answer.message, "Pensions are salary under section 17.");

    // The router was shown the first exchange.
    let router_call = &llm.calls()[0];
    assert!(router_call.iter().any(|m| m.content.contains("Deducted under section 192.")));

    let stored = driver.cache().get("client-42").await?;
    assert_eq!(stored.len(), 10);
    Ok(())
}
