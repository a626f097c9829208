//! Mock implementations of core traits for testing.
//!
//! These mocks never touch the network and can be shared by unit and
//! integration tests across the workspace.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::{
    traits::{ChatMessage, LlmClient, LlmResponse, LlmUsage, Retriever, SearchHit, SessionStore},
    types::Session,
    Error, Result,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Mock LLM Client
// =============================================================================

/// Scripted mock LLM that returns predefined responses in order.
///
/// Once the script is exhausted every call fails with a model provider error,
/// unless the mock was built with [`MockLlm::constant`].
pub struct MockLlm {
    responses: Mutex<VecDeque<String>>,
    repeat: Option<String>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockLlm {
    /// Create a new mock LLM with a queue of responses.
    pub fn new<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            repeat: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn constant(response: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            repeat: Some(response.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Get the number of calls made to this mock.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Messages received by each call, in order.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        lock(&self.calls).clone()
    }

    fn next_response(&self) -> Result<String> {
        if let Some(next) = lock(&self.responses).pop_front() {
            return Ok(next);
        }
        self.repeat
            .clone()
            .ok_or_else(|| Error::model_provider("mock LLM script exhausted"))
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse> {
        self.chat(&[ChatMessage::user(prompt)]).await
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        lock(&self.calls).push(messages.to_vec());
        let content = self.next_response()?;

        Ok(LlmResponse {
            content,
            finish_reason: "stop".to_string(),
            usage: LlmUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            },
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hashed_embedding(text, 64))
    }
}

/// Deterministic bag-of-words embedding: texts sharing words score closer.
pub fn hashed_embedding(text: &str, dims: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dims.max(1)];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let bucket = word
            .to_lowercase()
            .bytes()
            .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
        let len = vector.len();
        vector[bucket % len] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

// =============================================================================
// Mock Retriever
// =============================================================================

/// Retriever returning a fixed set of hits and recording every query.
#[derive(Default)]
pub struct StaticRetriever {
    hits: Vec<SearchHit>,
    fail: bool,
    queries: Mutex<Vec<(String, usize)>>,
}

impl StaticRetriever {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    /// A retriever whose every search fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Build a hit with `document_id` and `page` metadata.
    pub fn hit(content: &str, score: f32, document_id: &str, page: u32) -> SearchHit {
        let mut metadata = HashMap::new();
        metadata.insert("document_id".to_string(), document_id.to_string());
        metadata.insert("page".to_string(), page.to_string());
        SearchHit {
            content: content.to_string(),
            score,
            metadata,
        }
    }

    /// `(text, top_k)` pairs received so far.
    pub fn queries(&self) -> Vec<(String, usize)> {
        lock(&self.queries).clone()
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn search(&self, text: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        lock(&self.queries).push((text.to_string(), top_k));
        if self.fail {
            return Err(Error::retrieval("vector store unavailable"));
        }
        Ok(self.hits.iter().take(top_k).cloned().collect())
    }
}

// =============================================================================
// Mock Session Store
// =============================================================================

/// In-memory session store that counts writes and can be switched to fail.
#[derive(Default)]
pub struct MockSessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    saves: Mutex<usize>,
    unavailable: bool,
}

impl MockSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose backend is down.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        *lock(&self.saves)
    }

    fn check(&self) -> Result<()> {
        if self.unavailable {
            return Err(Error::storage("session backend unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn save(&self, session: &Session) -> Result<()> {
        self.check()?;
        lock(&self.sessions).insert(session.id.clone(), session.clone());
        *lock(&self.saves) += 1;
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Session>> {
        self.check()?;
        Ok(lock(&self.sessions).get(session_id).cloned())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.check()?;
        lock(&self.sessions).remove(session_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        self.check()?;
        Ok(lock(&self.sessions).keys().cloned().collect())
    }
}
