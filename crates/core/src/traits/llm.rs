//! Model gateway traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::types::extract_json;

/// LLM client interface.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion.
    async fn complete(&self, prompt: &str) -> Result<LlmResponse>;

    /// Generate a chat completion.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse>;

    /// Generate embeddings for text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate a JSON value shaped by `schema`.
    ///
    /// The schema is placed in the prompt and the reply is decoded as JSON.
    /// Conformance to the schema is left to the caller; output that is not
    /// JSON at all fails with [`Error::Parse`](crate::Error::Parse).
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<Value> {
        let response = self
            .chat(&[
                ChatMessage::system("You reply with a single JSON object and nothing else."),
                ChatMessage::user(format!("{}\n\nJSON Schema:\n{}", prompt, schema)),
            ])
            .await?;
        Ok(extract_json(&response.content)?)
    }
}

/// Chat message for LLM interactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role (system, user, assistant).
    pub role: String,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".into(), content: content.into() }
    }
}

/// Response from an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated content.
    pub content: String,
    /// Finish reason.
    pub finish_reason: String,
    /// Token usage.
    pub usage: LlmUsage,
}

/// Token usage from LLM call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Prompt tokens.
    pub prompt_tokens: u64,
    /// Completion tokens.
    pub completion_tokens: u64,
    /// Total tokens.
    pub total_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockLlm;
    use crate::Error;
    use serde_json::json;

    fn schema() -> Value {
        json!({"type": "object", "properties": {"section": {"type": "string"}}})
    }

    #[tokio::test]
    async fn test_generate_decodes_fenced_json() {
        let llm = MockLlm::new(["```json\n{\"section\": \"192\"}\n```"]);
        let value = llm.generate("Which section covers TDS on salary?", &schema()).await.unwrap();
        assert_eq!(value, json!({"section": "192"}));

        let calls = llm.calls();
        assert_eq!(calls[0][0].role, "system");
        assert!(calls[0][1].content.starts_with("Which section covers TDS on salary?"));
        assert!(calls[0][1].content.contains("\"section\""));
    }

    #[tokio::test]
    async fn test_generate_rejects_plain_text() {
        let llm = MockLlm::new(["Section 192."]);
        let result = llm.generate("Which section?", &schema()).await;
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[tokio::test]
    async fn test_generate_propagates_model_errors() {
        let llm = MockLlm::new(Vec::<String>::new());
        let result = llm.generate("Which section?", &schema()).await;
        assert!(matches!(result, Err(Error::ModelProvider(_))));
    }
}
