//! Rig LLM client adapter.
//!
//! Wraps Rig's provider agents for integration with our LlmClient trait.

use async_trait::async_trait;

use paralegal_core::{
    traits::{ChatMessage, LlmClient, LlmResponse, LlmUsage},
    Error, Result,
};

// Import required Rig traits
use rig::client::{CompletionClient, EmbeddingsClient, ProviderClient};
use rig::completion::Prompt;
use rig::embeddings::{EmbeddingModel, EmbeddingsBuilder};

/// Provider type for Rig clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigProvider {
    OpenAI,
    Anthropic,
    Gemini,
}

impl RigProvider {
    /// Environment variable holding the provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl std::str::FromStr for RigProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(Error::configuration(format!(
                "Unsupported model provider: {}",
                other
            ))),
        }
    }
}

/// Configuration for Rig client.
#[derive(Debug, Clone)]
pub struct RigConfig {
    /// Provider to use.
    pub provider: RigProvider,
    /// Model name.
    pub model: String,
    /// Embedding model name; provider default when unset.
    pub embedding_model: Option<String>,
    /// Temperature (0.0 - 1.0).
    pub temperature: Option<f64>,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self::gemini("gemini-2.0-flash")
    }
}

impl RigConfig {
    fn with_provider(provider: RigProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            embedding_model: None,
            temperature: Some(0.2),
        }
    }

    /// Create config for OpenAI.
    pub fn openai(model: impl Into<String>) -> Self {
        Self::with_provider(RigProvider::OpenAI, model)
    }

    /// Create config for Anthropic.
    pub fn anthropic(model: impl Into<String>) -> Self {
        Self::with_provider(RigProvider::Anthropic, model)
    }

    /// Create config for Google Gemini.
    pub fn gemini(model: impl Into<String>) -> Self {
        Self::with_provider(RigProvider::Gemini, model)
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set the embedding model.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }
}

/// Rig-based LLM client.
///
/// System messages become the agent preamble; the remaining turns are
/// flattened into a single role-tagged prompt.
pub struct RigLlmClient {
    config: RigConfig,
}

impl RigLlmClient {
    /// Create a new Rig client with the given configuration.
    pub fn new(config: RigConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    fn require_key(&self, provider: RigProvider) -> Result<()> {
        // Rig's from_env panics on a missing key.
        let var = provider.api_key_var();
        if std::env::var(var).is_err() {
            return Err(Error::model_provider(format!("{} not set", var)));
        }
        Ok(())
    }

    /// Split messages into (preamble, prompt).
    fn build_prompt(&self, messages: &[ChatMessage]) -> (Option<String>, String) {
        let mut preamble: Vec<&str> = Vec::new();
        let mut prompt = String::new();

        for msg in messages {
            match msg.role.as_str() {
                "system" => preamble.push(&msg.content),
                "user" => prompt.push_str(&format!("User: {}\n\n", msg.content)),
                "assistant" => prompt.push_str(&format!("Assistant: {}\n\n", msg.content)),
                _ => prompt.push_str(&format!("{}: {}\n\n", msg.role, msg.content)),
            }
        }

        let preamble = (!preamble.is_empty()).then(|| preamble.join("\n\n"));
        (preamble, prompt)
    }

    fn response(prompt: &str, preamble: Option<&str>, content: String) -> LlmResponse {
        let prompt_len = prompt.len() + preamble.map_or(0, str::len);
        LlmResponse {
            finish_reason: "stop".to_string(),
            usage: LlmUsage {
                prompt_tokens: (prompt_len / 4) as u64,
                completion_tokens: (content.len() / 4) as u64,
                total_tokens: ((prompt_len + content.len()) / 4) as u64,
            },
            content,
        }
    }

    /// Call OpenAI via Rig.
    async fn call_openai(&self, preamble: Option<&str>, prompt: &str) -> Result<String> {
        use rig::providers::openai;
        self.require_key(RigProvider::OpenAI)?;

        let client = openai::Client::from_env();
        let mut agent_builder = client.agent(&self.config.model);
        if let Some(system) = preamble {
            agent_builder = agent_builder.preamble(system);
        }
        if let Some(temperature) = self.config.temperature {
            agent_builder = agent_builder.temperature(temperature);
        }

        agent_builder
            .build()
            .prompt(prompt)
            .await
            .map_err(|e| Error::model_provider(format!("OpenAI error: {}", e)))
    }

    /// Call Anthropic via Rig.
    async fn call_anthropic(&self, preamble: Option<&str>, prompt: &str) -> Result<String> {
        use rig::providers::anthropic;
        self.require_key(RigProvider::Anthropic)?;

        let client = anthropic::Client::from_env();
        let mut agent_builder = client.agent(&self.config.model);
        if let Some(system) = preamble {
            agent_builder = agent_builder.preamble(system);
        }
        if let Some(temperature) = self.config.temperature {
            agent_builder = agent_builder.temperature(temperature);
        }

        agent_builder
            .build()
            .prompt(prompt)
            .await
            .map_err(|e| Error::model_provider(format!("Anthropic error: {}", e)))
    }

    /// Call Gemini via Rig.
    async fn call_gemini(&self, preamble: Option<&str>, prompt: &str) -> Result<String> {
        use rig::providers::gemini;
        self.require_key(RigProvider::Gemini)?;

        let client = gemini::Client::from_env();
        let mut agent_builder = client.agent(&self.config.model);
        if let Some(system) = preamble {
            agent_builder = agent_builder.preamble(system);
        }
        if let Some(temperature) = self.config.temperature {
            agent_builder = agent_builder.temperature(temperature);
        }

        agent_builder
            .build()
            .prompt(prompt)
            .await
            .map_err(|e| Error::model_provider(format!("Gemini error: {}", e)))
    }

    async fn generate(&self, preamble: Option<&str>, prompt: &str) -> Result<LlmResponse> {
        tracing::debug!(
            provider = ?self.config.provider,
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Calling LLM"
        );

        let content = match self.config.provider {
            RigProvider::OpenAI => self.call_openai(preamble, prompt).await?,
            RigProvider::Anthropic => self.call_anthropic(preamble, prompt).await?,
            RigProvider::Gemini => self.call_gemini(preamble, prompt).await?,
        };

        Ok(Self::response(prompt, preamble, content))
    }
}

/// Embed one document with any Rig embedding model.
async fn embed_with<M: EmbeddingModel>(model: M, text: &str) -> Result<Vec<f32>> {
    let result = EmbeddingsBuilder::new(model)
        .document(text)
        .map_err(|e| Error::model_provider(format!("Embedding builder error: {}", e)))?
        .build()
        .await
        .map_err(|e| Error::model_provider(format!("Embedding error: {}", e)))?;

    // Rig returns Vec<(document, OneOrMany<Embedding>)> with f64 vectors.
    result
        .into_iter()
        .next()
        .and_then(|(_, embeddings)| embeddings.into_iter().next())
        .map(|embedding| embedding.vec.into_iter().map(|x| x as f32).collect())
        .ok_or_else(|| Error::model_provider("No embedding returned"))
}

#[async_trait]
impl LlmClient for RigLlmClient {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse> {
        self.generate(None, prompt).await
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        let (preamble, prompt) = self.build_prompt(messages);
        self.generate(preamble.as_deref(), &prompt).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.config.embedding_model.as_deref();
        match self.config.provider {
            RigProvider::Gemini => {
                use rig::providers::gemini;
                self.require_key(RigProvider::Gemini)?;
                let client = gemini::Client::from_env();
                embed_with(client.embedding_model(model.unwrap_or("text-embedding-004")), text).await
            }
            // Anthropic has no embedding API; fall back to OpenAI embeddings.
            RigProvider::OpenAI | RigProvider::Anthropic => {
                use rig::providers::openai;
                self.require_key(RigProvider::OpenAI)?;
                let client = openai::Client::from_env();
                embed_with(
                    client.embedding_model(model.unwrap_or(openai::TEXT_EMBEDDING_3_SMALL)),
                    text,
                )
                .await
            }
        }
    }
}
