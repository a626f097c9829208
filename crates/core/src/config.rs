use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub orchestrator: OrchestratorConfig,
    pub session: SessionConfig,
    pub retrieval: RetrievalConfig,
    pub model_gateway: ModelGatewayConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum number of agent turns in one run.
    pub round_cap: usize,
    /// Maximum replies a single agent may give in one run.
    pub reply_cap: usize,
    /// Messages kept per session.
    pub history_bound: usize,
    /// Stored messages replayed when a session resumes.
    pub resume_window: usize,
    /// Hits requested by the retrieval agent.
    pub retrieval_top_k: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            round_cap: 50,
            reply_cap: 20,
            history_bound: 10,
            resume_window: 10,
            retrieval_top_k: 12,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    Memory,
    File,
    Redis,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    pub cache_dir: String,
    pub redis_url: Option<String>,
    /// Idle time after which a session is discarded; 0 disables expiry.
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Memory,
            cache_dir: ".cache/sessions".into(),
            redis_url: None,
            ttl_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalBackend {
    #[default]
    Memory,
    Qdrant,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub backend: RetrievalBackend,
    pub url: String,
    pub collection: String,
    pub vector_size: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend: RetrievalBackend::Memory,
            url: "http://localhost:6334".into(),
            collection: "legal_documents".into(),
            vector_size: 768,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelGatewayConfig {
    /// One of `openai`, `anthropic`, `gemini`.
    pub provider: String,
    pub model: String,
    pub embedding_model: Option<String>,
    pub temperature: f64,
}

impl Default for ModelGatewayConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".into(),
            model: "gemini-2.0-flash".into(),
            embedding_model: None,
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    pub json_logs: bool,
    pub log_filter: String,
    /// Install a Prometheus recorder and print its snapshot to stderr on exit.
    pub metrics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            log_filter: "info".into(),
            metrics: false,
        }
    }
}

impl AppConfig {
    /// Load from `config/` in the working directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load from `dir/default.toml`, `dir/{PARALEGAL_ENV}.toml`,
    /// `dir/local.toml`, then `PARALEGAL__*` environment variables.
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let env = std::env::var("PARALEGAL_ENV").unwrap_or_else(|_| "development".into());
        let source = |name: &str| dir.join(name).to_string_lossy().into_owned();

        let s = Config::builder()
            .add_source(File::with_name(&source("default")).required(false))
            .add_source(File::with_name(&source(&env)).required(false))
            .add_source(File::with_name(&source("local")).required(false))
            // Map PARALEGAL__ORCHESTRATOR__ROUND_CAP=30 to orchestrator.round_cap
            .add_source(
                Environment::with_prefix("PARALEGAL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
