#![deny(unused)]
//! Model gateway for the paralegal orchestrator.
//!
//! This crate provides the Rig-backed [`LlmClient`](paralegal_core::LlmClient)
//! used by the agents, for OpenAI, Anthropic and Google Gemini models.

pub mod rig_client;

pub use rig_client::{RigConfig, RigLlmClient, RigProvider};

use paralegal_core::config::ModelGatewayConfig;

/// Create an LLM client from the `model_gateway` configuration section.
///
/// API keys are read from the provider's environment variable at call time.
pub fn create_client_from_config(config: &ModelGatewayConfig) -> paralegal_core::Result<RigLlmClient> {
    let provider: RigProvider = config.provider.parse()?;

    let mut rig_cfg = match provider {
        RigProvider::OpenAI => RigConfig::openai(&config.model),
        RigProvider::Anthropic => RigConfig::anthropic(&config.model),
        RigProvider::Gemini => RigConfig::gemini(&config.model),
    }
    .with_temperature(config.temperature);

    if let Some(ref embedding_model) = config.embedding_model {
        rig_cfg = rig_cfg.with_embedding_model(embedding_model);
    }

    tracing::info!(provider = ?provider, model = %config.model, "Model gateway configured");
    Ok(RigLlmClient::new(rig_cfg))
}
