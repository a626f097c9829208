//! Metrics implementation using Prometheus.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use paralegal_core::{Error, Result};

/// Initialize Prometheus recorder and return the handle.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::configuration(format!("Failed to install Prometheus recorder: {}", e)))?;

    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// Count one agent turn.
pub fn track_turn(agent: &str) {
    metrics::counter!("agent_turns_total", "agent" => agent.to_string()).increment(1);
}

/// Count how the next speaker was chosen (`declared`, `auto`, `textual`, ...).
pub fn track_selection(strategy: &'static str) {
    metrics::counter!("speaker_selections_total", "strategy" => strategy).increment(1);
}

/// Helper to track token usage.
pub fn track_tokens(agent: &str, prompt: u64, completion: u64) {
    metrics::counter!("llm_token_usage_total", "agent" => agent.to_string(), "type" => "prompt").increment(prompt);
    metrics::counter!("llm_token_usage_total", "agent" => agent.to_string(), "type" => "completion").increment(completion);
}

/// Record the outcome and length of one conversation run.
pub fn track_run(outcome: &'static str, turns: usize, latency_sec: f64) {
    metrics::counter!("conversation_runs_total", "outcome" => outcome).increment(1);
    metrics::histogram!("conversation_turns").record(turns as f64);
    metrics::histogram!("conversation_duration_seconds", "outcome" => outcome).record(latency_sec);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_metrics_are_rendered() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            track_run("completed", 6, 0.1);
            track_turn("router");
        });

        let rendered = handle.render();
        assert!(rendered.contains("conversation_runs_total"));
        assert!(rendered.contains("outcome=\"completed\""));
        assert!(rendered.contains("agent_turns_total"));
    }
}
