#![deny(unused)]
//! Observability for the paralegal orchestrator.
//!
//! This crate provides:
//! - Structured logging setup (`tracing-subscriber`, text or JSON)
//! - Redaction of sensitive values before logging
//! - Prometheus counters for turns, speaker selection, tokens and runs

pub mod metrics;
pub mod redaction;
pub mod tracing_layer;

pub use metrics::{setup_metrics_recorder, track_run, track_selection, track_tokens, track_turn};
pub use redaction::{redact, Redactor};
pub use tracing_layer::configure_tracing;
