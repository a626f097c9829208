#![deny(unused)]
//! Conversation controller for the paralegal orchestrator.
//!
//! This crate provides the agent registry, the speaker selector that enforces
//! the allowed-transition graph, and the driver that runs a question through
//! the agent group.

pub mod builder;
pub mod driver;
pub mod executor;
pub mod normalize;
pub mod prompts;
pub mod registry;
pub mod selector;

pub use builder::DriverBuilder;
pub use driver::{ConversationDriver, NO_ANSWER};
pub use executor::{format_hits, LlmTurnExecutor, TurnContext, TurnExecutor, DEFAULT_TOP_K};
pub use normalize::{Normalized, Normalizer};
pub use registry::{Agent, AgentHandle, AgentRegistry, AgentSpec, DEFAULT_REPLY_CAP};
pub use selector::{
    textual_fallback, AutoSpeaker, GraphAutoSpeaker, LlmAutoSpeaker, Selection,
    SelectionStrategy, SpeakerSelector, TransitionGraph,
};
