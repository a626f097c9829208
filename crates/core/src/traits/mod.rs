//! Core traits for the paralegal orchestrator.
//!
//! Traits are organized by the collaborator they describe:
//! - `llm`: language model access (LlmClient)
//! - `retrieval`: semantic search over the legal corpus (Retriever)
//! - `session_store`: persistence of bounded session histories (SessionStore)

pub mod llm;
pub mod retrieval;
pub mod session_store;

pub use llm::*;
pub use retrieval::*;
pub use session_store::*;
