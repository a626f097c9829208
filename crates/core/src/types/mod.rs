//! Core data types for the paralegal orchestrator.

mod answer;
mod message;
mod role;
mod session;

pub use answer::*;
pub use message::*;
pub use role::*;
pub use session::*;
