#![deny(unused)]
//! Core types, traits, and error definitions for the paralegal orchestrator.
//!
//! This crate provides the building blocks shared by the session store, the
//! model gateway and the conversation controller.

pub mod config;
pub mod error;
pub mod mocks;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::*;
pub use types::*;
