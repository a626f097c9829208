#![deny(unused)]
//! Session persistence and retrieval backends for the paralegal orchestrator.
//!
//! Session stores hold whole bounded histories keyed by chat id; the
//! [`SessionCache`] layers the bound, expiry and per-session locking on top.
//! Retrievers implement semantic search over the legal corpus.

pub mod cache;
pub mod file;
pub mod memory;
pub mod qdrant;
pub mod redis;
pub mod vector;

pub use cache::{SessionCache, SessionGuard};
pub use file::FileSessionStore;
pub use memory::InMemorySessionStore;
pub use qdrant::QdrantRetriever;
pub use redis::RedisSessionStore;
pub use vector::SimpleVectorStore;
