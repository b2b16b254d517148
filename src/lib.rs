//! A small full-text search engine: a persistent posting-store, an inverted
//! index built on top of it, and a query evaluator supporting bag-of-words
//! and quoted-phrase search with score-based ranking.
//!
//! The core (posting-store, indexer, query evaluator) is storage-agnostic:
//! it only depends on the [`storage::Storage`] trait, with in-memory and
//! disk-backed implementations provided.

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod forward;
pub mod indexer;
pub mod posting_store;
pub mod query;
pub mod storage;
pub mod tokenizer;

pub use config::EngineConfig;
pub use engine::{Engine, ForwardRecordRequest};
pub use error::EngineError;
pub use query::SearchHit;
