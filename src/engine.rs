//! The public façade (spec §6.1): `add` and `search` wiring the indexer and
//! query evaluator over a [`Storage`] implementation.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::indexer;
use crate::query::{self, SearchHit};
use crate::storage::Storage;

/// A search engine over a concrete [`Storage`] backend, configured once at
/// construction.
pub struct Engine<S: Storage> {
    storage: S,
    config: EngineConfig,
}

impl<S: Storage> Engine<S> {
    pub fn new(storage: S, config: EngineConfig) -> Self {
        Engine { storage, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Index one document, returning its assigned doc-id.
    pub async fn add(&self, request: ForwardRecordRequest<'_>) -> Result<u32, EngineError> {
        let doc_id = indexer::add(
            &self.storage,
            &self.config.stop_words,
            request.title,
            request.text,
            request.url,
            request.rank,
        )
        .await
        .inspect_err(|err| tracing::error!(url = request.url, %err, "add failed"))?;
        Ok(doc_id)
    }

    /// Run a query, returning up to `max_count` ranked hits (spec §6.1
    /// default `max_count = 100`).
    pub async fn search(&self, query_text: &str, max_count: usize) -> Result<Vec<SearchHit>, EngineError> {
        let hits = query::search(
            &self.storage,
            &self.config.stop_words,
            self.config.score_weights.as_ref(),
            query_text,
            max_count,
        )
        .await
        .inspect_err(|err| tracing::error!(query = query_text, %err, "search failed"))?;
        Ok(hits)
    }

    pub async fn document_count(&self) -> Result<u64, EngineError> {
        Ok(self.storage.document_count().await?)
    }
}

/// Arguments to [`Engine::add`] (spec §6.1 `add`).
pub struct ForwardRecordRequest<'a> {
    pub title: &'a str,
    pub text: &'a str,
    pub url: &'a str,
    pub rank: u32,
}
