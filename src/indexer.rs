//! The indexer: `add` (spec §4.3).

use std::collections::BTreeSet;

use crate::error::StorageError;
use crate::forward::ForwardRecord;
use crate::storage::Storage;
use crate::tokenizer::{ascii_lower, is_stop_word};

/// Tokenize, reserve a doc-id from `rank`, persist the forward record, and
/// insert the document into every distinct non-stop term's posting list.
/// Returns the assigned doc-id.
pub async fn add(
    storage: &dyn Storage,
    stop_words: &BTreeSet<String>,
    title: &str,
    text: &str,
    url: &str,
    rank: u32,
) -> Result<u32, StorageError> {
    if storage.get_url_to_page(url).await?.is_some() {
        tracing::warn!(url, "rejecting add: url already indexed");
        return Err(StorageError::DuplicateUrl);
    }

    let doc_id = storage.reserve_doc_id(rank).await?;
    tracing::debug!(url, rank, doc_id, "doc-id reserved");

    storage.set_url_to_page(url, doc_id).await?;

    let record = ForwardRecord::build(title, text, url);
    storage.init_page(doc_id, &record).await?;

    let mut inserted = BTreeSet::new();
    for word in &record.words {
        let term = ascii_lower(word);
        if is_stop_word(&term, stop_words) || !inserted.insert(term.clone()) {
            continue;
        }
        storage.init_term(&term).await?;
        storage.add_doc_id(&term, doc_id).await?;
    }

    tracing::debug!(doc_id, terms = inserted.len(), "document indexed");
    Ok(doc_id)
}
