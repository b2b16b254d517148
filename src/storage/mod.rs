//! The blob-store contract the core consumes (spec §6.2): per-document
//! forward records, url -> doc-id lookup, and doc-id reservation by rank.
//! This is explicitly an *external collaborator* interface (spec §1) — the
//! core only depends on [`Storage`], never on a concrete backing store.

pub mod disk;
pub mod memory;

use async_trait::async_trait;

use crate::codec::{doc_id_from_be_bytes, doc_id_to_be_bytes};
use crate::error::{StorageError, StoreError};
use crate::forward::ForwardRecord;
use crate::posting_store::{PayloadIter, PostingStore};

/// A pull-based iterator over ascending doc-ids for one term (spec §6.2
/// `get_word_iterator`). Wraps a [`PayloadIter`] and silently drops doc-id
/// `0`, the sentinel a freshly-`set` posting-store key starts with (spec §3:
/// "0 is reserved as 'no doc' / sentinel").
#[async_trait]
pub trait DocIdStream: Send {
    async fn next(&mut self) -> Result<Option<u32>, StorageError>;
}

pub(crate) struct PostingDocIdStream {
    inner: Box<dyn PayloadIter>,
}

impl PostingDocIdStream {
    pub(crate) fn new(inner: Box<dyn PayloadIter>) -> Self {
        PostingDocIdStream { inner }
    }
}

#[async_trait]
impl DocIdStream for PostingDocIdStream {
    async fn next(&mut self) -> Result<Option<u32>, StorageError> {
        loop {
            match self.inner.next().await? {
                None => return Ok(None),
                Some(payload) => {
                    let id = doc_id_from_be_bytes(&payload)
                        .ok_or_else(|| StoreError::Corrupt("posting payload is not 4 bytes".into()))?;
                    if id != 0 {
                        return Ok(Some(id));
                    }
                    // Sentinel node from `set`; keep pulling.
                }
            }
        }
    }
}

/// An empty [`DocIdStream`], returned for terms with no posting list at all
/// (spec §4.4 step 2: "Missing terms yield empty iterators").
pub(crate) struct EmptyDocIdStream;

#[async_trait]
impl DocIdStream for EmptyDocIdStream {
    async fn next(&mut self) -> Result<Option<u32>, StorageError> {
        Ok(None)
    }
}

/// The storage contract (spec §6.2).
#[async_trait]
pub trait Storage: Send + Sync {
    /// `term` must already be lower-cased by the caller (the core always
    /// does this before calling in).
    async fn get_word_iterator(&self, term: &str) -> Result<Box<dyn DocIdStream>, StorageError>;

    async fn init_term(&self, term: &str) -> Result<(), StorageError>;

    async fn reset_term(&self, term: &str) -> Result<(), StorageError>;

    async fn add_doc_id(&self, term: &str, doc_id: u32) -> Result<(), StorageError>;

    async fn init_page(&self, doc_id: u32, record: &ForwardRecord) -> Result<(), StorageError>;

    async fn get_page(&self, doc_id: u32) -> Result<Option<ForwardRecord>, StorageError>;

    async fn get_url_to_page(&self, url: &str) -> Result<Option<u32>, StorageError>;

    async fn set_url_to_page(&self, url: &str, doc_id: u32) -> Result<(), StorageError>;

    /// Returns the largest `r <= proposed_rank` with no page recorded yet;
    /// errors with [`StorageError::RankExhausted`] if `r` would drop below 1.
    async fn reserve_doc_id(&self, proposed_rank: u32) -> Result<u32, StorageError>;

    async fn document_count(&self) -> Result<u64, StorageError>;
}

/// Shared by both `Storage` implementations: insert `doc_id` into `term`'s
/// posting list in sorted order, skipping the insert if it is already
/// present (spec §6.2 `add_doc_id`: "insert preserving ascending order and
/// uniqueness").
pub(crate) async fn insert_sorted_unique(
    store: &dyn PostingStore,
    key: &[u8],
    doc_id: u32,
) -> Result<(), StoreError> {
    let payload = doc_id_to_be_bytes(doc_id);
    let mut existing = Vec::new();
    let mut it = store.iter(key);
    while let Some(p) = it.next().await? {
        existing.push(p);
    }
    if existing.iter().any(|p| p.as_slice() == payload) {
        return Ok(());
    }
    let pos = crate::posting_store::sorted_position(existing.iter().map(|p| p.as_slice()), &payload);
    store.insert_at(key, pos, &payload).await
}
