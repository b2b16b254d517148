//! The in-memory `Storage` variant (spec §6.2): ordered lists per term, and
//! plain maps for pages and the url index. Used by tests and by the demo CLI
//! when no `--store` path is given.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::forward::ForwardRecord;
use crate::posting_store::memory::MemoryPostingStore;
use crate::posting_store::PostingStore;

use super::{insert_sorted_unique, DocIdStream, EmptyDocIdStream, PostingDocIdStream, Storage};

pub struct MemoryStorage {
    terms: MemoryPostingStore,
    pages: std::sync::RwLock<std::collections::HashMap<u32, ForwardRecord>>,
    urls: std::sync::RwLock<std::collections::HashMap<String, u32>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        MemoryStorage {
            terms: MemoryPostingStore::new(),
            pages: std::sync::RwLock::new(std::collections::HashMap::new()),
            urls: std::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_word_iterator(&self, term: &str) -> Result<Box<dyn DocIdStream>, StorageError> {
        if self.terms.contains_key(term.as_bytes()).await? {
            Ok(Box::new(PostingDocIdStream::new(self.terms.iter(term.as_bytes()))))
        } else {
            Ok(Box::new(EmptyDocIdStream))
        }
    }

    async fn init_term(&self, term: &str) -> Result<(), StorageError> {
        if !self.terms.contains_key(term.as_bytes()).await? {
            self.terms.set(term.as_bytes(), None).await?;
        }
        Ok(())
    }

    async fn reset_term(&self, term: &str) -> Result<(), StorageError> {
        self.terms.set(term.as_bytes(), None).await?;
        Ok(())
    }

    async fn add_doc_id(&self, term: &str, doc_id: u32) -> Result<(), StorageError> {
        insert_sorted_unique(&self.terms, term.as_bytes(), doc_id).await?;
        Ok(())
    }

    async fn init_page(&self, doc_id: u32, record: &ForwardRecord) -> Result<(), StorageError> {
        let mut pages = self.pages.write().expect("pages lock poisoned");
        pages.insert(doc_id, record.clone());
        Ok(())
    }

    async fn get_page(&self, doc_id: u32) -> Result<Option<ForwardRecord>, StorageError> {
        let pages = self.pages.read().expect("pages lock poisoned");
        Ok(pages.get(&doc_id).cloned())
    }

    async fn get_url_to_page(&self, url: &str) -> Result<Option<u32>, StorageError> {
        let urls = self.urls.read().expect("urls lock poisoned");
        Ok(urls.get(url).copied())
    }

    async fn set_url_to_page(&self, url: &str, doc_id: u32) -> Result<(), StorageError> {
        let mut urls = self.urls.write().expect("urls lock poisoned");
        urls.insert(url.to_string(), doc_id);
        Ok(())
    }

    async fn reserve_doc_id(&self, proposed_rank: u32) -> Result<u32, StorageError> {
        let pages = self.pages.read().expect("pages lock poisoned");
        let mut candidate = proposed_rank;
        loop {
            if candidate < 1 {
                return Err(StorageError::RankExhausted);
            }
            if !pages.contains_key(&candidate) {
                return Ok(candidate);
            }
            candidate -= 1;
        }
    }

    async fn document_count(&self) -> Result<u64, StorageError> {
        let pages = self.pages.read().expect("pages lock poisoned");
        Ok(pages.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reserve_doc_id_decrements_until_free() {
        let storage = MemoryStorage::default();
        storage
            .init_page(5, &ForwardRecord::build("a", "b", "u://5"))
            .await
            .unwrap();
        storage
            .init_page(4, &ForwardRecord::build("a", "b", "u://4"))
            .await
            .unwrap();
        assert_eq!(storage.reserve_doc_id(5).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn reserve_doc_id_exhausted_below_one() {
        let storage = MemoryStorage::default();
        for rank in 1..=3u32 {
            storage
                .init_page(rank, &ForwardRecord::build("a", "b", &format!("u://{rank}")))
                .await
                .unwrap();
        }
        let err = storage.reserve_doc_id(3).await.unwrap_err();
        assert!(matches!(err, StorageError::RankExhausted));
    }

    #[tokio::test]
    async fn missing_term_yields_empty_iterator() {
        let storage = MemoryStorage::default();
        let mut it = storage.get_word_iterator("ghost").await.unwrap();
        assert_eq!(it.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn add_doc_id_is_idempotent() {
        let storage = MemoryStorage::default();
        storage.init_term("cat").await.unwrap();
        storage.add_doc_id("cat", 3).await.unwrap();
        storage.add_doc_id("cat", 3).await.unwrap();
        let mut it = storage.get_word_iterator("cat").await.unwrap();
        let mut ids = Vec::new();
        while let Some(id) = it.next().await.unwrap() {
            ids.push(id);
        }
        assert_eq!(ids, vec![3]);
    }
}
