//! An in-memory [`PostingStore`], used by [`crate::storage::memory::MemoryStorage`]
//! and by tests that don't need file I/O. Backed by an ordered `Vec<Vec<u8>>`
//! per key, which is exactly the in-memory posting representation spec §6.2
//! calls for.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreError;

use super::{PayloadIter, PostingStore};

#[derive(Default)]
pub struct MemoryPostingStore {
    buckets: RwLock<HashMap<Vec<u8>, Vec<Vec<u8>>>>,
}

impl MemoryPostingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostingStore for MemoryPostingStore {
    async fn set(&self, key: &[u8], initial_payload: Option<&[u8]>) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write().expect("posting-store lock poisoned");
        // Zero-pad the sentinel head node to a doc-id-sized payload, matching
        // `DiskPostingStore::pad_payload`'s zero-padding — a 0-byte payload
        // would fail `doc_id_from_be_bytes`'s 4-byte decode instead of
        // decoding as the doc-id-0 sentinel `PostingDocIdStream` skips.
        let payload = initial_payload
            .map(|p| p.to_vec())
            .unwrap_or_else(|| vec![0u8; 4]);
        match buckets.get_mut(key) {
            Some(list) => list[0] = payload,
            None => {
                buckets.insert(key.to_vec(), vec![payload]);
            }
        }
        Ok(())
    }

    async fn insert_at(&self, key: &[u8], i: usize, payload: &[u8]) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write().expect("posting-store lock poisoned");
        let list = buckets
            .get_mut(key)
            .ok_or_else(|| StoreError::KeyMissing(key.to_vec()))?;
        let i = i.min(list.len());
        list.insert(i, payload.to_vec());
        Ok(())
    }

    async fn append(&self, key: &[u8], payload: &[u8]) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write().expect("posting-store lock poisoned");
        let list = buckets
            .get_mut(key)
            .ok_or_else(|| StoreError::KeyMissing(key.to_vec()))?;
        list.push(payload.to_vec());
        Ok(())
    }

    async fn find_sorted_position(&self, key: &[u8], payload: &[u8]) -> Result<usize, StoreError> {
        let buckets = self.buckets.read().expect("posting-store lock poisoned");
        let pos = match buckets.get(key) {
            Some(list) => super::sorted_position(list.iter().map(|v| v.as_slice()), payload),
            None => 0,
        };
        Ok(pos)
    }

    async fn contains_key(&self, key: &[u8]) -> Result<bool, StoreError> {
        let buckets = self.buckets.read().expect("posting-store lock poisoned");
        Ok(buckets.contains_key(key))
    }

    async fn get_one(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let buckets = self.buckets.read().expect("posting-store lock poisoned");
        Ok(buckets.get(key).and_then(|list| list.first()).cloned())
    }

    async fn key_count(&self) -> Result<u64, StoreError> {
        let buckets = self.buckets.read().expect("posting-store lock poisoned");
        Ok(buckets.len() as u64)
    }

    fn iter(&self, key: &[u8]) -> Box<dyn PayloadIter> {
        // Snapshot the list so the iterator is stable with respect to
        // concurrent appends, matching the "may or may not see later
        // appends" leeway in spec §4.1.
        let buckets = self.buckets.read().expect("posting-store lock poisoned");
        let snapshot = buckets.get(key).cloned().unwrap_or_default();
        Box::new(MemoryPayloadIter {
            items: snapshot.into_iter(),
        })
    }
}

struct MemoryPayloadIter {
    items: std::vec::IntoIter<Vec<u8>>,
}

#[async_trait]
impl PayloadIter for MemoryPayloadIter {
    async fn next(&mut self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.items.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::doc_id_to_be_bytes;
    use std::convert::TryInto;

    async fn collect(store: &MemoryPostingStore, key: &[u8]) -> Vec<Vec<u8>> {
        let mut it = store.iter(key);
        let mut out = Vec::new();
        while let Some(p) = it.next().await.unwrap() {
            out.push(p);
        }
        out
    }

    #[tokio::test]
    async fn set_then_iter_returns_head() {
        let store = MemoryPostingStore::new();
        store.set(b"cat", None).await.unwrap();
        assert_eq!(collect(&store, b"cat").await, vec![vec![0u8; 4]]);
    }

    #[tokio::test]
    async fn sorted_insert_keeps_ascending_order() {
        let store = MemoryPostingStore::new();
        store.set(b"cat", Some(&doc_id_to_be_bytes(5))).await.unwrap();
        for id in [2u32, 9, 1, 7] {
            let payload = doc_id_to_be_bytes(id);
            let pos = store.find_sorted_position(b"cat", &payload).await.unwrap();
            store.insert_at(b"cat", pos, &payload).await.unwrap();
        }
        let ids: Vec<u32> = collect(&store, b"cat")
            .await
            .into_iter()
            .map(|p| u32::from_be_bytes(p.try_into().unwrap()))
            .collect();
        assert_eq!(ids, vec![1, 2, 5, 7, 9]);
    }

    #[tokio::test]
    async fn insert_at_missing_key_errors() {
        let store = MemoryPostingStore::new();
        let err = store.insert_at(b"missing", 0, &[1]).await.unwrap_err();
        assert!(matches!(err, StoreError::KeyMissing(_)));
    }

    #[tokio::test]
    async fn key_count_tracks_distinct_keys() {
        let store = MemoryPostingStore::new();
        assert_eq!(store.key_count().await.unwrap(), 0);
        store.set(b"a", None).await.unwrap();
        store.set(b"b", None).await.unwrap();
        assert_eq!(store.key_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn append_adds_to_tail() {
        let store = MemoryPostingStore::new();
        store.set(b"k", Some(&[1])).await.unwrap();
        store.append(b"k", &[2]).await.unwrap();
        store.append(b"k", &[3]).await.unwrap();
        assert_eq!(collect(&store, b"k").await, vec![vec![1], vec![2], vec![3]]);
    }
}
