//! The persistent hash-map-of-linked-lists primitive described in spec §4.1.
//!
//! [`PostingStore`] is the single abstraction reused for three different
//! purposes by [`crate::storage::disk::DiskStorage`]: the term -> doc-ids
//! inverted index, the doc-id -> page-pointer index, and the url -> doc-id
//! index. Only the inverted index actually uses the linked-list/sorted-
//! insert half of the interface; the other two always call [`PostingStore::set`]
//! and read back a single value.

pub mod disk;
pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;

/// A pull-based, forward-only iterator over the payload bytes of one key's
/// posting list (spec §4.1 `iter`). Modeled as an explicit `async fn next`
/// rather than `futures::Stream` so that opening the iterator is a plain,
/// non-suspending call (spec §9: "pull-based iterator that yields one doc-id
/// per read step") and the first suspension point is the first `next().await`.
#[async_trait]
pub trait PayloadIter: Send {
    async fn next(&mut self) -> Result<Option<Vec<u8>>, StoreError>;
}

/// The posting-store contract (spec §4.1 and §6.2/§6.3).
#[async_trait]
pub trait PostingStore: Send + Sync {
    /// `set(K, initial_payload)`: create the bucket for `K` if absent
    /// (writing `initial_payload` or zeros into its single node), or
    /// overwrite the head node's payload in place if `K` already exists.
    async fn set(&self, key: &[u8], initial_payload: Option<&[u8]>) -> Result<(), StoreError>;

    /// `insert_at(K, i, payload)`: insert `payload` at 0-based logical
    /// position `i` in `K`'s list. `K` must already exist.
    async fn insert_at(&self, key: &[u8], i: usize, payload: &[u8]) -> Result<(), StoreError>;

    /// `append(K, payload)`: insert at the end of `K`'s list without
    /// traversing it, by updating the cached tail pointer.
    async fn append(&self, key: &[u8], payload: &[u8]) -> Result<(), StoreError>;

    /// Smallest position `i` such that the list is shorter than `i` or the
    /// node at `i` has a payload byte-compare `>= payload`.
    async fn find_sorted_position(&self, key: &[u8], payload: &[u8]) -> Result<usize, StoreError>;

    /// Whether `key` currently has a bucket (possibly with an empty list is
    /// not representable — a bucket always has >= 1 node once created).
    async fn contains_key(&self, key: &[u8]) -> Result<bool, StoreError>;

    /// The single payload stored at the head node of `key`, if any. Used by
    /// the page-index and url-index uses of this store, where each key maps
    /// to exactly one value rather than a list.
    async fn get_one(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// A forward iterator over every payload currently linked under `key`.
    fn iter(&self, key: &[u8]) -> Box<dyn PayloadIter>;

    /// Number of distinct keys currently stored (occupied buckets). Used by
    /// [`crate::storage::disk::DiskStorage::document_count`], which reuses
    /// the page-index store's bucket occupancy as the document count since
    /// each document owns exactly one page-index key.
    async fn key_count(&self) -> Result<u64, StoreError>;
}

/// Convenience used by both the memory and disk implementations: dedup is
/// the caller's job (spec §4.3 step 7), but every insertion must still land
/// in byte-sorted order, so this is the shared "where does this payload go"
/// routine exposed as a free function for testing independent of storage.
pub fn sorted_position<'a>(existing: impl Iterator<Item = &'a [u8]>, payload: &[u8]) -> usize {
    existing.take_while(|p| *p < payload).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_position_matches_byte_compare() {
        let items: Vec<&[u8]> = vec![&[0, 0, 0, 1], &[0, 0, 0, 5], &[0, 0, 0, 9]];
        assert_eq!(sorted_position(items.iter().copied(), &[0, 0, 0, 0]), 0);
        assert_eq!(sorted_position(items.iter().copied(), &[0, 0, 0, 5]), 1);
        assert_eq!(sorted_position(items.iter().copied(), &[0, 0, 0, 20]), 3);
    }
}
