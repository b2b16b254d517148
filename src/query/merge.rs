//! The sorted-merge intersection at the heart of the query evaluator (spec
//! §4.5). Two flavors share the same minimal-advance rule: an async one
//! driving the doc-id posting iterators the storage layer hands back, and a
//! synchronous one used by phrase adjacency over already-materialized
//! position lists (spec §4.6).

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage::DocIdStream;

/// An async side predicate evaluated once per discovered intersection
/// (spec §4.5's `accept`), e.g. phrase-adjacency filtering in
/// [`crate::query::evaluate`].
#[async_trait]
pub trait Accept: Send {
    async fn accept(&mut self, doc_id: u32) -> Result<bool, StorageError>;
}

/// The trivial predicate: every candidate is accepted. Lets callers share
/// one code path whether or not spec §4.4 needs `quote_ok` filtering.
pub struct AcceptAll;

#[async_trait]
impl Accept for AcceptAll {
    async fn accept(&mut self, _doc_id: u32) -> Result<bool, StorageError> {
        Ok(true)
    }
}

/// Sorted-merge intersect `streams`, capped at `max_count` results, with
/// `accept` evaluated once per fully-agreeing tuple.
///
/// Mirrors spec §4.5 exactly: on a tie, only the first iterator at the
/// minimum value is advanced, not all of them — so `k` iterators agreeing on
/// a shared value are drained one at a time across subsequent loop turns
/// rather than all at once.
pub async fn intersect(
    mut streams: Vec<Box<dyn DocIdStream>>,
    max_count: usize,
    mut accept: impl Accept,
) -> Result<Vec<u32>, StorageError> {
    if streams.is_empty() || max_count == 0 {
        return Ok(Vec::new());
    }

    if streams.len() == 1 {
        let mut out = Vec::new();
        while out.len() < max_count {
            match streams[0].next().await? {
                None => break,
                Some(id) => {
                    if accept.accept(id).await? {
                        out.push(id);
                    }
                }
            }
        }
        return Ok(out);
    }

    let mut current = Vec::with_capacity(streams.len());
    for s in streams.iter_mut() {
        current.push(s.next().await?);
    }

    let mut out = Vec::new();
    while out.len() < max_count {
        if current.iter().any(|v| v.is_none()) {
            break;
        }
        let values: Vec<u32> = current.iter().map(|v| v.unwrap()).collect();
        let min_value = *values.iter().min().unwrap();
        if values.iter().all(|&v| v == min_value) {
            if accept.accept(min_value).await? {
                out.push(min_value);
            }
        }
        let advance = values.iter().position(|&v| v == min_value).unwrap();
        current[advance] = streams[advance].next().await?;
    }

    Ok(out)
}

/// The same minimal-advance rule over already-materialized, ascending
/// `u32` lists, capped at `max_count`. Used by phrase adjacency (spec §4.6),
/// where the "iterators" are just shifted position vectors already held in
/// memory, so no suspension points are needed.
pub fn intersect_sync(lists: &[Vec<u32>], max_count: usize) -> Vec<u32> {
    if lists.is_empty() || max_count == 0 {
        return Vec::new();
    }
    if lists.iter().any(|l| l.is_empty()) {
        return Vec::new();
    }
    if lists.len() == 1 {
        return lists[0].iter().copied().take(max_count).collect();
    }

    let mut idx = vec![0usize; lists.len()];
    let mut out = Vec::new();
    loop {
        if out.len() >= max_count {
            break;
        }
        let mut values = Vec::with_capacity(lists.len());
        let mut exhausted = false;
        for (i, list) in lists.iter().enumerate() {
            match list.get(idx[i]) {
                Some(&v) => values.push(v),
                None => {
                    exhausted = true;
                    break;
                }
            }
        }
        if exhausted {
            break;
        }
        let min_value = *values.iter().min().unwrap();
        if values.iter().all(|&v| v == min_value) {
            out.push(min_value);
        }
        let advance = values.iter().position(|&v| v == min_value).unwrap();
        idx[advance] += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_sync_finds_common_elements() {
        let lists = vec![vec![1, 3, 5, 7], vec![2, 3, 5, 9], vec![3, 5, 6]];
        assert_eq!(intersect_sync(&lists, usize::MAX), vec![3, 5]);
    }

    #[test]
    fn intersect_sync_respects_cap() {
        let lists = vec![vec![1, 2, 3], vec![1, 2, 3]];
        assert_eq!(intersect_sync(&lists, 1), vec![1]);
    }

    #[test]
    fn intersect_sync_empty_list_yields_empty() {
        let lists = vec![vec![1, 2], vec![]];
        assert!(intersect_sync(&lists, usize::MAX).is_empty());
    }

    #[test]
    fn intersect_sync_single_list_passes_through() {
        let lists = vec![vec![4, 5, 6]];
        assert_eq!(intersect_sync(&lists, usize::MAX), vec![4, 5, 6]);
    }
}
