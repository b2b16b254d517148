//! The query evaluator (spec §4.4): tokenize, sorted-merge intersect with
//! phrase filtering, score, and build snippets.

pub mod merge;
pub mod phrase;
pub mod scoring;
pub mod snippet;

use std::collections::BTreeSet;

use async_trait::async_trait;
use itertools::Itertools;

use crate::config::ScoreWeights;
use crate::error::StorageError;
use crate::storage::Storage;
use crate::tokenizer::{ascii_lower, is_stop_word, tokenize};

use merge::Accept;

/// One result row: the document's title/url plus a highlighted snippet.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub introduction: String,
}

/// The cap on candidates considered during intersection (spec §4.4 step 3).
const MAX_CANDIDATES: usize = 100;

struct PhraseAccept<'a> {
    storage: &'a dyn Storage,
    ranges: Vec<Vec<String>>,
}

#[async_trait]
impl<'a> Accept for PhraseAccept<'a> {
    /// Spec §4.4 step 4, read literally: vacuously true with no quoted
    /// ranges, otherwise true as soon as any one range is adjacent in the
    /// document. Multiple independent phrases in one query are combined
    /// existentially here, not conjunctively — see DESIGN.md.
    async fn accept(&mut self, doc_id: u32) -> Result<bool, StorageError> {
        if self.ranges.is_empty() {
            return Ok(true);
        }
        match self.storage.get_page(doc_id).await? {
            None => Ok(false),
            Some(record) => Ok(self
                .ranges
                .iter()
                .any(|terms| phrase::matches(&record.index, terms))),
        }
    }
}

/// Run a query against `storage` and return up to `max_count` ranked hits.
pub async fn search(
    storage: &dyn Storage,
    stop_words: &BTreeSet<String>,
    score_weights: Option<&ScoreWeights>,
    query_text: &str,
    max_count: usize,
) -> Result<Vec<SearchHit>, StorageError> {
    let query = tokenize(query_text, false);
    let non_stop: Vec<String> = query
        .words
        .iter()
        .map(|w| ascii_lower(w))
        .filter(|w| !is_stop_word(w, stop_words))
        .collect();

    if non_stop.is_empty() {
        return Ok(Vec::new());
    }

    let mut streams = Vec::with_capacity(non_stop.len());
    for term in &non_stop {
        streams.push(storage.get_word_iterator(term).await?);
    }

    let quote_ranges: Vec<Vec<String>> = query
        .quote_ranges()
        .map(|(a, b)| query.words[a..b].iter().map(|w| ascii_lower(w)).collect())
        .collect();

    let accept = PhraseAccept {
        storage,
        ranges: quote_ranges,
    };
    let candidates = merge::intersect(streams, MAX_CANDIDATES, accept).await?;
    let candidates: Vec<u32> = candidates.into_iter().unique().collect();

    let mut scored = Vec::with_capacity(candidates.len());
    for doc_id in candidates {
        if let Some(record) = storage.get_page(doc_id).await? {
            let points = match score_weights {
                Some(weights) => scoring::score(&record, &non_stop, weights),
                None => 0.0,
            };
            scored.push((doc_id, points, record));
        }
    }
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(max_count);

    Ok(scored
        .into_iter()
        .map(|(_, _, record)| {
            let introduction = snippet::build(&query, stop_words, &record);
            SearchHit {
                title: record.title,
                url: record.url,
                introduction,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_stop_words;
    use crate::forward::ForwardRecord;
    use crate::storage::memory::MemoryStorage;

    async fn add(storage: &MemoryStorage, doc_id: u32, title: &str, text: &str, url: &str) {
        let record = ForwardRecord::build(title, text, url);
        storage.init_page(doc_id, &record).await.unwrap();
        storage.set_url_to_page(url, doc_id).await.unwrap();
        let mut seen = BTreeSet::new();
        for word in &record.words {
            let lower = ascii_lower(word);
            if is_stop_word(&lower, &default_stop_words()) || !seen.insert(lower.clone()) {
                continue;
            }
            storage.init_term(&lower).await.unwrap();
            storage.add_doc_id(&lower, doc_id).await.unwrap();
        }
    }

    #[tokio::test]
    async fn stop_word_only_query_returns_nothing() {
        let storage = MemoryStorage::default();
        add(&storage, 1, "Jupiter", "the largest planet", "u://jupiter").await;
        let hits = search(&storage, &default_stop_words(), None, "the", 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn phrase_must_be_adjacent_to_match() {
        let storage = MemoryStorage::default();
        add(
            &storage,
            1,
            "Saturn",
            "Saturn is the sixth planet from the Sun",
            "u://saturn",
        )
        .await;
        let hits = search(&storage, &default_stop_words(), None, "\"planet sixth\"", 10)
            .await
            .unwrap();
        assert!(hits.is_empty());

        let hits = search(&storage, &default_stop_words(), None, "\"sixth planet\"", 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn url_contains_breaks_ties_between_identical_text() {
        let storage = MemoryStorage::default();
        add(&storage, 1, "Process", "a process is a sequence of steps", "http://hackapedia.org/entry42").await;
        add(
            &storage,
            2,
            "Process",
            "a process is a sequence of steps",
            "https://en.wikipedia.org/wiki/Process",
        )
        .await;
        let weights = ScoreWeights::default();
        let hits = search(&storage, &default_stop_words(), Some(&weights), "process", 10)
            .await
            .unwrap();
        assert_eq!(hits[0].url, "https://en.wikipedia.org/wiki/Process");
    }
}
