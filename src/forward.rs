//! The per-document forward record (spec §3): original-case tokens plus a
//! lower-cased term -> positions map, serialized with `bincode` when stored
//! on disk (see [`crate::storage::disk`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tokenizer::{ascii_lower, tokenize};

/// A single indexed document, as handed back by `get_page`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForwardRecord {
    pub title: String,
    pub url: String,
    /// Original-case tokens, in document order.
    pub words: Vec<String>,
    /// Lower-cased term -> ordered positions in `words`.
    pub index: BTreeMap<String, Vec<u32>>,
}

impl ForwardRecord {
    /// Build a forward record from a title/body pair the way the indexer
    /// does it (spec §4.3 steps 1 and 5): tokenize `title + " " + text` with
    /// `lower_case = false`, then bucket positions by lower-cased term.
    pub fn build(title: &str, text: &str, url: &str) -> Self {
        let combined = format!("{} {}", title, text);
        let tokenized = tokenize(&combined, false);

        let mut index: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        for (pos, word) in tokenized.words.iter().enumerate() {
            index
                .entry(ascii_lower(word))
                .or_default()
                .push(pos as u32);
        }

        ForwardRecord {
            title: title.to_string(),
            url: url.to_string(),
            words: tokenized.words,
            index,
        }
    }

    /// Number of tokens contributed by the title alone, used by
    /// `title_exact_match` scoring (spec §4.8).
    pub fn title_token_count(&self) -> usize {
        tokenize(&self.title, false).words.len()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_lists_precise_positions() {
        let rec = ForwardRecord::build("the cat sat", "on the cat mat", "u://x");
        // words: the cat sat on the cat mat
        assert_eq!(rec.words, vec!["the", "cat", "sat", "on", "the", "cat", "mat"]);
        assert_eq!(rec.index.get("cat"), Some(&vec![1, 5]));
        assert_eq!(rec.index.get("the"), Some(&vec![0, 4]));
        assert_eq!(rec.index.get("mat"), Some(&vec![6]));
    }

    #[test]
    fn bincode_round_trips() {
        let rec = ForwardRecord::build("Jupiter", "is the largest planet", "u://jupiter");
        let bytes = rec.to_bytes().unwrap();
        let back = ForwardRecord::from_bytes(&bytes).unwrap();
        assert_eq!(rec, back);
    }
}
