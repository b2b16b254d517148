//! Engine configuration: posting-store sizing and the optional scoring
//! weights, loadable from a TOML file the way `ChainSafe-forest`'s
//! `RocksDbConfig` is — `#[serde(default)]` plus a hand-written `Default`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Sizing parameters for a disk-backed [`crate::posting_store::PostingStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum bytes per term key; longer terms are rejected at write time.
    pub key_size: usize,
    /// Number of rows in the bucket table.
    pub hash_rows: usize,
    /// Payload bytes per node. `4` is enough for a doc-id posting list; the
    /// page-index and url-index stores configure their own values.
    pub node_size_payload: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            key_size: 64,
            hash_rows: 4096,
            node_size_payload: 4,
        }
    }
}

impl StoreConfig {
    /// The [`StoreConfig`] used for the page index (doc-id -> `{offset,
    /// len}` pointer): keys are 4-byte doc-ids, payload is a fixed 12 bytes.
    pub fn page_index() -> Self {
        StoreConfig {
            key_size: 4,
            hash_rows: 4096,
            node_size_payload: 12,
        }
    }

    /// The [`StoreConfig`] used for the url index (url bytes -> doc-id).
    pub fn url_index(key_size: usize, hash_rows: usize) -> Self {
        StoreConfig {
            key_size,
            hash_rows,
            node_size_payload: 4,
        }
    }

    pub fn bucket_row_size(&self) -> usize {
        self.key_size + 4 + 4
    }

    pub fn node_size(&self) -> usize {
        self.node_size_payload + 4
    }
}

/// Additive scoring weights applied on top of the exclusive title-match
/// family (spec §4.8). All fields are point values, not booleans, so callers
/// can tune how much a title/url hit should matter relative to a bag-of-words
/// match.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub title_exact_match: f64,
    pub title_begins: f64,
    pub title_contains_in_beginning: f64,
    pub url_contains: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            title_exact_match: 100.0,
            title_begins: 50.0,
            title_contains_in_beginning: 25.0,
            url_contains: 10.0,
        }
    }
}

/// Top-level configuration for a [`crate::engine::Engine`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub store: StoreConfig,
    pub stop_words: BTreeSet<String>,
    pub score_weights: Option<ScoreWeights>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            store: StoreConfig::default(),
            stop_words: default_stop_words(),
            score_weights: Some(ScoreWeights::default()),
        }
    }
}

impl EngineConfig {
    /// Parse an [`EngineConfig`] from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize this [`EngineConfig`] to TOML text.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// A small, fixed English stop-word list. Not exhaustive by design — the
/// spec defines stop-word-ness as "in the configured set", so callers with
/// different needs are expected to supply their own [`EngineConfig`].
pub fn default_stop_words() -> BTreeSet<String> {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
        "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
        "these", "they", "this", "to", "was", "will", "with",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_toml() {
        let cfg = EngineConfig::default();
        let toml = cfg.to_toml_string().expect("serialize");
        let back = EngineConfig::from_toml_str(&toml).expect("deserialize");
        assert_eq!(cfg, back);
    }

    #[test]
    fn default_has_no_empty_stop_words() {
        assert!(default_stop_words().iter().all(|w| w.len() >= 2));
    }
}
