//! Scoring (spec §4.8): an exclusive title-match family plus an additive
//! URL bonus.

use std::collections::BTreeSet;

use crate::config::ScoreWeights;
use crate::forward::ForwardRecord;
use crate::tokenizer::{ascii_lower, tokenize};

/// Score `doc` against `query_terms` (already lower-cased, non-stop). With
/// no weights configured callers should skip scoring entirely (spec §4.8:
/// "with no weights configured, the score is zero").
pub fn score(doc: &ForwardRecord, query_terms: &[String], weights: &ScoreWeights) -> f64 {
    let title_len = doc.title_token_count();
    let query_set: BTreeSet<&str> = query_terms.iter().map(|s| s.as_str()).collect();

    let title_score = if title_len > 0 && is_title_exact_match(doc, query_terms, title_len) {
        weights.title_exact_match
    } else if title_begins(doc, query_terms) {
        weights.title_begins
    } else if title_contains_in_beginning(doc, &query_set, title_len) {
        weights.title_contains_in_beginning
    } else {
        0.0
    };

    let mut total = title_score;
    if url_contains_all(&doc.url, &query_set) {
        total += weights.url_contains;
    }
    total
}

/// All query-term positions within the title span line up with the natural
/// sequence `0, 1, 2, …`, and there are exactly as many of them as the title
/// has tokens (spec §4.8, and the non-unique-term caveat in spec §9).
fn is_title_exact_match(doc: &ForwardRecord, query_terms: &[String], title_len: usize) -> bool {
    let mut matched_in_title: BTreeSet<usize> = BTreeSet::new();
    for term in query_terms {
        if let Some(positions) = doc.index.get(term) {
            for &p in positions {
                if (p as usize) < title_len {
                    matched_in_title.insert(p as usize);
                }
            }
        }
    }
    matched_in_title.len() == title_len && matched_in_title.iter().copied().eq(0..title_len)
}

fn title_begins(doc: &ForwardRecord, query_terms: &[String]) -> bool {
    query_terms
        .iter()
        .any(|t| doc.index.get(t).is_some_and(|ps| ps.contains(&0)))
}

fn title_contains_in_beginning(
    doc: &ForwardRecord,
    query_set: &BTreeSet<&str>,
    title_len: usize,
) -> bool {
    doc.words
        .iter()
        .take(title_len)
        .enumerate()
        .filter(|(_, w)| query_set.contains(ascii_lower(w).as_str()))
        .map(|(i, _)| i)
        .min()
        .is_some_and(|p| p < 3)
}

/// Every query term appears in `url` as a whole-token-boundary substring,
/// case-insensitively. The url is tokenized the same way document text is,
/// so "boundary" means the same thing as it does everywhere else in the
/// engine: a run of letters/digits/allowlisted letters.
fn url_contains_all(url: &str, query_set: &BTreeSet<&str>) -> bool {
    if query_set.is_empty() {
        return false;
    }
    let url_tokens: BTreeSet<String> = tokenize(url, true).words.into_iter().collect();
    query_set.iter().all(|t| url_tokens.contains(*t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> ScoreWeights {
        ScoreWeights {
            title_exact_match: 100.0,
            title_begins: 50.0,
            title_contains_in_beginning: 25.0,
            url_contains: 10.0,
        }
    }

    #[test]
    fn exact_title_match_scores_highest() {
        let doc = ForwardRecord::build("Jupiter", "the largest planet", "u://jupiter");
        let terms = vec!["jupiter".to_string()];
        assert_eq!(score(&doc, &terms, &weights()), 100.0);
    }

    #[test]
    fn title_begins_when_not_exact() {
        let doc = ForwardRecord::build("Jupiter facts", "the largest planet", "u://jupiter");
        let terms = vec!["jupiter".to_string()];
        assert_eq!(score(&doc, &terms, &weights()), 50.0);
    }

    #[test]
    fn title_contains_in_beginning_scores_when_not_at_zero() {
        let doc = ForwardRecord::build("The Mighty Jupiter", "gas giant", "u://jupiter");
        let terms = vec!["jupiter".to_string()];
        assert_eq!(score(&doc, &terms, &weights()), 25.0);
    }

    #[test]
    fn url_bonus_is_additive() {
        let doc = ForwardRecord::build("Facts", "gas giant", "https://en.wikipedia.org/wiki/Jupiter");
        let terms = vec!["jupiter".to_string()];
        assert_eq!(score(&doc, &terms, &weights()), 10.0);
    }

    #[test]
    fn no_match_scores_zero() {
        let doc = ForwardRecord::build("Saturn", "rings", "u://saturn");
        let terms = vec!["jupiter".to_string()];
        assert_eq!(score(&doc, &terms, &weights()), 0.0);
    }
}
