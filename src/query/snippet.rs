//! Snippet ("ingress"/"introduction") construction (spec §4.7).

use std::collections::BTreeSet;

use crate::forward::ForwardRecord;
use crate::tokenizer::{ascii_lower, is_stop_word, Tokenized};

use super::phrase::anchor_positions;

const OPEN_MARKER: &str = "\"-";
const CLOSE_MARKER: &str = "-\"";

/// Build the introduction text for `doc` against `query`.
///
/// Stop words contribute phrase positions (inner phrase terms are ordinary
/// terms, spec §6.4) but never contribute to the free set on their own,
/// since an unmatched stop word is never part of what made this document a
/// hit and would otherwise sprinkle every snippet with highlighted "the"s.
pub fn build(query: &Tokenized, stop_words: &BTreeSet<String>, doc: &ForwardRecord) -> String {
    let quoted_positions = query.quoted_positions();
    let mut positions: BTreeSet<u32> = BTreeSet::new();

    for (a, b) in query.quote_ranges() {
        let terms_lower: Vec<String> = query.words[a..b].iter().map(|w| ascii_lower(w)).collect();
        let m = terms_lower.len() as u32;
        for anchor in anchor_positions(&doc.index, &terms_lower) {
            for j in 0..m {
                positions.insert(anchor + j);
            }
        }
    }

    for (i, w) in query.words.iter().enumerate() {
        if quoted_positions.contains(&i) {
            continue;
        }
        let lower = ascii_lower(w);
        if is_stop_word(&lower, stop_words) {
            continue;
        }
        if let Some(doc_positions) = doc.index.get(&lower) {
            positions.extend(doc_positions.iter().copied());
        }
    }

    if positions.is_empty() {
        return String::new();
    }

    let runs = consecutive_runs(&positions);
    let mut tokens: Vec<String> = Vec::new();
    for (i, &(start, end)) in runs.iter().enumerate() {
        if i > 0 && start > runs[i - 1].1 + 1 {
            tokens.push("...".to_string());
        }
        let left_start = (start as usize).saturating_sub(2);
        for p in left_start..(start as usize) {
            tokens.push(doc.words[p].clone());
        }
        tokens.push(OPEN_MARKER.to_string());
        for p in (start as usize)..=(end as usize) {
            if let Some(word) = doc.words.get(p) {
                tokens.push(word.clone());
            }
        }
        tokens.push(CLOSE_MARKER.to_string());
        let right_end = ((end as usize) + 1 + 2).min(doc.words.len());
        for p in ((end as usize) + 1)..right_end {
            tokens.push(doc.words[p].clone());
        }
    }

    tokens
        .join(" ")
        .replace(&format!("{OPEN_MARKER} "), "\"")
        .replace(&format!(" {CLOSE_MARKER}"), "\"")
}

/// Group an ascending set of positions into maximal `[start, end]` runs of
/// consecutive integers.
fn consecutive_runs(positions: &BTreeSet<u32>) -> Vec<(u32, u32)> {
    let mut runs = Vec::new();
    let mut iter = positions.iter().copied();
    let Some(first) = iter.next() else {
        return runs;
    };
    let mut start = first;
    let mut end = first;
    for p in iter {
        if p == end + 1 {
            end = p;
        } else {
            runs.push((start, end));
            start = p;
            end = p;
        }
    }
    runs.push((start, end));
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn stop_words() -> BTreeSet<String> {
        crate::config::default_stop_words()
    }

    #[test]
    fn highlights_repeated_free_term_with_ellipsis_between() {
        let doc = ForwardRecord::build(
            "Jupiter",
            "Jupiter is the brightest planet at night but not always the brightest of all",
            "u://jupiter",
        );
        let query = tokenize("brightest", false);
        let snippet = build(&query, &stop_words(), &doc);
        assert_eq!(snippet.matches("\"brightest\"").count(), 2);
        assert!(snippet.contains("..."));
    }

    #[test]
    fn exact_phrase_snippet_matches_spec_example() {
        let doc = ForwardRecord::build(
            "Jupiter",
            "Jupiter has been known to ancient civilizations since before recorded history",
            "u://jupiter",
        );
        let query = tokenize(r#""ancient civilizations""#, false);
        let snippet = build(&query, &stop_words(), &doc);
        assert_eq!(snippet, "known to \"ancient civilizations\" since before");
    }

    #[test]
    fn phrase_and_free_term_combine_with_some_separator() {
        let doc = ForwardRecord::build(
            "Jupiter",
            "the four largest moons were discovered orbiting far from the Sun long before the Moon was understood",
            "u://jupiter",
        );
        let query = tokenize(r#""from the Sun" Moon"#, false);
        let snippet = build(&query, &stop_words(), &doc);
        let re = regex_lite_match(&snippet, "\"from the Sun\"", "\"Moon\"");
        assert!(re, "snippet was: {snippet}");
    }

    fn regex_lite_match(haystack: &str, first: &str, second: &str) -> bool {
        match haystack.find(first) {
            Some(i) => haystack[i + first.len()..].contains(second),
            None => false,
        }
    }

    #[test]
    fn no_matches_yields_empty_snippet() {
        let doc = ForwardRecord::build("Saturn", "has rings", "u://saturn");
        let query = tokenize("jupiter", false);
        assert_eq!(build(&query, &stop_words(), &doc), "");
    }
}
