//! Phrase adjacency (spec §4.6): does a quoted range of query terms occur as
//! consecutive positions in a document's forward index?

use std::collections::BTreeMap;
use std::convert::TryInto;

use super::merge::intersect_sync;

/// Shift each position list by its term's offset within the phrase and
/// intersect them; the surviving values are the phrase's anchor positions
/// (the position of the phrase's first word in the document).
///
/// `terms_lower` must already be lower-cased; a term absent from `index`
/// contributes an empty list, which makes the whole intersection empty.
fn shifted_lists(index: &BTreeMap<String, Vec<u32>>, terms_lower: &[String]) -> Vec<Vec<u32>> {
    terms_lower
        .iter()
        .enumerate()
        .map(|(j, term)| match index.get(term) {
            None => Vec::new(),
            Some(positions) => positions
                .iter()
                .filter_map(|&x| (x as i64 - j as i64).try_into().ok())
                .collect(),
        })
        .collect()
}

/// All anchor positions at which `terms_lower` occurs consecutively in
/// `index`, in ascending order. Used by snippet construction, which needs
/// every occurrence rather than just the first.
pub fn anchor_positions(index: &BTreeMap<String, Vec<u32>>, terms_lower: &[String]) -> Vec<u32> {
    if terms_lower.is_empty() {
        return Vec::new();
    }
    intersect_sync(&shifted_lists(index, terms_lower), usize::MAX)
}

/// Whether `terms_lower` occurs consecutively anywhere in `index` (spec
/// §4.6's existential test, via a §4.5 intersection capped at 1).
pub fn matches(index: &BTreeMap<String, Vec<u32>>, terms_lower: &[String]) -> bool {
    if terms_lower.is_empty() {
        return true;
    }
    !intersect_sync(&shifted_lists(index, terms_lower), 1).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_from(pairs: &[(&str, &[u32])]) -> BTreeMap<String, Vec<u32>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect()
    }

    #[test]
    fn finds_anchor_for_adjacent_terms() {
        let index = index_from(&[("ancient", &[2]), ("civilizations", &[3])]);
        let terms = vec!["ancient".to_string(), "civilizations".to_string()];
        assert_eq!(anchor_positions(&index, &terms), vec![2]);
        assert!(matches(&index, &terms));
    }

    #[test]
    fn rejects_non_adjacent_terms() {
        let index = index_from(&[("planet", &[1]), ("sixth", &[9])]);
        let terms = vec!["planet".to_string(), "sixth".to_string()];
        assert!(anchor_positions(&index, &terms).is_empty());
        assert!(!matches(&index, &terms));
    }

    #[test]
    fn finds_every_occurrence() {
        let index = index_from(&[("gas", &[0, 10]), ("giant", &[1, 11])]);
        let terms = vec!["gas".to_string(), "giant".to_string()];
        assert_eq!(anchor_positions(&index, &terms), vec![0, 10]);
    }

    #[test]
    fn missing_term_yields_no_match() {
        let index = index_from(&[("ancient", &[2])]);
        let terms = vec!["ancient".to_string(), "ghost".to_string()];
        assert!(anchor_positions(&index, &terms).is_empty());
    }
}
