use crate::document::Document;
use crate::error::Result;
use crate::query::{prepare_terms, QueryTerm};
use folio_protocol::ExactRow;
use rayon::prelude::*;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, HashMap};

/// Pages (1-based) a term occurs on, with the occurrence count per page.
pub type PageCounts = BTreeMap<usize, usize>;

/// Term -> page -> count. Only non-zero counts are stored and each raw term
/// appears once, at the position of its first match in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExactMatches {
    entries: Vec<(String, PageCounts)>,
    positions: HashMap<String, usize>,
}

impl ExactMatches {
    pub(crate) fn record(&mut self, term: &str, page: usize, count: usize) {
        if count == 0 {
            return;
        }
        let position = match self.positions.get(term) {
            Some(&position) => position,
            None => {
                self.entries.push((term.to_string(), PageCounts::new()));
                self.positions
                    .insert(term.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        *self.entries[position].1.entry(page).or_insert(0) += count;
    }

    pub fn get(&self, term: &str) -> Option<&PageCounts> {
        self.positions.get(term).map(|&i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PageCounts)> {
        self.entries
            .iter()
            .map(|(term, pages)| (term.as_str(), pages))
    }

    /// Sum of the term's counts over all pages; 0 when it never matched.
    pub fn total_for(&self, term: &str) -> usize {
        self.get(term).map_or(0, |pages| pages.values().sum())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One row per (term, page), terms in match order and pages ascending.
    pub fn to_rows(&self) -> Vec<ExactRow> {
        self.iter()
            .flat_map(|(term, pages)| {
                pages.iter().map(move |(&page, &occurrences)| ExactRow {
                    term: term.to_string(),
                    page,
                    occurrences,
                })
            })
            .collect()
    }
}

impl Serialize for ExactMatches {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (term, pages) in &self.entries {
            map.serialize_entry(term, pages)?;
        }
        map.end()
    }
}

/// Non-overlapping, left-to-right occurrences of `needle` in `haystack`.
///
/// Both sides are expected in normalized form. Matching is on raw substrings,
/// so a term also matches inside longer words ("sol" in "girasol").
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Counts every term on every page.
///
/// Pages are scanned in parallel; partial counts are merged in page order so the
/// result does not depend on scheduling.
pub fn exact_search<S: AsRef<str>>(document: &Document, terms: &[S]) -> Result<ExactMatches> {
    let terms = prepare_terms(terms)?;
    Ok(count_terms(document, &terms))
}

pub(crate) fn count_terms(document: &Document, terms: &[QueryTerm]) -> ExactMatches {
    let per_page: Vec<Vec<(usize, usize)>> = document
        .pages()
        .par_iter()
        .map(|page| {
            let text = page.normalized();
            terms
                .iter()
                .enumerate()
                .filter_map(|(i, term)| {
                    let count = count_occurrences(text, term.normalized());
                    (count > 0).then_some((i, count))
                })
                .collect()
        })
        .collect();

    let mut matches = ExactMatches::default();
    for (page, hits) in document.pages().iter().zip(per_page) {
        for (term_idx, count) in hits {
            matches.record(terms[term_idx].raw(), page.index(), count);
        }
    }

    log::debug!(
        "Exact search: {} of {} terms matched across {} pages",
        matches.len(),
        terms.len(),
        document.len()
    );
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn counts_terms_per_page() {
        let doc = Document::from_texts(["gato negro", "gato blanco", "perro"]);
        let matches = exact_search(&doc, &["gato"]).unwrap();
        assert_eq!(
            serde_json::to_value(&matches).unwrap(),
            json!({"gato": {"1": 1, "2": 1}})
        );
    }

    #[test]
    fn matching_ignores_case_and_accents() {
        let doc = Document::from_texts(["El ÁRBOL y el árbol", "arbolito"]);
        let matches = exact_search(&doc, &["Árbol"]).unwrap();
        let pages = matches.get("Árbol").unwrap();
        assert_eq!(pages.get(&1), Some(&2));
        // substring match inside a longer word
        assert_eq!(pages.get(&2), Some(&1));
    }

    #[test]
    fn spacing_vowel_signs_distinguish_terms() {
        let doc = Document::from_texts(["\u{915}"]);
        let matches = exact_search(&doc, &["\u{915}\u{93F}"]).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn counts_are_non_overlapping() {
        let doc = Document::from_texts(["aaaa"]);
        let matches = exact_search(&doc, &["aa"]).unwrap();
        assert_eq!(matches.total_for("aa"), 2);
    }

    #[test]
    fn multi_word_terms_match_across_word_boundaries() {
        let doc = Document::from_texts(["el gato negro", "ungato negrosol"]);
        let matches = exact_search(&doc, &["gato negro"]).unwrap();
        let pages: Vec<usize> = matches.get("gato negro").unwrap().keys().copied().collect();
        assert_eq!(pages, vec![1, 2]);
    }

    #[test]
    fn unmatched_terms_are_absent() {
        let doc = Document::from_texts(["gato"]);
        let matches = exact_search(&doc, &["perro", "gato"]).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches.get("perro").is_none());
        assert_eq!(matches.total_for("perro"), 0);
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let doc = Document::from_texts(["gato"]);
        let matches = exact_search(&doc, &["jirafa"]).unwrap();
        assert!(matches.is_empty());
        assert_eq!(serde_json::to_value(&matches).unwrap(), json!({}));
    }

    #[test]
    fn duplicate_terms_are_counted_once() {
        let doc = Document::from_texts(["gato gato"]);
        let matches = exact_search(&doc, &["gato", "gato"]).unwrap();
        assert_eq!(matches.total_for("gato"), 2);
    }

    #[test]
    fn terms_are_ordered_by_first_match() {
        let doc = Document::from_texts(["perro", "gato perro"]);
        let matches = exact_search(&doc, &["gato", "perro"]).unwrap();
        let order: Vec<&str> = matches.iter().map(|(term, _)| term).collect();
        assert_eq!(order, vec!["perro", "gato"]);
    }

    #[test]
    fn rows_flatten_in_term_then_page_order() {
        let doc = Document::from_texts(["gato", "perro", "gato gato"]);
        let rows = exact_search(&doc, &["gato", "perro"]).unwrap().to_rows();
        let flat: Vec<(&str, usize, usize)> = rows
            .iter()
            .map(|r| (r.term.as_str(), r.page, r.occurrences))
            .collect();
        assert_eq!(flat, vec![("gato", 1, 1), ("gato", 3, 2), ("perro", 2, 1)]);
    }

    #[test]
    fn rejects_blank_query() {
        let doc = Document::from_texts(["gato"]);
        let empty: [&str; 0] = [];
        assert!(matches!(
            exact_search(&doc, &empty),
            Err(SearchError::InvalidQuery(_))
        ));
        assert!(matches!(
            exact_search(&doc, &[" "]),
            Err(SearchError::InvalidQuery(_))
        ));
    }

    #[test]
    fn empty_document_has_no_matches() {
        let doc = Document::default();
        assert!(exact_search(&doc, &["gato"]).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn parallel_counts_match_sequential_scan(
            pages in prop::collection::vec("[ab ]{0,24}", 0..12),
            term in "[ab]{1,3}",
        ) {
            let doc = Document::from_texts(pages.clone());
            let matches = exact_search(&doc, &[term.as_str()]).unwrap();
            for (i, text) in pages.iter().enumerate() {
                let expected = count_occurrences(&crate::normalize_text(text), &term);
                let got = matches.get(&term).and_then(|p| p.get(&(i + 1)).copied());
                prop_assert_eq!(got.unwrap_or(0), expected);
                prop_assert!(got != Some(0));
            }
        }
    }
}
