use crate::error::{Result, SearchError};
use crate::normalize::normalize_text;
use std::collections::HashSet;

/// A query term in raw and canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    raw: String,
    normalized: String,
}

impl QueryTerm {
    /// Fails with [`SearchError::InvalidQuery`] when the term normalizes to nothing.
    pub fn new(raw: &str) -> Result<Self> {
        let normalized = normalize_text(raw);
        if normalized.is_empty() {
            return Err(SearchError::InvalidQuery(format!("term {raw:?} is blank")));
        }
        Ok(Self {
            raw: raw.to_string(),
            normalized,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

/// Validates a term list and drops repeated raw terms, keeping first occurrences.
pub fn prepare_terms<S: AsRef<str>>(terms: &[S]) -> Result<Vec<QueryTerm>> {
    if terms.is_empty() {
        return Err(SearchError::InvalidQuery("no search terms given".to_string()));
    }
    let mut seen = HashSet::new();
    let mut prepared = Vec::with_capacity(terms.len());
    for term in terms {
        let term = QueryTerm::new(term.as_ref())?;
        if seen.insert(term.raw.clone()) {
            prepared.push(term);
        }
    }
    Ok(prepared)
}

/// Splits free-form user input into terms on whitespace.
pub fn split_query(input: &str) -> Vec<String> {
    input.split_whitespace().map(ToString::to_string).collect()
}

/// The single query string used by semantic search: terms joined by spaces.
pub fn join_query<S: AsRef<str>>(terms: &[S]) -> String {
    terms
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}
