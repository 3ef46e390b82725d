//! Page search over an in-memory document: exact counting, position-weighted
//! relevance, embedding similarity, and an integrator that runs one of them.

mod document;
mod error;
mod exact;
mod heuristic;
mod integrated;
mod normalize;
mod query;
mod score;
mod semantic;

pub use document::{Document, Page};
pub use error::{Result, SearchError};
pub use exact::{count_occurrences, exact_search, ExactMatches, PageCounts};
pub use folio_protocol::{ExactRow, HeuristicRow, ResultRow, SearchMode, SemanticRow};
pub use heuristic::{heuristic_search, rank_matches};
pub use integrated::{integrated_search, IntegratedOptions};
pub use normalize::normalize_text;
pub use query::{join_query, prepare_terms, split_query, QueryTerm};
pub use semantic::SemanticSearch;

/// Parses a user-supplied mode name.
pub fn parse_mode(name: &str) -> Result<SearchMode> {
    name.parse::<SearchMode>().map_err(Into::into)
}
