//! Result schemas shared by the Folio search modes and their front-ends.
//!
//! Page numbers in every schema are 1-based.

use anyhow::Result;
use serde::{Deserialize, Serialize};

mod mode;

pub use mode::{SearchMode, UnknownMode};

/// One (term, page) pair produced by exact search, flattened for integrated output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactRow {
    pub term: String,
    pub page: usize,
    pub occurrences: usize,
}

/// Position-weighted relevance of a single term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicRow {
    pub term: String,
    pub total_frequency: usize,
    /// Matched pages in ascending order.
    pub pages: Vec<usize>,
    /// Rounded to 3 decimals.
    pub relevance: f64,
}

/// Embedding similarity of one page against the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticRow {
    pub page: usize,
    /// Rounded to 4 decimals.
    pub page_similarity: f64,
    /// `None` when the page has no tokens.
    pub best_token: Option<String>,
    pub token_similarity: Option<f64>,
    pub query: String,
}

/// A row of integrated output, tagged with the mode that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum ResultRow {
    Exact(ExactRow),
    Heuristic(HeuristicRow),
    Semantic(SemanticRow),
}

impl ResultRow {
    pub const fn mode(&self) -> SearchMode {
        match self {
            ResultRow::Exact(_) => SearchMode::Exact,
            ResultRow::Heuristic(_) => SearchMode::Heuristic,
            ResultRow::Semantic(_) => SearchMode::Semantic,
        }
    }

    /// The field integrated output is ordered by.
    ///
    /// Occurrence counts, relevance scores and cosine similarities are not on the
    /// same scale; rows from different modes are compared as raw numbers anyway.
    #[allow(clippy::cast_precision_loss)]
    pub fn ranking_score(&self) -> f64 {
        match self {
            ResultRow::Exact(row) => row.occurrences as f64,
            ResultRow::Heuristic(row) => row.relevance,
            ResultRow::Semantic(row) => row.page_similarity,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Ok,
    Error,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ResponseMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Envelope printed by front-ends for every search request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SearchResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default)]
    pub results: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
    #[serde(default)]
    pub meta: ResponseMeta,
}

impl SearchResponse {
    pub fn ok(mode: impl Into<String>, results: serde_json::Value, meta: ResponseMeta) -> Self {
        Self {
            status: ResponseStatus::Ok,
            mode: Some(mode.into()),
            results,
            error: None,
            meta,
        }
    }

    pub fn error(error: ErrorEnvelope, meta: ResponseMeta) -> Self {
        Self {
            status: ResponseStatus::Error,
            mode: None,
            results: serde_json::Value::Null,
            error: Some(error),
            meta,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, ResponseStatus::Error)
    }
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}
