use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The closed set of page search strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchMode {
    Exact,
    Heuristic,
    Semantic,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized search mode '{0}' (expected exact, heuristic or semantic)")]
pub struct UnknownMode(pub String);

impl SearchMode {
    pub const ALL: [Self; 3] = [Self::Exact, Self::Heuristic, Self::Semantic];

    /// Tag written on integrated result rows.
    pub const fn as_str(self) -> &'static str {
        match self {
            SearchMode::Exact => "Exact",
            SearchMode::Heuristic => "Heuristic",
            SearchMode::Semantic => "Semantic",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "exact" => Some(SearchMode::Exact),
            "heuristic" => Some(SearchMode::Heuristic),
            "semantic" => Some(SearchMode::Semantic),
            _ => None,
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownMode(s.to_string()))
    }
}
