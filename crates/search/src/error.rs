use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unrecognized search mode '{0}' (expected exact, heuristic or semantic)")]
    UnrecognizedMode(String),

    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] folio_vector_store::VectorStoreError),
}

impl SearchError {
    /// Stable machine-readable code for error envelopes.
    pub const fn code(&self) -> &'static str {
        match self {
            SearchError::InvalidQuery(_) => "invalid_query",
            SearchError::UnrecognizedMode(_) => "unrecognized_mode",
            SearchError::ProviderUnavailable(_) => "provider_unavailable",
            SearchError::VectorStoreError(_) => "embedding_failed",
        }
    }
}

impl From<folio_protocol::UnknownMode> for SearchError {
    fn from(err: folio_protocol::UnknownMode) -> Self {
        SearchError::UnrecognizedMode(err.0)
    }
}
