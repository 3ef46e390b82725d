use crate::config::FolioConfig;
use crate::pages::load_pages;
use anyhow::{Context, Result};
use folio_protocol::{ErrorEnvelope, ResponseMeta, SearchResponse};
use folio_search::{
    exact_search, heuristic_search, integrated_search, parse_mode, split_query, Document,
    IntegratedOptions, SearchError, SearchMode, SemanticSearch,
};
use folio_vector_store::{build_provider, EmbeddingCache, EmbeddingProvider};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub const INTEGRATED_MODE: &str = "Integrated";

#[derive(Debug, Clone)]
pub enum SearchKind {
    /// Mode name as typed by the user; parsed when the request runs.
    Single(String),
    Integrated(IntegratedOptions),
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub pages: PathBuf,
    pub terms: Vec<String>,
    pub kind: SearchKind,
}

impl SearchRequest {
    /// A single argument is a whole query line and is split on whitespace;
    /// several arguments are taken as individual terms.
    pub fn query_terms(&self) -> Vec<String> {
        match self.terms.as_slice() {
            [line] => split_query(line),
            terms => terms.to_vec(),
        }
    }
}

/// Provider and cache kept alive for the duration of one request.
struct SemanticBackend {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Box<dyn EmbeddingCache>,
    max_batch: usize,
}

impl SemanticBackend {
    fn build(config: &FolioConfig) -> Result<Self, SearchError> {
        let provider = build_provider(&config.embedding)
            .map_err(|err| SearchError::ProviderUnavailable(err.to_string()))?;
        log::debug!("Using embedding provider {}", provider.id());
        Ok(Self {
            provider,
            cache: config.cache.build(),
            max_batch: config.embedding.max_batch.unwrap_or(0),
        })
    }

    fn search(&self) -> SemanticSearch<'_> {
        SemanticSearch::new(self.provider.as_ref())
            .with_cache(self.cache.as_ref())
            .with_max_batch(self.max_batch)
    }
}

/// Runs a request and wraps the outcome, success or failure, in a response
/// envelope.
pub async fn execute(request: &SearchRequest, config: &FolioConfig) -> SearchResponse {
    let started = Instant::now();
    let mut meta = ResponseMeta::default();
    let outcome = run(request, config, &mut meta).await;
    meta.duration_ms = Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));

    match outcome {
        Ok((mode, results)) => {
            let empty = match &results {
                Value::Array(rows) => rows.is_empty(),
                Value::Object(map) => map.is_empty(),
                _ => false,
            };
            if empty {
                log::info!("No matches found");
            }
            SearchResponse::ok(mode, results, meta)
        }
        Err(err) => {
            let envelope = classify_error(&err);
            log::error!("{} ({})", envelope.message, envelope.code);
            SearchResponse::error(envelope, meta)
        }
    }
}

async fn run(
    request: &SearchRequest,
    config: &FolioConfig,
    meta: &mut ResponseMeta,
) -> Result<(String, Value)> {
    let options = match &request.kind {
        SearchKind::Single(name) => IntegratedOptions::for_mode(parse_mode(name)?),
        SearchKind::Integrated(options) => *options,
    };
    let document = load_pages(&request.pages)?;
    let terms = request.query_terms();
    meta.pages = Some(document.len());
    meta.terms = Some(terms.len());

    let backend = if options.use_semantic {
        Some(SemanticBackend::build(config)?)
    } else {
        None
    };
    let semantic = backend.as_ref().map(SemanticBackend::search);
    meta.embedding_provider = semantic.as_ref().map(|s| s.provider_id().to_string());

    let output = match &request.kind {
        SearchKind::Single(_) => {
            let mode = options.mode();
            let results = run_single(mode, &document, &terms, semantic.as_ref()).await?;
            (mode.as_str().to_string(), results)
        }
        SearchKind::Integrated(options) => {
            let rows = integrated_search(&document, &terms, *options, semantic.as_ref()).await?;
            (INTEGRATED_MODE.to_string(), serde_json::to_value(rows)?)
        }
    };

    if let Some(max_bytes) = config.cache.max_bytes.filter(|_| backend.is_some()) {
        if let Some(disk) = config.cache.disk_cache() {
            disk.prune(max_bytes).await;
        }
    }
    Ok(output)
}

async fn run_single(
    mode: SearchMode,
    document: &Document,
    terms: &[String],
    semantic: Option<&SemanticSearch<'_>>,
) -> Result<Value> {
    let value = match mode {
        SearchMode::Exact => serde_json::to_value(exact_search(document, terms)?)?,
        SearchMode::Heuristic => serde_json::to_value(heuristic_search(document, terms)?)?,
        SearchMode::Semantic => {
            let semantic = semantic.ok_or_else(|| {
                SearchError::ProviderUnavailable("no embedding provider configured".to_string())
            })?;
            serde_json::to_value(semantic.search(document, terms).await?)?
        }
    };
    Ok(value)
}

pub fn classify_error(err: &anyhow::Error) -> ErrorEnvelope {
    let message = format!("{err:#}");
    let Some(search) = err.downcast_ref::<SearchError>() else {
        return ErrorEnvelope {
            code: "invalid_input".to_string(),
            message,
            hint: Some(
                "Check the pages file (JSON array or form-feed separated text) and the config file."
                    .to_string(),
            ),
        };
    };

    let hint = match search {
        SearchError::InvalidQuery(_) => "Pass at least one non-blank search term.",
        SearchError::UnrecognizedMode(_) => "Use --mode exact, heuristic or semantic.",
        SearchError::ProviderUnavailable(_) => {
            "Set --embed-mode stub for offline runs or point --embed-url at a running Ollama server."
        }
        SearchError::VectorStoreError(_) => {
            "The embedding provider failed; rerun with --verbose for details."
        }
    };
    ErrorEnvelope {
        code: search.code().to_string(),
        message,
        hint: Some(hint.to_string()),
    }
}

pub fn normalize_command(text: &str) -> Result<String> {
    let normalized = folio_search::normalize_text(text);
    serde_json::to_string(&serde_json::json!({ "input": text, "normalized": normalized }))
        .context("Failed to encode normalized text")
}
