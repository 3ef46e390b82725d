use crate::document::Document;
use crate::error::Result;
use crate::normalize::normalize_text;
use crate::query::{join_query, prepare_terms};
use crate::score::{descending, round_to};
use folio_protocol::SemanticRow;
use folio_vector_store::{
    cosine_similarity, validate_embeddings, CacheKey, EmbeddingCache, EmbeddingProvider,
    VectorStoreError,
};
use std::collections::HashMap;

/// Embedding-based page ranking.
///
/// Page texts and tokens do not depend on the query, so they are embedded in
/// batches and, when a cache is attached, served from it on later queries.
/// Only the query vector is computed on every call.
pub struct SemanticSearch<'a> {
    provider: &'a dyn EmbeddingProvider,
    cache: Option<&'a dyn EmbeddingCache>,
    max_batch: Option<usize>,
}

impl<'a> SemanticSearch<'a> {
    pub fn new(provider: &'a dyn EmbeddingProvider) -> Self {
        Self {
            provider,
            cache: None,
            max_batch: None,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: &'a dyn EmbeddingCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Caps the number of texts per provider call. `0` means unbounded.
    #[must_use]
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = (max_batch > 0).then_some(max_batch);
        self
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    /// Ranks pages by cosine similarity to the joined query and reports the
    /// closest token on each page. Any provider failure aborts the search.
    pub async fn search<S: AsRef<str>>(
        &self,
        document: &Document,
        terms: &[S],
    ) -> Result<Vec<SemanticRow>> {
        prepare_terms(terms)?;
        let query = join_query(terms);
        if document.is_empty() {
            return Ok(Vec::new());
        }

        let page_texts: Vec<String> = document
            .pages()
            .iter()
            .map(|page| page.normalized().to_string())
            .collect();
        let (tokens, token_positions) = distinct_tokens(&page_texts);

        log::debug!(
            "Semantic search via {}: {} pages, {} distinct tokens",
            self.provider.id(),
            page_texts.len(),
            tokens.len()
        );

        let query_texts = vec![normalize_text(&query)];
        let (mut query_vectors, page_vectors, token_vectors) = tokio::try_join!(
            self.embed_batched(&query_texts),
            self.embed_cached(&page_texts),
            self.embed_cached(&tokens),
        )?;
        let query_vector = query_vectors.pop().ok_or_else(|| {
            VectorStoreError::EmbeddingError("Empty embedding result for query".to_string())
        })?;

        let mut rows: Vec<SemanticRow> = document
            .pages()
            .iter()
            .zip(&page_vectors)
            .zip(&page_texts)
            .map(|((page, page_vector), text)| {
                let page_similarity = cosine_similarity(&query_vector, page_vector);
                let best = best_token(text, &query_vector, &token_positions, &token_vectors);
                SemanticRow {
                    page: page.index(),
                    page_similarity: round_to(f64::from(page_similarity), 4),
                    best_token: best.map(|(token, _)| token.to_string()),
                    token_similarity: best.map(|(_, sim)| round_to(f64::from(sim), 4)),
                    query: query.clone(),
                }
            })
            .collect();

        rows.sort_by(|a, b| descending(a.page_similarity, b.page_similarity));
        log::info!(
            "Semantic search ranked {} pages for {:?}",
            rows.len(),
            query
        );
        Ok(rows)
    }

    /// Embeds `texts` through the cache; only misses reach the provider.
    async fn embed_cached(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let Some(cache) = self.cache else {
            return self.embed_batched(texts).await;
        };

        let dimension = self.provider.dimension();
        let mut vectors: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut misses = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let cached = cache
                .get(&CacheKey::new(self.provider.id(), text), dimension)
                .await;
            if cached.is_none() {
                misses.push(i);
            }
            vectors.push(cached);
        }

        log::debug!(
            "Embedding cache: {} hits, {} misses",
            texts.len() - misses.len(),
            misses.len()
        );

        let miss_texts: Vec<String> = misses.iter().map(|&i| texts[i].clone()).collect();
        let fresh = self.embed_batched(&miss_texts).await?;
        for (i, vector) in misses.into_iter().zip(fresh) {
            let key = CacheKey::new(self.provider.id(), &texts[i]);
            if let Err(err) = cache.put(&key, &vector).await {
                log::warn!("Failed to cache embedding: {err}");
            }
            vectors[i] = Some(vector);
        }

        vectors.into_iter().collect::<Option<Vec<_>>>().ok_or_else(|| {
            VectorStoreError::EmbeddingError("Missing embedding after cache fill".to_string())
                .into()
        })
    }

    /// Embeds `texts` in as few provider calls as `max_batch` allows.
    async fn embed_batched(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let chunk_size = self.max_batch.unwrap_or(texts.len());
        let dimension = self.provider.dimension();
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(chunk_size) {
            let embedded = self.provider.embed_batch(chunk).await?;
            vectors.extend(validate_embeddings(chunk.len(), dimension, embedded)?);
        }
        Ok(vectors)
    }
}

/// Distinct whitespace tokens across all pages, in first-seen order.
fn distinct_tokens(page_texts: &[String]) -> (Vec<String>, HashMap<String, usize>) {
    let mut tokens = Vec::new();
    let mut positions = HashMap::new();
    for text in page_texts {
        for token in text.split_whitespace() {
            if !positions.contains_key(token) {
                positions.insert(token.to_string(), tokens.len());
                tokens.push(token.to_string());
            }
        }
    }
    (tokens, positions)
}

/// The page token most similar to the query; the first one wins on ties.
fn best_token<'t>(
    text: &'t str,
    query_vector: &[f32],
    positions: &HashMap<String, usize>,
    vectors: &[Vec<f32>],
) -> Option<(&'t str, f32)> {
    let mut best: Option<(&str, f32)> = None;
    for token in text.split_whitespace() {
        let Some(vector) = positions.get(token).and_then(|&i| vectors.get(i)) else {
            continue;
        };
        let similarity = cosine_similarity(query_vector, vector);
        if best.map_or(true, |(_, current)| similarity > current) {
            best = Some((token, similarity));
        }
    }
    best
}
