//! # Folio Vector Store
//!
//! Embedding providers, vector similarity and embedding caches used by
//! semantic page search.
//!
//! ## Architecture
//!
//! ```text
//! page texts / tokens
//!     │
//!     ├──> EmbeddingCache (memory LRU, disk, layered)
//!     │      └─> hit: cached vector
//!     │
//!     └──> EmbeddingProvider (stub, Ollama)
//!            └─> Vec<f32> per text, batched
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use folio_vector_store::{cosine_similarity, EmbeddingProvider, StubEmbedder};
//!
//! #[tokio::main]
//! async fn main() -> folio_vector_store::Result<()> {
//!     let embedder = StubEmbedder::new(384);
//!     let texts = vec!["gato negro".to_string(), "perro".to_string()];
//!     let vectors = embedder.embed_batch(&texts).await?;
//!     println!("{:.4}", cosine_similarity(&vectors[0], &vectors[1]));
//!     Ok(())
//! }
//! ```

mod embedding_cache;
mod embeddings;
mod error;
mod ollama;

pub use embedding_cache::{
    CacheKey, DiskEmbeddingCache, EmbeddingCache, LayeredEmbeddingCache, MemoryEmbeddingCache,
    DEFAULT_MEMORY_CAPACITY,
};
pub use embeddings::{
    build_provider, cosine_similarity, validate_embeddings, EmbeddingConfig, EmbeddingMode,
    EmbeddingProvider, StubEmbedder, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL,
    DEFAULT_STUB_DIMENSION,
};
pub use error::{Result, VectorStoreError};
pub use ollama::OllamaEmbedder;
