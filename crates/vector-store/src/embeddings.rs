use crate::error::{Result, VectorStoreError};
use crate::ollama::OllamaEmbedder;
use async_trait::async_trait;
use serde::Deserialize;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const DEFAULT_STUB_DIMENSION: usize = 384;
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Text-to-vector capability injected into semantic search.
///
/// Vectors from two providers are only comparable when their [`id`](Self::id)
/// matches; the id also scopes cached embeddings.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identity (backend and model), used for cache keys.
    fn id(&self) -> &str;

    fn dimension(&self) -> usize;

    /// Embed `texts`, returning one vector per input in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Rejects provider output that does not line up with its input.
pub fn validate_embeddings(
    expected_count: usize,
    dimension: usize,
    vectors: Vec<Vec<f32>>,
) -> Result<Vec<Vec<f32>>> {
    if vectors.len() != expected_count {
        return Err(VectorStoreError::EmbeddingError(format!(
            "provider returned {} vectors for {expected_count} inputs",
            vectors.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(VectorStoreError::InvalidDimension {
            expected: dimension,
            actual: bad.len(),
        });
    }
    Ok(vectors)
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Deterministic offline embedder: every distinct text maps to a pseudo-random
/// unit vector seeded from its bytes. Identical text always yields an identical
/// vector, unrelated texts are close to orthogonal.
pub struct StubEmbedder {
    id: String,
    dimension: usize,
    batch_calls: AtomicUsize,
}

impl StubEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            id: format!("stub/{dimension}"),
            dimension,
            batch_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed_batch` calls served so far.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::Relaxed)
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_STUB_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        Ok(texts
            .iter()
            .map(|text| stub_embed(text, self.dimension))
            .collect())
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    l2_normalize(&mut vec);
    vec
}

fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vec.iter_mut() {
            *value /= norm;
        }
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmbeddingMode {
    Stub,
    Ollama,
}

impl EmbeddingMode {
    pub fn from_name(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(Self::Stub),
            "ollama" => Ok(Self::Ollama),
            other => Err(VectorStoreError::EmbeddingError(format!(
                "Unsupported embedding mode '{other}' (expected 'stub' or 'ollama')"
            ))),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stub => "stub",
            Self::Ollama => "ollama",
        }
    }
}

/// Provider selection, read from the `[embedding]` table of the config file.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub mode: String,
    pub model: String,
    pub url: String,
    pub dimension: usize,
    pub max_batch: Option<usize>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::Stub.as_str().to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            url: DEFAULT_OLLAMA_URL.to_string(),
            dimension: DEFAULT_STUB_DIMENSION,
            max_batch: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl EmbeddingConfig {
    /// Applies `FOLIO_EMBEDDING_MODE`, `FOLIO_EMBEDDING_MODEL` and
    /// `FOLIO_EMBEDDING_URL` on top of the current values.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(mode) = env::var("FOLIO_EMBEDDING_MODE") {
            self.mode = mode;
        }
        if let Ok(model) = env::var("FOLIO_EMBEDDING_MODEL") {
            self.model = model;
        }
        if let Ok(url) = env::var("FOLIO_EMBEDDING_URL") {
            self.url = url;
        }
        self
    }
}

/// Builds the provider described by `config`.
pub fn build_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    if config.dimension == 0 {
        return Err(VectorStoreError::EmbeddingError(
            "embedding dimension must be greater than zero".to_string(),
        ));
    }
    let mode = EmbeddingMode::from_name(&config.mode)?;
    log::debug!(
        "Building {} embedding provider (dimension {})",
        mode.as_str(),
        config.dimension
    );
    match mode {
        EmbeddingMode::Stub => Ok(Arc::new(StubEmbedder::new(config.dimension))),
        EmbeddingMode::Ollama => Ok(Arc::new(OllamaEmbedder::new(
            &config.url,
            &config.model,
            config.dimension,
            config.timeout_secs,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_is_deterministic_and_unit_length() {
        let embedder = StubEmbedder::new(16);
        let texts = vec!["gato negro".to_string(), "gato negro".to_string()];
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors[0], vectors[1]);
        let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(embedder.batch_calls(), 1);
    }

    #[tokio::test]
    async fn stub_distinguishes_texts() {
        let embedder = StubEmbedder::default();
        let texts = vec!["gato".to_string(), "perro".to_string()];
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        let sim = cosine_similarity(&vectors[0], &vectors[1]);
        assert!(sim < 0.5, "unexpected similarity {sim}");
        assert_eq!(embedder.id(), "stub/384");
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn validate_rejects_count_and_dimension_mismatch() {
        let err = validate_embeddings(2, 2, vec![vec![0.0, 1.0]]).unwrap_err();
        assert!(matches!(err, VectorStoreError::EmbeddingError(_)));

        let err = validate_embeddings(1, 3, vec![vec![0.0, 1.0]]).unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::InvalidDimension {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn build_provider_rejects_unknown_mode() {
        let config = EmbeddingConfig {
            mode: "onnx".to_string(),
            ..EmbeddingConfig::default()
        };
        let Err(err) = build_provider(&config) else {
            panic!("expected unknown mode to fail");
        };
        assert!(err.to_string().contains("Unsupported embedding mode 'onnx'"));
    }

    #[test]
    fn build_provider_defaults_to_stub() {
        let provider = build_provider(&EmbeddingConfig::default()).unwrap();
        assert_eq!(provider.id(), "stub/384");
        assert_eq!(provider.dimension(), DEFAULT_STUB_DIMENSION);
    }

    #[test]
    fn config_parses_partial_table() {
        let config: EmbeddingConfig =
            serde_json::from_str(r#"{"mode":"ollama","dimension":768}"#).unwrap();
        assert_eq!(config.mode, "ollama");
        assert_eq!(config.dimension, 768);
        assert_eq!(config.url, DEFAULT_OLLAMA_URL);
    }
}
