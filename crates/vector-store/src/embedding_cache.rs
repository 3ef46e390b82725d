use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const CACHE_MAGIC: &[u8; 4] = b"FV01";
pub const DEFAULT_MEMORY_CAPACITY: usize = 4096;

/// Cache key: provider identity plus the SHA-256 of the embedded text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    provider: String,
    text_hash: String,
}

impl CacheKey {
    pub fn new(provider: &str, text: &str) -> Self {
        Self {
            provider: provider.to_string(),
            text_hash: format!("{:x}", Sha256::digest(text.as_bytes())),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn text_hash(&self) -> &str {
        &self.text_hash
    }
}

/// Read-through store for query-independent embeddings.
#[async_trait]
pub trait EmbeddingCache: Send + Sync {
    /// Returns the cached vector when present and of the expected dimension.
    async fn get(&self, key: &CacheKey, dimension: usize) -> Option<Vec<f32>>;

    async fn put(&self, key: &CacheKey, vector: &[f32]) -> Result<()>;
}

/// Process-local LRU of embeddings.
pub struct MemoryEmbeddingCache {
    entries: Mutex<LruCache<CacheKey, Vec<f32>>>,
}

impl MemoryEmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryEmbeddingCache {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

#[async_trait]
impl EmbeddingCache for MemoryEmbeddingCache {
    async fn get(&self, key: &CacheKey, dimension: usize) -> Option<Vec<f32>> {
        let mut guard = self.entries.lock().ok()?;
        guard
            .get(key)
            .filter(|vector| vector.len() == dimension)
            .cloned()
    }

    async fn put(&self, key: &CacheKey, vector: &[f32]) -> Result<()> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| VectorStoreError::Other("Failed to lock embedding cache".into()))?;
        guard.put(key.clone(), vector.to_vec());
        Ok(())
    }
}

/// One binary file per embedding, sharded by hash prefix.
#[derive(Clone, Debug)]
pub struct DiskEmbeddingCache {
    base_dir: PathBuf,
}

impl DiskEmbeddingCache {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn vector_path(&self, key: &CacheKey) -> PathBuf {
        let (shard_a, shard_b) = shard_dirs(key.text_hash());
        self.base_dir
            .join(safe_component(key.provider()))
            .join(shard_a)
            .join(shard_b)
            .join(format!("{}.bin", key.text_hash()))
    }

    /// Removes the oldest files until the cache fits in `max_bytes`.
    pub async fn prune(&self, max_bytes: u64) {
        if max_bytes == 0 {
            return;
        }
        let root = self.base_dir.clone();
        let _ = tokio::task::spawn_blocking(move || prune_dir(&root, max_bytes)).await;
    }
}

#[async_trait]
impl EmbeddingCache for DiskEmbeddingCache {
    async fn get(&self, key: &CacheKey, dimension: usize) -> Option<Vec<f32>> {
        let path = self.vector_path(key);
        let bytes = tokio::fs::read(&path).await.ok()?;
        decode_vector(&bytes, dimension)
    }

    async fn put(&self, key: &CacheKey, vector: &[f32]) -> Result<()> {
        let path = self.vector_path(key);
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = encode_vector(vector);
        let tmp = path.with_extension("bin.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        commit_tmp(&tmp, &path).await;
        Ok(())
    }
}

/// Memory in front of disk. Disk hits are promoted into memory.
pub struct LayeredEmbeddingCache {
    memory: MemoryEmbeddingCache,
    disk: DiskEmbeddingCache,
}

impl LayeredEmbeddingCache {
    pub fn new(memory: MemoryEmbeddingCache, disk: DiskEmbeddingCache) -> Self {
        Self { memory, disk }
    }
}

#[async_trait]
impl EmbeddingCache for LayeredEmbeddingCache {
    async fn get(&self, key: &CacheKey, dimension: usize) -> Option<Vec<f32>> {
        if let Some(vector) = self.memory.get(key, dimension).await {
            return Some(vector);
        }
        let vector = self.disk.get(key, dimension).await?;
        if let Err(err) = self.memory.put(key, &vector).await {
            log::warn!("Failed to promote cached embedding: {err}");
        }
        Some(vector)
    }

    async fn put(&self, key: &CacheKey, vector: &[f32]) -> Result<()> {
        self.memory.put(key, vector).await?;
        self.disk.put(key, vector).await
    }
}

fn safe_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        "_".to_string()
    } else {
        out
    }
}

fn shard_dirs(hex: &str) -> (String, String) {
    let a = hex.get(0..2).unwrap_or("00").to_string();
    let b = hex.get(2..4).unwrap_or("00").to_string();
    (a, b)
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + vector.len() * 4);
    out.extend_from_slice(CACHE_MAGIC);
    #[allow(clippy::cast_possible_truncation)]
    let dim = vector.len() as u32;
    out.extend_from_slice(&dim.to_le_bytes());
    for v in vector {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

fn decode_vector(bytes: &[u8], expected_dimension: usize) -> Option<Vec<f32>> {
    if bytes.len() < 8 || &bytes[0..4] != CACHE_MAGIC {
        return None;
    }
    let dim = u32::from_le_bytes(bytes[4..8].try_into().ok()?) as usize;
    if dim != expected_dimension {
        return None;
    }
    let payload = &bytes[8..];
    if payload.len() != dim.saturating_mul(4) {
        return None;
    }
    payload
        .chunks_exact(4)
        .map(|chunk| chunk.try_into().ok().map(f32::from_le_bytes))
        .collect()
}

/// Moves a finished temp file into place. A failed rename drops the temp file
/// and leaves the entry uncached.
async fn commit_tmp(tmp: &Path, path: &Path) -> bool {
    match tokio::fs::rename(tmp, path).await {
        Ok(()) => true,
        Err(err) => {
            log::warn!("Failed to store embedding at {}: {err}", path.display());
            let _ = tokio::fs::remove_file(tmp).await;
            false
        }
    }
}

fn prune_dir(root: &Path, max_bytes: u64) {
    let mut files = Vec::new();
    let mut total = 0u64;
    collect_files(root, &mut files, &mut total);
    if total <= max_bytes {
        return;
    }
    files.sort_by(|a, b| a.modified.cmp(&b.modified));
    let mut removed = 0usize;
    for file in files {
        if total <= max_bytes {
            break;
        }
        if std::fs::remove_file(&file.path).is_ok() {
            total = total.saturating_sub(file.len);
            removed += 1;
        }
    }
    log::debug!("Pruned {removed} cached embeddings under {}", root.display());
}

struct FileEntry {
    path: PathBuf,
    len: u64,
    modified: std::time::SystemTime,
}

fn collect_files(root: &Path, out: &mut Vec<FileEntry>, total: &mut u64) {
    let Ok(read_dir) = std::fs::read_dir(root) else {
        return;
    };
    for entry in read_dir.flatten() {
        let path = entry.path();
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_dir() {
            collect_files(&path, out, total);
            continue;
        }
        let len = meta.len();
        let modified = meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        *total = total.saturating_add(len);
        out.push(FileEntry {
            path,
            len,
            modified,
        });
    }
}
