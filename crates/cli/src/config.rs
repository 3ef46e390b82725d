use anyhow::{Context, Result};
use folio_vector_store::{
    DiskEmbeddingCache, EmbeddingCache, EmbeddingConfig, LayeredEmbeddingCache,
    MemoryEmbeddingCache, DEFAULT_MEMORY_CAPACITY,
};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "folio.toml";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FolioConfig {
    pub embedding: EmbeddingConfig,
    pub cache: CacheSettings,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    /// Directory for persisted embeddings; memory-only when unset.
    pub dir: Option<PathBuf>,
    pub memory_capacity: usize,
    /// Prune the disk cache down to this size after each semantic search.
    pub max_bytes: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: None,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            max_bytes: None,
        }
    }
}

/// Values given on the command line; they win over env and file.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub embed_mode: Option<String>,
    pub embed_model: Option<String>,
    pub embed_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
}

impl FolioConfig {
    /// Reads `path`, or `folio.toml` in the working directory when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    log::debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        let config = Self::parse(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(Into::into)
    }

    /// Layers environment variables, then CLI overrides, on top of the file values.
    #[must_use]
    pub fn resolve(mut self, overrides: &ConfigOverrides) -> Self {
        self.embedding = self.embedding.with_env_overrides();
        if let Ok(dir) = env::var("FOLIO_CACHE_DIR") {
            self.cache.dir = Some(PathBuf::from(dir));
        }

        if let Some(mode) = &overrides.embed_mode {
            self.embedding.mode = mode.clone();
        }
        if let Some(model) = &overrides.embed_model {
            self.embedding.model = model.clone();
        }
        if let Some(url) = &overrides.embed_url {
            self.embedding.url = url.clone();
        }
        if let Some(dir) = &overrides.cache_dir {
            self.cache.dir = Some(dir.clone());
        }
        self
    }
}

impl CacheSettings {
    pub fn disk_cache(&self) -> Option<DiskEmbeddingCache> {
        self.dir.as_ref().map(DiskEmbeddingCache::new)
    }

    pub fn build(&self) -> Box<dyn EmbeddingCache> {
        let memory = MemoryEmbeddingCache::new(self.memory_capacity);
        match self.disk_cache() {
            Some(disk) => Box::new(LayeredEmbeddingCache::new(memory, disk)),
            None => Box::new(memory),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn parses_full_config() {
        let config = FolioConfig::parse(
            r#"
            [embedding]
            mode = "ollama"
            model = "mxbai-embed-large"
            dimension = 1024
            max_batch = 64

            [cache]
            dir = ".folio/cache"
            memory_capacity = 10
            max_bytes = 1048576
            "#,
        )
        .unwrap();
        assert_eq!(config.embedding.mode, "ollama");
        assert_eq!(config.embedding.dimension, 1024);
        assert_eq!(config.embedding.max_batch, Some(64));
        assert_eq!(
            config.cache,
            CacheSettings {
                dir: Some(PathBuf::from(".folio/cache")),
                memory_capacity: 10,
                max_bytes: Some(1_048_576),
            }
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = FolioConfig::parse("").unwrap();
        assert_eq!(config.embedding, EmbeddingConfig::default());
        assert_eq!(config.cache, CacheSettings::default());
    }

    #[test]
    fn rejects_unknown_sections() {
        assert!(FolioConfig::parse("[index]\npath = \"x\"").is_err());
    }

    #[test]
    fn cli_overrides_win() {
        let overrides = ConfigOverrides {
            embed_mode: Some("stub".to_string()),
            cache_dir: Some(PathBuf::from("/tmp/folio-cache")),
            ..ConfigOverrides::default()
        };
        let config = FolioConfig::parse("[embedding]\nmode = \"ollama\"")
            .unwrap()
            .resolve(&overrides);
        assert_eq!(config.embedding.mode, "stub");
        assert_eq!(config.cache.dir, Some(PathBuf::from("/tmp/folio-cache")));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempdir().unwrap();
        let err = FolioConfig::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("Cannot read config"));
    }

    #[test]
    fn loads_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("folio.toml");
        std::fs::write(&path, "[cache]\nmemory_capacity = 3\n").unwrap();
        let config = FolioConfig::load(Some(&path)).unwrap();
        assert_eq!(config.cache.memory_capacity, 3);
        assert!(config.cache.disk_cache().is_none());
    }
}
