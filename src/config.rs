/// Configuration module for planpoker.
///
/// Handles loading, validating, and providing default configuration values,
/// plus the application context that caches the AI-availability check.
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::Db;

// ── Default value functions ──────────────────────────────────────────

fn default_db_path() -> String {
    "./planpoker.db".to_string()
}

fn default_strategy() -> String {
    "story_aware".to_string()
}

fn default_chunk_size() -> usize {
    500
}

fn default_overlap() -> usize {
    50
}

fn default_provider() -> String {
    "mock".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_top_k() -> usize {
    5
}

fn default_min_similarity() -> f32 {
    0.5
}

fn default_reasoning_api_base() -> String {
    "http://localhost:11434".to_string()
}

fn default_reasoning_model() -> String {
    "llama3".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    60
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub reasoning: ReasoningConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_strategy")]
    pub strategy: String,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Bearer key for remote providers; the provider-specific environment
    /// variable is consulted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReasoningConfig {
    #[serde(default = "default_reasoning_api_base")]
    pub api_base: String,

    #[serde(default = "default_reasoning_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            reasoning: ReasoningConfig::default(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            api_base: None,
            api_key: None,
            dimensions: default_dimensions(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_similarity: default_min_similarity(),
        }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            api_base: default_reasoning_api_base(),
            model: default_reasoning_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`.
    /// If the file does not exist, returns a default config and optionally
    /// generates a template file.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "config.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            // Generate template only for the default path
            if path == "config.json" {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.chunking.chunk_size > 0,
            "chunking.chunk_size must be positive"
        );
        anyhow::ensure!(
            self.chunking.overlap < self.chunking.chunk_size,
            "chunking.overlap must be smaller than chunk_size"
        );
        anyhow::ensure!(self.retrieval.top_k > 0, "retrieval.top_k must be positive");
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.retrieval.min_similarity),
            "retrieval.min_similarity must be in [0, 1]"
        );
        anyhow::ensure!(
            self.embedding.dimensions > 0,
            "embedding.dimensions must be positive"
        );
        anyhow::ensure!(
            self.reasoning.max_tokens > 0,
            "reasoning.max_tokens must be positive"
        );
        Ok(())
    }
}

// ── Application context ──────────────────────────────────────────────

/// Shared configuration plus a cached, explicitly invalidatable answer to
/// "can this instance do AI estimation right now?".
pub struct AppContext {
    pub config: Config,
    ai_available: Mutex<Option<bool>>,
}

impl AppContext {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ai_available: Mutex::new(None),
        }
    }

    /// Whether AI estimation can run: a usable provider and at least one
    /// stored embedding to retrieve against. The answer is computed once
    /// and cached until [`AppContext::invalidate_ai_cache`] is called.
    pub fn ai_available(&self, db: &Db) -> bool {
        let mut cache = match self.ai_available.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(cached) = *cache {
            return cached;
        }

        let provider_ok = match self.config.embedding.provider.as_str() {
            "openai" => match self.config.embedding.api_key.as_deref() {
                Some(key) => !key.is_empty(),
                None => std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()),
            },
            _ => true,
        };
        let embeddings = db.count_embeddings().unwrap_or(0);
        let available = provider_ok && embeddings > 0;

        *cache = Some(available);
        available
    }

    /// Drop the cached availability answer so the next query recomputes it,
    /// e.g. after processing stories or changing credentials.
    pub fn invalidate_ai_cache(&self) {
        let mut cache = match self.ai_available.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *cache = None;
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.db_path, "./planpoker.db");
        assert_eq!(config.chunking.strategy, "story_aware");
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.overlap, 50);
        assert_eq!(config.embedding.provider, "mock");
        assert_eq!(config.embedding.dimensions, 384);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.min_similarity, 0.5);
        assert_eq!(config.reasoning.max_tokens, 1024);
    }

    #[test]
    fn test_load_from_json_partial() {
        let json = r#"{"db_path": "./test.db", "retrieval": {"top_k": 3}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.db_path, "./test.db");
        assert_eq!(config.retrieval.top_k, 3);
        // Unspecified fields fall back to defaults
        assert_eq!(config.retrieval.min_similarity, 0.5);
        assert_eq!(config.embedding.provider, "mock");
    }

    #[test]
    fn test_validate_ok() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_chunk_size() {
        let mut config = Config::default();
        config.chunking.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_overlap_must_be_smaller() {
        let mut config = Config::default();
        config.chunking.overlap = config.chunking.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_similarity_range() {
        let mut config = Config::default();
        config.retrieval.min_similarity = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.db_path, config.db_path);
        assert_eq!(parsed.chunking.strategy, config.chunking.strategy);
        assert_eq!(parsed.reasoning.model, config.reasoning.model);
    }

    #[test]
    fn test_ai_cache_recomputes_after_invalidate() {
        let db = Db::open_in_memory().unwrap();
        let ctx = AppContext::new(Config::default());

        // No embeddings stored yet
        assert!(!ctx.ai_available(&db));

        let story_id = db
            .create_story("Login page", Some("As a user..."), "alice", Some("archive"))
            .unwrap();
        let chunk_id = db
            .create_chunk("story", story_id, 0, "Title: Login page", "story_aware")
            .unwrap();
        db.create_embedding(chunk_id, &[0.1, 0.2], "mock_embedding_2")
            .unwrap();

        // Cached answer survives until invalidated
        assert!(!ctx.ai_available(&db));
        ctx.invalidate_ai_cache();
        assert!(ctx.ai_available(&db));
    }
}
