//! Embedding provider trait, byte packing, and the provider registry.
//!
//! A provider maps chunk text to a fixed-length `f32` vector. Backends are
//! interchangeable behind [`EmbeddingProvider`]; vectors are persisted as
//! little-endian float32 blobs whose length alone determines the dimension.

pub mod mock;
pub mod ollama;
pub mod openai;

use std::str::FromStr;

use thiserror::Error;

use crate::config::EmbeddingConfig;

pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

#[derive(Error, Debug)]
pub enum EmbedderError {
    /// Transport, authentication, or backend-side failure. Transient;
    /// batch callers skip the item and continue.
    #[error("embedding generation failed: {0}")]
    GenerationFailed(String),

    /// Unrecognized provider key. Fatal to the calling setup step.
    #[error("unknown embedding provider: {0}")]
    UnknownProvider(String),

    /// Provider is recognized but cannot be constructed (e.g. missing key).
    #[error("provider configuration error: {0}")]
    Configuration(String),
}

/// Trait for embedding backends.
///
/// Implementations must be `Send + Sync` for concurrent use behind `Arc`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text, returning the vector and its dimension.
    fn generate(&self, text: &str) -> Result<(Vec<f32>, usize), EmbedderError>;

    /// Stable identifier persisted alongside vectors. Combines provider
    /// family and model name so vectors from different models never mix.
    fn model_id(&self) -> String;

    /// Advertised input length ceiling, for truncation decisions upstream.
    fn max_context(&self) -> usize;

    /// Embed several texts in input order, one result per text.
    fn batch_generate(&self, texts: &[&str]) -> Result<Vec<(Vec<f32>, usize)>, EmbedderError> {
        texts.iter().map(|t| self.generate(t)).collect()
    }
}

/// Pack a vector as little-endian float32 bytes for BLOB storage.
#[must_use]
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Recover a vector from its byte blob. The element count is inferred from
/// the blob length alone; trailing bytes short of a full float are ignored.
#[must_use]
pub fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Closed set of provider keys accepted from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Mock,
    OpenAi,
    Ollama,
}

impl FromStr for ProviderKind {
    type Err = EmbedderError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key.to_lowercase().as_str() {
            "mock" => Ok(ProviderKind::Mock),
            "openai" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(EmbedderError::UnknownProvider(other.to_string())),
        }
    }
}

/// Construct the provider named by `config.provider`.
pub fn create_provider(
    config: &EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>, EmbedderError> {
    match config.provider.parse::<ProviderKind>()? {
        ProviderKind::Mock => Ok(Box::new(MockProvider::new(config.dimensions))),
        ProviderKind::OpenAi => Ok(Box::new(OpenAiProvider::from_config(config)?)),
        ProviderKind::Ollama => Ok(Box::new(OllamaProvider::from_config(config)?)),
    }
}
