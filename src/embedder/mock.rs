//! Deterministic stub provider for tests and offline development.

use std::hash::{DefaultHasher, Hash, Hasher};

use super::{EmbedderError, EmbeddingProvider};

/// Produces a vector of the configured dimension from a stable hash of the
/// input text. No network, no model files, same text → same vector.
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

impl EmbeddingProvider for MockProvider {
    fn generate(&self, text: &str) -> Result<(Vec<f32>, usize), EmbedderError> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        let vector: Vec<f32> = (0..self.dimensions)
            .map(|i| {
                let mixed = seed.wrapping_add(i as u64 * 7919);
                (mixed % 10_000) as f32 / 10_000.0 - 0.5
            })
            .collect();

        Ok((vector, self.dimensions))
    }

    fn model_id(&self) -> String {
        format!("mock_embedding_{}", self.dimensions)
    }

    fn max_context(&self) -> usize {
        512
    }
}
