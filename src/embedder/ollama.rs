//! Ollama local embeddings backend.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{EmbedderError, EmbeddingProvider};
use crate::config::EmbeddingConfig;

const DEFAULT_API_BASE: &str = "http://localhost:11434";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct OllamaResponse {
    embedding: Vec<f32>,
}

/// Local backend calling `POST {api_base}/api/embeddings`.
pub struct OllamaProvider {
    client: reqwest::blocking::Client,
    api_base: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(model: String, api_base: String) -> Result<Self, EmbedderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EmbedderError::Configuration(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            api_base,
            model,
        })
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbedderError> {
        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Self::new(config.model.clone(), api_base)
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn generate(&self, text: &str) -> Result<(Vec<f32>, usize), EmbedderError> {
        let url = format!("{}/api/embeddings", self.api_base);
        debug!(model = %self.model, "requesting Ollama embedding");

        let response = self
            .client
            .post(&url)
            .json(&json!({ "model": self.model, "prompt": text }))
            .send()
            .map_err(|e| EmbedderError::GenerationFailed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EmbedderError::GenerationFailed(format!(
                "Ollama API error: {status} - {body}"
            )));
        }

        let parsed: OllamaResponse = response
            .json()
            .map_err(|e| EmbedderError::GenerationFailed(format!("invalid response: {e}")))?;

        if parsed.embedding.is_empty() {
            return Err(EmbedderError::GenerationFailed(
                "empty embedding response".to_string(),
            ));
        }

        let dimension = parsed.embedding.len();
        Ok((parsed.embedding, dimension))
    }

    fn model_id(&self) -> String {
        format!("ollama_{}", self.model)
    }

    fn max_context(&self) -> usize {
        2048
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_disambiguates_provider() {
        let provider =
            OllamaProvider::new("nomic-embed-text".to_string(), DEFAULT_API_BASE.to_string())
                .unwrap();
        assert_eq!(provider.model_id(), "ollama_nomic-embed-text");
        assert_eq!(provider.max_context(), 2048);
    }
}
