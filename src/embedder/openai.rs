//! OpenAI embeddings API backend.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{EmbedderError, EmbeddingProvider};
use crate::config::EmbeddingConfig;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Remote backend calling `POST {api_base}/embeddings` with a bearer key.
pub struct OpenAiProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, api_base: String) -> Result<Self, EmbedderError> {
        if api_key.is_empty() {
            return Err(EmbedderError::Configuration(
                "OpenAI API key not provided and OPENAI_API_KEY not set".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EmbedderError::Configuration(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            api_key,
            api_base,
            model,
        })
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbedderError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default();
        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Self::new(api_key, config.model.clone(), api_base)
    }
}

impl EmbeddingProvider for OpenAiProvider {
    fn generate(&self, text: &str) -> Result<(Vec<f32>, usize), EmbedderError> {
        let url = format!("{}/embeddings", self.api_base);
        debug!(model = %self.model, "requesting OpenAI embedding");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "input": text, "model": self.model }))
            .send()
            .map_err(|e| EmbedderError::GenerationFailed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EmbedderError::GenerationFailed(format!(
                "OpenAI API error: {status} - {body}"
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .map_err(|e| EmbedderError::GenerationFailed(format!("invalid response: {e}")))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                EmbedderError::GenerationFailed("empty embedding response".to_string())
            })?;

        let dimension = embedding.len();
        Ok((embedding, dimension))
    }

    fn model_id(&self) -> String {
        format!("openai_{}", self.model)
    }

    fn max_context(&self) -> usize {
        // OpenAI embedding models accept up to 8191 tokens
        8191
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_api_key() {
        let result = OpenAiProvider::new(
            String::new(),
            "text-embedding-3-small".to_string(),
            DEFAULT_API_BASE.to_string(),
        );
        assert!(matches!(result, Err(EmbedderError::Configuration(_))));
    }

    #[test]
    fn test_model_id_disambiguates_provider() {
        let provider = OpenAiProvider::new(
            "sk-test".to_string(),
            "text-embedding-3-small".to_string(),
            DEFAULT_API_BASE.to_string(),
        )
        .unwrap();
        assert_eq!(provider.model_id(), "openai_text-embedding-3-small");
        assert_eq!(provider.max_context(), 8191);
    }
}
