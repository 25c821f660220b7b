//! The reasoning backend behind estimation.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::EstimationError;
use crate::config::ReasoningConfig;

/// A chat-completion backend. Implementations must be `Send + Sync` so the
/// estimation service can run them off-thread.
pub trait Reasoner: Send + Sync {
    /// Send one prompt and return the raw response text.
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, EstimationError>;

    /// Identifier persisted with each estimation.
    fn model_id(&self) -> String;
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// HTTP backend posting to a messages-style chat endpoint
/// (`POST {api_base}/api/chat`, Ollama-compatible).
pub struct HttpReasoner {
    client: reqwest::blocking::Client,
    api_base: String,
    model: String,
}

impl HttpReasoner {
    pub fn new(api_base: String, model: String, timeout_secs: u64) -> Result<Self, EstimationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| EstimationError::ModelCallFailed(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            api_base,
            model,
        })
    }

    pub fn from_config(config: &ReasoningConfig) -> Result<Self, EstimationError> {
        Self::new(config.api_base.clone(), config.model.clone(), config.timeout_secs)
    }
}

impl Reasoner for HttpReasoner {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, EstimationError> {
        let url = format!("{}/api/chat", self.api_base);
        debug!(model = %self.model, "requesting estimation completion");

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "stream": false,
                "options": { "num_predict": max_tokens },
            }))
            .send()
            .map_err(|e| EstimationError::ModelCallFailed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EstimationError::ModelCallFailed(format!(
                "chat API error: {status} - {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| EstimationError::ModelCallFailed(format!("invalid response: {e}")))?;

        Ok(parsed.message.content)
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }
}

/// Canned reasoner for tests: always returns the same response and keeps
/// the prompts it saw.
pub struct ScriptedReasoner {
    response: String,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl ScriptedReasoner {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        match self.prompts.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Reasoner for ScriptedReasoner {
    fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String, EstimationError> {
        if let Ok(mut guard) = self.prompts.lock() {
            guard.push(prompt.to_string());
        }
        Ok(self.response.clone())
    }

    fn model_id(&self) -> String {
        "scripted".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_reasoner_records_prompts() {
        let reasoner = ScriptedReasoner::new("STORY POINTS: 3");
        let reply = reasoner.complete("estimate this", 1024).unwrap();
        assert_eq!(reply, "STORY POINTS: 3");
        assert_eq!(reasoner.prompts(), vec!["estimate this".to_string()]);
        assert_eq!(reasoner.model_id(), "scripted");
    }

    #[test]
    fn test_http_reasoner_model_id() {
        let reasoner =
            HttpReasoner::new("http://localhost:11434".to_string(), "llama3".to_string(), 60)
                .unwrap();
        assert_eq!(reasoner.model_id(), "llama3");
    }
}
