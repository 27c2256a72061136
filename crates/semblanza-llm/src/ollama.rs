//! Ollama Provider Implementation
//!
//! Integration with Ollama's local LLM API for conflict arbitration.
//! Arbitration wants reproducible answers, so every request pins a low
//! temperature and a fixed seed.
//!
//! # Features
//!
//! - Async HTTP communication with the Ollama API
//! - Configurable endpoint and model
//! - Deterministic generation options (temperature 0, fixed seed)
//! - Retry logic with exponential backoff
//!
//! # Examples
//!
//! ```no_run
//! use semblanza_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3");
//! // `generate` is async; the LlmProvider trait impl wraps it for sync callers.
//! ```

use crate::LlmError;
use semblanza_domain::traits::LlmProvider as LlmProviderTrait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for LLM requests (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Temperature pinned for arbitration requests
const ARBITRATION_TEMPERATURE: f64 = 0.0;

/// Seed pinned for arbitration requests
const ARBITRATION_SEED: u64 = 7;

/// Ollama API provider for local LLM inference
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    max_retries: u32,
}

/// Request body for the Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

/// Generation options; pinned for determinism
#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
    seed: u64,
}

/// Response from the Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: model to use (e.g., "llama3", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap();

        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Create a provider against the default local endpoint
    pub fn default_endpoint(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Generate text using the Ollama API under deterministic settings
    ///
    /// # Errors
    ///
    /// Returns an error if Ollama is not running, the model is not
    /// available, network communication fails, or the response format is
    /// invalid.
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);

        let request_body = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: OllamaOptions {
                temperature: ARBITRATION_TEMPERATURE,
                seed: ARBITRATION_SEED,
            },
        };

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self.client.post(&url).json(&request_body).send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        match response.json::<OllamaGenerateResponse>().await {
                            Ok(ollama_response) => {
                                return Ok(ollama_response.response);
                            }
                            Err(e) => {
                                return Err(LlmError::InvalidResponse(format!(
                                    "Failed to parse response: {}",
                                    e
                                )));
                            }
                        }
                    } else if response.status() == reqwest::StatusCode::NOT_FOUND {
                        return Err(LlmError::ModelNotAvailable(self.model.clone()));
                    } else {
                        let status = response.status();
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        last_error = Some(LlmError::Communication(format!(
                            "HTTP {}: {}",
                            status, error_text
                        )));
                    }
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                // Exponential backoff: 1s, 2s, 4s, ...
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }
}

impl LlmProviderTrait for OllamaProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        // Blocking wrapper for async function
        tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(async { self.generate(prompt).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = OllamaProvider::new("http://localhost:11434", "llama3");
        assert_eq!(provider.endpoint, "http://localhost:11434");
        assert_eq!(provider.model, "llama3");
        assert_eq!(provider.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_default_endpoint() {
        let provider = OllamaProvider::default_endpoint("mistral");
        assert_eq!(provider.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(provider.model, "mistral");
    }

    #[test]
    fn test_with_max_retries() {
        let provider = OllamaProvider::new("http://localhost:11434", "llama3").with_max_retries(5);
        assert_eq!(provider.max_retries, 5);
    }

    #[test]
    fn test_request_pins_deterministic_options() {
        let request = OllamaGenerateRequest {
            model: "llama3".to_string(),
            prompt: "p".to_string(),
            stream: false,
            options: OllamaOptions {
                temperature: ARBITRATION_TEMPERATURE,
                seed: ARBITRATION_SEED,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["options"]["temperature"], 0.0);
        assert_eq!(json["options"]["seed"], 7);
        assert_eq!(json["stream"], false);
    }

    #[tokio::test]
    async fn test_error_on_unreachable_endpoint() {
        let provider = OllamaProvider::new("http://localhost:1", "llama3").with_max_retries(1);

        let result = provider.generate("test").await;
        assert!(matches!(result, Err(LlmError::Communication(_))));
    }

    // Integration test (requires running Ollama)
    #[tokio::test]
    #[ignore] // Only run when Ollama is available
    async fn test_generate_integration() {
        let provider = OllamaProvider::default_endpoint("llama3");
        let result = provider.generate("Responde únicamente: hola").await;

        if let Ok(response) = result {
            assert!(!response.is_empty());
        }
    }
}
