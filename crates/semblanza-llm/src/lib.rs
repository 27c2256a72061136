//! Semblanza LLM Provider Layer
//!
//! Pluggable implementations of the `LlmProvider` trait from
//! `semblanza-domain`. The pipeline uses a provider in exactly one place:
//! batched conflict arbitration, one call per invocation, under
//! deterministic low-temperature settings.
//!
//! # Providers
//!
//! - `MockProvider`: deterministic scripted provider for testing
//! - `OllamaProvider`: local Ollama API integration
//!
//! # Examples
//!
//! ```
//! use semblanza_llm::MockProvider;
//! use semblanza_domain::traits::LlmProvider;
//!
//! let provider = MockProvider::new(r#"[{"conflict": 0, "value": "azules"}]"#);
//! let decisions = provider.generate("arbitrate this").unwrap();
//! assert!(decisions.contains("azules"));
//! ```

#![warn(missing_docs)]

pub mod ollama;

use semblanza_domain::traits::LlmProvider as LlmProviderTrait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use ollama::OllamaProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Deterministic scripted provider for tests
///
/// Returns pre-configured responses without making any network calls.
/// Because it is fully deterministic, pipelines driven by it must produce
/// identical output across repeated runs - the determinism tests rely on
/// this.
///
/// # Examples
///
/// ```
/// use semblanza_llm::MockProvider;
/// use semblanza_domain::traits::LlmProvider;
///
/// let mut provider = MockProvider::new("[]");
/// provider.respond_with("prompt-a", "response-a");
/// assert_eq!(provider.generate("prompt-a").unwrap(), "response-a");
/// assert_eq!(provider.generate("anything else").unwrap(), "[]");
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<HashMap<String, String>>>,
    failing_prompts: Arc<Mutex<Vec<String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockProvider {
    /// Create a provider that answers every prompt with `response`
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(HashMap::new())),
            failing_prompts: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Script a specific response for a specific prompt
    pub fn respond_with(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(prompt.into(), response.into());
    }

    /// Make any prompt containing `fragment` fail with a communication error
    pub fn fail_on(&mut self, fragment: impl Into<String>) {
        self.failing_prompts.lock().unwrap().push(fragment.into());
    }

    /// Number of times `generate` was called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("[]")
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        *self.call_count.lock().unwrap() += 1;

        let failing = self.failing_prompts.lock().unwrap();
        if failing.iter().any(|fragment| prompt.contains(fragment)) {
            return Err(LlmError::Communication("scripted failure".to_string()));
        }
        drop(failing);

        let responses = self.responses.lock().unwrap();
        if let Some(response) = responses.get(prompt) {
            return Ok(response.clone());
        }

        Ok(self.default_response.clone())
    }
}
