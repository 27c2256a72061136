//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and the
//! detector, embedding, and LLM infrastructure. Implementations live in
//! other crates.

use crate::attribute::{AttributeCandidate, DetectionMethod};
use crate::document::AnnotatedDocument;

/// Output of one detector run over one document
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// Candidates the detector emitted
    pub candidates: Vec<AttributeCandidate>,

    /// Matches suppressed by linguistic guards (metaphor, dialogue)
    pub suppressed: usize,
}

impl Detection {
    /// A detection with candidates and no suppressions
    pub fn of(candidates: Vec<AttributeCandidate>) -> Self {
        Self {
            candidates,
            suppressed: 0,
        }
    }
}

/// Uniform capability interface for detector strategies
///
/// Implemented by the detector layer (semblanza-detect). Detectors are
/// stateless across invocations: `detect` reads the immutable document
/// and returns candidates, nothing else.
pub trait Detector {
    /// Error type for detection failures
    type Error;

    /// Which strategy this detector implements
    fn method(&self) -> DetectionMethod;

    /// Run the detector over one annotated document
    fn detect(&self, document: &AnnotatedDocument) -> Result<Detection, Self::Error>;
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (semblanza-llm). The pipeline
/// uses it only for conflict arbitration, at most once per invocation.
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate a text completion under deterministic settings
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;
}

/// Trait for sentence embedding
///
/// Implemented by the detector layer. Embeddings only need to be stable
/// and comparable within one process; they are never persisted.
pub trait SentenceEmbedder {
    /// Embed a sentence or phrase into a fixed-dimension vector
    fn embed(&self, text: &str) -> Vec<f32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_of() {
        let detection = Detection::of(Vec::new());
        assert!(detection.candidates.is_empty());
        assert_eq!(detection.suppressed, 0);
    }
}
