//! Embedding detector - semantic similarity against prototype phrases
//!
//! Each attribute type carries a small library of prototype phrasings.
//! A sentence whose embedding lands close enough to a prototype emits an
//! unassigned candidate valued from that prototype's wording. Catches
//! paraphrases the surface rules miss, at lower precision.
//!
//! The default embedder is a deterministic lexical one: blake3 feature
//! hashing over tokens, L2-normalized. It is *not* a neural model - it
//! provides a stable, offline baseline, and the `SentenceEmbedder` seam
//! accepts a real model when one is available.

use crate::config::DetectorConfig;
use crate::error::DetectError;
use semblanza_domain::traits::{Detection, Detector, SentenceEmbedder};
use semblanza_domain::{
    AnnotatedDocument, AttributeCandidate, AttributeType, DetectionMethod, SourceSpan,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Default embedding dimensionality for lexical embeddings
pub const DEFAULT_EMBEDDING_DIM: usize = 128;

/// Deterministic lexical sentence embedder (feature hashing over tokens)
#[derive(Debug, Clone)]
pub struct LexicalEmbedder {
    dim: usize,
}

impl LexicalEmbedder {
    /// Embedder with the default dimensionality
    pub fn new() -> Self {
        Self {
            dim: DEFAULT_EMBEDDING_DIM,
        }
    }

    /// Embedder with a custom dimensionality
    pub fn with_dim(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for LexicalEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

fn tokenize(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}

impl SentenceEmbedder for LexicalEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        if self.dim == 0 {
            return Vec::new();
        }

        let mut vec = vec![0.0f32; self.dim];
        let lowered = text.to_lowercase();

        for token in tokenize(&lowered) {
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();

            let mut bucket = 0u64;
            for (shift, byte) in bytes.iter().take(8).enumerate() {
                bucket |= u64::from(*byte) << (shift * 8);
            }

            let idx = (bucket as usize) % self.dim;
            let sign = if (bytes[8] & 1) == 0 { 1.0f32 } else { -1.0f32 };
            vec[idx] += sign;
        }

        // L2-normalize
        let norm2: f64 = vec.iter().map(|&x| f64::from(x) * f64::from(x)).sum();
        if norm2 > 0.0 {
            let inv = norm2.sqrt().recip() as f32;
            for x in &mut vec {
                *x *= inv;
            }
        }

        vec
    }
}

/// Cosine similarity between two embedding vectors
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// A prototype phrasing for one attribute value
#[derive(Debug, Clone)]
pub struct Prototype {
    /// Attribute kind the phrase describes
    pub attribute_type: AttributeType,
    /// The phrasing to compare against
    pub phrase: &'static str,
    /// Value a match takes from this prototype
    pub value: &'static str,
}

const fn proto(
    attribute_type: AttributeType,
    phrase: &'static str,
    value: &'static str,
) -> Prototype {
    Prototype {
        attribute_type,
        phrase,
        value,
    }
}

/// The default Spanish prototype library
pub fn default_prototypes() -> Vec<Prototype> {
    use AttributeType::*;
    vec![
        proto(EyeColor, "tiene los ojos azules", "azules"),
        proto(EyeColor, "sus ojos son verdes", "verdes"),
        proto(EyeColor, "de ojos marrones", "marrones"),
        proto(HairColor, "tiene el pelo negro", "negro"),
        proto(HairColor, "su cabello es rubio", "rubio"),
        proto(HairType, "lleva el pelo largo", "largo"),
        proto(HairType, "tiene el pelo rizado", "rizado"),
        proto(Height, "es una persona alta", "alta"),
        proto(Height, "es de baja estatura", "baja"),
        proto(Build, "tiene complexión delgada", "delgada"),
        proto(Build, "es de cuerpo robusto", "robusto"),
        proto(Age, "es una persona joven", "joven"),
        proto(Age, "es un hombre anciano", "anciano"),
        proto(Skin, "tiene la piel pálida", "pálida"),
        proto(Skin, "es de tez morena", "morena"),
    ]
}

/// Embedding-based detector
pub struct EmbeddingDetector<E: SentenceEmbedder> {
    embedder: E,
    prototypes: Vec<(Prototype, Vec<f32>)>,
    config: DetectorConfig,
}

impl EmbeddingDetector<LexicalEmbedder> {
    /// Build the detector with the lexical embedder and default library
    pub fn new(config: DetectorConfig) -> Result<Self, DetectError> {
        Self::with_embedder(config, LexicalEmbedder::new(), default_prototypes())
    }
}

impl<E: SentenceEmbedder> EmbeddingDetector<E> {
    /// Build the detector with a custom embedder and prototype library
    pub fn with_embedder(
        config: DetectorConfig,
        embedder: E,
        prototypes: Vec<Prototype>,
    ) -> Result<Self, DetectError> {
        config.validate().map_err(DetectError::InvalidConfig)?;
        let embedded = prototypes
            .into_iter()
            .map(|p| {
                let vector = embedder.embed(p.phrase);
                (p, vector)
            })
            .collect();
        Ok(Self {
            embedder,
            prototypes: embedded,
            config,
        })
    }

    /// Confidence grows with the similarity margin above the cutoff and
    /// never exceeds the semantic cap.
    fn margin_confidence(&self, similarity: f32) -> f64 {
        let margin = f64::from(similarity - self.config.similarity_cutoff);
        (self.config.tiers.semantic_match + margin).min(self.config.semantic_confidence_cap)
    }
}

impl<E: SentenceEmbedder> Detector for EmbeddingDetector<E> {
    type Error = DetectError;

    fn method(&self) -> DetectionMethod {
        DetectionMethod::Embedding
    }

    fn detect(&self, document: &AnnotatedDocument) -> Result<Detection, Self::Error> {
        let mut candidates = Vec::new();

        for sentence in &document.sentences {
            let sentence_text = sentence.text(&document.text);
            let sentence_vector = self.embedder.embed(sentence_text);

            // Nearest prototype per attribute type; BTreeMap keeps the
            // emission order stable.
            let mut nearest: BTreeMap<AttributeType, (f32, &Prototype)> = BTreeMap::new();
            for (prototype, vector) in &self.prototypes {
                let similarity = cosine(&sentence_vector, vector);
                match nearest.get(&prototype.attribute_type) {
                    Some((best, _)) if *best >= similarity => {}
                    _ => {
                        nearest.insert(prototype.attribute_type, (similarity, prototype));
                    }
                }
            }

            for (attribute_type, (similarity, prototype)) in nearest {
                if similarity < self.config.similarity_cutoff {
                    continue;
                }
                debug!(
                    %attribute_type,
                    similarity,
                    phrase = prototype.phrase,
                    "prototype match"
                );
                candidates.push(AttributeCandidate {
                    attribute_type,
                    value: prototype.value.to_string(),
                    span: SourceSpan {
                        sentence_text: sentence_text.to_string(),
                        start: sentence.start,
                        end: sentence.end,
                    },
                    sentence_index: sentence.index,
                    method: DetectionMethod::Embedding,
                    confidence: self.margin_confidence(similarity),
                    assigned_entity: None,
                    assignment_tier: None,
                    assignment_evidence: None,
                    negated: false,
                    metaphor_suspected: false,
                    chapter: document.chapter,
                });
            }
        }

        debug!(candidates = candidates.len(), "embedding detection finished");
        Ok(Detection::of(candidates))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: embeddings are unit-length or zero
        #[test]
        fn test_embedding_norm(text in ".{0,80}") {
            let embedder = LexicalEmbedder::new();
            let v = embedder.embed(&text);
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            prop_assert!(norm < 1.0 + 1e-3);
        }

        /// Property: cosine similarity stays within [-1, 1]
        #[test]
        fn test_cosine_bounds(a in ".{1,40}", b in ".{1,40}") {
            let embedder = LexicalEmbedder::new();
            let va = embedder.embed(&a);
            let vb = embedder.embed(&b);
            let similarity = cosine(&va, &vb);
            prop_assert!((-1.0 - 1e-3..=1.0 + 1e-3).contains(&similarity));
        }
    }
}
