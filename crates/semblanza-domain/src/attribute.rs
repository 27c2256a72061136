//! Attribute records - candidates emitted by detectors and resolved output

use crate::tier::AssignmentTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unique identifier for a resolved attribute based on UUIDv7
///
/// UUIDv7 provides chronological sortability and collision-free generation
/// without coordination, so the caller's persistence layer can use these
/// ids directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributeId(u128);

impl AttributeId {
    /// Generate a new UUIDv7-based AttributeId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create an AttributeId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for AttributeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// The descriptive attribute kinds the detectors know how to extract
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// Eye color ("azules", "verdes")
    EyeColor,
    /// Hair color ("negro", "rubio")
    HairColor,
    /// Hair type ("largo", "rizado")
    HairType,
    /// Height ("alto", "baja")
    Height,
    /// Body build ("delgado", "corpulenta")
    Build,
    /// Age, numeric or descriptive
    Age,
    /// Skin/complexion ("pálida", "morena")
    Skin,
    /// Personality trait ("valiente", "tímida")
    Personality,
    /// Profession or occupation
    Profession,
    /// Distinctive feature (scars, marks)
    DistinctiveFeature,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EyeColor => "eye_color",
            Self::HairColor => "hair_color",
            Self::HairType => "hair_type",
            Self::Height => "height",
            Self::Build => "build",
            Self::Age => "age",
            Self::Skin => "skin",
            Self::Personality => "personality",
            Self::Profession => "profession",
            Self::DistinctiveFeature => "distinctive_feature",
        };
        write!(f, "{}", name)
    }
}

/// Which detector strategy produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Surface pattern rules
    Pattern,
    /// Syntactic dependency walk
    Dependency,
    /// Semantic prototype similarity
    Embedding,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pattern => "pattern",
            Self::Dependency => "dependency",
            Self::Embedding => "embedding",
        };
        write!(f, "{}", name)
    }
}

/// How a classified candidate group became a resolved attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Clear syntactic evidence, taken directly
    Syntactic,
    /// All methods agreed on one value
    VotingUnanimous,
    /// A value won more than half the votes
    VotingMajority,
    /// Conflict resolved by the method-precision table
    PrecisionFallback,
    /// Conflict decided by the LLM arbiter
    LlmArbitration,
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Syntactic => "syntactic",
            Self::VotingUnanimous => "voting_unanimous",
            Self::VotingMajority => "voting_majority",
            Self::PrecisionFallback => "precision_fallback",
            Self::LlmArbitration => "llm_arbitration",
        };
        write!(f, "{}", name)
    }
}

/// Where in the document a candidate was detected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Text of the sentence the match occurred in
    pub sentence_text: String,

    /// Byte offset of the match start within the document
    pub start: usize,

    /// Byte offset of the match end within the document
    pub end: usize,
}

/// One detector firing - a typed attribute value awaiting assignment,
/// classification, and resolution.
///
/// Candidates are immutable once emitted; the assignment stage produces a
/// new candidate rather than mutating one in place.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeCandidate {
    /// Kind of attribute detected
    pub attribute_type: AttributeType,

    /// Extracted value, normalized to lowercase by the detector
    pub value: String,

    /// Source location of the evidence
    pub span: SourceSpan,

    /// Index of the sentence the evidence sits in
    pub sentence_index: usize,

    /// Which detector strategy fired
    pub method: DetectionMethod,

    /// Detection confidence in [0, 1]
    pub confidence: f64,

    /// Owning entity, when the detector could assign directly
    pub assigned_entity: Option<String>,

    /// Calibration tier of the assignment, when assigned
    pub assignment_tier: Option<AssignmentTier>,

    /// Human-readable trace of how the assignment was made
    pub assignment_evidence: Option<String>,

    /// Whether the attribute is negated ("no tenía ojos verdes")
    pub negated: bool,

    /// Whether the surrounding text suggests figurative use
    pub metaphor_suspected: bool,

    /// Chapter tag for provenance
    pub chapter: Option<u32>,
}

impl AttributeCandidate {
    /// Value normalized for grouping and comparison
    pub fn normalized_value(&self) -> String {
        self.value.trim().to_lowercase()
    }

    /// Whether the candidate carries an entity assignment
    pub fn is_assigned(&self) -> bool {
        self.assigned_entity.is_some()
    }

    /// Return a copy of this candidate with an entity assignment applied
    pub fn assigned(
        &self,
        entity: impl Into<String>,
        tier: AssignmentTier,
        confidence: f64,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            assigned_entity: Some(entity.into()),
            assignment_tier: Some(tier),
            assignment_evidence: Some(evidence.into()),
            confidence: confidence.clamp(0.0, 1.0),
            ..self.clone()
        }
    }
}

/// A fully resolved attribute - the pipeline's sole output record.
///
/// Ownership passes to the caller, which persists or discards it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAttribute {
    /// Unique identifier for downstream persistence
    pub id: AttributeId,

    /// Display name of the owning entity
    pub entity_name: String,

    /// Kind of attribute
    pub attribute_type: AttributeType,

    /// Final value
    pub value: String,

    /// Final confidence in [0, 1]
    pub final_confidence: f64,

    /// How the resolution was reached
    pub resolution_method: ResolutionMethod,

    /// Detector strategies that contributed evidence
    pub contributing_methods: BTreeSet<DetectionMethod>,

    /// Sentence text the attribute was drawn from
    pub source_text: String,

    /// Chapter tag for provenance
    pub chapter: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_candidate() -> AttributeCandidate {
        AttributeCandidate {
            attribute_type: AttributeType::EyeColor,
            value: "Azules ".to_string(),
            span: SourceSpan {
                sentence_text: "María tenía los ojos azules.".to_string(),
                start: 21,
                end: 27,
            },
            sentence_index: 0,
            method: DetectionMethod::Pattern,
            confidence: 0.9,
            assigned_entity: None,
            assignment_tier: None,
            assignment_evidence: None,
            negated: false,
            metaphor_suspected: false,
            chapter: None,
        }
    }

    #[test]
    fn test_attribute_id_ordering() {
        let id1 = AttributeId::from_value(1000);
        let id2 = AttributeId::from_value(2000);
        assert!(id1 < id2);
    }

    #[test]
    fn test_attribute_id_chronological() {
        let id1 = AttributeId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = AttributeId::new();
        assert!(id1 < id2, "Earlier UUIDv7 should be less than later UUIDv7");
    }

    #[test]
    fn test_normalized_value() {
        assert_eq!(sample_candidate().normalized_value(), "azules");
    }

    #[test]
    fn test_assignment_clamps_confidence() {
        let assigned = sample_candidate().assigned(
            "María",
            AssignmentTier::ProximityStrong,
            1.4,
            "nearest mention",
        );
        assert!(assigned.is_assigned());
        assert_eq!(assigned.confidence, 1.0);
        assert_eq!(
            assigned.assignment_tier,
            Some(AssignmentTier::ProximityStrong)
        );
    }

    #[test]
    fn test_display_names() {
        assert_eq!(AttributeType::EyeColor.to_string(), "eye_color");
        assert_eq!(DetectionMethod::Embedding.to_string(), "embedding");
        assert_eq!(
            ResolutionMethod::PrecisionFallback.to_string(),
            "precision_fallback"
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: AttributeId ordering matches the underlying value
        #[test]
        fn test_id_ordering_property(a: u128, b: u128) {
            let id_a = AttributeId::from_value(a);
            let id_b = AttributeId::from_value(b);

            prop_assert_eq!(id_a < id_b, a < b);
            prop_assert_eq!(id_a == id_b, a == b);
        }

        /// Property: assignment always leaves confidence inside [0, 1]
        #[test]
        fn test_assignment_confidence_clamped(confidence in -2.0f64..3.0) {
            let candidate = AttributeCandidate {
                attribute_type: AttributeType::Height,
                value: "alta".to_string(),
                span: SourceSpan {
                    sentence_text: String::new(),
                    start: 0,
                    end: 0,
                },
                sentence_index: 0,
                method: DetectionMethod::Dependency,
                confidence: 0.5,
                assigned_entity: None,
                assignment_tier: None,
                assignment_evidence: None,
                negated: false,
                metaphor_suspected: false,
                chapter: None,
            };
            let assigned = candidate.assigned(
                "María",
                AssignmentTier::SyntacticTacit,
                confidence,
                "test",
            );
            prop_assert!((0.0..=1.0).contains(&assigned.confidence));
        }
    }
}
