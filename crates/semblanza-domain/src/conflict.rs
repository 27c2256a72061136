//! Conflict classification types for grouped candidates

use crate::attribute::{AttributeCandidate, AttributeType};
use std::fmt;

/// Classification of a candidate group, per (entity, attribute type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupClass {
    /// Clear explicit-syntactic or arbiter evidence present
    Confirmed,
    /// Every candidate agrees on one value, no explicit evidence
    Unanimous,
    /// One value holds more than half the votes
    Majority,
    /// True disagreement - eligible for arbitration
    Conflict,
}

impl fmt::Display for GroupClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Confirmed => "confirmed",
            Self::Unanimous => "unanimous",
            Self::Majority => "majority",
            Self::Conflict => "conflict",
        };
        write!(f, "{}", name)
    }
}

/// Why a group was classified as a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// Candidates disagree on the attribute value
    ValueMismatch,
    /// Every candidate was linked by proximity only; the real doubt is
    /// which entity owns the attribute
    EntityAmbiguous,
    /// Negated and plain observations of the same attribute disagree
    Negation,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ValueMismatch => "value_mismatch",
            Self::EntityAmbiguous => "entity_ambiguous",
            Self::Negation => "negation",
        };
        write!(f, "{}", name)
    }
}

/// A group of disagreeing candidates for one (entity, attribute type) pair.
///
/// Transient: created only for groups classified [`GroupClass::Conflict`],
/// consumed by the resolution engine or the arbiter.
#[derive(Debug, Clone)]
pub struct AttributeConflict {
    /// Entity the candidates were assigned to
    pub entity_name: String,

    /// Attribute kind under dispute
    pub attribute_type: AttributeType,

    /// The disagreeing candidates
    pub candidates: Vec<AttributeCandidate>,

    /// Diagnosed nature of the disagreement
    pub kind: ConflictKind,
}

impl AttributeConflict {
    /// Spread between the strongest and weakest candidate confidence.
    ///
    /// Used to prioritize conflicts when more exist than the arbiter
    /// budget allows.
    pub fn confidence_spread(&self) -> f64 {
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for candidate in &self.candidates {
            min = min.min(candidate.confidence);
            max = max.max(candidate.confidence);
        }
        if self.candidates.is_empty() {
            0.0
        } else {
            max - min
        }
    }

    /// Distinct normalized values among the candidates, in first-seen order
    pub fn distinct_values(&self) -> Vec<String> {
        let mut values: Vec<String> = Vec::new();
        for candidate in &self.candidates {
            let value = candidate.normalized_value();
            if !values.contains(&value) {
                values.push(value);
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{DetectionMethod, SourceSpan};

    fn candidate(value: &str, confidence: f64) -> AttributeCandidate {
        AttributeCandidate {
            attribute_type: AttributeType::EyeColor,
            value: value.to_string(),
            span: SourceSpan {
                sentence_text: String::new(),
                start: 0,
                end: 0,
            },
            sentence_index: 0,
            method: DetectionMethod::Pattern,
            confidence,
            assigned_entity: Some("María".to_string()),
            assignment_tier: None,
            assignment_evidence: None,
            negated: false,
            metaphor_suspected: false,
            chapter: None,
        }
    }

    #[test]
    fn test_confidence_spread() {
        let conflict = AttributeConflict {
            entity_name: "María".to_string(),
            attribute_type: AttributeType::EyeColor,
            candidates: vec![candidate("azules", 0.9), candidate("verdes", 0.55)],
            kind: ConflictKind::ValueMismatch,
        };
        assert!((conflict.confidence_spread() - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_distinct_values_deduplicated() {
        let conflict = AttributeConflict {
            entity_name: "María".to_string(),
            attribute_type: AttributeType::EyeColor,
            candidates: vec![
                candidate("Azules", 0.9),
                candidate("azules ", 0.7),
                candidate("verdes", 0.6),
            ],
            kind: ConflictKind::ValueMismatch,
        };
        assert_eq!(conflict.distinct_values(), vec!["azules", "verdes"]);
    }
}
