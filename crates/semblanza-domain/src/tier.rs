//! Assignment tiers - discrete calibration constants for entity linking

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an attribute candidate was linked to its owning entity.
///
/// Tiers are ordered by evidential strength. The numeric confidence of each
/// tier is configuration (see [`TierTable`]), not derived at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentTier {
    /// Explicit grammatical subject of the describing clause
    SyntacticExplicit,

    /// Ownership confirmed by the LLM arbiter
    LlmVerified,

    /// Tacit subject inherited from a previous sentence
    SyntacticTacit,

    /// Nearest mention in the same sentence, within the distance threshold
    ProximityStrong,

    /// Semantic similarity to a prototype phrase
    SemanticMatch,

    /// Nearest mention, but far away or in a different sentence
    ProximityWeak,
}

impl AssignmentTier {
    /// Whether this tier carries direct syntactic or arbiter evidence,
    /// as opposed to a proximity or similarity heuristic.
    pub fn is_evidential(&self) -> bool {
        matches!(self, Self::SyntacticExplicit | Self::LlmVerified)
    }

    /// Whether this tier was reached through a proximity heuristic.
    pub fn is_proximity(&self) -> bool {
        matches!(self, Self::ProximityStrong | Self::ProximityWeak)
    }
}

impl fmt::Display for AssignmentTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SyntacticExplicit => "syntactic_explicit",
            Self::LlmVerified => "llm_verified",
            Self::SyntacticTacit => "syntactic_tacit",
            Self::ProximityStrong => "proximity_strong",
            Self::SemanticMatch => "semantic_match",
            Self::ProximityWeak => "proximity_weak",
        };
        write!(f, "{}", name)
    }
}

/// Calibrated confidence per assignment tier.
///
/// These are fixed constants passed in at construction, never adjusted by
/// the pipeline itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    /// Confidence for explicit syntactic subjects
    pub syntactic_explicit: f64,

    /// Confidence for arbiter-verified assignments
    pub llm_verified: f64,

    /// Confidence for tacit (inherited) subjects
    pub syntactic_tacit: f64,

    /// Confidence for close same-sentence proximity
    pub proximity_strong: f64,

    /// Confidence for semantic prototype matches
    pub semantic_match: f64,

    /// Confidence for distant proximity
    pub proximity_weak: f64,
}

impl TierTable {
    /// Look up the confidence for a tier
    pub fn confidence(&self, tier: AssignmentTier) -> f64 {
        match tier {
            AssignmentTier::SyntacticExplicit => self.syntactic_explicit,
            AssignmentTier::LlmVerified => self.llm_verified,
            AssignmentTier::SyntacticTacit => self.syntactic_tacit,
            AssignmentTier::ProximityStrong => self.proximity_strong,
            AssignmentTier::SemanticMatch => self.semantic_match,
            AssignmentTier::ProximityWeak => self.proximity_weak,
        }
    }

    /// Validate that every tier confidence is within [0, 1]
    pub fn validate(&self) -> Result<(), String> {
        let entries = [
            ("syntactic_explicit", self.syntactic_explicit),
            ("llm_verified", self.llm_verified),
            ("syntactic_tacit", self.syntactic_tacit),
            ("proximity_strong", self.proximity_strong),
            ("semantic_match", self.semantic_match),
            ("proximity_weak", self.proximity_weak),
        ];
        for (name, value) in entries {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("tier {} confidence {} out of [0, 1]", name, value));
            }
        }
        Ok(())
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            syntactic_explicit: 0.92,
            llm_verified: 0.95,
            syntactic_tacit: 0.78,
            proximity_strong: 0.70,
            semantic_match: 0.65,
            proximity_weak: 0.55,
        }
    }
}
