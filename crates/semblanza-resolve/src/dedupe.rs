//! Deduplication stage - at most one attribute per (entity, type)
//!
//! Resolution already works group-by-group, so duplicates are rare; this
//! final pass is the guarantee, not the common path. Ranking prefers
//! direct evidence (syntactic or arbiter resolution) over voting, then
//! higher confidence, then broader method support.

use semblanza_domain::{AttributeType, ResolutionMethod, ResolvedAttribute};
use std::collections::BTreeMap;
use tracing::debug;

/// Collapse residual duplicates; returns the surviving attributes
/// (sorted by entity, then attribute type) and the superseded count
pub fn dedupe(attributes: Vec<ResolvedAttribute>) -> (Vec<ResolvedAttribute>, usize) {
    let mut kept: BTreeMap<(String, AttributeType), ResolvedAttribute> = BTreeMap::new();
    let mut superseded = 0;

    for attribute in attributes {
        let key = (attribute.entity_name.to_lowercase(), attribute.attribute_type);
        match kept.get(&key) {
            None => {
                kept.insert(key, attribute);
            }
            Some(existing) => {
                if rank(&attribute) > rank(existing) {
                    debug!(
                        entity = %attribute.entity_name,
                        attribute_type = %attribute.attribute_type,
                        winner = %attribute.value,
                        loser = %existing.value,
                        "duplicate superseded"
                    );
                    kept.insert(key, attribute);
                }
                superseded += 1;
            }
        }
    }

    (kept.into_values().collect(), superseded)
}

/// Ranking tuple: direct evidence first, then confidence, then method
/// breadth
fn rank(attribute: &ResolvedAttribute) -> (u8, f64, usize) {
    let direct = matches!(
        attribute.resolution_method,
        ResolutionMethod::Syntactic | ResolutionMethod::LlmArbitration
    );
    (
        u8::from(direct),
        attribute.final_confidence,
        attribute.contributing_methods.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use semblanza_domain::{AttributeId, DetectionMethod};
    use std::collections::BTreeSet;

    fn resolved(
        entity: &str,
        value: &str,
        confidence: f64,
        method: ResolutionMethod,
        methods: &[DetectionMethod],
    ) -> ResolvedAttribute {
        ResolvedAttribute {
            id: AttributeId::new(),
            entity_name: entity.to_string(),
            attribute_type: AttributeType::EyeColor,
            value: value.to_string(),
            final_confidence: confidence,
            resolution_method: method,
            contributing_methods: methods.iter().copied().collect::<BTreeSet<_>>(),
            source_text: String::new(),
            chapter: None,
        }
    }

    #[test]
    fn test_no_duplicates_pass_through() {
        let input = vec![
            resolved("María", "azules", 0.9, ResolutionMethod::Syntactic, &[DetectionMethod::Dependency]),
        ];
        let (kept, superseded) = dedupe(input);
        assert_eq!(kept.len(), 1);
        assert_eq!(superseded, 0);
    }

    #[test]
    fn test_syntactic_beats_higher_confidence_voting() {
        let input = vec![
            resolved("María", "verdes", 0.95, ResolutionMethod::VotingUnanimous, &[DetectionMethod::Pattern]),
            resolved("María", "azules", 0.80, ResolutionMethod::Syntactic, &[DetectionMethod::Dependency]),
        ];
        let (kept, superseded) = dedupe(input);
        assert_eq!(kept.len(), 1);
        assert_eq!(superseded, 1);
        assert_eq!(kept[0].value, "azules");
    }

    #[test]
    fn test_confidence_breaks_method_tie() {
        let input = vec![
            resolved("María", "verdes", 0.70, ResolutionMethod::VotingMajority, &[DetectionMethod::Pattern]),
            resolved("maría", "azules", 0.85, ResolutionMethod::VotingMajority, &[DetectionMethod::Embedding]),
        ];
        let (kept, _) = dedupe(input);
        assert_eq!(kept.len(), 1, "entity comparison is case-insensitive");
        assert_eq!(kept[0].value, "azules");
    }

    #[test]
    fn test_method_breadth_breaks_full_tie() {
        let input = vec![
            resolved("María", "verdes", 0.80, ResolutionMethod::VotingMajority, &[DetectionMethod::Pattern]),
            resolved(
                "María",
                "azules",
                0.80,
                ResolutionMethod::VotingMajority,
                &[DetectionMethod::Pattern, DetectionMethod::Embedding],
            ),
        ];
        let (kept, _) = dedupe(input);
        assert_eq!(kept[0].value, "azules");
    }

    #[test]
    fn test_distinct_entities_both_survive() {
        let input = vec![
            resolved("María", "azules", 0.9, ResolutionMethod::Syntactic, &[DetectionMethod::Dependency]),
            resolved("Juan", "verdes", 0.9, ResolutionMethod::Syntactic, &[DetectionMethod::Dependency]),
        ];
        let (kept, superseded) = dedupe(input);
        assert_eq!(kept.len(), 2);
        assert_eq!(superseded, 0);
    }
}
