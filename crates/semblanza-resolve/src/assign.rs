//! Assignment stage - link unassigned candidates to the nearest mention
//!
//! Candidates the dependency detector already assigned pass through
//! untouched; syntax outranks anything distance can say. Everything else
//! is matched to the nearest known-entity mention by byte distance:
//!
//! - same sentence, within the distance threshold → `proximity_strong`
//! - same sentence, farther → `proximity_weak`
//! - different sentence → `proximity_weak`, confidence capped hard
//!
//! A candidate with no locatable mention is dropped silently; that is
//! missing annotation, not an error.

use crate::config::ResolverConfig;
use semblanza_domain::{
    AnnotatedDocument, AssignmentTier, AttributeCandidate, EntityMention, MentionKind,
};
use tracing::debug;

/// Result of the assignment stage
#[derive(Debug, Default)]
pub struct AssignmentOutcome {
    /// Candidates carrying an entity, ready for classification
    pub assigned: Vec<AttributeCandidate>,

    /// Candidates dropped for want of any locatable entity
    pub dropped: usize,
}

/// Run the assignment stage over all detector output
pub fn assign_candidates(
    document: &AnnotatedDocument,
    candidates: Vec<AttributeCandidate>,
    config: &ResolverConfig,
) -> AssignmentOutcome {
    let mut outcome = AssignmentOutcome::default();

    // Character attributes belong to people; only fall back to other
    // mention kinds when the recognizer found no people at all.
    let person_mentions: Vec<&EntityMention> = document
        .mentions
        .iter()
        .filter(|m| m.kind == MentionKind::Person)
        .collect();
    let pool: Vec<&EntityMention> = if person_mentions.is_empty() {
        document.mentions.iter().collect()
    } else {
        person_mentions
    };

    for candidate in candidates {
        if candidate.is_assigned() {
            outcome.assigned.push(candidate);
            continue;
        }

        match nearest_mention(&candidate, &pool) {
            Some((mention, distance)) => {
                let same_sentence = mention.sentence_index == candidate.sentence_index;
                let (tier, cap) = if same_sentence {
                    if distance <= config.proximity_distance {
                        (AssignmentTier::ProximityStrong, 1.0)
                    } else {
                        (AssignmentTier::ProximityWeak, 1.0)
                    }
                } else {
                    (AssignmentTier::ProximityWeak, config.cross_sentence_cap)
                };

                let tier_confidence = config.detect.tiers.confidence(tier);
                let confidence = candidate.confidence.min(tier_confidence).min(cap);
                let evidence = if same_sentence {
                    format!("nearest mention '{}' at {} bytes", mention.name, distance)
                } else {
                    format!(
                        "nearest mention '{}' in sentence {} ({} bytes away)",
                        mention.name, mention.sentence_index, distance
                    )
                };

                outcome
                    .assigned
                    .push(candidate.assigned(mention.name.clone(), tier, confidence, evidence));
            }
            None => {
                debug!(
                    attribute = %candidate.attribute_type,
                    value = %candidate.value,
                    "no locatable entity, candidate dropped"
                );
                outcome.dropped += 1;
            }
        }
    }

    outcome
}

/// Nearest mention to a candidate span.
///
/// Same-sentence mentions always win over cross-sentence ones; remaining
/// ties break by distance, then document order.
fn nearest_mention<'a>(
    candidate: &AttributeCandidate,
    pool: &[&'a EntityMention],
) -> Option<(&'a EntityMention, usize)> {
    let mut best: Option<(&EntityMention, usize, bool)> = None;

    for mention in pool {
        let distance = span_distance(
            candidate.span.start,
            candidate.span.end,
            mention.start,
            mention.end,
        );
        let same_sentence = mention.sentence_index == candidate.sentence_index;

        let better = match best {
            None => true,
            Some((_, best_distance, best_same)) => {
                (same_sentence, std::cmp::Reverse(distance))
                    > (best_same, std::cmp::Reverse(best_distance))
            }
        };
        if better {
            best = Some((mention, distance, same_sentence));
        }
    }

    best.map(|(mention, distance, _)| (mention, distance))
}

/// Byte distance between two spans; overlapping spans are distance zero
fn span_distance(a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> usize {
    if b_end <= a_start {
        a_start - b_end
    } else if b_start >= a_end {
        b_start - a_end
    } else {
        0
    }
}
