//! Conflict classifier - group candidates and label the agreement
//!
//! Groups assigned candidates by (entity, attribute type) and labels each
//! group:
//!
//! - `confirmed`: explicit-syntactic or arbiter-verified evidence present
//! - `unanimous`: every candidate agrees on one value, evidence is softer
//! - `majority`: one value holds more than half the votes
//! - `conflict`: true disagreement, eligible for arbitration
//!
//! Negated and plain observations of the same attribute are a conflict
//! even when their values agree; "no tenía ojos verdes" must not
//! corroborate "tenía ojos verdes".

use semblanza_domain::{
    AttributeCandidate, AttributeConflict, AttributeType, ConflictKind, GroupClass,
};
use std::collections::BTreeMap;
use tracing::debug;

/// A classified candidate group for one (entity, attribute type) pair
#[derive(Debug, Clone)]
pub struct ClassifiedGroup {
    /// Display name of the entity (from the first candidate seen)
    pub entity_name: String,

    /// Attribute kind
    pub attribute_type: AttributeType,

    /// Agreement label
    pub class: GroupClass,

    /// Member candidates, in assignment order
    pub candidates: Vec<AttributeCandidate>,
}

impl ClassifiedGroup {
    /// Build the transient conflict record for an arbitration-eligible
    /// group
    pub fn into_conflict(self) -> AttributeConflict {
        let kind = diagnose_kind(&self.candidates);
        AttributeConflict {
            entity_name: self.entity_name,
            attribute_type: self.attribute_type,
            candidates: self.candidates,
            kind,
        }
    }
}

/// Group and classify assigned candidates.
///
/// Grouping is case-insensitive on the entity name; iteration order is
/// deterministic (sorted by entity, then attribute type).
pub fn classify(candidates: Vec<AttributeCandidate>) -> Vec<ClassifiedGroup> {
    let mut groups: BTreeMap<(String, AttributeType), Vec<AttributeCandidate>> = BTreeMap::new();

    for candidate in candidates {
        let Some(entity) = candidate.assigned_entity.as_deref() else {
            // Unassigned candidates never reach classification; guard
            // against a misbehaving caller anyway.
            continue;
        };
        groups
            .entry((entity.to_lowercase(), candidate.attribute_type))
            .or_default()
            .push(candidate);
    }

    groups
        .into_values()
        .filter_map(|members| {
            let entity_name = members[0]
                .assigned_entity
                .clone()
                .unwrap_or_default();
            let attribute_type = members[0].attribute_type;

            if members.iter().all(|c| c.negated) {
                // Only negated observations: the text asserts absence, so
                // there is no value to resolve.
                debug!(
                    entity = %entity_name,
                    attribute = %attribute_type,
                    "all observations negated, group omitted"
                );
                return None;
            }

            let class = classify_group(&members);
            debug!(
                entity = %entity_name,
                attribute = %attribute_type,
                members = members.len(),
                class = %class,
                "group classified"
            );
            Some(ClassifiedGroup {
                entity_name,
                attribute_type,
                class,
                candidates: members,
            })
        })
        .collect()
}

fn classify_group(members: &[AttributeCandidate]) -> GroupClass {
    if members.len() == 1 {
        let tier_evidential = members[0]
            .assignment_tier
            .map(|t| t.is_evidential())
            .unwrap_or(false);
        return if tier_evidential {
            GroupClass::Confirmed
        } else {
            GroupClass::Majority
        };
    }

    let negated = members.iter().filter(|c| c.negated).count();
    if negated > 0 && negated < members.len() {
        return GroupClass::Conflict;
    }

    let values = value_counts(members);
    if values.len() == 1 {
        let any_explicit = members
            .iter()
            .any(|c| c.assignment_tier.map(|t| t.is_evidential()).unwrap_or(false));
        return if any_explicit {
            GroupClass::Confirmed
        } else {
            GroupClass::Unanimous
        };
    }

    let top_count = values.iter().map(|(_, n)| *n).max().unwrap_or(0);
    if top_count * 2 > members.len() {
        GroupClass::Majority
    } else {
        GroupClass::Conflict
    }
}

/// Vote counts per distinct normalized value, in first-seen order
pub fn value_counts(members: &[AttributeCandidate]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for candidate in members {
        let value = candidate.normalized_value();
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    counts
}

fn diagnose_kind(members: &[AttributeCandidate]) -> ConflictKind {
    let negated = members.iter().filter(|c| c.negated).count();
    if negated > 0 && negated < members.len() {
        return ConflictKind::Negation;
    }
    let all_proximity = members.iter().all(|c| {
        c.assignment_tier
            .map(|t| t.is_proximity())
            .unwrap_or(false)
    });
    if all_proximity {
        ConflictKind::EntityAmbiguous
    } else {
        ConflictKind::ValueMismatch
    }
}
