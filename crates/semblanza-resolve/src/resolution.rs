//! Resolution engine - turn classified groups into resolved attributes
//!
//! Deterministic confidence formulas per group class:
//!
//! - `confirmed`: take the strongest candidate, method `syntactic`
//! - `unanimous`: weighted average over the per-method weight table,
//!   boosted by the consensus factor, capped
//! - `majority`: winning value's weighted share of the total, scaled by
//!   the consensus penalty
//! - `conflict`: handed back to the caller for arbitration or the
//!   precision fallback
//!
//! All constants come from [`ResolverConfig`]; nothing here adapts at
//! runtime.

use crate::classify::{value_counts, ClassifiedGroup};
use crate::config::ResolverConfig;
use semblanza_domain::{
    AttributeCandidate, AttributeConflict, AttributeId, DetectionMethod, GroupClass,
    ResolutionMethod, ResolvedAttribute,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Resolve every non-conflict group; conflicts are returned for the
/// arbitration stage.
pub fn resolve_groups(
    groups: Vec<ClassifiedGroup>,
    config: &ResolverConfig,
) -> (Vec<ResolvedAttribute>, Vec<AttributeConflict>) {
    let mut resolved = Vec::new();
    let mut conflicts = Vec::new();

    for group in groups {
        match group.class {
            GroupClass::Confirmed => resolved.push(resolve_confirmed(group)),
            GroupClass::Unanimous => resolved.push(resolve_unanimous(group, config)),
            GroupClass::Majority => resolved.push(resolve_majority(group, config)),
            GroupClass::Conflict => conflicts.push(group.into_conflict()),
        }
    }

    (resolved, conflicts)
}

/// Clear syntactic evidence: the strongest candidate speaks for the group
fn resolve_confirmed(group: ClassifiedGroup) -> ResolvedAttribute {
    let best = strongest(&group.candidates);
    let methods = method_set(group.candidates.iter());
    build(
        &group,
        best.normalized_value(),
        best.confidence,
        ResolutionMethod::Syntactic,
        methods,
        best,
    )
}

/// Independent methods agreeing is worth more than any one of them alone
fn resolve_unanimous(group: ClassifiedGroup, config: &ResolverConfig) -> ResolvedAttribute {
    let mut weight_sum = 0.0;
    let mut weighted_confidence = 0.0;
    for candidate in &group.candidates {
        let weight = config.weights.weight(candidate.method);
        weight_sum += weight;
        weighted_confidence += weight * candidate.confidence;
    }
    let average = if weight_sum > 0.0 {
        weighted_confidence / weight_sum
    } else {
        0.0
    };
    let boosted = (average * (1.0 + config.unanimous_boost)).min(config.unanimous_cap);

    let best = strongest(&group.candidates);
    let methods = method_set(group.candidates.iter());
    debug!(
        entity = %group.entity_name,
        attribute = %group.attribute_type,
        average,
        boosted,
        "unanimous group resolved"
    );
    build(
        &group,
        best.normalized_value(),
        boosted,
        ResolutionMethod::VotingUnanimous,
        methods,
        best,
    )
}

/// One value out-voted the rest; its weighted share of the evidence,
/// discounted for the disagreement it did not win over.
fn resolve_majority(group: ClassifiedGroup, config: &ResolverConfig) -> ResolvedAttribute {
    if group.candidates.len() == 1 {
        // Single observation: nothing to vote over, the candidate's own
        // confidence stands.
        let best = &group.candidates[0];
        let methods = method_set(group.candidates.iter());
        return build(
            &group,
            best.normalized_value(),
            best.confidence,
            ResolutionMethod::VotingMajority,
            methods,
            best,
        );
    }

    let counts = value_counts(&group.candidates);
    let top_count = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);

    // Tie-break among equally-counted values by weighted score, then
    // lexicographically for determinism.
    let winner = counts
        .iter()
        .filter(|(_, n)| *n == top_count)
        .map(|(value, _)| (value.clone(), weighted_score(&group.candidates, value, config)))
        .max_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.cmp(&a.0))
        })
        .map(|(value, _)| value)
        .unwrap_or_default();

    let winning_score = weighted_score(&group.candidates, &winner, config);
    let total_score: f64 = group
        .candidates
        .iter()
        .map(|c| config.weights.weight(c.method) * c.confidence)
        .sum();
    let share = if total_score > 0.0 {
        winning_score / total_score
    } else {
        0.0
    };
    let confidence = (share * config.majority_penalty).clamp(0.0, 1.0);

    let winners: Vec<&AttributeCandidate> = group
        .candidates
        .iter()
        .filter(|c| c.normalized_value() == winner)
        .collect();
    let best = winners
        .iter()
        .copied()
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .expect("winning value always has at least one candidate");
    let methods = method_set(winners.iter().copied());

    debug!(
        entity = %group.entity_name,
        attribute = %group.attribute_type,
        winner = %winner,
        share,
        confidence,
        "majority group resolved"
    );
    build(
        &group,
        winner,
        confidence,
        ResolutionMethod::VotingMajority,
        methods,
        best,
    )
}

/// Resolve a conflict without an arbiter: trust the historically most
/// precise method, discounted for the unresolved disagreement.
pub fn precision_fallback(
    conflict: &AttributeConflict,
    config: &ResolverConfig,
) -> ResolvedAttribute {
    // Negated candidates assert absence; they lose to any positive
    // observation regardless of method precision.
    let positive: Vec<&AttributeCandidate> = conflict
        .candidates
        .iter()
        .filter(|c| !c.negated)
        .collect();
    let pool: Vec<&AttributeCandidate> = if positive.is_empty() {
        conflict.candidates.iter().collect()
    } else {
        positive
    };

    let best = pool
        .iter()
        .copied()
        .max_by(|a, b| {
            let pa = config.precision.precision(a.method);
            let pb = config.precision.precision(b.method);
            pa.partial_cmp(&pb)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    a.confidence
                        .partial_cmp(&b.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| b.span.start.cmp(&a.span.start))
        })
        .expect("conflicts are never empty");

    let confidence = (best.confidence * config.fallback_penalty).clamp(0.0, 1.0);
    debug!(
        entity = %conflict.entity_name,
        attribute = %conflict.attribute_type,
        method = %best.method,
        confidence,
        "conflict resolved by precision fallback"
    );

    ResolvedAttribute {
        id: AttributeId::new(),
        entity_name: conflict.entity_name.clone(),
        attribute_type: conflict.attribute_type,
        value: best.normalized_value(),
        final_confidence: confidence,
        resolution_method: ResolutionMethod::PrecisionFallback,
        contributing_methods: BTreeSet::from([best.method]),
        source_text: best.span.sentence_text.clone(),
        chapter: best.chapter,
    }
}

fn strongest(candidates: &[AttributeCandidate]) -> &AttributeCandidate {
    candidates
        .iter()
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.span.start.cmp(&a.span.start))
        })
        .expect("classified groups are never empty")
}

fn method_set<'a>(
    candidates: impl Iterator<Item = &'a AttributeCandidate>,
) -> BTreeSet<DetectionMethod> {
    candidates.map(|c| c.method).collect()
}

fn weighted_score(candidates: &[AttributeCandidate], value: &str, config: &ResolverConfig) -> f64 {
    candidates
        .iter()
        .filter(|c| c.normalized_value() == value)
        .map(|c| config.weights.weight(c.method) * c.confidence)
        .sum()
}

fn build(
    group: &ClassifiedGroup,
    value: String,
    confidence: f64,
    resolution_method: ResolutionMethod,
    contributing_methods: BTreeSet<DetectionMethod>,
    representative: &AttributeCandidate,
) -> ResolvedAttribute {
    ResolvedAttribute {
        id: AttributeId::new(),
        entity_name: group.entity_name.clone(),
        attribute_type: group.attribute_type,
        value,
        final_confidence: confidence.clamp(0.0, 1.0),
        resolution_method,
        contributing_methods,
        source_text: representative.span.sentence_text.clone(),
        chapter: representative.chapter,
    }
}
