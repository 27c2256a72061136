//! LLM arbitration - batch true conflicts into one structured request
//!
//! All conflicts that survive classification are described in a single
//! prompt (bounded by the configured budget; overflow is ranked by
//! confidence spread and the rest falls back). The response is expected
//! to parse as a small JSON decision list; anything the arbiter does not
//! address, or a response that fails to parse, degrades to the precision
//! fallback - never to an error.

use crate::config::ResolverConfig;
use crate::resolution::precision_fallback;
use semblanza_domain::{
    AttributeConflict, AttributeId, DetectionMethod, ResolutionMethod, ResolvedAttribute,
};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// One per-conflict decision parsed from the arbiter response
#[derive(Debug, Clone, PartialEq)]
pub struct ArbiterDecision {
    /// Index of the conflict in the batched prompt
    pub conflict: usize,

    /// Value the arbiter settled on
    pub value: String,
}

/// Result of applying arbitration to the queued conflicts
#[derive(Debug, Default)]
pub struct ArbitrationOutcome {
    /// Resolved attributes, one per queued conflict
    pub resolved: Vec<ResolvedAttribute>,

    /// Conflicts the arbiter actually decided
    pub arbitrated: usize,

    /// Conflicts that fell back to precision resolution
    pub fell_back: usize,
}

/// Split conflicts into the arbitration batch and the overflow.
///
/// When more conflicts exist than the budget allows, the ones with the
/// largest candidate-confidence spread are prioritized; a wide spread
/// means the detectors disagree hardest about them.
pub fn select_for_arbitration(
    mut conflicts: Vec<AttributeConflict>,
    budget: usize,
) -> (Vec<AttributeConflict>, Vec<AttributeConflict>) {
    if conflicts.len() <= budget {
        return (conflicts, Vec::new());
    }
    conflicts.sort_by(|a, b| {
        b.confidence_spread()
            .partial_cmp(&a.confidence_spread())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let overflow = conflicts.split_off(budget);
    (conflicts, overflow)
}

/// Describe the batched conflicts for the arbiter
pub fn build_arbitration_prompt(conflicts: &[AttributeConflict]) -> String {
    let mut prompt = String::from(
        "Eres un corrector editorial. Varios métodos de análisis discrepan \
         sobre atributos de personajes de un manuscrito. Decide el valor \
         correcto de cada conflicto usando las frases de evidencia.\n\n",
    );

    for (index, conflict) in conflicts.iter().enumerate() {
        prompt.push_str(&format!(
            "Conflicto {}: personaje \"{}\", atributo \"{}\" ({})\n",
            index, conflict.entity_name, conflict.attribute_type, conflict.kind
        ));
        let values = conflict
            .distinct_values()
            .into_iter()
            .map(|v| format!("\"{}\"", v))
            .collect::<Vec<_>>()
            .join(", ");
        prompt.push_str(&format!("  Valores en disputa: {}\n  Evidencia:\n", values));
        for candidate in &conflict.candidates {
            prompt.push_str(&format!(
                "  - [{}, confianza {:.2}{}] \"{}\"\n",
                candidate.method,
                candidate.confidence,
                if candidate.negated { ", negado" } else { "" },
                candidate.span.sentence_text.trim()
            ));
        }
        prompt.push('\n');
    }

    prompt.push_str(
        "Responde únicamente con una lista JSON, un objeto por conflicto:\n\
         [{\"conflict\": 0, \"value\": \"azules\"}]\n",
    );
    prompt
}

/// Parse the arbiter's JSON decision list.
///
/// LLMs sometimes wrap JSON in markdown code blocks; invalid entries are
/// skipped with a warning rather than failing the batch.
pub fn parse_arbiter_response(response: &str) -> Result<Vec<ArbiterDecision>, String> {
    let json_str = extract_json(response)?;

    let json: Value =
        serde_json::from_str(&json_str).map_err(|e| format!("JSON parse error: {}", e))?;

    let entries = json
        .as_array()
        .ok_or_else(|| "Expected JSON array".to_string())?;

    let mut decisions = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        match parse_decision(entry) {
            Ok(decision) => decisions.push(decision),
            Err(e) => {
                warn!("Failed to parse arbiter decision {}: {}", idx, e);
            }
        }
    }

    Ok(decisions)
}

/// Extract JSON from a response, handling markdown code blocks
fn extract_json(response: &str) -> Result<String, String> {
    let trimmed = response.trim();

    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() < 2 {
            return Err("Empty code block".to_string());
        }
        let json_lines = &lines[1..lines.len().saturating_sub(1)];
        Ok(json_lines.join("\n"))
    } else {
        Ok(trimmed.to_string())
    }
}

fn parse_decision(entry: &Value) -> Result<ArbiterDecision, String> {
    let obj = entry
        .as_object()
        .ok_or_else(|| "Decision is not a JSON object".to_string())?;

    let conflict = obj
        .get("conflict")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| "Missing or invalid 'conflict'".to_string())? as usize;

    let value = obj
        .get("value")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "Missing or invalid 'value'".to_string())?
        .trim()
        .to_lowercase();

    if value.is_empty() {
        return Err("Empty 'value'".to_string());
    }

    Ok(ArbiterDecision { conflict, value })
}

/// Apply parsed decisions to the queued conflicts.
///
/// A decision matching one of the conflict's candidate values takes the
/// calibrated arbitration confidence; a novel value is still accepted,
/// at lower confidence, since no detector corroborates it. Conflicts
/// without a decision fall back to precision resolution.
pub fn apply_decisions(
    conflicts: &[AttributeConflict],
    decisions: &[ArbiterDecision],
    config: &ResolverConfig,
) -> ArbitrationOutcome {
    let mut outcome = ArbitrationOutcome::default();

    for (index, conflict) in conflicts.iter().enumerate() {
        let decision = decisions.iter().find(|d| d.conflict == index);

        let Some(decision) = decision else {
            debug!(
                entity = %conflict.entity_name,
                attribute = %conflict.attribute_type,
                "conflict not addressed by arbiter, falling back"
            );
            outcome.resolved.push(precision_fallback(conflict, config));
            outcome.fell_back += 1;
            continue;
        };

        let matching: Vec<_> = conflict
            .candidates
            .iter()
            .filter(|c| c.normalized_value() == decision.value)
            .collect();

        let (confidence, methods, representative) = if matching.is_empty() {
            // Value none of the detectors saw; accepted, but without
            // corroboration.
            let representative = conflict
                .candidates
                .iter()
                .max_by(|a, b| {
                    a.confidence
                        .partial_cmp(&b.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .expect("conflicts are never empty");
            let methods: BTreeSet<DetectionMethod> =
                conflict.candidates.iter().map(|c| c.method).collect();
            (config.arbiter_novel_confidence, methods, representative)
        } else {
            let representative = matching
                .iter()
                .copied()
                .max_by(|a, b| {
                    a.confidence
                        .partial_cmp(&b.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .expect("matching is non-empty");
            let methods: BTreeSet<DetectionMethod> = matching.iter().map(|c| c.method).collect();
            (config.arbiter_confidence, methods, representative)
        };

        debug!(
            entity = %conflict.entity_name,
            attribute = %conflict.attribute_type,
            value = %decision.value,
            confidence,
            "conflict decided by arbiter"
        );
        outcome.resolved.push(ResolvedAttribute {
            id: AttributeId::new(),
            entity_name: conflict.entity_name.clone(),
            attribute_type: conflict.attribute_type,
            value: decision.value.clone(),
            final_confidence: confidence.clamp(0.0, 1.0),
            resolution_method: ResolutionMethod::LlmArbitration,
            contributing_methods: methods,
            source_text: representative.span.sentence_text.clone(),
            chapter: representative.chapter,
        });
        outcome.arbitrated += 1;
    }

    outcome
}
