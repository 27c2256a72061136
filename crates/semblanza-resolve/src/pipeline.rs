//! Pipeline orchestrator
//!
//! One invocation: detectors → assignment → classification → resolution
//! (with at most one arbiter call) → deduplication. Stages run strictly
//! left to right; the pattern and embedding detectors, which only read
//! the immutable document, run concurrently on blocking tasks while the
//! dependency detector builds and consumes its subject map inline.
//!
//! The pipeline has no fatal path after construction: detector failures
//! are isolated, arbiter trouble degrades to the precision fallback, and
//! degenerate input yields an empty result.

use crate::arbiter::{
    apply_decisions, build_arbitration_prompt, parse_arbiter_response, select_for_arbitration,
    ArbiterDecision,
};
use crate::assign::assign_candidates;
use crate::classify::classify;
use crate::config::ResolverConfig;
use crate::dedupe::dedupe;
use crate::error::ResolveError;
use crate::resolution::{precision_fallback, resolve_groups};
use semblanza_detect::{DependencyDetector, EmbeddingDetector, LexicalEmbedder, PatternDetector};
use semblanza_domain::traits::{Detection, Detector, LlmProvider};
use semblanza_domain::{AnnotatedDocument, AttributeConflict, ResolvedAttribute};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{info, warn};

/// Per-run counters for observability; no decision logic reads these
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunMetadata {
    /// Candidates emitted by the pattern detector
    pub pattern_candidates: usize,

    /// Candidates emitted by the dependency detector
    pub dependency_candidates: usize,

    /// Candidates emitted by the embedding detector
    pub embedding_candidates: usize,

    /// Surface matches suppressed by the metaphor/dialogue guards
    pub suppressed_matches: usize,

    /// Candidates dropped for want of a locatable entity
    pub dropped_unassigned: usize,

    /// Conflicts decided by the arbiter
    pub conflicts_arbitrated: usize,

    /// Conflicts resolved by the precision fallback
    pub conflicts_fallback: usize,

    /// Resolutions discarded below the confidence floor
    pub below_threshold: usize,

    /// Duplicates collapsed by the final pass
    pub superseded_duplicates: usize,

    /// Wall-clock processing time
    pub processing_time_ms: u64,
}

/// The complete result of one invocation
#[derive(Debug, Clone, Default)]
pub struct PipelineOutcome {
    /// Resolved attributes, ordered by entity then attribute type
    pub attributes: Vec<ResolvedAttribute>,

    /// Run counters
    pub metadata: RunMetadata,
}

/// Placeholder provider for pipelines built without an arbiter
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledArbiter;

impl LlmProvider for DisabledArbiter {
    type Error = ResolveError;

    fn generate(&self, _prompt: &str) -> Result<String, Self::Error> {
        Err(ResolveError::ArbiterDisabled)
    }
}

/// The attribute-attribution pipeline
pub struct AttributeResolver<P: LlmProvider = DisabledArbiter> {
    config: ResolverConfig,
    pattern: Arc<PatternDetector>,
    dependency: DependencyDetector,
    embedding: Arc<EmbeddingDetector<LexicalEmbedder>>,
    arbiter: Option<Arc<P>>,
}

impl AttributeResolver<DisabledArbiter> {
    /// Build a pipeline without an arbiter; every true conflict resolves
    /// by precision fallback
    pub fn new(config: ResolverConfig) -> Result<Self, ResolveError> {
        Self::build(config, None)
    }
}

impl<P> AttributeResolver<P>
where
    P: LlmProvider + Send + Sync + 'static,
    P::Error: Display + Send + 'static,
{
    /// Build a pipeline with an arbiter for conflict resolution
    pub fn with_arbiter(config: ResolverConfig, arbiter: P) -> Result<Self, ResolveError> {
        Self::build(config, Some(Arc::new(arbiter)))
    }

    fn build(config: ResolverConfig, arbiter: Option<Arc<P>>) -> Result<Self, ResolveError> {
        config.validate().map_err(ResolveError::InvalidConfig)?;
        Ok(Self {
            pattern: Arc::new(PatternDetector::new(config.detect.clone())?),
            dependency: DependencyDetector::new(config.detect.clone())?,
            embedding: Arc::new(EmbeddingDetector::new(config.detect.clone())?),
            config,
            arbiter,
        })
    }

    /// Run one complete invocation over one annotated document.
    ///
    /// Always returns a full result list; failures along the way degrade
    /// confidence or omit attributes, never abort.
    pub async fn resolve(&self, document: &AnnotatedDocument) -> PipelineOutcome {
        let started = Instant::now();

        if document.is_degenerate() {
            info!("degenerate input (empty text or entity set), empty result");
            return PipelineOutcome::default();
        }

        let mut metadata = RunMetadata::default();

        // Pattern and embedding detection only read the document; run
        // them off-thread while dependency detection (which owns the
        // subject tracker) proceeds here.
        let shared = Arc::new(document.clone());

        let pattern = Arc::clone(&self.pattern);
        let doc_for_pattern = Arc::clone(&shared);
        let pattern_task =
            tokio::task::spawn_blocking(move || pattern.detect(doc_for_pattern.as_ref()));

        let embedding = Arc::clone(&self.embedding);
        let doc_for_embedding = Arc::clone(&shared);
        let embedding_task =
            tokio::task::spawn_blocking(move || embedding.detect(doc_for_embedding.as_ref()));

        let dependency_detection = match self.dependency.detect(document) {
            Ok(detection) => detection,
            Err(e) => {
                warn!("dependency detector failed, contributing nothing: {}", e);
                Detection::default()
            }
        };

        let (pattern_result, embedding_result) = tokio::join!(pattern_task, embedding_task);
        let pattern_detection = settle_detection(pattern_result, "pattern");
        let embedding_detection = settle_detection(embedding_result, "embedding");

        metadata.pattern_candidates = pattern_detection.candidates.len();
        metadata.dependency_candidates = dependency_detection.candidates.len();
        metadata.embedding_candidates = embedding_detection.candidates.len();
        metadata.suppressed_matches = pattern_detection.suppressed
            + dependency_detection.suppressed
            + embedding_detection.suppressed;

        let mut candidates = dependency_detection.candidates;
        candidates.extend(pattern_detection.candidates);
        candidates.extend(embedding_detection.candidates);

        let assignment = assign_candidates(document, candidates, &self.config);
        metadata.dropped_unassigned = assignment.dropped;

        let groups = classify(assignment.assigned);
        let (mut resolved, conflicts) = resolve_groups(groups, &self.config);

        if !conflicts.is_empty() {
            self.settle_conflicts(conflicts, &mut resolved, &mut metadata)
                .await;
        }

        let mut surviving = Vec::with_capacity(resolved.len());
        for attribute in resolved {
            if attribute.final_confidence >= self.config.min_confidence {
                surviving.push(attribute);
            } else {
                metadata.below_threshold += 1;
            }
        }

        let (attributes, superseded) = dedupe(surviving);
        metadata.superseded_duplicates = superseded;
        metadata.processing_time_ms = started.elapsed().as_millis() as u64;

        info!(
            attributes = attributes.len(),
            arbitrated = metadata.conflicts_arbitrated,
            fallback = metadata.conflicts_fallback,
            dropped = metadata.dropped_unassigned,
            elapsed_ms = metadata.processing_time_ms,
            "invocation complete"
        );

        PipelineOutcome {
            attributes,
            metadata,
        }
    }

    /// Arbitrate what the budget allows, fall back for the rest
    async fn settle_conflicts(
        &self,
        conflicts: Vec<AttributeConflict>,
        resolved: &mut Vec<ResolvedAttribute>,
        metadata: &mut RunMetadata,
    ) {
        let Some(provider) = &self.arbiter else {
            for conflict in &conflicts {
                resolved.push(precision_fallback(conflict, &self.config));
                metadata.conflicts_fallback += 1;
            }
            return;
        };

        let (queued, overflow) =
            select_for_arbitration(conflicts, self.config.max_arbitrated_conflicts);
        for conflict in &overflow {
            resolved.push(precision_fallback(conflict, &self.config));
            metadata.conflicts_fallback += 1;
        }

        match self.call_arbiter(provider, &queued).await {
            Some(decisions) => {
                let outcome = apply_decisions(&queued, &decisions, &self.config);
                metadata.conflicts_arbitrated += outcome.arbitrated;
                metadata.conflicts_fallback += outcome.fell_back;
                resolved.extend(outcome.resolved);
            }
            None => {
                for conflict in &queued {
                    resolved.push(precision_fallback(conflict, &self.config));
                    metadata.conflicts_fallback += 1;
                }
            }
        }
    }

    /// The pipeline's single I/O-bound operation: one call, one timeout,
    /// no retries. Any failure means "no decisions".
    async fn call_arbiter(
        &self,
        provider: &Arc<P>,
        queued: &[AttributeConflict],
    ) -> Option<Vec<ArbiterDecision>> {
        if queued.is_empty() {
            return Some(Vec::new());
        }

        let prompt = build_arbitration_prompt(queued);
        info!(
            conflicts = queued.len(),
            prompt_len = prompt.len(),
            "invoking arbiter"
        );

        let provider = Arc::clone(provider);
        let call = tokio::task::spawn_blocking(move || provider.generate(&prompt));

        match timeout(self.config.arbiter_timeout(), call).await {
            Ok(Ok(Ok(response))) => match parse_arbiter_response(&response) {
                Ok(decisions) => Some(decisions),
                Err(e) => {
                    warn!("arbiter response failed to parse: {}", e);
                    None
                }
            },
            Ok(Ok(Err(e))) => {
                warn!("arbiter call failed: {}", e);
                None
            }
            Ok(Err(e)) => {
                warn!("arbiter task failed: {}", e);
                None
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.config.arbiter_timeout_secs,
                    "arbiter call timed out"
                );
                None
            }
        }
    }
}

/// Unpack a detector task result; any failure contributes nothing
fn settle_detection<E: Display>(
    result: Result<Result<Detection, E>, tokio::task::JoinError>,
    which: &str,
) -> Detection {
    match result {
        Ok(Ok(detection)) => detection,
        Ok(Err(e)) => {
            warn!("{} detector failed, contributing nothing: {}", which, e);
            Detection::default()
        }
        Err(e) => {
            warn!("{} detector task panicked or was cancelled: {}", which, e);
            Detection::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semblanza_domain::DocumentBuilder;

    #[tokio::test]
    async fn test_empty_text_yields_empty_outcome() {
        let resolver = AttributeResolver::new(ResolverConfig::default()).unwrap();
        let doc = DocumentBuilder::new("   ").entity("María").build();
        let outcome = resolver.resolve(&doc).await;
        assert!(outcome.attributes.is_empty());
    }

    #[tokio::test]
    async fn test_empty_entity_set_yields_empty_outcome() {
        let resolver = AttributeResolver::new(ResolverConfig::default()).unwrap();
        let doc = DocumentBuilder::new("María tenía los ojos azules.")
            .sentence(0, 30, vec![])
            .build();
        let outcome = resolver.resolve(&doc).await;
        assert!(outcome.attributes.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = ResolverConfig::default();
        config.min_confidence = 2.0;
        assert!(matches!(
            AttributeResolver::new(config),
            Err(ResolveError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_disabled_arbiter_always_errors() {
        let provider = DisabledArbiter;
        assert!(provider.generate("anything").is_err());
    }
}
