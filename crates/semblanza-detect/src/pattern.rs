//! Pattern detector - fixed surface rules over sentence text
//!
//! High precision on known phrasings, zero recall outside them. Rules
//! never assign an entity: that is the assignment stage's job (or the
//! dependency detector's, when syntax allows it).
//!
//! Every match passes three guards before emission:
//! - dialogue: matches inside quoted or dash-opened speech are discarded
//! - metaphor: matches inside a metaphor-indicator window are discarded
//! - negation: a negation indicator just before the match sets the
//!   candidate's negated flag (the classifier handles the disagreement)

use crate::config::DetectorConfig;
use crate::context::{self, ContextGuards};
use crate::error::DetectError;
use crate::vocab;
use regex::Regex;
use semblanza_domain::traits::{Detection, Detector};
use semblanza_domain::{
    AnnotatedDocument, AttributeCandidate, AttributeType, DetectionMethod, SourceSpan,
};
use std::collections::HashMap;
use tracing::debug;

/// One surface rule: the first capture group is the attribute value
#[derive(Debug, Clone)]
pub struct PatternRule {
    /// Rule source, kept for diagnostics
    pub source: String,
    /// Compiled pattern
    pub regex: Regex,
    /// Attribute kind this rule detects
    pub attribute_type: AttributeType,
    /// Base confidence of a match
    pub confidence: f64,
}

impl PatternRule {
    fn compile(
        source: &str,
        attribute_type: AttributeType,
        confidence: f64,
    ) -> Result<Self, DetectError> {
        let regex =
            Regex::new(&format!("(?i){}", source)).map_err(|e| DetectError::InvalidRule {
                rule: source.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            source: source.to_string(),
            regex,
            attribute_type,
            confidence,
        })
    }
}

/// The default Spanish rule table: (pattern, attribute type, confidence)
fn default_rule_table() -> &'static [(&'static str, AttributeType, f64)] {
    use AttributeType::*;
    &[
        // Eyes
        (r"ten[íi]a\s+(?:unos\s+)?(?:los\s+)?ojos\s+(\w+)", EyeColor, 0.90),
        (r"(?:los|sus)\s+ojos\s+(\w+)", EyeColor, 0.75),
        (r"de\s+ojos\s+(\w+)", EyeColor, 0.65),
        (r"ojos\s+(\w+)", EyeColor, 0.50),
        // Hair
        (
            r"(?:ten[íi]a|llevaba)\s+(?:el\s+)?(?:pelo|cabello)\s+(\w+)",
            HairColor,
            0.90,
        ),
        (r"(?:el|su)\s+(?:pelo|cabello)\s+(\w+)", HairColor, 0.60),
        (
            r"(?:pelo|cabello|melena)\s+(largo|corto|liso|rizado|ondulado|recogido|suelto)",
            HairType,
            0.80,
        ),
        // Age
        (r"de\s+(\d+)\s+años", Age, 0.95),
        (r"ten[íi]a\s+(\d+)\s+años", Age, 0.90),
        (r"cumpl[íi][aó]\s+(\d+)\s+años", Age, 0.90),
        // Copulative descriptions
        (r"era\s+(alto|alta|bajo|baja|bajito|bajita)", Height, 0.85),
        (
            r"era\s+(delgado|delgada|corpulento|corpulenta|esbelto|esbelta|robusto|robusta|gordo|gorda|flaco|flaca|atlético|atlética|fornido|fornida)",
            Build,
            0.85,
        ),
        (
            r"era\s+(rubio|rubia|moreno|morena|castaño|castaña|pelirrojo|pelirroja|canoso|canosa)",
            HairColor,
            0.80,
        ),
        (
            r"era\s+(joven|viejo|vieja|anciano|anciana|adolescente|mayor)",
            Age,
            0.70,
        ),
        // Profession
        (r"trabajaba\s+(?:como|de)\s+(\w+)", Profession, 0.85),
        (r"era\s+(?:un|una)\s+(\w+)\s+de\s+profesión", Profession, 0.90),
    ]
}

/// Surface-pattern detector
pub struct PatternDetector {
    rules: Vec<PatternRule>,
    guards: ContextGuards,
    config: DetectorConfig,
}

impl PatternDetector {
    /// Build the detector with the default Spanish rule table
    pub fn new(config: DetectorConfig) -> Result<Self, DetectError> {
        let rules = default_rule_table()
            .iter()
            .map(|(src, ty, conf)| PatternRule::compile(src, *ty, *conf))
            .collect::<Result<Vec<_>, _>>()?;
        Self::with_rules(config, rules)
    }

    /// Build the detector with a custom rule table
    pub fn with_rules(config: DetectorConfig, rules: Vec<PatternRule>) -> Result<Self, DetectError> {
        config
            .validate()
            .map_err(DetectError::InvalidConfig)?;
        Ok(Self {
            rules,
            guards: ContextGuards::new()?,
            config,
        })
    }

    fn scan_sentence(
        &self,
        document: &AnnotatedDocument,
        sentence_index: usize,
        detection: &mut Detection,
    ) {
        let sentence = &document.sentences[sentence_index];
        let sentence_text = sentence.text(&document.text);

        // Best candidate per (type, value); overlapping rules fire on the
        // same phrase and must not count as independent votes.
        let mut best: HashMap<(AttributeType, String), AttributeCandidate> = HashMap::new();

        for rule in &self.rules {
            for captures in rule.regex.captures_iter(sentence_text) {
                let Some(value_match) = captures.get(1) else {
                    continue;
                };
                let value = value_match.as_str().trim().to_lowercase();
                if !vocab::validate_value(rule.attribute_type, &value) {
                    continue;
                }

                let full = captures.get(0).expect("group 0 always present");
                let doc_start = sentence.start + full.start();
                let doc_end = sentence.start + full.end();

                if context::is_inside_dialogue(&document.text, doc_start) {
                    debug!(rule = %rule.source, "match inside dialogue, discarded");
                    detection.suppressed += 1;
                    continue;
                }

                if self.is_metaphorical(sentence_text, full.start(), full.end()) {
                    debug!(rule = %rule.source, value = %value, "metaphorical match, discarded");
                    detection.suppressed += 1;
                    continue;
                }

                let negated = self.is_negated(sentence_text, full.start());

                let candidate = AttributeCandidate {
                    attribute_type: rule.attribute_type,
                    value: value.clone(),
                    span: SourceSpan {
                        sentence_text: sentence_text.to_string(),
                        start: doc_start,
                        end: doc_end,
                    },
                    sentence_index,
                    method: DetectionMethod::Pattern,
                    confidence: rule.confidence,
                    assigned_entity: None,
                    assignment_tier: None,
                    assignment_evidence: None,
                    negated,
                    metaphor_suspected: false,
                    chapter: document.chapter,
                };

                let key = (rule.attribute_type, value);
                match best.get(&key) {
                    Some(existing) if existing.confidence >= candidate.confidence => {}
                    _ => {
                        best.insert(key, candidate);
                    }
                }
            }
        }

        let mut found: Vec<AttributeCandidate> = best.into_values().collect();
        found.sort_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then(a.attribute_type.cmp(&b.attribute_type))
        });
        detection.candidates.extend(found);
    }

    fn is_metaphorical(&self, sentence_text: &str, start: usize, end: usize) -> bool {
        let window_start = context::floor_char_boundary(
            sentence_text,
            start.saturating_sub(self.config.metaphor_window),
        );
        let window_end = context::ceil_char_boundary(
            sentence_text,
            (end + self.config.metaphor_window).min(sentence_text.len()),
        );
        let window = &sentence_text[window_start..window_end];
        self.guards
            .is_metaphorical(window, start - window_start, end - window_start)
    }

    fn is_negated(&self, sentence_text: &str, start: usize) -> bool {
        let before_start = context::floor_char_boundary(
            sentence_text,
            start.saturating_sub(self.config.negation_window),
        );
        self.guards.is_negated(&sentence_text[before_start..start])
    }
}

impl Detector for PatternDetector {
    type Error = DetectError;

    fn method(&self) -> DetectionMethod {
        DetectionMethod::Pattern
    }

    fn detect(&self, document: &AnnotatedDocument) -> Result<Detection, Self::Error> {
        let mut detection = Detection::default();
        for index in 0..document.sentences.len() {
            self.scan_sentence(document, index, &mut detection);
        }
        debug!(
            candidates = detection.candidates.len(),
            suppressed = detection.suppressed,
            "pattern detection finished"
        );
        Ok(detection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semblanza_domain::{DepRel, DocumentBuilder, MentionKind, Pos, Token};

    fn detector() -> PatternDetector {
        PatternDetector::new(DetectorConfig::default()).unwrap()
    }

    fn simple_doc(text: &str) -> AnnotatedDocument {
        // Token-level parse is irrelevant to the pattern detector; one
        // sentence covering the whole text is enough.
        DocumentBuilder::new(text)
            .entity("María")
            .sentence(
                0,
                text.len(),
                vec![Token::new("x", "x", Pos::Other, DepRel::Root, 0, 0)],
            )
            .build()
    }

    #[test]
    fn test_detects_eye_color() {
        let doc = simple_doc("María tenía los ojos azules.");
        let detection = detector().detect(&doc).unwrap();

        let eye: Vec<_> = detection
            .candidates
            .iter()
            .filter(|c| c.attribute_type == AttributeType::EyeColor)
            .collect();
        assert_eq!(eye.len(), 1, "overlapping rules must collapse to one");
        assert_eq!(eye[0].value, "azules");
        assert!(eye[0].confidence >= 0.9);
        assert!(eye[0].assigned_entity.is_none());
    }

    #[test]
    fn test_invalid_color_rejected() {
        let doc = simple_doc("María tenía los ojos cansados.");
        let detection = detector().detect(&doc).unwrap();
        assert!(detection.candidates.is_empty());
    }

    #[test]
    fn test_metaphor_window_discards_match() {
        let doc = simple_doc("Tenía los ojos azules como el mar.");
        let detection = detector().detect(&doc).unwrap();
        assert!(
            detection
                .candidates
                .iter()
                .all(|c| c.attribute_type != AttributeType::EyeColor),
            "simile must not produce an eye_color candidate"
        );
        assert!(detection.suppressed > 0);
    }

    #[test]
    fn test_simile_sentence_yields_nothing() {
        let doc = simple_doc("Sus ojos eran como pozos de tristeza.");
        let detection = detector().detect(&doc).unwrap();
        assert!(detection
            .candidates
            .iter()
            .all(|c| c.attribute_type != AttributeType::EyeColor));
    }

    #[test]
    fn test_negation_flag_set() {
        let doc = simple_doc("María no tenía los ojos verdes.");
        let detection = detector().detect(&doc).unwrap();
        let eye = detection
            .candidates
            .iter()
            .find(|c| c.attribute_type == AttributeType::EyeColor)
            .expect("negated candidate is still emitted");
        assert!(eye.negated);
    }

    #[test]
    fn test_dialogue_match_discarded() {
        let doc = simple_doc("«Tenías los ojos verdes», dijo Juan.");
        let detection = detector().detect(&doc).unwrap();
        assert!(detection
            .candidates
            .iter()
            .all(|c| c.attribute_type != AttributeType::EyeColor));
    }

    #[test]
    fn test_age_and_hair() {
        let doc = simple_doc("Juan, de 25 años, llevaba el pelo corto.");
        let detection = detector().detect(&doc).unwrap();

        assert!(detection
            .candidates
            .iter()
            .any(|c| c.attribute_type == AttributeType::Age && c.value == "25"));
        assert!(detection
            .candidates
            .iter()
            .any(|c| c.attribute_type == AttributeType::HairType && c.value == "corto"));
    }

    #[test]
    fn test_copulative_height() {
        let doc = simple_doc("María era alta.");
        let detection = detector().detect(&doc).unwrap();
        assert!(detection
            .candidates
            .iter()
            .any(|c| c.attribute_type == AttributeType::Height && c.value == "alta"));
    }

    #[test]
    fn test_spans_are_document_relative() {
        let text = "Relleno inicial. María tenía los ojos azules.";
        let doc = DocumentBuilder::new(text)
            .entity("María")
            .sentence(0, 17, vec![])
            .sentence(17, text.len(), vec![])
            .build();
        let detection = detector().detect(&doc).unwrap();
        let eye = detection
            .candidates
            .iter()
            .find(|c| c.attribute_type == AttributeType::EyeColor)
            .unwrap();
        assert!(eye.span.start > 17);
        assert_eq!(eye.sentence_index, 1);
    }
}
