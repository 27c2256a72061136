//! Dependency detector - syntactic walks over the external parse
//!
//! The only detector that assigns entities directly, because only syntax
//! says who owns a description. Three walks per sentence:
//!
//! - copulative: linking verb + predicate adjective ("María era alta")
//! - possessive: possession verb + body-part object + modifier
//!   ("tenía los ojos azules")
//! - genitive: descriptive phrase attached to an entity mention
//!   ("los ojos verdes de María")
//!
//! When a clause has no explicit subject, the sentence-subject tracker
//! supplies the tacit one and the candidate is marked `syntactic_tacit`
//! instead of `syntactic_explicit`.

use crate::config::DetectorConfig;
use crate::error::DetectError;
use crate::subject::SentenceSubjectMap;
use crate::vocab;
use semblanza_domain::traits::{Detection, Detector};
use semblanza_domain::{
    AnnotatedDocument, AssignmentTier, AttributeCandidate, AttributeType, DepRel, DetectionMethod,
    Pos, Sentence, SourceSpan, Token,
};
use std::collections::HashMap;
use tracing::debug;

/// Copular verb lemmas that introduce predicate adjectives
const COPULAR_LEMMAS: &[&str] = &["ser", "estar", "parecer"];

/// Possession verb lemmas that introduce body-part descriptions
const POSSESSION_LEMMAS: &[&str] = &["tener", "llevar", "lucir"];

/// How a clause subject was found
enum SubjectEvidence {
    /// Explicit nsubj resolved to a known entity
    Explicit(String),
    /// No resolvable explicit subject; the tracker supplied one
    Tacit(String),
}

/// Syntactic dependency detector
pub struct DependencyDetector {
    config: DetectorConfig,
}

impl DependencyDetector {
    /// Build the detector
    pub fn new(config: DetectorConfig) -> Result<Self, DetectError> {
        config.validate().map_err(DetectError::InvalidConfig)?;
        Ok(Self { config })
    }

    fn emit(
        &self,
        out: &mut Vec<AttributeCandidate>,
        document: &AnnotatedDocument,
        sentence: &Sentence,
        attribute_type: AttributeType,
        value_token: &Token,
        entity: &str,
        tier: AssignmentTier,
        evidence: String,
    ) {
        let value = value_token.text.trim().to_lowercase();
        if !vocab::validate_value(attribute_type, &value) {
            return;
        }
        out.push(AttributeCandidate {
            attribute_type,
            value,
            span: SourceSpan {
                sentence_text: sentence.text(&document.text).to_string(),
                start: value_token.start,
                end: value_token.end(),
            },
            sentence_index: sentence.index,
            method: DetectionMethod::Dependency,
            confidence: self.config.tiers.confidence(tier),
            assigned_entity: Some(entity.to_string()),
            assignment_tier: Some(tier),
            assignment_evidence: Some(evidence),
            negated: false,
            metaphor_suspected: false,
            chapter: document.chapter,
        });
    }

    /// Resolve the subject of a clause headed at `predicate_idx` (with the
    /// verb at `verb_idx`), preferring explicit syntax over the tracker.
    fn clause_subject(
        &self,
        sentence: &Sentence,
        document: &AnnotatedDocument,
        subjects: &SentenceSubjectMap,
        verb_idx: usize,
        predicate_idx: usize,
    ) -> Option<SubjectEvidence> {
        for head in [predicate_idx, verb_idx] {
            for (i, child) in sentence.children_of(head) {
                if !child.dep.is_subject() {
                    continue;
                }
                if let Some(name) = resolve_token_entity(sentence, document, i) {
                    return Some(SubjectEvidence::Explicit(name));
                }
                // Pronoun or unknown noun as subject: pronouns are not
                // resolved here, fall through to the tracker.
            }
        }
        subjects
            .subject_of(sentence.index)
            .map(|name| SubjectEvidence::Tacit(name.to_string()))
    }

    fn walk_copulative(
        &self,
        document: &AnnotatedDocument,
        sentence: &Sentence,
        subjects: &SentenceSubjectMap,
        out: &mut Vec<AttributeCandidate>,
    ) {
        for (i, token) in sentence.tokens.iter().enumerate() {
            if !matches!(token.pos, Pos::Aux | Pos::Verb) {
                continue;
            }
            if !COPULAR_LEMMAS.contains(&token.lemma.as_str()) {
                continue;
            }

            let predicate_idx = if token.dep == DepRel::Cop {
                token.head
            } else {
                i
            };
            let Some(predicate) = sentence.tokens.get(predicate_idx) else {
                continue;
            };

            let Some(subject) =
                self.clause_subject(sentence, document, subjects, i, predicate_idx)
            else {
                continue;
            };
            let (entity, tier, evidence) = match &subject {
                SubjectEvidence::Explicit(name) => (
                    name.clone(),
                    AssignmentTier::SyntacticExplicit,
                    format!("explicit subject '{}'", name),
                ),
                SubjectEvidence::Tacit(name) => (
                    name.clone(),
                    AssignmentTier::SyntacticTacit,
                    format!("tacit subject '{}'", name),
                ),
            };

            // Predicate adjective itself, plus coordinated adjectives;
            // "era un hombre alto" hangs the adjectives off a noun.
            let adjectives = if predicate.pos == Pos::Adj {
                let mut adjs = vec![predicate_idx];
                adjs.extend(coordinated_adjectives(sentence, predicate_idx));
                adjs
            } else {
                adjective_children(sentence, predicate_idx)
            };

            for adj_idx in adjectives {
                let adj = &sentence.tokens[adj_idx];
                if let Some(attribute_type) = vocab::classify_adjective(&adj.text) {
                    self.emit(
                        out,
                        document,
                        sentence,
                        attribute_type,
                        adj,
                        &entity,
                        tier,
                        evidence.clone(),
                    );
                }
            }
        }
    }

    fn walk_possession(
        &self,
        document: &AnnotatedDocument,
        sentence: &Sentence,
        subjects: &SentenceSubjectMap,
        out: &mut Vec<AttributeCandidate>,
    ) {
        for (i, token) in sentence.tokens.iter().enumerate() {
            if token.pos != Pos::Verb || !POSSESSION_LEMMAS.contains(&token.lemma.as_str()) {
                continue;
            }

            for (obj_idx, obj) in sentence.children_of(i) {
                if obj.dep != DepRel::Obj {
                    continue;
                }
                let Some(base_type) = vocab::body_part_attribute(&obj.lemma) else {
                    continue;
                };

                let Some(subject) = self.clause_subject(sentence, document, subjects, i, i)
                else {
                    continue;
                };
                let (entity, tier, evidence) = match &subject {
                    SubjectEvidence::Explicit(name) => (
                        name.clone(),
                        AssignmentTier::SyntacticExplicit,
                        format!("possession with explicit subject '{}'", name),
                    ),
                    SubjectEvidence::Tacit(name) => (
                        name.clone(),
                        AssignmentTier::SyntacticTacit,
                        format!("possession with tacit subject '{}'", name),
                    ),
                };

                for adj_idx in adjective_children(sentence, obj_idx) {
                    let adj = &sentence.tokens[adj_idx];
                    let attribute_type = joint_body_part_type(&obj.lemma, &adj.text, base_type);
                    self.emit(
                        out,
                        document,
                        sentence,
                        attribute_type,
                        adj,
                        &entity,
                        tier,
                        evidence.clone(),
                    );
                }
            }
        }
    }

    fn walk_genitive(
        &self,
        document: &AnnotatedDocument,
        sentence: &Sentence,
        out: &mut Vec<AttributeCandidate>,
    ) {
        for (i, token) in sentence.tokens.iter().enumerate() {
            if token.dep != DepRel::Case || token.lemma != "de" {
                continue;
            }
            let owner_idx = token.head;
            let Some(owner) = sentence.tokens.get(owner_idx) else {
                continue;
            };
            if owner.pos != Pos::Propn || owner_idx == i {
                continue;
            }
            let Some(entity) = resolve_token_entity(sentence, document, owner_idx) else {
                continue;
            };

            let Some(described) = sentence.tokens.get(owner.head) else {
                continue;
            };
            let Some(base_type) = vocab::body_part_attribute(&described.lemma) else {
                continue;
            };

            for adj_idx in adjective_children(sentence, owner.head) {
                let adj = &sentence.tokens[adj_idx];
                let attribute_type = joint_body_part_type(&described.lemma, &adj.text, base_type);
                self.emit(
                    out,
                    document,
                    sentence,
                    attribute_type,
                    adj,
                    &entity,
                    AssignmentTier::SyntacticExplicit,
                    format!("genitive 'de {}'", entity),
                );
            }
        }
    }
}

impl Detector for DependencyDetector {
    type Error = DetectError;

    fn method(&self) -> DetectionMethod {
        DetectionMethod::Dependency
    }

    fn detect(&self, document: &AnnotatedDocument) -> Result<Detection, Self::Error> {
        let subjects = SentenceSubjectMap::build(document);
        let mut found = Vec::new();

        for sentence in &document.sentences {
            self.walk_copulative(document, sentence, &subjects, &mut found);
            self.walk_possession(document, sentence, &subjects, &mut found);
            self.walk_genitive(document, sentence, &mut found);
        }

        // The walks overlap on some constructions; keep the strongest
        // observation per (entity, type, value).
        let mut best: HashMap<(String, AttributeType, String), AttributeCandidate> = HashMap::new();
        for candidate in found {
            let key = (
                candidate
                    .assigned_entity
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase(),
                candidate.attribute_type,
                candidate.normalized_value(),
            );
            match best.get(&key) {
                Some(existing) if existing.confidence >= candidate.confidence => {}
                _ => {
                    best.insert(key, candidate);
                }
            }
        }
        let mut candidates: Vec<AttributeCandidate> = best.into_values().collect();
        candidates.sort_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then(a.attribute_type.cmp(&b.attribute_type))
        });

        debug!(candidates = candidates.len(), "dependency detection finished");
        Ok(Detection::of(candidates))
    }
}

/// Resolve the token at `idx` (possibly the head of a two-token proper
/// name) to a known entity
fn resolve_token_entity(
    sentence: &Sentence,
    document: &AnnotatedDocument,
    idx: usize,
) -> Option<String> {
    let token = sentence.tokens.get(idx)?;
    if token.pos == Pos::Propn {
        if let Some(next) = sentence.tokens.get(idx + 1) {
            if next.pos == Pos::Propn {
                let compound = format!("{} {}", token.text, next.text);
                if let Some(name) = document.resolve_entity(&compound) {
                    return Some(name.to_string());
                }
            }
        }
    }
    if token.pos == Pos::Pron {
        return None;
    }
    document.resolve_entity(&token.text).map(str::to_string)
}

/// Adjective children of a head token, including coordinated adjectives
fn adjective_children(sentence: &Sentence, head_idx: usize) -> Vec<usize> {
    let mut adjectives = Vec::new();
    for (i, child) in sentence.children_of(head_idx) {
        if child.pos == Pos::Adj {
            adjectives.push(i);
            adjectives.extend(coordinated_adjectives(sentence, i));
        }
    }
    adjectives
}

/// Adjectives coordinated with (or nested under) the adjective at `idx`
fn coordinated_adjectives(sentence: &Sentence, idx: usize) -> Vec<usize> {
    sentence
        .children_of(idx)
        .filter(|(_, t)| t.pos == Pos::Adj && matches!(t.dep, DepRel::Conj | DepRel::Amod))
        .map(|(i, _)| i)
        .collect()
}

/// Body parts like "pelo" carry both color and shape descriptors;
/// "pelo largo" is hair_type, "pelo negro" is hair_color.
fn joint_body_part_type(
    body_part_lemma: &str,
    adjective: &str,
    base_type: AttributeType,
) -> AttributeType {
    let adj = adjective.trim().to_lowercase();
    if vocab::body_part_has_hair_type(body_part_lemma) && vocab::HAIR_TYPES.contains(&adj.as_str())
    {
        AttributeType::HairType
    } else {
        base_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semblanza_domain::{DocumentBuilder, MentionKind};

    fn detector() -> DependencyDetector {
        DependencyDetector::new(DetectorConfig::default()).unwrap()
    }

    /// "María tenía los ojos azules."
    fn possession_doc() -> AnnotatedDocument {
        DocumentBuilder::new("María tenía los ojos azules.")
            .entity("María")
            .mention("María", 0, 6, MentionKind::Person)
            .sentence(
                0,
                30,
                vec![
                    Token::new("María", "maría", Pos::Propn, DepRel::Nsubj, 1, 0),
                    Token::new("tenía", "tener", Pos::Verb, DepRel::Root, 1, 7),
                    Token::new("los", "el", Pos::Det, DepRel::Det, 3, 14),
                    Token::new("ojos", "ojo", Pos::Noun, DepRel::Obj, 1, 18),
                    Token::new("azules", "azul", Pos::Adj, DepRel::Amod, 3, 23),
                    Token::new(".", ".", Pos::Punct, DepRel::Other, 1, 29),
                ],
            )
            .build()
    }

    /// "María entró. Era alta."
    fn tacit_doc() -> AnnotatedDocument {
        DocumentBuilder::new("María entró. Era alta.")
            .entity("María")
            .mention("María", 0, 6, MentionKind::Person)
            .sentence(
                0,
                15,
                vec![
                    Token::new("María", "maría", Pos::Propn, DepRel::Nsubj, 1, 0),
                    Token::new("entró", "entrar", Pos::Verb, DepRel::Root, 1, 7),
                    Token::new(".", ".", Pos::Punct, DepRel::Other, 1, 13),
                ],
            )
            .sentence(
                15,
                24,
                vec![
                    Token::new("Era", "ser", Pos::Aux, DepRel::Cop, 1, 15),
                    Token::new("alta", "alto", Pos::Adj, DepRel::Root, 1, 19),
                    Token::new(".", ".", Pos::Punct, DepRel::Other, 1, 23),
                ],
            )
            .build()
    }

    #[test]
    fn test_possession_explicit_subject() {
        let detection = detector().detect(&possession_doc()).unwrap();
        assert_eq!(detection.candidates.len(), 1);

        let c = &detection.candidates[0];
        assert_eq!(c.attribute_type, AttributeType::EyeColor);
        assert_eq!(c.value, "azules");
        assert_eq!(c.assigned_entity.as_deref(), Some("María"));
        assert_eq!(c.assignment_tier, Some(AssignmentTier::SyntacticExplicit));
        assert!((c.confidence - 0.92).abs() < 1e-9);
    }

    #[test]
    fn test_copulative_tacit_subject() {
        let detection = detector().detect(&tacit_doc()).unwrap();
        assert_eq!(detection.candidates.len(), 1);

        let c = &detection.candidates[0];
        assert_eq!(c.attribute_type, AttributeType::Height);
        assert_eq!(c.value, "alta");
        assert_eq!(c.assigned_entity.as_deref(), Some("María"));
        assert_eq!(c.assignment_tier, Some(AssignmentTier::SyntacticTacit));
        assert!((c.confidence - 0.78).abs() < 1e-9);
    }

    #[test]
    fn test_genitive_attachment() {
        // "Los ojos verdes de María brillaban."
        let doc = DocumentBuilder::new("Los ojos verdes de María brillaban.")
            .entity("María")
            .entity("Juan")
            .mention("María", 19, 25, MentionKind::Person)
            .sentence(
                0,
                36,
                vec![
                    Token::new("Los", "el", Pos::Det, DepRel::Det, 1, 0),
                    Token::new("ojos", "ojo", Pos::Noun, DepRel::Nsubj, 5, 4),
                    Token::new("verdes", "verde", Pos::Adj, DepRel::Amod, 1, 9),
                    Token::new("de", "de", Pos::Adp, DepRel::Case, 4, 16),
                    Token::new("María", "maría", Pos::Propn, DepRel::Nmod, 1, 19),
                    Token::new("brillaban", "brillar", Pos::Verb, DepRel::Root, 5, 26),
                ],
            )
            .build();

        let detection = detector().detect(&doc).unwrap();
        assert_eq!(detection.candidates.len(), 1);

        let c = &detection.candidates[0];
        assert_eq!(c.attribute_type, AttributeType::EyeColor);
        assert_eq!(c.value, "verdes");
        assert_eq!(c.assigned_entity.as_deref(), Some("María"));
        assert_eq!(c.assignment_tier, Some(AssignmentTier::SyntacticExplicit));
    }

    #[test]
    fn test_possession_tacit_subject() {
        // "María entró. Tenía el pelo negro."
        let doc = DocumentBuilder::new("María entró. Tenía el pelo negro.")
            .entity("María")
            .mention("María", 0, 6, MentionKind::Person)
            .sentence(
                0,
                15,
                vec![
                    Token::new("María", "maría", Pos::Propn, DepRel::Nsubj, 1, 0),
                    Token::new("entró", "entrar", Pos::Verb, DepRel::Root, 1, 7),
                ],
            )
            .sentence(
                15,
                36,
                vec![
                    Token::new("Tenía", "tener", Pos::Verb, DepRel::Root, 0, 15),
                    Token::new("el", "el", Pos::Det, DepRel::Det, 2, 22),
                    Token::new("pelo", "pelo", Pos::Noun, DepRel::Obj, 0, 25),
                    Token::new("negro", "negro", Pos::Adj, DepRel::Amod, 2, 30),
                ],
            )
            .build();

        let detection = detector().detect(&doc).unwrap();
        assert_eq!(detection.candidates.len(), 1);

        let c = &detection.candidates[0];
        assert_eq!(c.attribute_type, AttributeType::HairColor);
        assert_eq!(c.assigned_entity.as_deref(), Some("María"));
        assert_eq!(c.assignment_tier, Some(AssignmentTier::SyntacticTacit));
    }

    #[test]
    fn test_hair_type_disambiguation() {
        // "Juan tenía el pelo largo."
        let doc = DocumentBuilder::new("Juan tenía el pelo largo.")
            .entity("Juan")
            .mention("Juan", 0, 4, MentionKind::Person)
            .sentence(
                0,
                26,
                vec![
                    Token::new("Juan", "juan", Pos::Propn, DepRel::Nsubj, 1, 0),
                    Token::new("tenía", "tener", Pos::Verb, DepRel::Root, 1, 5),
                    Token::new("el", "el", Pos::Det, DepRel::Det, 3, 12),
                    Token::new("pelo", "pelo", Pos::Noun, DepRel::Obj, 1, 15),
                    Token::new("largo", "largo", Pos::Adj, DepRel::Amod, 3, 20),
                ],
            )
            .build();

        let detection = detector().detect(&doc).unwrap();
        assert_eq!(detection.candidates.len(), 1);
        assert_eq!(detection.candidates[0].attribute_type, AttributeType::HairType);
    }

    #[test]
    fn test_coordinated_adjectives() {
        // "María era alta y delgada."
        let doc = DocumentBuilder::new("María era alta y delgada.")
            .entity("María")
            .mention("María", 0, 6, MentionKind::Person)
            .sentence(
                0,
                26,
                vec![
                    Token::new("María", "maría", Pos::Propn, DepRel::Nsubj, 2, 0),
                    Token::new("era", "ser", Pos::Aux, DepRel::Cop, 2, 7),
                    Token::new("alta", "alto", Pos::Adj, DepRel::Root, 2, 11),
                    Token::new("y", "y", Pos::Cconj, DepRel::Other, 4, 16),
                    Token::new("delgada", "delgado", Pos::Adj, DepRel::Conj, 2, 18),
                ],
            )
            .build();

        let detection = detector().detect(&doc).unwrap();
        let types: Vec<AttributeType> = detection
            .candidates
            .iter()
            .map(|c| c.attribute_type)
            .collect();
        assert!(types.contains(&AttributeType::Height));
        assert!(types.contains(&AttributeType::Build));
        for c in &detection.candidates {
            assert_eq!(c.assignment_tier, Some(AssignmentTier::SyntacticExplicit));
        }
    }

    #[test]
    fn test_unknown_subject_yields_nothing() {
        // "Pedro era alto." with only María known and no prior subject
        let doc = DocumentBuilder::new("Pedro era alto.")
            .entity("María")
            .sentence(
                0,
                15,
                vec![
                    Token::new("Pedro", "pedro", Pos::Propn, DepRel::Nsubj, 2, 0),
                    Token::new("era", "ser", Pos::Aux, DepRel::Cop, 2, 6),
                    Token::new("alto", "alto", Pos::Adj, DepRel::Root, 2, 10),
                ],
            )
            .build();

        let detection = detector().detect(&doc).unwrap();
        assert!(detection.candidates.is_empty());
    }
}
