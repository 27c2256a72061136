//! Sentence-subject tracker
//!
//! Records, per sentence, the most recent explicit grammatical subject
//! resolvable to a known entity; sentences without one inherit the value
//! of the previous sentence. This approximates clause-level anaphora for
//! pro-drop Spanish ("María entró. Era alta.") without full coreference.
//!
//! The map is rebuilt from scratch on every invocation and owned by the
//! dependency detector while it runs.

use semblanza_domain::{AnnotatedDocument, Pos, Sentence};
use std::collections::BTreeMap;

/// Per-sentence view of the last known explicit subject
#[derive(Debug, Clone, Default)]
pub struct SentenceSubjectMap {
    by_index: Vec<Option<String>>,
    by_offset: BTreeMap<usize, Option<String>>,
}

impl SentenceSubjectMap {
    /// Walk the document in order, tracking explicit subjects
    pub fn build(document: &AnnotatedDocument) -> Self {
        let mut by_index = Vec::with_capacity(document.sentences.len());
        let mut by_offset = BTreeMap::new();
        let mut last: Option<String> = None;

        for sentence in &document.sentences {
            if let Some(subject) = explicit_subject(sentence, document) {
                last = Some(subject);
            }
            by_index.push(last.clone());
            by_offset.insert(sentence.start, last.clone());
        }

        Self {
            by_index,
            by_offset,
        }
    }

    /// Subject in effect for the sentence at `index`
    pub fn subject_of(&self, index: usize) -> Option<&str> {
        self.by_index.get(index).and_then(|s| s.as_deref())
    }

    /// Subject in effect for the sentence starting at `offset`
    pub fn subject_at(&self, offset: usize) -> Option<&str> {
        self.by_offset.get(&offset).and_then(|s| s.as_deref())
    }
}

/// Find an explicit-subject token resolvable to a known entity.
///
/// Compound names are checked first: two consecutive proper-noun tokens
/// ("María García") must resolve as a unit before falling back to the
/// single token.
fn explicit_subject(sentence: &Sentence, document: &AnnotatedDocument) -> Option<String> {
    for (i, token) in sentence.subject_tokens() {
        if token.pos == Pos::Propn {
            if let Some(next) = sentence.tokens.get(i + 1) {
                if next.pos == Pos::Propn {
                    let compound = format!("{} {}", token.text, next.text);
                    if let Some(name) = document.resolve_entity(&compound) {
                        return Some(name.to_string());
                    }
                }
            }
        }
        if let Some(name) = document.resolve_entity(&token.text) {
            return Some(name.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use semblanza_domain::{DepRel, DocumentBuilder, MentionKind, Token};

    fn doc() -> AnnotatedDocument {
        // "María entró. Era alta."
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
    fn test_explicit_subject_recorded() {
        let map = SentenceSubjectMap::build(&doc());
        assert_eq!(map.subject_of(0), Some("María"));
    }

    #[test]
    fn test_subjectless_sentence_inherits() {
        let map = SentenceSubjectMap::build(&doc());
        assert_eq!(map.subject_of(1), Some("María"));
        assert_eq!(map.subject_at(15), Some("María"));
    }

    #[test]
    fn test_no_subject_anywhere() {
        let doc = DocumentBuilder::new("Llovía mucho.")
            .entity("María")
            .sentence(
                0,
                14,
                vec![Token::new(
                    "Llovía", "llover", Pos::Verb, DepRel::Root, 0, 0,
                )],
            )
            .build();
        let map = SentenceSubjectMap::build(&doc);
        assert_eq!(map.subject_of(0), None);
    }

    #[test]
    fn test_compound_name_subject() {
        // "María García entró."
        let doc = DocumentBuilder::new("María García entró.")
            .entity("María García")
            .sentence(
                0,
                22,
                vec![
                    Token::new("María", "maría", Pos::Propn, DepRel::Nsubj, 2, 0),
                    Token::new("García", "garcía", Pos::Propn, DepRel::Other, 0, 7),
                    Token::new("entró", "entrar", Pos::Verb, DepRel::Root, 2, 15),
                ],
            )
            .build();
        let map = SentenceSubjectMap::build(&doc);
        assert_eq!(map.subject_of(0), Some("María García"));
    }

    #[test]
    fn test_subject_updates_on_new_explicit_subject() {
        // "María entró. Juan salió."
        let doc = DocumentBuilder::new("María entró. Juan salió.")
            .entity("María")
            .entity("Juan")
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
                27,
                vec![
                    Token::new("Juan", "juan", Pos::Propn, DepRel::Nsubj, 1, 15),
                    Token::new("salió", "salir", Pos::Verb, DepRel::Root, 1, 20),
                ],
            )
            .build();
        let map = SentenceSubjectMap::build(&doc);
        assert_eq!(map.subject_of(0), Some("María"));
        assert_eq!(map.subject_of(1), Some("Juan"));
    }
}
