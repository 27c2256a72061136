//! Annotated document - the externally-produced input contract
//!
//! The pipeline does not segment, parse, or recognize entities itself.
//! The upstream producer delivers text already annotated with sentence
//! spans, a dependency parse per sentence, and entity mention spans.
//! [`DocumentBuilder`] is the assembly point for that producer (and for
//! tests).
//!
//! All offsets are byte offsets into the document text.

/// Universal part-of-speech tag, reduced to the categories the detectors
/// inspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Pos {
    Adj,
    Adp,
    Adv,
    Aux,
    Cconj,
    Det,
    Noun,
    Num,
    Pron,
    Propn,
    Punct,
    Sconj,
    Verb,
    Other,
}

/// Dependency relation label, reduced to the relations the detectors walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum DepRel {
    Nsubj,
    NsubjPass,
    Obj,
    Iobj,
    Obl,
    Cop,
    Amod,
    Conj,
    Case,
    Appos,
    Det,
    Nmod,
    Root,
    Other,
}

impl DepRel {
    /// Whether this relation marks an explicit grammatical subject
    pub fn is_subject(&self) -> bool {
        matches!(self, Self::Nsubj | Self::NsubjPass)
    }

    /// Whether this relation marks a direct or indirect object
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Obj | Self::Iobj | Self::Obl)
    }
}

/// One parsed token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Surface form
    pub text: String,

    /// Lemma (lowercase)
    pub lemma: String,

    /// Part-of-speech tag
    pub pos: Pos,

    /// Dependency relation to the head
    pub dep: DepRel,

    /// Index of the head token within the same sentence; the root points
    /// at itself
    pub head: usize,

    /// Byte offset of the token start within the document
    pub start: usize,
}

impl Token {
    /// Create a token
    pub fn new(
        text: impl Into<String>,
        lemma: impl Into<String>,
        pos: Pos,
        dep: DepRel,
        head: usize,
        start: usize,
    ) -> Self {
        Self {
            text: text.into(),
            lemma: lemma.into(),
            pos,
            dep,
            head,
            start,
        }
    }

    /// Byte offset one past the token end
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// One sentence with its dependency parse
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    /// Position in document order
    pub index: usize,

    /// Byte offset of the sentence start
    pub start: usize,

    /// Byte offset one past the sentence end
    pub end: usize,

    /// Parsed tokens in surface order
    pub tokens: Vec<Token>,
}

impl Sentence {
    /// Slice the sentence text out of the document text
    pub fn text<'a>(&self, document_text: &'a str) -> &'a str {
        &document_text[self.start..self.end.min(document_text.len())]
    }

    /// Whether a byte offset falls inside this sentence
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Tokens whose dependency relation marks an explicit subject
    pub fn subject_tokens(&self) -> impl Iterator<Item = (usize, &Token)> {
        self.tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.dep.is_subject())
    }

    /// Child tokens of the token at `head_idx`
    pub fn children_of(&self, head_idx: usize) -> impl Iterator<Item = (usize, &Token)> {
        self.tokens
            .iter()
            .enumerate()
            .filter(move |(i, t)| t.head == head_idx && *i != head_idx)
    }
}

/// Kind of entity a mention refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MentionKind {
    /// A person / character
    Person,
    /// A place
    Location,
    /// An organization
    Organization,
    /// Anything else the recognizer tagged
    Other,
}

/// One recognized entity mention span
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMention {
    /// Canonical display name of the entity
    pub name: String,

    /// Byte offset of the mention start
    pub start: usize,

    /// Byte offset one past the mention end
    pub end: usize,

    /// Recognized kind
    pub kind: MentionKind,

    /// Index of the sentence containing the mention
    pub sentence_index: usize,
}

/// The complete one-invocation input: text plus external annotations
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedDocument {
    /// Full text of the unit under analysis
    pub text: String,

    /// Sentences in document order
    pub sentences: Vec<Sentence>,

    /// Entity mentions in document order
    pub mentions: Vec<EntityMention>,

    /// Known entity display names
    pub entities: Vec<String>,

    /// Chapter tag for provenance
    pub chapter: Option<u32>,
}

impl AnnotatedDocument {
    /// Degenerate input yields an empty result, not an error
    pub fn is_degenerate(&self) -> bool {
        self.text.trim().is_empty() || self.entities.is_empty()
    }

    /// Find the sentence containing a byte offset
    pub fn sentence_at(&self, offset: usize) -> Option<&Sentence> {
        self.sentences.iter().find(|s| s.contains(offset))
    }

    /// Case-insensitive lookup of a known entity name.
    ///
    /// Matches the full name or, for compound names, a single component
    /// ("María" matches the known entity "María García").
    pub fn resolve_entity(&self, surface: &str) -> Option<&str> {
        let surface = surface.trim().to_lowercase();
        if surface.is_empty() {
            return None;
        }
        for name in &self.entities {
            if name.to_lowercase() == surface {
                return Some(name.as_str());
            }
        }
        for name in &self.entities {
            if name
                .to_lowercase()
                .split_whitespace()
                .any(|part| part == surface)
            {
                return Some(name.as_str());
            }
        }
        None
    }
}

/// Assembles an [`AnnotatedDocument`] from the upstream producer's output
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    text: String,
    sentences: Vec<Sentence>,
    mentions: Vec<(String, usize, usize, MentionKind)>,
    entities: Vec<String>,
    chapter: Option<u32>,
}

impl DocumentBuilder {
    /// Start a builder for the given text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sentences: Vec::new(),
            mentions: Vec::new(),
            entities: Vec::new(),
            chapter: None,
        }
    }

    /// Set the chapter tag
    pub fn chapter(mut self, chapter: u32) -> Self {
        self.chapter = Some(chapter);
        self
    }

    /// Register a known entity display name
    pub fn entity(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        if !trimmed.is_empty() && !self.entities.iter().any(|e| e == trimmed) {
            self.entities.push(trimmed.to_string());
        }
        self
    }

    /// Register an entity mention span
    pub fn mention(
        mut self,
        name: impl Into<String>,
        start: usize,
        end: usize,
        kind: MentionKind,
    ) -> Self {
        self.mentions.push((name.into(), start, end, kind));
        self
    }

    /// Register a sentence span with its parsed tokens
    pub fn sentence(mut self, start: usize, end: usize, tokens: Vec<Token>) -> Self {
        let index = self.sentences.len();
        self.sentences.push(Sentence {
            index,
            start,
            end,
            tokens,
        });
        self
    }

    /// Finish the document.
    ///
    /// Mentions with spans outside the text or outside every sentence are
    /// silently dropped - the producer's annotations are advisory, and a
    /// bad span must not poison the whole invocation.
    pub fn build(self) -> AnnotatedDocument {
        let text_len = self.text.len();
        let sentences = self.sentences;

        let mut mentions: Vec<EntityMention> = Vec::with_capacity(self.mentions.len());
        for (name, start, end, kind) in self.mentions {
            if start >= end || end > text_len {
                continue;
            }
            let Some(sentence) = sentences.iter().find(|s| s.contains(start)) else {
                continue;
            };
            mentions.push(EntityMention {
                name,
                start,
                end,
                kind,
                sentence_index: sentence.index,
            });
        }
        mentions.sort_by_key(|m| m.start);

        AnnotatedDocument {
            text: self.text,
            sentences,
            mentions,
            entities: self.entities,
            chapter: self.chapter,
        }
    }
}
