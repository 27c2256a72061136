//! Linguistic context guards
//!
//! Window checks around a surface match: figurative language, negation,
//! and dialogue. A match inside a metaphor window or a dialogue segment
//! must not become a candidate; a negated match is emitted with its
//! negated flag set.

use crate::error::DetectError;
use crate::vocab::{METAPHOR_INDICATORS, NEGATION_INDICATORS, SPEECH_VERBS};
use regex::Regex;

/// Punctuation that breaks the association between an indicator and a match
const BREAKERS: &[char] = &[',', '.', ';', '\n'];

/// Compiled guard patterns, built once per detector
#[derive(Debug)]
pub struct ContextGuards {
    metaphor: Vec<Regex>,
    negation: Vec<Regex>,
}

impl ContextGuards {
    /// Compile the guard patterns
    pub fn new() -> Result<Self, DetectError> {
        Ok(Self {
            metaphor: compile_all(METAPHOR_INDICATORS)?,
            negation: compile_all(NEGATION_INDICATORS)?,
        })
    }

    /// Whether a match at `[match_start, match_end)` within `window` sits
    /// under a metaphor indicator.
    ///
    /// An indicator only affects the match when no breaking punctuation
    /// and no long gap separates them; "tenía los ojos azules, como su
    /// madre" keeps the literal reading.
    pub fn is_metaphorical(&self, window: &str, match_start: usize, match_end: usize) -> bool {
        for pattern in &self.metaphor {
            for indicator in pattern.find_iter(window) {
                if indicator.end() <= match_start {
                    let between = &window[indicator.end()..match_start];
                    if between.contains(BREAKERS) || between.trim().len() > 20 {
                        continue;
                    }
                    return true;
                }
                if indicator.start() >= match_start && indicator.end() <= match_end {
                    return true;
                }
                if indicator.start() >= match_end {
                    let between = &window[match_end..indicator.start()];
                    if between.contains(BREAKERS) || between.trim().len() > 20 {
                        continue;
                    }
                    return true;
                }
            }
        }
        false
    }

    /// Whether the text immediately before a match negates it
    pub fn is_negated(&self, before: &str) -> bool {
        self.negation.iter().any(|p| p.is_match(before))
    }
}

/// Largest char boundary at or below `idx`
///
/// Window arithmetic lands on arbitrary byte offsets; slicing Spanish text
/// there would split an accented character.
pub fn floor_char_boundary(s: &str, idx: usize) -> usize {
    let mut idx = idx.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Smallest char boundary at or above `idx`
pub fn ceil_char_boundary(s: &str, idx: usize) -> usize {
    let mut idx = idx.min(s.len());
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

fn compile_all(sources: &[&str]) -> Result<Vec<Regex>, DetectError> {
    sources
        .iter()
        .map(|src| {
            Regex::new(&format!("(?i){}", src)).map_err(|e| DetectError::InvalidRule {
                rule: (*src).to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Whether a document position sits inside dialogue.
///
/// Attributes voiced in dialogue describe whoever the speaker is talking
/// about, so they never attach by narration rules. Handles Spanish
/// guillemets, double quotes, and em-dash dialogue lines.
pub fn is_inside_dialogue(text: &str, position: usize) -> bool {
    let before = &text[..position.min(text.len())];

    let open_guillemets = before.matches('«').count();
    let close_guillemets = before.matches('»').count();
    if open_guillemets > close_guillemets {
        return true;
    }

    if before.matches('"').count() % 2 == 1 {
        return true;
    }

    let open_curly = before.matches('\u{201c}').count();
    let close_curly = before.matches('\u{201d}').count();
    if open_curly > close_curly {
        return true;
    }

    // Em-dash dialogue: a line starting with a dash stays dialogue until a
    // speech verb, a closing dash, or a line break.
    if let Some(dash_line_start) = last_dialogue_dash(before) {
        let segment = &before[dash_line_start..];
        let lowered = segment.to_lowercase();
        let closed = SPEECH_VERBS.iter().any(|verb| lowered.contains(verb))
            || segment.contains('\n')
            || has_closing_dash(segment);
        if !closed {
            return true;
        }
    }

    false
}

/// Offset just past the dash of the last dash-opened line, if any
fn last_dialogue_dash(before: &str) -> Option<usize> {
    let mut candidate = None;
    let mut line_start = 0;
    for line in before.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();
        if let Some(rest) = trimmed
            .strip_prefix('—')
            .or_else(|| trimmed.strip_prefix('-'))
        {
            let dash_len = trimmed.len() - rest.len();
            candidate = Some(line_start + indent + dash_len);
        }
        line_start += line.len();
    }
    candidate
}

fn has_closing_dash(segment: &str) -> bool {
    segment.contains(" — ") || segment.contains(" - ")
}
