//! Heuristic vocabulary parser.
//!
//! Turns noisy multi-line text (OCR output or an AI transcription)
//! into term/translation pairs. Best effort only: callers must treat
//! the output as correctable by the user's later edits, not as ground
//! truth.

use serde::{Deserialize, Serialize};

/// Terms longer than this are assumed to be mis-joined paragraphs.
const MAX_TERM_CHARS: usize = 200;

/// A parsed term/translation candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabPair {
    pub term: String,
    pub translation: String,
}

impl VocabPair {
    pub fn new(term: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            translation: translation.into(),
        }
    }
}

/// Unicode dash variants that OCR engines like to emit.
const DASH_VARIANTS: [char; 6] = [
    '\u{2013}', // en dash
    '\u{2014}', // em dash
    '\u{2015}', // horizontal bar
    '\u{2212}', // minus sign
    '\u{2010}', // hyphen
    '\u{2011}', // non-breaking hyphen
];

/// Normalize separator noise to a canonical " - " token.
///
/// Tabs, dash variants, '=' and ':' (with any surrounding spaces) all
/// become " - "; runs of spaces collapse to one. Newlines survive.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut skip_spaces = false;

    for c in text.chars() {
        let is_separator = c == '\t' || c == '=' || c == ':' || DASH_VARIANTS.contains(&c);
        if is_separator {
            while out.ends_with(' ') {
                out.pop();
            }
            out.push_str(" - ");
            skip_spaces = true;
        } else if c == ' ' {
            if !skip_spaces && !out.ends_with(' ') {
                out.push(' ');
            }
        } else {
            skip_spaces = false;
            out.push(c);
        }
    }

    out
}

/// Strip leading bullet markers and whitespace from a line.
fn strip_bullet(line: &str) -> &str {
    line.trim_start_matches(['-', '*', '\u{2022}', '\u{00b7}', ' ', '\t'])
        .trim()
}

fn accept(term: &str, translation: &str) -> Option<VocabPair> {
    if term.is_empty() || translation.is_empty() || term.chars().count() >= MAX_TERM_CHARS {
        return None;
    }
    Some(VocabPair::new(term, translation))
}

/// Try the `term (translation)` / `term [translation]` form.
fn split_bracketed(line: &str) -> Option<VocabPair> {
    let line = line.trim_end();
    let inner_end = line.len().checked_sub(1)?;
    match line.chars().last()? {
        ')' | ']' => {}
        _ => return None,
    }
    let open = line[..inner_end].rfind(['(', '['])?;
    let term = line[..open].trim();
    let translation = line[open + 1..inner_end].trim();
    accept(term, translation)
}

/// Parse free-form text into term/translation pairs.
///
/// Per line, in priority order: split on the first canonical
/// separator (everything right of it is the translation, further
/// separator tokens included), then the bracketed form. If no line
/// produced a pair and there are at least two non-empty lines, pair
/// consecutive lines two at a time, skipping purely numeric terms
/// (OCR line-numbering artifacts).
pub fn parse_pairs(text: &str) -> Vec<VocabPair> {
    let normalized = normalize(text);
    let lines: Vec<&str> = normalized
        .lines()
        .map(strip_bullet)
        .filter(|l| !l.is_empty())
        .collect();

    let mut items = Vec::new();

    for line in &lines {
        let split = line
            .find(" - ")
            .map(|idx| (idx, idx + 3))
            .or_else(|| line.find(" / ").map(|idx| (idx, idx + 3)));

        if let Some((term_end, translation_start)) = split {
            let term = line[..term_end].trim();
            let translation = line[translation_start..].trim();
            if let Some(pair) = accept(term, translation) {
                items.push(pair);
            }
            continue;
        }

        if let Some(pair) = split_bracketed(line) {
            items.push(pair);
        }
    }

    if items.is_empty() && lines.len() >= 2 {
        for chunk in lines.chunks(2) {
            let [term, translation] = chunk else { continue };
            if term.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if let Some(pair) = accept(term, translation) {
                items.push(pair);
            }
        }
    }

    items
}
