//! Image scanning for vocabulary import.
//!
//! A photographed vocabulary page goes through a cascade: ask the AI
//! collaborator to transcribe it into structured pairs, fall back to
//! heuristic parsing of whatever text it produced, and finally fall
//! back to a plain OCR engine plus the heuristic parser. Each stage is
//! best effort; only an empty final result is an error.

use crate::ai::Completer;
use crate::extract::parse_json_lenient;
use crate::vocab::{parse_pairs, VocabPair};
use serde::Deserialize;
use thiserror::Error;

/// Errors from the scan pipeline.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("AI request failed: {0}")]
    Ai(#[from] ollama::Error),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("No vocabulary pairs found in the image")]
    NoPairs,
}

/// A plain text recognizer, used when the model cannot read the image.
pub trait Ocr: Send + Sync {
    fn recognize(&self, image_base64: &str, language_hint: &str) -> Result<String, ScanError>;
}

#[derive(Debug, Deserialize)]
struct ItemsPayload {
    items: Vec<RawPair>,
}

#[derive(Debug, Deserialize)]
struct RawPair {
    #[serde(default, alias = "word")]
    term: String,
    #[serde(default, alias = "meaning")]
    translation: String,
}

/// Characters that mark an OCR misread rather than vocabulary.
const JUNK_CHARS: [char; 4] = ['%', '&', '$', '\u{00a7}'];

fn clean_pair(term: &str, translation: &str) -> Option<VocabPair> {
    let term = term.trim();
    let translation = translation.trim();
    if term.chars().count() < 2 || translation.is_empty() {
        return None;
    }
    if term.contains(JUNK_CHARS) || translation.contains(JUNK_CHARS) {
        return None;
    }
    Some(VocabPair::new(term, translation))
}

/// Extract structured pairs from a model transcription response.
pub fn structured_pairs(raw: &str) -> Vec<VocabPair> {
    let Some(payload) = parse_json_lenient::<ItemsPayload>(raw) else {
        return Vec::new();
    };
    payload
        .items
        .iter()
        .filter_map(|p| clean_pair(&p.term, &p.translation))
        .collect()
}

/// Run the full scan cascade on a base64-encoded image.
pub async fn scan_image(
    completer: &dyn Completer,
    ocr: Option<&dyn Ocr>,
    image_base64: &str,
    language_hint: &str,
) -> Result<Vec<VocabPair>, ScanError> {
    let prompt = format!(
        "This image shows a vocabulary list (likely {language_hint}). Transcribe \
         every term/translation pair you can read. Respond ONLY with this JSON, \
         nothing else:\n\
         {{\"items\":[{{\"term\":\"...\",\"translation\":\"...\"}}]}}"
    );
    let request = ollama::Request::new(prompt).with_image(image_base64);

    match completer.complete_text(request).await {
        Ok(raw) => {
            let pairs = structured_pairs(&raw);
            if !pairs.is_empty() {
                return Ok(pairs);
            }
            // The model answered but not in the structured shape; its
            // text may still be a readable transcription.
            let pairs = parse_pairs(&raw);
            if !pairs.is_empty() {
                return Ok(pairs);
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "AI transcription failed, trying OCR");
        }
    }

    if let Some(ocr) = ocr {
        match ocr.recognize(image_base64, language_hint) {
            Ok(text) => {
                let pairs = parse_pairs(&text);
                if !pairs.is_empty() {
                    return Ok(pairs);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "OCR fallback failed");
            }
        }
    }

    Err(ScanError::NoPairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCompleter;

    struct FixedOcr(&'static str);

    impl Ocr for FixedOcr {
        fn recognize(&self, _image: &str, _hint: &str) -> Result<String, ScanError> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenOcr;

    impl Ocr for BrokenOcr {
        fn recognize(&self, _image: &str, _hint: &str) -> Result<String, ScanError> {
            Err(ScanError::Ocr("engine unavailable".to_string()))
        }
    }

    #[test]
    fn test_structured_pairs_with_aliases() {
        let raw = r#"{"items":[
            {"term":"Hund","translation":"dog"},
            {"word":"Katze","meaning":"cat"}
        ]}"#;
        let pairs = structured_pairs(raw);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], VocabPair::new("Katze", "cat"));
    }

    #[test]
    fn test_structured_pairs_filters_junk() {
        let raw = r#"{"items":[
            {"term":"Hund","translation":"dog"},
            {"term":"%$&","translation":"noise"},
            {"term":"x","translation":"too short"},
            {"term":"Katze","translation":""}
        ]}"#;
        let pairs = structured_pairs(raw);
        assert_eq!(pairs, vec![VocabPair::new("Hund", "dog")]);
    }

    #[tokio::test]
    async fn test_scan_uses_structured_response() {
        let completer = MockCompleter::new();
        completer.queue_text(r#"{"items":[{"term":"Hund","translation":"dog"}]}"#.to_string());

        let pairs = scan_image(&completer, None, "aW1hZ2U=", "German")
            .await
            .unwrap();
        assert_eq!(pairs, vec![VocabPair::new("Hund", "dog")]);
    }

    #[tokio::test]
    async fn test_scan_falls_back_to_heuristic_parse() {
        let completer = MockCompleter::new();
        completer.queue_text("Sure! I can read:\nHund - dog\nKatze - cat".to_string());

        let pairs = scan_image(&completer, None, "aW1hZ2U=", "German")
            .await
            .unwrap();
        assert_eq!(pairs.len(), 2);
    }

    #[tokio::test]
    async fn test_scan_falls_back_to_ocr() {
        let ocr = FixedOcr("Baum - tree\nHaus - house");
        let pairs = scan_image(&MockCompleter::failing(), Some(&ocr), "aW1hZ2U=", "German")
            .await
            .unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], VocabPair::new("Baum", "tree"));
    }

    #[tokio::test]
    async fn test_scan_no_pairs_anywhere() {
        let completer = MockCompleter::new();
        completer.queue_text("I cannot read this image.".to_string());

        let err = scan_image(&completer, Some(&BrokenOcr), "aW1hZ2U=", "German")
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::NoPairs));
    }
}
