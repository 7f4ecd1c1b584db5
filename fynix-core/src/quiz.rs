//! Quiz synthesis.
//!
//! Two generation strategies, always in the same order: ask the AI
//! collaborator for a strict-JSON quiz, and on any failure fall back
//! to the deterministic local generator with distractor sampling.
//! Answer checking is shared and normalization-based.

use crate::ai::Completer;
use crate::extract::parse_json_lenient;
use crate::state::{VocabEntry, VocabList};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// XP per correct answer in a material quiz.
pub const MATERIAL_QUIZ_XP: u32 = 20;
/// XP per correct answer in a vocabulary quiz.
pub const VOCAB_QUIZ_XP: u32 = 15;
/// XP per correct answer in a feed quiz.
pub const FEED_QUIZ_XP: u32 = 25;
/// XP debited for a wrong answer where the flow penalizes.
pub const WRONG_ANSWER_PENALTY: u32 = 5;

/// Maximum questions the local generator produces.
const LOCAL_QUIZ_LEN: usize = 5;
/// Option count for multiple-choice items, pool permitting.
const OPTION_COUNT: usize = 4;
/// Minimum well-formed items for an AI quiz to be accepted.
const MIN_AI_ITEMS: usize = 2;
/// Material prompts are truncated to this many characters.
const MATERIAL_PROMPT_CHARS: usize = 4000;

/// Errors from quiz synthesis.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("AI request failed: {0}")]
    Ai(#[from] ollama::Error),

    #[error("Model response did not contain a usable quiz")]
    MalformedResponse,

    #[error("Model returned fewer than {MIN_AI_ITEMS} well-formed questions")]
    TooFewItems,

    #[error("No source material to build a quiz from")]
    NoItems,
}

/// How answers are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizMode {
    MultipleChoice,
    Input,
}

/// Which way entries are asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizDirection {
    SourceToTarget,
    TargetToSource,
    /// Per-item random direction.
    Mixed,
}

/// One quiz question. `options` is absent for input-mode items, which
/// carry only the required exact answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Whether a selected option or typed answer matches the canonical
/// answer: trim + lowercase on both sides, then equality.
pub fn answer_is_correct(given: &str, answer: &str) -> bool {
    given.trim().to_lowercase() == answer.trim().to_lowercase()
}

// ============================================================================
// Local generation
// ============================================================================

/// Build a quiz locally from vocabulary entries.
///
/// Shuffles the entries, takes up to five, and resolves a direction
/// per item (for `Mixed`, a coin flip each). Multiple-choice items get
/// up to four unique options sampled from the same direction's value
/// pool, always including the answer; the option set degrades
/// gracefully when the pool is smaller than four.
pub fn build_local_quiz(
    entries: &[VocabEntry],
    source_lang: &str,
    target_lang: &str,
    mode: QuizMode,
    direction: QuizDirection,
) -> Vec<QuizItem> {
    let mut rng = rand::thread_rng();

    let mut shuffled: Vec<&VocabEntry> = entries.iter().collect();
    shuffled.shuffle(&mut rng);
    shuffled.truncate(LOCAL_QUIZ_LEN);

    shuffled
        .into_iter()
        .map(|entry| {
            let forward = match direction {
                QuizDirection::SourceToTarget => true,
                QuizDirection::TargetToSource => false,
                QuizDirection::Mixed => rng.gen_bool(0.5),
            };

            let (question, answer) = if forward {
                (
                    format!("Translate ({source_lang} \u{2192} {target_lang}): {}", entry.term),
                    entry.translation.clone(),
                )
            } else {
                (
                    format!("Translate ({target_lang} \u{2192} {source_lang}): {}", entry.translation),
                    entry.term.clone(),
                )
            };

            let options = match mode {
                QuizMode::MultipleChoice => {
                    let pool: Vec<&str> = entries
                        .iter()
                        .map(|e| {
                            if forward {
                                e.translation.as_str()
                            } else {
                                e.term.as_str()
                            }
                        })
                        .collect();
                    Some(pick_options(&answer, &pool, &mut rng))
                }
                QuizMode::Input => None,
            };

            QuizItem {
                question,
                answer,
                options,
            }
        })
        .collect()
}

/// Sample unique distractors from the pool until the option set holds
/// the answer plus up to three others, then shuffle.
fn pick_options(answer: &str, pool: &[&str], rng: &mut impl Rng) -> Vec<String> {
    let mut distinct: Vec<&str> = Vec::new();
    for value in pool {
        if !distinct.contains(value) {
            distinct.push(value);
        }
    }

    let target = OPTION_COUNT.min(distinct.len()).max(1);
    let mut options: Vec<String> = vec![answer.to_string()];

    while options.len() < target {
        let candidate = distinct[rng.gen_range(0..distinct.len())];
        if !options.iter().any(|o| o == candidate) {
            options.push(candidate.to_string());
        }
    }

    options.shuffle(rng);
    options
}

// ============================================================================
// AI response parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct QuestionsPayload {
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(default)]
    question: String,
    #[serde(default)]
    answer: String,
    #[serde(default)]
    options: Option<Vec<String>>,
}

/// Parse a model response against the `{"questions":[...]}` shape.
///
/// Items missing a question or answer are discarded; the result is
/// accepted only if at least two well-formed items remain.
pub fn parse_quiz_response(raw: &str) -> Result<Vec<QuizItem>, QuizError> {
    let payload: QuestionsPayload =
        parse_json_lenient(raw).ok_or(QuizError::MalformedResponse)?;

    let items: Vec<QuizItem> = payload
        .questions
        .into_iter()
        .filter_map(|q| {
            let question = q.question.trim().to_string();
            let answer = q.answer.trim().to_string();
            if question.is_empty() || answer.is_empty() {
                return None;
            }
            let options = q.options.map(|opts| {
                opts.iter()
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            });
            let options = match options {
                Some(opts) if opts.is_empty() => None,
                other => other,
            };
            Some(QuizItem {
                question,
                answer,
                options,
            })
        })
        .collect();

    if items.len() < MIN_AI_ITEMS {
        return Err(QuizError::TooFewItems);
    }

    Ok(items)
}

// ============================================================================
// Synthesizer
// ============================================================================

/// Produces quizzes through the AI-first, local-fallback pipeline.
pub struct QuizSynthesizer<'a> {
    completer: &'a dyn Completer,
}

impl<'a> QuizSynthesizer<'a> {
    pub fn new(completer: &'a dyn Completer) -> Self {
        Self { completer }
    }

    /// Build a quiz from a vocabulary list.
    ///
    /// The AI strategy runs first; any failure (transport, malformed
    /// JSON, too few items) falls through to the local generator. The
    /// only unrecoverable case is an empty vocabulary list.
    pub async fn vocab_quiz(
        &self,
        list: &VocabList,
        mode: QuizMode,
        direction: QuizDirection,
    ) -> Result<Vec<QuizItem>, QuizError> {
        match self.ai_vocab_quiz(list, mode, direction).await {
            Ok(items) => Ok(items),
            Err(e) => {
                tracing::warn!(error = %e, "AI vocabulary quiz failed, using local generator");
                let items = build_local_quiz(
                    &list.entries,
                    &list.source_lang,
                    &list.target_lang,
                    mode,
                    direction,
                );
                if items.is_empty() {
                    Err(QuizError::NoItems)
                } else {
                    Ok(items)
                }
            }
        }
    }

    /// Build a quiz from free study text.
    ///
    /// There is no vocabulary pool to sample distractors from, so this
    /// path has no local fallback; callers surface the error as a
    /// non-blocking notice.
    pub async fn material_quiz(&self, source_text: &str) -> Result<Vec<QuizItem>, QuizError> {
        let excerpt: String = source_text.chars().take(MATERIAL_PROMPT_CHARS).collect();
        let prompt = format!(
            "Create exactly 5 multiple-choice quiz questions from the following study \
             material. Each question has 4 answer options, one of them correct. Respond \
             ONLY with this JSON, nothing else:\n\
             {{\"questions\":[{{\"question\":\"...\",\"answer\":\"...\",\"options\":[\"A\",\"B\",\"C\",\"D\"]}}]}}\n\n\
             Material:\n{excerpt}"
        );

        let raw = self
            .completer
            .complete_text(ollama::Request::new(prompt))
            .await?;
        parse_quiz_response(&raw)
    }

    async fn ai_vocab_quiz(
        &self,
        list: &VocabList,
        mode: QuizMode,
        direction: QuizDirection,
    ) -> Result<Vec<QuizItem>, QuizError> {
        let direction_text = match direction {
            QuizDirection::Mixed => "mixed".to_string(),
            QuizDirection::SourceToTarget => {
                format!("{} \u{2192} {}", list.source_lang, list.target_lang)
            }
            QuizDirection::TargetToSource => {
                format!("{} \u{2192} {}", list.target_lang, list.source_lang)
            }
        };
        let mode_text = match mode {
            QuizMode::MultipleChoice => "multiple choice",
            QuizMode::Input => "typed answer",
        };
        let terms: String = list
            .entries
            .iter()
            .map(|e| format!("{} - {}", e.term, e.translation))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Create a short vocabulary quiz ({mode_text}, direction: {direction_text}). \
             Respond only with JSON in the format \
             {{\"questions\":[{{\"question\":\"...\",\"answer\":\"...\",\"options\":[\"...\"]}}]}}. \
             Use these terms:\n{terms}"
        );

        let raw = self
            .completer
            .complete_text(ollama::Request::new(prompt))
            .await?;
        parse_quiz_response(&raw)
    }
}
