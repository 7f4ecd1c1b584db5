//! The knowledge feed.
//!
//! The feed starts from a built-in seed pool so the screen is never
//! empty, then grows one AI-generated fact at a time through a
//! background refresher. Refreshing is strictly best effort: a failed
//! generation logs a warning and the next tick tries again.

use crate::ai::Completer;
use crate::extract::parse_json_lenient;
use crate::state::{AppLanguage, FeedItem, FeedQuiz, FeedQuizKind};
use crate::store::Store;
use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// How often the background refresher wakes up.
pub const REFRESH_PERIOD: Duration = Duration::from_secs(60);

/// Errors from feed generation.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("AI request failed: {0}")]
    Ai(#[from] ollama::Error),

    #[error("Model response did not contain a usable feed fact")]
    Malformed,
}

// ============================================================================
// Seed pool
// ============================================================================

struct SeedFact {
    category: &'static str,
    title: &'static str,
    content: &'static str,
    quiz_kind: FeedQuizKind,
    question: &'static str,
    options: &'static [&'static str],
    correct: usize,
}

const SEED_FACTS: &[SeedFact] = &[
    SeedFact {
        category: "Natur",
        title: "Oktopus-Herzen",
        content: "Ein Oktopus hat drei Herzen. Zwei pumpen Blut durch die Kiemen, \
                  das dritte versorgt den Rest des Koerpers.",
        quiz_kind: FeedQuizKind::MultipleChoice,
        question: "Wie viele Herzen hat ein Oktopus?",
        options: &["Eins", "Zwei", "Drei", "Vier"],
        correct: 2,
    },
    SeedFact {
        category: "Weltraum",
        title: "Ein Tag auf der Venus",
        content: "Die Venus dreht sich so langsam, dass ein Venustag laenger dauert \
                  als ein Venusjahr.",
        quiz_kind: FeedQuizKind::TrueFalse,
        question: "Ein Tag auf der Venus ist laenger als ein Jahr auf der Venus.",
        options: &["Wahr", "Falsch"],
        correct: 0,
    },
    SeedFact {
        category: "Geschichte",
        title: "Die kuerzeste Kriegserklaerung",
        content: "Der Krieg zwischen Grossbritannien und Sansibar 1896 dauerte nur \
                  etwa 38 Minuten und gilt als kuerzester Krieg der Geschichte.",
        quiz_kind: FeedQuizKind::MultipleChoice,
        question: "Wie lange dauerte der kuerzeste Krieg der Geschichte ungefaehr?",
        options: &["38 Minuten", "38 Stunden", "38 Tage", "38 Wochen"],
        correct: 0,
    },
    SeedFact {
        category: "Sprache",
        title: "Honig verdirbt nicht",
        content: "Archaeologen fanden in aegyptischen Graebern ueber 3000 Jahre \
                  alten Honig, der noch essbar war.",
        quiz_kind: FeedQuizKind::TrueFalse,
        question: "Richtig gelagerter Honig kann tausende Jahre haltbar bleiben.",
        options: &["Wahr", "Falsch"],
        correct: 0,
    },
    SeedFact {
        category: "Natur",
        title: "Blitz und Temperatur",
        content: "Ein Blitzkanal wird kurzzeitig rund 30000 Grad Celsius heiss, \
                  etwa fuenfmal heisser als die Oberflaeche der Sonne.",
        quiz_kind: FeedQuizKind::MultipleChoice,
        question: "Was ist heisser?",
        options: &["Die Sonnenoberflaeche", "Ein Blitzkanal"],
        correct: 1,
    },
    SeedFact {
        category: "Mathematik",
        title: "Null ist gerade",
        content: "Die Zahl Null ist eine gerade Zahl: sie ist ohne Rest durch zwei \
                  teilbar.",
        quiz_kind: FeedQuizKind::TrueFalse,
        question: "Null ist eine gerade Zahl.",
        options: &["Wahr", "Falsch"],
        correct: 0,
    },
    SeedFact {
        category: "Koerper",
        title: "Knochen bei Geburt",
        content: "Babys kommen mit rund 300 Knochen zur Welt. Viele davon wachsen \
                  spaeter zusammen, Erwachsene haben etwa 206.",
        quiz_kind: FeedQuizKind::MultipleChoice,
        question: "Wie viele Knochen hat ein Erwachsener ungefaehr?",
        options: &["106", "206", "306", "406"],
        correct: 1,
    },
    SeedFact {
        category: "Technik",
        title: "Die erste Computermaus",
        content: "Die erste Computermaus von Douglas Engelbart aus den 1960ern \
                  bestand aus einem Holzgehaeuse mit zwei Metallraedern.",
        quiz_kind: FeedQuizKind::MultipleChoice,
        question: "Woraus bestand das Gehaeuse der ersten Computermaus?",
        options: &["Plastik", "Aluminium", "Holz", "Glas"],
        correct: 2,
    },
];

/// The built-in starter feed, shuffled so repeated fresh installs do
/// not all open on the same card.
pub fn seeded_feed() -> Vec<FeedItem> {
    let mut items: Vec<FeedItem> = SEED_FACTS
        .iter()
        .map(|seed| FeedItem {
            category: seed.category.to_string(),
            title: seed.title.to_string(),
            content: seed.content.to_string(),
            quiz: FeedQuiz {
                kind: seed.quiz_kind,
                question: seed.question.to_string(),
                options: seed.options.iter().map(|o| o.to_string()).collect(),
                correct: seed.correct,
            },
        })
        .collect();
    items.shuffle(&mut rand::thread_rng());
    items
}

// ============================================================================
// AI generation
// ============================================================================

/// Parse a model response into a single feed fact.
pub fn parse_feed_response(raw: &str) -> Result<FeedItem, FeedError> {
    let item: FeedItem = parse_json_lenient(raw).ok_or(FeedError::Malformed)?;

    if item.title.trim().is_empty() || item.content.trim().is_empty() {
        return Err(FeedError::Malformed);
    }
    if item.quiz.options.len() < 2 || item.quiz.correct >= item.quiz.options.len() {
        return Err(FeedError::Malformed);
    }

    Ok(item)
}

/// Ask the collaborator for one fresh feed fact with attached quiz.
pub async fn generate_feed_fact(
    completer: &dyn Completer,
    grade: &str,
    interests: Option<&str>,
    language: AppLanguage,
) -> Result<FeedItem, FeedError> {
    let audience = if grade.is_empty() {
        "a curious student".to_string()
    } else {
        format!("a student in grade {grade}")
    };
    let interests = interests
        .filter(|i| !i.trim().is_empty())
        .map(|i| format!(" Lean towards these interests if it fits naturally: {i}."))
        .unwrap_or_default();

    let prompt = format!(
        "Generate one surprising, true educational fact for {audience}, written in \
         the language with tag \"{}\".{interests} Respond ONLY with this JSON, \
         nothing else:\n\
         {{\"category\":\"...\",\"title\":\"...\",\"content\":\"...\",\
         \"quiz\":{{\"type\":\"mc\",\"question\":\"...\",\
         \"options\":[\"A\",\"B\",\"C\",\"D\"],\"correct\":0}}}}\n\
         For a true/false question use \"type\":\"tf\" with exactly two options.",
        language.tag()
    );

    let raw = completer
        .complete_text(ollama::Request::new(prompt))
        .await?;
    parse_feed_response(&raw)
}

// ============================================================================
// Background refresher
// ============================================================================

/// Clears the busy flag when a tick ends, however it ends.
struct ClearOnDrop(Arc<AtomicBool>);

impl Drop for ClearOnDrop {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodically generates one feed fact and prepends it to the store.
///
/// At most one generation is in flight at a time; ticks that fire
/// while a previous one is still running are skipped. The store lock
/// is never held across the model call.
pub struct FeedRefresher {
    store: Arc<Mutex<Store>>,
    completer: Arc<dyn Completer>,
    busy: Arc<AtomicBool>,
    period: Duration,
}

impl FeedRefresher {
    pub fn new(store: Arc<Mutex<Store>>, completer: Arc<dyn Completer>) -> Self {
        Self::with_period(store, completer, REFRESH_PERIOD)
    }

    pub fn with_period(
        store: Arc<Mutex<Store>>,
        completer: Arc<dyn Completer>,
        period: Duration,
    ) -> Self {
        Self {
            store,
            completer,
            busy: Arc::new(AtomicBool::new(false)),
            period,
        }
    }

    /// Run one refresh attempt.
    ///
    /// Returns `true` if a fact was generated and stored; `false` when
    /// the tick was skipped (already busy, no onboarded user) or the
    /// generation failed.
    pub async fn tick(&self) -> bool {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }
        let _clear = ClearOnDrop(Arc::clone(&self.busy));

        // Snapshot what the prompt needs, then release the lock before
        // the (slow) model call.
        let (grade, interests, language) = {
            let store = self.store.lock().await;
            let Some(user) = store.state().user.as_ref() else {
                return false;
            };
            if !user.onboarded {
                return false;
            }
            (
                user.grade.clone(),
                user.interests.clone(),
                store.state().preferences.language,
            )
        };

        match generate_feed_fact(
            self.completer.as_ref(),
            &grade,
            interests.as_deref(),
            language,
        )
        .await
        {
            Ok(item) => {
                self.store.lock().await.add_feed_items(vec![item], true);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "feed refresh failed, will retry next tick");
                false
            }
        }
    }

    /// Spawn the refresh loop on the current runtime.
    pub fn spawn(self) -> RefresherHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let refresher = Arc::new(self);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(refresher.period);
            // First tick of a tokio interval fires immediately; the
            // feed already has seed content, so skip it.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        refresher.tick().await;
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        RefresherHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running refresh loop.
pub struct RefresherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefresherHandle {
    /// Signal the loop to stop and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FeedQuizKind;
    use crate::testing::{memory_store, MockCompleter};

    #[test]
    fn test_seed_pool_is_well_formed() {
        let feed = seeded_feed();
        assert_eq!(feed.len(), SEED_FACTS.len());
        for item in &feed {
            assert!(!item.title.is_empty());
            assert!(!item.content.is_empty());
            assert!(item.quiz.correct < item.quiz.options.len());
            match item.quiz.kind {
                FeedQuizKind::TrueFalse => assert_eq!(item.quiz.options.len(), 2),
                FeedQuizKind::MultipleChoice => assert!(item.quiz.options.len() >= 2),
            }
        }
    }

    #[test]
    fn test_parse_feed_response() {
        let raw = r#"Here you go:
        {"category":"Natur","title":"T","content":"C",
         "quiz":{"type":"mc","question":"Q?","options":["A","B","C","D"],"correct":1}}"#;
        let item = parse_feed_response(raw).unwrap();
        assert_eq!(item.title, "T");
        assert_eq!(item.quiz.correct, 1);
    }

    #[test]
    fn test_parse_feed_response_rejects_bad_correct_index() {
        let raw = r#"{"category":"Natur","title":"T","content":"C",
         "quiz":{"type":"tf","question":"Q?","options":["Wahr","Falsch"],"correct":2}}"#;
        assert!(matches!(
            parse_feed_response(raw),
            Err(FeedError::Malformed)
        ));
    }

    #[test]
    fn test_parse_feed_response_rejects_empty_title() {
        let raw = r#"{"category":"Natur","title":" ","content":"C",
         "quiz":{"type":"tf","question":"Q?","options":["Wahr","Falsch"],"correct":0}}"#;
        assert!(matches!(
            parse_feed_response(raw),
            Err(FeedError::Malformed)
        ));
    }

    fn valid_fact_json() -> String {
        r#"{"category":"Natur","title":"Neu","content":"Frisch",
         "quiz":{"type":"tf","question":"Q?","options":["Wahr","Falsch"],"correct":0}}"#
            .to_string()
    }

    #[tokio::test]
    async fn test_tick_skips_without_onboarded_user() {
        let store = Arc::new(Mutex::new(memory_store()));
        let completer = Arc::new(MockCompleter::with_replies(vec![]));
        let refresher = FeedRefresher::new(Arc::clone(&store), completer);

        // No user at all.
        assert!(!refresher.tick().await);

        // A user who has not finished onboarding.
        store.lock().await.login_as_guest();
        assert!(!refresher.tick().await);
        assert!(store.lock().await.state().feed.is_empty());
    }

    #[tokio::test]
    async fn test_tick_prepends_generated_fact() {
        let store = Arc::new(Mutex::new(memory_store()));
        {
            let mut store = store.lock().await;
            store.login_as_guest();
            store.update_user(|u| u.onboarded = true).unwrap();
            store.seed_feed();
        }
        let before = store.lock().await.state().feed.len();

        let completer = MockCompleter::new();
        completer.queue_text(valid_fact_json());
        let refresher = FeedRefresher::new(Arc::clone(&store), Arc::new(completer));

        assert!(refresher.tick().await);
        let store = store.lock().await;
        assert_eq!(store.state().feed.len(), before + 1);
        assert_eq!(store.state().feed[0].title, "Neu");
    }

    #[tokio::test]
    async fn test_tick_failure_is_best_effort() {
        let store = Arc::new(Mutex::new(memory_store()));
        {
            let mut store = store.lock().await;
            store.login_as_guest();
            store.update_user(|u| u.onboarded = true).unwrap();
        }

        let refresher = FeedRefresher::new(Arc::clone(&store), Arc::new(MockCompleter::failing()));
        assert!(!refresher.tick().await);
        assert!(store.lock().await.state().feed.is_empty());
        // The busy flag must be clear again for the next tick.
        assert!(!refresher.busy.load(Ordering::Acquire));
    }
}
