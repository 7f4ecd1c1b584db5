//! Core engine for the Fynix learning client.
//!
//! This crate holds everything below the UI: the application state and
//! its persistence, the XP/streak/reward rules, vocabulary parsing and
//! import, quiz synthesis, and the knowledge feed with its background
//! refresher. AI-backed features talk to an Ollama-compatible endpoint
//! through the `ollama` crate and degrade to local behavior when it is
//! unreachable.
//!
//! # Quick Start
//!
//! ```no_run
//! use fynix_core::persist::FileBackend;
//! use fynix_core::quiz::{QuizDirection, QuizMode, QuizSynthesizer};
//! use fynix_core::store::Store;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = FileBackend::new("./data")?;
//! let mut store = Store::new(Box::new(backend));
//!
//! store.login("ada@example.com", "Ada")?;
//! let list_id = store.add_vocab_list("Unit 3", "Deutsch", "Englisch")?;
//! let pairs = fynix_core::vocab::parse_pairs("Hund - dog\nKatze - cat");
//! store.add_vocab_entries(list_id, &pairs);
//!
//! let client = ollama::Ollama::new(&store.state().preferences.ai_url);
//! let synthesizer = QuizSynthesizer::new(&client);
//! let list = store.state().vocab_list(list_id).unwrap().clone();
//! let quiz = synthesizer
//!     .vocab_quiz(&list, QuizMode::MultipleChoice, QuizDirection::Mixed)
//!     .await?;
//! println!("{} questions ready", quiz.len());
//! # Ok(())
//! # }
//! ```

pub mod ai;
pub mod extract;
pub mod feed;
pub mod gamification;
pub mod persist;
pub mod quiz;
pub mod scan;
pub mod state;
pub mod store;
pub mod testing;
pub mod vocab;

pub use ai::Completer;
pub use feed::{FeedRefresher, RefresherHandle};
pub use gamification::{level_info, streak_bonus, LevelInfo};
pub use persist::{FileBackend, MemoryBackend, StorageBackend};
pub use state::{AppState, UserProfile};
pub use store::{ChestReward, Store, StoreError};
pub use vocab::{parse_pairs, VocabPair};
