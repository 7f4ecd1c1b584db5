//! Application state types.
//!
//! Contains all types for representing client state: the user profile,
//! habits, money entries, vocabulary lists, saved facts, the knowledge
//! feed, app preferences, and the aggregate `AppState` that is the
//! single unit of persistence.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Unique identifier for habits.
    HabitId
);
id_type!(
    /// Unique identifier for money entries.
    MoneyEntryId
);
id_type!(
    /// Unique identifier for vocabulary lists.
    VocabListId
);
id_type!(
    /// Unique identifier for vocabulary entries (unique within a list).
    VocabEntryId
);
id_type!(
    /// Unique identifier for saved facts.
    SavedFactId
);

// ============================================================================
// User Profile
// ============================================================================

/// Prefix marking synthetic guest identities.
pub const GUEST_PREFIX: &str = "guest_";

/// The user's profile, including gamification counters and the
/// demographic fields collected during onboarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub name: String,
    /// Email, or a synthetic `guest_<millis>` identity.
    pub email: String,
    /// Avatar selection token.
    pub avatar: String,
    pub xp: u32,
    /// Consecutive-day activity counter.
    pub streak: u32,
    /// Number of XP-awarding sessions so far.
    pub sessions: u32,
    /// Calendar day of the last XP-awarding activity.
    pub last_active: Option<NaiveDate>,
    pub onboarded: bool,
    pub grade: String,
    pub style: String,
    pub motivation: String,
    /// Habit names chosen during onboarding.
    pub habits: Vec<String>,
    /// How harsh the mascot's feedback should be, 1-5.
    pub roast_level: u8,
    pub goal_30: String,
    pub learn_time: String,
    pub school_problem: String,
    pub interests: Option<String>,
    pub is_private: bool,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            avatar: "gamer".to_string(),
            xp: 0,
            streak: 0,
            sessions: 0,
            last_active: None,
            onboarded: false,
            grade: String::new(),
            style: String::new(),
            motivation: String::new(),
            habits: Vec::new(),
            roast_level: 3,
            goal_30: String::new(),
            learn_time: String::new(),
            school_problem: String::new(),
            interests: None,
            is_private: false,
        }
    }
}

impl UserProfile {
    /// Create a fresh profile for the given identity.
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a profile with a synthetic guest identity.
    pub fn guest() -> Self {
        let id = format!("{GUEST_PREFIX}{}", Utc::now().timestamp_millis());
        Self::new(id, "Guest")
    }

    /// Whether this is a session-scoped guest identity.
    pub fn is_guest(&self) -> bool {
        self.email.starts_with(GUEST_PREFIX)
    }
}

// ============================================================================
// Habits
// ============================================================================

/// Whether completing a habit earns or costs XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitPolarity {
    Positive,
    Negative,
}

/// A daily habit with a per-repetition XP value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    pub polarity: HabitPolarity,
    /// XP per repetition; negative for bad habits.
    pub xp_value: i32,
    /// Repetition multiplier, at least 1.
    pub reps: u32,
    pub completed_today: bool,
    pub streak: u32,
}

// ============================================================================
// Money
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoneyDirection {
    Income,
    Expense,
}

/// A single income or expense entry. Append-only except for explicit
/// deletion; never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyEntry {
    pub id: MoneyEntryId,
    pub amount: f64,
    pub direction: MoneyDirection,
    pub category: String,
    pub note: String,
    pub date: DateTime<Utc>,
}

impl MoneyEntry {
    /// The signed effect of this entry on the balance.
    pub fn signed_amount(&self) -> f64 {
        match self.direction {
            MoneyDirection::Income => self.amount,
            MoneyDirection::Expense => -self.amount,
        }
    }
}

// ============================================================================
// Vocabulary
// ============================================================================

/// A term/translation pair owned by exactly one list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabEntry {
    pub id: VocabEntryId,
    pub term: String,
    pub translation: String,
    pub created_at: DateTime<Utc>,
}

/// A named collection of vocabulary entries. Insertion order is
/// meaningful for display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabList {
    pub id: VocabListId,
    pub name: String,
    pub source_lang: String,
    pub target_lang: String,
    pub entries: Vec<VocabEntry>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Feed and saved facts
// ============================================================================

/// A fact the user pinned from the feed. Facts are deduplicated by
/// exact title match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFact {
    pub id: SavedFactId,
    pub category: String,
    pub title: String,
    pub content: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedQuizKind {
    #[serde(rename = "mc")]
    MultipleChoice,
    #[serde(rename = "tf")]
    TrueFalse,
}

/// The single-question quiz attached to a feed fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedQuiz {
    #[serde(rename = "type")]
    pub kind: FeedQuizKind,
    pub question: String,
    pub options: Vec<String>,
    /// Index of the correct option.
    pub correct: usize,
}

/// A knowledge card in the feed, from the seed pool or the AI
/// collaborator. Read-only once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub category: String,
    pub title: String,
    pub content: String,
    pub quiz: FeedQuiz,
}

// ============================================================================
// Preferences
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppLanguage {
    De,
    En,
    Es,
}

impl AppLanguage {
    /// Language tag as used in prompts.
    pub fn tag(&self) -> &'static str {
        match self {
            AppLanguage::De => "de",
            AppLanguage::En => "en",
            AppLanguage::Es => "es",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccentColor {
    Yellow,
    Green,
    Blue,
    Purple,
    Red,
}

/// App-wide settings, mutated by explicit setters only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppPreferences {
    pub theme: ThemeMode,
    pub language: AppLanguage,
    pub accent: AccentColor,
    /// Base URL of the AI completion endpoint.
    pub ai_url: String,
    pub music_enabled: bool,
}

impl Default for AppPreferences {
    fn default() -> Self {
        Self {
            theme: ThemeMode::Dark,
            language: AppLanguage::De,
            accent: AccentColor::Purple,
            ai_url: "http://localhost:11434".to_string(),
            music_enabled: true,
        }
    }
}

// ============================================================================
// Aggregate state
// ============================================================================

/// The aggregate root. Exactly one instance exists per running client;
/// it is the only unit of persistence.
///
/// Unknown or missing fields in a persisted blob fall back to these
/// defaults, which keeps old snapshots loadable after schema growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub user: Option<UserProfile>,
    /// Current screen token, owned by the UI layer.
    pub screen: String,
    pub habits: Vec<Habit>,
    pub money: Vec<MoneyEntry>,
    pub jokers: u32,
    pub chests: u32,
    pub vocab_lists: Vec<VocabList>,
    pub preferences: AppPreferences,
    pub saved_facts: Vec<SavedFact>,
    pub feed: Vec<FeedItem>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            user: None,
            screen: "splash".to_string(),
            habits: Vec::new(),
            money: Vec::new(),
            jokers: 3,
            chests: 0,
            vocab_lists: Vec::new(),
            preferences: AppPreferences::default(),
            saved_facts: Vec::new(),
            feed: Vec::new(),
        }
    }
}

impl AppState {
    /// Find a vocabulary list by id.
    pub fn vocab_list(&self, id: VocabListId) -> Option<&VocabList> {
        self.vocab_lists.iter().find(|l| l.id == id)
    }

    /// Current money balance across all entries.
    pub fn money_balance(&self) -> f64 {
        self.money.iter().map(|m| m.signed_amount()).sum()
    }
}
