//! The state store.
//!
//! All mutations of [`AppState`] go through [`Store`], which enforces
//! the gamification rules and writes the state through to its storage
//! backend after every change. Persistence failures are logged and
//! swallowed: losing one write must never block the user's session.

use crate::feed::seeded_feed;
use crate::gamification::apply_streak_bonus;
use crate::persist::{load_profile, save_profile, save_state, StorageBackend};
use crate::state::{
    AppLanguage, AppState, AccentColor, FeedItem, Habit, HabitId, HabitPolarity, MoneyDirection,
    MoneyEntry, MoneyEntryId, SavedFact, SavedFactId, ThemeMode, UserProfile, VocabEntry,
    VocabEntryId, VocabList, VocabListId,
};
use crate::vocab::VocabPair;
use chrono::{NaiveDate, Utc};
use rand::Rng;
use thiserror::Error;

/// XP granted when the money balance first crosses the milestone.
const BALANCE_MILESTONE: f64 = 100.0;
const MILESTONE_XP: u32 = 50;

/// Income XP is the amount divided by ten, clamped to this range.
const INCOME_XP_MIN: u32 = 5;
const INCOME_XP_MAX: u32 = 30;

/// XP values inside a chest.
const CHEST_XP_SMALL: u32 = 50;
const CHEST_XP_LARGE: u32 = 100;

/// Errors from store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("No user is signed in")]
    NoProfile,

    #[error("Field must not be empty: {0}")]
    EmptyField(&'static str),

    #[error("Amount must be positive and finite")]
    NonPositiveAmount,

    #[error("A fact with this title is already saved")]
    DuplicateFact,
}

/// What opening a chest produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChestReward {
    XpSmall,
    XpLarge,
    Joker,
    Booster,
}

impl ChestReward {
    /// Display label for the reward toast.
    pub fn label(&self) -> &'static str {
        match self {
            ChestReward::XpSmall => "+50 XP",
            ChestReward::XpLarge => "+100 XP",
            ChestReward::Joker => "+1 Joker",
            ChestReward::Booster => "Cosmetic booster",
        }
    }
}

/// Result of recording a money entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoneyOutcome {
    pub entry_id: MoneyEntryId,
    /// XP credited for this entry, streak bonus included.
    pub xp_awarded: u32,
    /// Whether this entry pushed the balance across the milestone.
    pub milestone: bool,
}

/// Owns the application state and its storage backend.
pub struct Store {
    state: AppState,
    backend: Box<dyn StorageBackend>,
}

impl Store {
    /// Open a store on the given backend, loading any saved state.
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        let state = crate::persist::load_state(backend.as_ref());
        Self { state, backend }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    fn persist(&mut self) {
        if let Err(e) = save_state(self.backend.as_mut(), &self.state) {
            tracing::error!(error = %e, "failed to persist state");
        }
    }

    /// Write the signed-in user's profile under its identity key.
    /// Guest identities are session-scoped and never written.
    fn persist_profile(&mut self) {
        let Some(user) = self.state.user.as_ref() else {
            return;
        };
        if user.is_guest() {
            return;
        }
        let user = user.clone();
        if let Err(e) = save_profile(self.backend.as_mut(), &user) {
            tracing::error!(error = %e, "failed to persist profile");
        }
    }

    fn user_mut(&mut self) -> Result<&mut UserProfile, StoreError> {
        self.state.user.as_mut().ok_or(StoreError::NoProfile)
    }

    // ========================================================================
    // Session
    // ========================================================================

    pub fn set_screen(&mut self, screen: impl Into<String>) {
        self.state.screen = screen.into();
        self.persist();
    }

    /// Sign in with an email identity.
    ///
    /// A previously saved profile for this identity is resumed with all
    /// its counters; otherwise a fresh profile is created. The screen
    /// moves to home or onboarding depending on the profile.
    pub fn login(
        &mut self,
        email: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<(), StoreError> {
        let email = email.into();
        let name = name.into();
        if email.trim().is_empty() {
            return Err(StoreError::EmptyField("email"));
        }

        let profile = load_profile(self.backend.as_ref(), &email)
            .unwrap_or_else(|| UserProfile::new(email, name));

        self.state.screen = if profile.onboarded {
            "home".to_string()
        } else {
            "onboarding".to_string()
        };
        self.state.user = Some(profile);
        self.persist_profile();
        self.persist();
        Ok(())
    }

    /// Start a session-scoped guest session. Nothing identity-keyed is
    /// ever written for guests.
    pub fn login_as_guest(&mut self) {
        self.state.user = Some(UserProfile::guest());
        self.state.screen = "onboarding".to_string();
        self.persist();
    }

    /// Sign out, clearing session-scoped progress but keeping content
    /// (vocabulary, saved facts, feed) and preferences.
    pub fn logout(&mut self) {
        self.state.user = None;
        self.state.screen = "splash".to_string();
        self.state.habits.clear();
        self.state.money.clear();
        self.state.jokers = 3;
        self.state.chests = 0;
        self.persist();
    }

    /// Apply an edit to the signed-in user's profile.
    pub fn update_user(
        &mut self,
        edit: impl FnOnce(&mut UserProfile),
    ) -> Result<(), StoreError> {
        edit(self.user_mut()?);
        self.persist_profile();
        self.persist();
        Ok(())
    }

    // ========================================================================
    // XP and streaks
    // ========================================================================

    /// Credit XP, scaled by the streak bonus.
    ///
    /// Also counts a session and stamps today as the last active day.
    /// Returns the credited amount.
    pub fn add_xp(&mut self, amount: u32) -> Result<u32, StoreError> {
        let today = Utc::now().date_naive();
        let user = self.user_mut()?;
        let credited = apply_streak_bonus(amount, user.streak);
        user.xp += credited;
        user.sessions += 1;
        user.last_active = Some(today);
        self.persist_profile();
        self.persist();
        Ok(credited)
    }

    /// Debit XP, never below zero. No streak scaling on the way down.
    pub fn remove_xp(&mut self, amount: u32) -> Result<(), StoreError> {
        let user = self.user_mut()?;
        user.xp = user.xp.saturating_sub(amount);
        self.persist_profile();
        self.persist();
        Ok(())
    }

    /// Roll the streak forward for the current calendar day.
    pub fn check_streak(&mut self) -> Result<(), StoreError> {
        self.check_streak_on(Utc::now().date_naive())
    }

    /// Roll the streak forward for the given day.
    ///
    /// Activity yesterday extends the streak and awards a chest; any
    /// longer gap (or a first-ever check) restarts the streak at one.
    /// A repeat check on the same day changes nothing. Crossing into a
    /// new day also clears the habits' daily completion flags.
    pub fn check_streak_on(&mut self, today: NaiveDate) -> Result<(), StoreError> {
        let user = self.state.user.as_mut().ok_or(StoreError::NoProfile)?;

        let award_chest = match user.last_active {
            Some(day) if day == today => return Ok(()),
            Some(day) if day.succ_opt() == Some(today) => {
                user.streak += 1;
                user.last_active = Some(today);
                true
            }
            _ => {
                user.streak = 1;
                user.last_active = Some(today);
                false
            }
        };
        if award_chest {
            self.state.chests += 1;
        }

        for habit in &mut self.state.habits {
            habit.completed_today = false;
        }

        self.persist_profile();
        self.persist();
        Ok(())
    }

    // ========================================================================
    // Habits
    // ========================================================================

    pub fn add_habit(
        &mut self,
        name: impl Into<String>,
        polarity: HabitPolarity,
        xp_value: i32,
        reps: u32,
    ) -> Result<HabitId, StoreError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StoreError::EmptyField("name"));
        }

        let habit = Habit {
            id: HabitId::new(),
            name,
            polarity,
            xp_value,
            reps: reps.max(1),
            completed_today: false,
            streak: 0,
        };
        let id = habit.id;
        self.state.habits.push(habit);
        self.persist();
        Ok(id)
    }

    /// Mark a habit done for today. Returns `false` for an unknown
    /// habit or one already completed today.
    pub fn complete_habit(&mut self, id: HabitId) -> bool {
        let Some(habit) = self.state.habits.iter_mut().find(|h| h.id == id) else {
            return false;
        };
        if habit.completed_today {
            return false;
        }
        habit.completed_today = true;
        habit.streak += 1;
        self.persist();
        true
    }

    /// Complete a habit and settle its XP: value times repetitions,
    /// credited for positive habits and debited for negative ones.
    /// Returns the signed XP delta actually applied.
    pub fn complete_habit_with_xp(&mut self, id: HabitId) -> Option<i64> {
        let (xp_value, reps) = {
            let habit = self.state.habits.iter().find(|h| h.id == id)?;
            if habit.completed_today {
                return None;
            }
            (habit.xp_value, habit.reps.max(1))
        };
        if !self.complete_habit(id) {
            return None;
        }

        let magnitude = xp_value.unsigned_abs() * reps;
        if xp_value >= 0 {
            let credited = self.add_xp(magnitude).ok()?;
            Some(i64::from(credited))
        } else {
            self.remove_xp(magnitude).ok()?;
            Some(-i64::from(magnitude))
        }
    }

    pub fn remove_habit(&mut self, id: HabitId) -> bool {
        let before = self.state.habits.len();
        self.state.habits.retain(|h| h.id != id);
        let removed = self.state.habits.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    // ========================================================================
    // Money
    // ========================================================================

    /// Record an income or expense entry.
    ///
    /// Income earns XP proportional to the amount; pushing the balance
    /// across the milestone earns extra on top. Expenses earn nothing
    /// but still count toward the balance.
    pub fn add_money_entry(
        &mut self,
        direction: MoneyDirection,
        amount: f64,
        category: impl Into<String>,
        note: impl Into<String>,
    ) -> Result<MoneyOutcome, StoreError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(StoreError::NonPositiveAmount);
        }
        if self.state.user.is_none() {
            return Err(StoreError::NoProfile);
        }

        let balance_before = self.state.money_balance();
        let entry = MoneyEntry {
            id: MoneyEntryId::new(),
            amount,
            direction,
            category: category.into(),
            note: note.into(),
            date: Utc::now(),
        };
        let entry_id = entry.id;
        self.state.money.push(entry);
        let balance_after = self.state.money_balance();

        let milestone =
            balance_before < BALANCE_MILESTONE && balance_after >= BALANCE_MILESTONE;

        let mut base = 0u32;
        if direction == MoneyDirection::Income {
            base = ((amount / 10.0).round() as u32).clamp(INCOME_XP_MIN, INCOME_XP_MAX);
        }
        if milestone {
            base += MILESTONE_XP;
        }

        let xp_awarded = if base > 0 { self.add_xp(base)? } else { 0 };
        self.persist();

        Ok(MoneyOutcome {
            entry_id,
            xp_awarded,
            milestone,
        })
    }

    pub fn remove_money_entry(&mut self, id: MoneyEntryId) -> bool {
        let before = self.state.money.len();
        self.state.money.retain(|m| m.id != id);
        let removed = self.state.money.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    // ========================================================================
    // Jokers and chests
    // ========================================================================

    /// Spend a joker. Returns `false` when none are left.
    pub fn use_joker(&mut self) -> bool {
        if self.state.jokers == 0 {
            return false;
        }
        self.state.jokers -= 1;
        self.persist();
        true
    }

    /// Buy a joker for XP. Returns `false` when the user cannot afford
    /// it or nobody is signed in.
    pub fn buy_joker(&mut self, cost: u32) -> bool {
        let Some(user) = self.state.user.as_mut() else {
            return false;
        };
        if user.xp < cost {
            return false;
        }
        user.xp -= cost;
        self.state.jokers += 1;
        self.persist_profile();
        self.persist();
        true
    }

    /// Open one chest for a uniformly random reward.
    ///
    /// The chest is consumed even when an XP reward cannot be credited
    /// because nobody is signed in.
    pub fn open_chest(&mut self) -> Option<ChestReward> {
        if self.state.chests == 0 {
            return None;
        }
        self.state.chests -= 1;

        let reward = match rand::thread_rng().gen_range(0..4) {
            0 => ChestReward::XpSmall,
            1 => ChestReward::XpLarge,
            2 => ChestReward::Joker,
            _ => ChestReward::Booster,
        };

        match reward {
            ChestReward::XpSmall => {
                if let Some(user) = self.state.user.as_mut() {
                    user.xp += CHEST_XP_SMALL;
                }
            }
            ChestReward::XpLarge => {
                if let Some(user) = self.state.user.as_mut() {
                    user.xp += CHEST_XP_LARGE;
                }
            }
            ChestReward::Joker => self.state.jokers += 1,
            ChestReward::Booster => {}
        }

        self.persist_profile();
        self.persist();
        Some(reward)
    }

    // ========================================================================
    // Vocabulary
    // ========================================================================

    pub fn add_vocab_list(
        &mut self,
        name: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Result<VocabListId, StoreError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StoreError::EmptyField("name"));
        }

        let list = VocabList {
            id: VocabListId::new(),
            name,
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            entries: Vec::new(),
            created_at: Utc::now(),
        };
        let id = list.id;
        self.state.vocab_lists.push(list);
        self.persist();
        Ok(id)
    }

    pub fn remove_vocab_list(&mut self, id: VocabListId) -> bool {
        let before = self.state.vocab_lists.len();
        self.state.vocab_lists.retain(|l| l.id != id);
        let removed = self.state.vocab_lists.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    /// Append parsed pairs to a list. Returns how many were added;
    /// zero for an unknown list.
    pub fn add_vocab_entries(&mut self, list_id: VocabListId, pairs: &[VocabPair]) -> usize {
        let now = Utc::now();
        let Some(list) = self.state.vocab_lists.iter_mut().find(|l| l.id == list_id) else {
            return 0;
        };
        for pair in pairs {
            list.entries.push(VocabEntry {
                id: VocabEntryId::new(),
                term: pair.term.clone(),
                translation: pair.translation.clone(),
                created_at: now,
            });
        }
        if !pairs.is_empty() {
            self.persist();
        }
        pairs.len()
    }

    pub fn add_vocab_entry(
        &mut self,
        list_id: VocabListId,
        term: impl Into<String>,
        translation: impl Into<String>,
    ) -> Option<VocabEntryId> {
        let pair = VocabPair::new(term, translation);
        if self.add_vocab_entries(list_id, std::slice::from_ref(&pair)) == 0 {
            return None;
        }
        let list = self.state.vocab_list(list_id)?;
        list.entries.last().map(|e| e.id)
    }

    pub fn remove_vocab_entry(&mut self, list_id: VocabListId, entry_id: VocabEntryId) -> bool {
        let Some(list) = self.state.vocab_lists.iter_mut().find(|l| l.id == list_id) else {
            return false;
        };
        let before = list.entries.len();
        list.entries.retain(|e| e.id != entry_id);
        let removed = list.entries.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    /// Edit an entry in place; `None` fields are left unchanged.
    pub fn update_vocab_entry(
        &mut self,
        list_id: VocabListId,
        entry_id: VocabEntryId,
        term: Option<String>,
        translation: Option<String>,
    ) -> bool {
        let Some(list) = self.state.vocab_lists.iter_mut().find(|l| l.id == list_id) else {
            return false;
        };
        let Some(entry) = list.entries.iter_mut().find(|e| e.id == entry_id) else {
            return false;
        };
        if let Some(term) = term {
            entry.term = term;
        }
        if let Some(translation) = translation {
            entry.translation = translation;
        }
        self.persist();
        true
    }

    // ========================================================================
    // Saved facts and feed
    // ========================================================================

    /// Pin a fact. Facts are deduplicated by exact title.
    pub fn add_saved_fact(
        &mut self,
        category: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<SavedFactId, StoreError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(StoreError::EmptyField("title"));
        }
        if self.is_fact_saved(&title) {
            return Err(StoreError::DuplicateFact);
        }

        let fact = SavedFact {
            id: SavedFactId::new(),
            category: category.into(),
            title,
            content: content.into(),
            saved_at: Utc::now(),
        };
        let id = fact.id;
        self.state.saved_facts.push(fact);
        self.persist();
        Ok(id)
    }

    pub fn remove_saved_fact(&mut self, id: SavedFactId) -> bool {
        let before = self.state.saved_facts.len();
        self.state.saved_facts.retain(|f| f.id != id);
        let removed = self.state.saved_facts.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    pub fn is_fact_saved(&self, title: &str) -> bool {
        self.state.saved_facts.iter().any(|f| f.title == title)
    }

    /// Add items to the feed, at the top or the bottom.
    pub fn add_feed_items(&mut self, items: Vec<FeedItem>, top: bool) {
        if items.is_empty() {
            return;
        }
        if top {
            self.state.feed.splice(0..0, items);
        } else {
            self.state.feed.extend(items);
        }
        self.persist();
    }

    /// Fill an empty feed with the built-in starter facts.
    pub fn seed_feed(&mut self) {
        if self.state.feed.is_empty() {
            self.add_feed_items(seeded_feed(), false);
        }
    }

    // ========================================================================
    // Preferences
    // ========================================================================

    pub fn set_theme(&mut self, theme: ThemeMode) {
        self.state.preferences.theme = theme;
        self.persist();
    }

    pub fn set_language(&mut self, language: AppLanguage) {
        self.state.preferences.language = language;
        self.persist();
    }

    pub fn set_accent(&mut self, accent: AccentColor) {
        self.state.preferences.accent = accent;
        self.persist();
    }

    pub fn set_ai_url(&mut self, url: impl Into<String>) {
        self.state.preferences.ai_url = url.into();
        self.persist();
    }

    pub fn set_music_enabled(&mut self, enabled: bool) {
        self.state.preferences.music_enabled = enabled;
        self.persist();
    }
}
