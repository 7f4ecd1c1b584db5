//! Level and streak arithmetic.
//!
//! Pure functions only: XP maps to a level through four threshold
//! regimes, and a streak maps to a bonus-XP percentage through a step
//! function. No state, no side effects.

use serde::{Deserialize, Serialize};

/// Display titles per level band; the last entry covers everything
/// beyond the list.
pub const LEVEL_TITLES: [&str; 11] = [
    "Newbie", "Scholar", "Learner", "Explorer", "Thinker", "Achiever", "Master", "Expert",
    "Legend", "Champion", "GOD",
];

/// Hard cap on the walkable level range.
pub const MAX_LEVEL: u32 = 200;

/// A level computed from an XP total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub level: u32,
    pub title: &'static str,
    /// Position within the current tier's band, clamped to 0..=100.
    pub percent: u8,
    /// Cumulative XP at which the current level began.
    pub current_threshold: u32,
    /// Cumulative XP at which the next level begins.
    pub next_threshold: u32,
}

/// Cost of advancing past the given level.
///
/// Tiers 1-5 cost `50 + 50*lvl`, 6-15 cost `300 + 100*(lvl-5)`,
/// 16-40 cost `1300 + 200*(lvl-15)`, beyond cost `6300 + 500*(lvl-40)`.
fn xp_for_level(level: u32) -> u32 {
    if level <= 5 {
        50 + level * 50
    } else if level <= 15 {
        300 + (level - 5) * 100
    } else if level <= 40 {
        1300 + (level - 15) * 200
    } else {
        6300 + (level - 40) * 500
    }
}

/// Compute level, title and progress for an XP total.
///
/// Walks thresholds upward from zero until `xp` no longer covers the
/// next tier's cumulative cost, capped at [`MAX_LEVEL`].
pub fn level_info(xp: u32) -> LevelInfo {
    let mut level = 1;
    let mut current_threshold = 0u32;
    let mut next_threshold = xp_for_level(1);

    while xp >= next_threshold && level < MAX_LEVEL {
        level += 1;
        current_threshold = next_threshold;
        next_threshold = current_threshold + xp_for_level(level);
    }

    let band = (next_threshold - current_threshold) as f64;
    let into_band = xp.saturating_sub(current_threshold) as f64;
    let percent = ((into_band / band) * 100.0).round().clamp(0.0, 100.0) as u8;

    let title_index = (level as usize - 1).min(LEVEL_TITLES.len() - 1);

    LevelInfo {
        level,
        title: LEVEL_TITLES[title_index],
        percent,
        current_threshold,
        next_threshold,
    }
}

/// Bonus XP percentage for a streak length.
///
/// Step function: 0% below 7 days, 5% at >=7, 10% at >=14, 50% at >=21.
pub fn streak_bonus(streak: u32) -> u32 {
    if streak >= 21 {
        50
    } else if streak >= 14 {
        10
    } else if streak >= 7 {
        5
    } else {
        0
    }
}

/// Apply the streak bonus to a raw XP amount, rounding to nearest.
pub fn apply_streak_bonus(amount: u32, streak: u32) -> u32 {
    let multiplier = 1.0 + streak_bonus(streak) as f64 / 100.0;
    (amount as f64 * multiplier).round() as u32
}
