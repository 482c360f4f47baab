//! End-of-session scoring.
use serde::{Deserialize, Serialize};

use crate::constants::{
    BASE_POINTS_PER_PUZZLE, FEW_HINTS_BONUS, FEW_HINTS_MAX, NEAR_TARGET_DEN, NEAR_TARGET_NUM,
    NEAR_TARGET_TIME_BONUS, NO_HINT_BONUS, ON_TARGET_TIME_BONUS, SECONDS_PER_MINUTE,
};
use crate::endings::ResolvedEnding;
use crate::progress::SessionProgress;

/// Final score split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScoreBreakdown {
    pub base: u32,
    pub hint_bonus: u32,
    pub time_bonus: u32,
    pub ending_bonus: u32,
    pub bonus: u32,
    pub total: u32,
}

#[must_use]
pub const fn hint_bonus(hints_used: u32) -> u32 {
    match hints_used {
        0 => NO_HINT_BONUS,
        n if n <= FEW_HINTS_MAX => FEW_HINTS_BONUS,
        _ => 0,
    }
}

/// Time bonus for `elapsed_secs` against a target given in minutes.
#[must_use]
pub const fn time_bonus(elapsed_secs: u64, target_minutes: u32) -> u32 {
    let target_secs = target_minutes as u64 * SECONDS_PER_MINUTE;
    if elapsed_secs <= target_secs {
        ON_TARGET_TIME_BONUS
    } else if elapsed_secs.saturating_mul(NEAR_TARGET_DEN)
        <= target_secs.saturating_mul(NEAR_TARGET_NUM)
    {
        NEAR_TARGET_TIME_BONUS
    } else {
        0
    }
}

/// Combine progress and the resolved ending into a final score.
#[must_use]
pub fn compute_score(
    progress: &SessionProgress,
    target_minutes: u32,
    ending: &ResolvedEnding,
) -> ScoreBreakdown {
    let base = progress
        .completed_puzzles()
        .saturating_mul(BASE_POINTS_PER_PUZZLE);
    let hint_bonus = hint_bonus(progress.total_hints_used());
    let time_bonus = time_bonus(progress.elapsed_secs, target_minutes);
    let ending_bonus = ending.reward;
    let bonus = hint_bonus
        .saturating_add(time_bonus)
        .saturating_add(ending_bonus);
    ScoreBreakdown {
        base,
        hint_bonus,
        time_bonus,
        ending_bonus,
        bonus,
        total: base.saturating_add(bonus),
    }
}
