//! Hint ladder: attempt-driven escalation, token budget and cooldowns.
use serde::{Deserialize, Serialize};

use crate::adventure::Adventure;
use crate::constants::LOG_HINT_GRANTED;
use crate::content::{Hint, HintLevel};
use crate::error::{EngineError, Rejection};
use crate::progress::{HintStamp, SessionProgress};
use crate::unlock::{ensure_scene_open, mark_in_progress};

/// A hint handed to the team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintGrant {
    pub puzzle: String,
    pub level: HintLevel,
    pub text: String,
    /// Tokens deducted by this request; zero when re-showing a revealed hint.
    pub cost_charged: u32,
    pub tokens_remaining: u32,
    pub repeat: bool,
}

/// Hint for a puzzle at the ladder position of `attempt`.
///
/// Returns `Ok(None)` when the attempt count maps to no level or nothing is
/// authored at that level.
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] for an unknown puzzle id.
pub fn get_hint<'a>(
    adventure: &'a Adventure,
    puzzle_id: &str,
    attempt: u32,
) -> Result<Option<&'a Hint>, EngineError> {
    match HintLevel::for_attempt(attempt) {
        Some(level) => adventure.hint(puzzle_id, level),
        None => {
            adventure.puzzle(puzzle_id)?;
            Ok(None)
        }
    }
}

/// Grant the hint matching the puzzle's current attempt count.
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] for an unknown puzzle, or a rejection
/// when the session ended, the puzzle is solved, its scene is closed, the
/// previous hint is still cooling down, or the token budget cannot cover the
/// cost.
pub fn request_hint(
    adventure: &Adventure,
    progress: &mut SessionProgress,
    puzzle_id: &str,
    now: u64,
) -> Result<Option<HintGrant>, EngineError> {
    progress.ensure_active()?;
    let puzzle = adventure.puzzle(puzzle_id)?;
    if progress.is_puzzle_completed(puzzle_id) {
        return Err(Rejection::PuzzleCompleted {
            puzzle: puzzle_id.to_string(),
        }
        .into());
    }
    ensure_scene_open(progress, &puzzle.scene)?;

    let state = progress.puzzle(puzzle_id).cloned().unwrap_or_default();
    let Some(hint) = get_hint(adventure, puzzle_id, state.attempts)? else {
        return Ok(None);
    };

    if let Some(remaining_secs) = state.last_hint.and_then(|stamp| stamp.remaining(now)) {
        return Err(Rejection::HintCooldown {
            puzzle: puzzle_id.to_string(),
            remaining_secs,
        }
        .into());
    }

    let repeat = state.revealed.contains(&hint.level);
    let cost_charged = if repeat { 0 } else { hint.cost };
    if cost_charged > progress.hint_tokens {
        return Err(Rejection::HintBudgetExhausted {
            cost: cost_charged,
            remaining: progress.hint_tokens,
        }
        .into());
    }

    progress.hint_tokens -= cost_charged;
    let tokens_remaining = progress.hint_tokens;
    let entry = progress.puzzle_mut(puzzle_id)?;
    if !repeat {
        entry.hints_used += 1;
        entry.revealed.push(hint.level);
    }
    entry.last_hint = Some(HintStamp {
        level: hint.level,
        granted_at: now,
        cooldown_secs: hint.cooldown_secs,
    });
    mark_in_progress(progress, &puzzle.scene);

    log::info!(
        "{LOG_HINT_GRANTED} puzzle={puzzle_id} level={} cost={cost_charged} remaining={tokens_remaining}",
        hint.level
    );

    Ok(Some(HintGrant {
        puzzle: puzzle_id.to_string(),
        level: hint.level,
        text: hint.text.clone(),
        cost_charged,
        tokens_remaining,
        repeat,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adventure::tests::mini;
    use crate::unlock::refresh_scenes;

    fn open_progress(adventure: &Adventure) -> SessionProgress {
        let mut progress = SessionProgress::new(adventure, Vec::new(), 0);
        refresh_scenes(adventure, &mut progress);
        progress
    }

    #[test]
    fn ladder_maps_attempts_and_saturates() {
        let adventure = mini();
        assert!(get_hint(&adventure, "riddle", 0).unwrap().is_none());
        assert_eq!(
            get_hint(&adventure, "riddle", 1).unwrap().map(|h| h.level),
            Some(HintLevel::Subtle)
        );
        assert_eq!(
            get_hint(&adventure, "riddle", 3).unwrap(),
            get_hint(&adventure, "riddle", 99).unwrap()
        );
        assert!(get_hint(&adventure, "code", 2).unwrap().is_none());
        assert!(get_hint(&adventure, "ghost", 1).is_err());
        assert!(get_hint(&adventure, "ghost", 0).is_err());
    }

    #[test]
    fn no_hint_before_first_attempt() {
        let adventure = mini();
        let mut progress = open_progress(&adventure);
        assert_eq!(request_hint(&adventure, &mut progress, "riddle", 0), Ok(None));
        assert_eq!(progress.hint_tokens, 4);
    }

    #[test]
    fn grant_charges_once_and_enforces_cooldown() {
        let adventure = mini();
        let mut progress = open_progress(&adventure);
        progress.puzzle_mut("riddle").unwrap().attempts = 1;

        let grant = request_hint(&adventure, &mut progress, "riddle", 10)
            .unwrap()
            .unwrap();
        assert_eq!(grant.level, HintLevel::Subtle);
        assert_eq!(grant.cost_charged, 1);
        assert_eq!(grant.tokens_remaining, 3);
        assert!(!grant.repeat);

        let err = request_hint(&adventure, &mut progress, "riddle", 40).unwrap_err();
        assert_eq!(
            err,
            EngineError::Rejected(Rejection::HintCooldown {
                puzzle: "riddle".into(),
                remaining_secs: 30,
            })
        );

        let again = request_hint(&adventure, &mut progress, "riddle", 70)
            .unwrap()
            .unwrap();
        assert!(again.repeat);
        assert_eq!(again.cost_charged, 0);
        assert_eq!(progress.puzzle("riddle").unwrap().hints_used, 1);
    }

    #[test]
    fn budget_exhaustion_is_rejected() {
        let adventure = mini();
        let mut progress = open_progress(&adventure);
        progress.puzzle_mut("riddle").unwrap().attempts = 3;
        progress.hint_tokens = 2;
        let err = request_hint(&adventure, &mut progress, "riddle", 0).unwrap_err();
        assert_eq!(err.rejection_code(), Some("hint_budget_exhausted"));
        assert_eq!(progress.hint_tokens, 2);
        assert_eq!(progress.puzzle("riddle").unwrap().hints_used, 0);
    }

    #[test]
    fn solved_or_locked_puzzles_refuse_hints() {
        let adventure = mini();
        let mut progress = open_progress(&adventure);
        progress.puzzle_mut("riddle").unwrap().completed = true;
        assert_eq!(
            request_hint(&adventure, &mut progress, "riddle", 0)
                .unwrap_err()
                .rejection_code(),
            Some("puzzle_completed")
        );
        assert_eq!(
            request_hint(&adventure, &mut progress, "door", 0)
                .unwrap_err()
                .rejection_code(),
            Some("scene_locked")
        );
    }
}
