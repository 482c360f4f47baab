//! Free-text answer matching.
//!
//! Normalisation trims surrounding whitespace and, for case-insensitive
//! puzzles, lower-cases both the input and every accepted answer. `exact`
//! puzzles need equality with one accepted answer. `fuzzy` puzzles also accept
//! substring containment in either direction when partial credit is enabled
//! and the coverage (shorter length / longer length) is strictly above the
//! puzzle's threshold. Without a threshold only exact matches count.
use serde::{Deserialize, Serialize};

use crate::adventure::Adventure;
use crate::constants::{
    LOG_PUZZLE_SOLVED, MSG_ANSWER_CLOSE, MSG_ANSWER_CORRECT, MSG_ANSWER_EMPTY, MSG_ANSWER_INCORRECT,
};
use crate::content::{MatchMode, Puzzle};
use crate::error::{EngineError, Rejection};
use crate::progress::SessionProgress;
use crate::unlock::{ensure_scene_open, mark_in_progress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Contains,
    None,
}

/// Outcome of checking one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerVerdict {
    pub accepted: bool,
    /// `1.0` when accepted, `0.0` otherwise; the threshold is a binary gate.
    pub partial_score: f32,
    pub match_kind: MatchKind,
    /// Points added to the running score by this submission.
    pub points_awarded: u32,
    pub message: String,
}

impl AnswerVerdict {
    fn accepted(kind: MatchKind, points: u32) -> Self {
        let message = match kind {
            MatchKind::Contains => MSG_ANSWER_CLOSE,
            _ => MSG_ANSWER_CORRECT,
        };
        Self {
            accepted: true,
            partial_score: 1.0,
            match_kind: kind,
            points_awarded: points,
            message: message.to_string(),
        }
    }

    fn rejected(message: &str) -> Self {
        Self {
            accepted: false,
            partial_score: 0.0,
            match_kind: MatchKind::None,
            points_awarded: 0,
            message: message.to_string(),
        }
    }
}

fn normalize(text: &str, case_sensitive: bool) -> String {
    let trimmed = text.trim();
    if case_sensitive {
        trimmed.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// Coverage of the shorter string over the longer when one contains the other.
fn containment(input: &str, answer: &str) -> Option<f32> {
    let (short, long) = if input.len() <= answer.len() {
        (input, answer)
    } else {
        (answer, input)
    };
    if short.is_empty() || !long.contains(short) {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let coverage = short.chars().count() as f32 / long.chars().count() as f32;
    Some(coverage)
}

/// Check a raw answer against a puzzle. Pure; never mutates progress.
#[must_use]
pub fn validate(puzzle: &Puzzle, raw: &str) -> AnswerVerdict {
    let input = normalize(raw, puzzle.case_sensitive);
    if input.is_empty() {
        return AnswerVerdict::rejected(MSG_ANSWER_EMPTY);
    }

    let answers: Vec<String> = puzzle
        .answers
        .iter()
        .map(|a| normalize(a, puzzle.case_sensitive))
        .filter(|a| !a.is_empty())
        .collect();

    if answers.iter().any(|a| *a == input) {
        return AnswerVerdict::accepted(MatchKind::Exact, puzzle.points);
    }

    if puzzle.mode == MatchMode::Fuzzy
        && puzzle.allow_partial_credit
        && let Some(threshold) = puzzle.partial_credit_threshold
    {
        let best = answers
            .iter()
            .filter_map(|a| containment(&input, a))
            .fold(None, |best: Option<f32>, c| Some(best.map_or(c, |b| b.max(c))));
        if let Some(coverage) = best
            && coverage > threshold
        {
            return AnswerVerdict::accepted(MatchKind::Contains, puzzle.points);
        }
    }

    AnswerVerdict::rejected(MSG_ANSWER_INCORRECT)
}

/// Check an answer and record the attempt.
///
/// Every submission counts as an attempt. An accepted answer completes the
/// puzzle and adds its points to the running score.
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] for an unknown puzzle, or a rejection
/// when the session ended, the puzzle is already solved, or its scene is
/// closed. A wrong answer is not an error.
pub fn submit_answer(
    adventure: &Adventure,
    progress: &mut SessionProgress,
    puzzle_id: &str,
    raw: &str,
) -> Result<AnswerVerdict, EngineError> {
    progress.ensure_active()?;
    let puzzle = adventure.puzzle(puzzle_id)?;
    if progress.is_puzzle_completed(puzzle_id) {
        return Err(Rejection::PuzzleCompleted {
            puzzle: puzzle_id.to_string(),
        }
        .into());
    }
    ensure_scene_open(progress, &puzzle.scene)?;

    let verdict = validate(puzzle, raw);
    let entry = progress.puzzle_mut(puzzle_id)?;
    entry.attempts = entry.attempts.saturating_add(1);
    let attempts = entry.attempts;
    if verdict.accepted {
        entry.completed = true;
        progress.score = progress.score.saturating_add(verdict.points_awarded);
        log::info!(
            "{LOG_PUZZLE_SOLVED} puzzle={puzzle_id} attempts={attempts} points={}",
            verdict.points_awarded
        );
    } else {
        log::debug!("answer rejected puzzle={puzzle_id} attempts={attempts}");
    }
    mark_in_progress(progress, &puzzle.scene);
    Ok(verdict)
}
