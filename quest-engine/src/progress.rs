//! Mutable per-session progress record.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

use crate::adventure::Adventure;
use crate::content::HintLevel;
use crate::error::{EngineError, EntityKind, Rejection};

/// Lifecycle of a scene within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SceneStatus {
    #[default]
    Locked,
    Available,
    InProgress,
    Completed,
    Failed,
}

impl SceneStatus {
    /// Whether `next` is a legal forward move from `self`.
    #[must_use]
    pub const fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Locked, Self::Available)
                | (Self::Available, Self::InProgress | Self::Completed)
                | (Self::InProgress, Self::Completed | Self::Failed)
        )
    }

    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Available | Self::InProgress)
    }
}

impl fmt::Display for SceneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locked => write!(f, "locked"),
            Self::Available => write!(f, "available"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Last hint granted for a puzzle; drives the cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintStamp {
    pub level: HintLevel,
    pub granted_at: u64,
    pub cooldown_secs: u64,
}

impl HintStamp {
    /// Seconds left before another hint may be requested, if any.
    #[must_use]
    pub const fn remaining(&self, now: u64) -> Option<u64> {
        let ready_at = self.granted_at.saturating_add(self.cooldown_secs);
        if now < ready_at {
            Some(ready_at - now)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PuzzleProgress {
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub hints_used: u32,
    #[serde(default)]
    pub revealed: SmallVec<[HintLevel; 3]>,
    #[serde(default)]
    pub last_hint: Option<HintStamp>,
    #[serde(default)]
    pub completed: bool,
}

/// How a decision's option was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// Ordinary decision settled by the first submission.
    Single,
    /// Consensus decision where every participant agreed.
    Unanimous { votes: u32 },
    /// Consensus decision settled by majority after disagreement.
    Majority { votes_for: u32, total: u32 },
}

impl Resolution {
    #[must_use]
    pub const fn is_majority_fallback(self) -> bool {
        matches!(self, Self::Majority { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision: String,
    pub option: String,
    pub resolution: Resolution,
    pub decided_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub player: String,
    pub option: String,
}

/// Everything that changes while a team plays an adventure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub adventure_id: String,
    pub fingerprint: u64,
    #[serde(default)]
    pub team: Vec<String>,
    #[serde(default)]
    pub scenes: BTreeMap<String, SceneStatus>,
    #[serde(default)]
    pub puzzles: BTreeMap<String, PuzzleProgress>,
    #[serde(default)]
    pub decisions: Vec<DecisionRecord>,
    #[serde(default)]
    pub pending_votes: BTreeMap<String, Vec<Vote>>,
    pub started_at: u64,
    #[serde(default)]
    pub elapsed_secs: u64,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub hint_tokens: u32,
    #[serde(default)]
    pub ended: bool,
}

impl SessionProgress {
    /// Fresh progress with every scene locked and the full hint budget.
    #[must_use]
    pub fn new(adventure: &Adventure, team: Vec<String>, started_at: u64) -> Self {
        let scenes = adventure
            .scenes()
            .iter()
            .map(|scene| (scene.id.clone(), SceneStatus::Locked))
            .collect();
        let puzzles = adventure
            .puzzles()
            .iter()
            .map(|puzzle| (puzzle.id.clone(), PuzzleProgress::default()))
            .collect();
        Self {
            adventure_id: adventure.id().to_string(),
            fingerprint: adventure.fingerprint(),
            team,
            scenes,
            puzzles,
            decisions: Vec::new(),
            pending_votes: BTreeMap::new(),
            started_at,
            elapsed_secs: 0,
            score: 0,
            hint_tokens: adventure.meta().hint_tokens,
            ended: false,
        }
    }

    pub(crate) fn ensure_active(&self) -> Result<(), Rejection> {
        if self.ended {
            Err(Rejection::SessionEnded)
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn scene_status(&self, scene_id: &str) -> SceneStatus {
        self.scenes.get(scene_id).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn puzzle(&self, puzzle_id: &str) -> Option<&PuzzleProgress> {
        self.puzzles.get(puzzle_id)
    }

    /// Progress entry for a puzzle of this adventure. Unknown ids are refused
    /// so counts never include puzzles the adventure does not define.
    pub(crate) fn puzzle_mut(
        &mut self,
        puzzle_id: &str,
    ) -> Result<&mut PuzzleProgress, EngineError> {
        self.puzzles
            .get_mut(puzzle_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Puzzle, puzzle_id))
    }

    #[must_use]
    pub fn is_puzzle_completed(&self, puzzle_id: &str) -> bool {
        self.puzzles.get(puzzle_id).is_some_and(|p| p.completed)
    }

    #[must_use]
    pub fn completed_puzzles(&self) -> u32 {
        let count = self.puzzles.values().filter(|p| p.completed).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn total_hints_used(&self) -> u32 {
        self.puzzles.values().map(|p| p.hints_used).sum()
    }

    #[must_use]
    pub fn decision(&self, decision_id: &str) -> Option<&DecisionRecord> {
        self.decisions.iter().find(|d| d.decision == decision_id)
    }

    /// Move the elapsed-time counter forward. Never moves backwards.
    pub fn advance_clock(&mut self, now: u64) {
        let elapsed = now.saturating_sub(self.started_at);
        self.elapsed_secs = self.elapsed_secs.max(elapsed);
    }

    /// Share of scenes completed, in `[0, 1]`.
    #[must_use]
    pub fn completion_ratio(&self) -> f32 {
        if self.scenes.is_empty() {
            return 0.0;
        }
        let done = self
            .scenes
            .values()
            .filter(|s| **s == SceneStatus::Completed)
            .count();
        #[allow(clippy::cast_precision_loss)]
        let ratio = done as f32 / self.scenes.len() as f32;
        ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adventure::tests::mini;

    #[test]
    fn scene_status_moves_forward_only() {
        assert!(SceneStatus::Locked.can_become(SceneStatus::Available));
        assert!(SceneStatus::Available.can_become(SceneStatus::InProgress));
        assert!(SceneStatus::InProgress.can_become(SceneStatus::Failed));
        assert!(!SceneStatus::Locked.can_become(SceneStatus::Completed));
        assert!(!SceneStatus::Completed.can_become(SceneStatus::Available));
        assert!(!SceneStatus::Available.can_become(SceneStatus::Failed));
        assert!(!SceneStatus::Failed.can_become(SceneStatus::InProgress));
    }

    #[test]
    fn new_progress_starts_locked_with_budget() {
        let adventure = mini();
        let progress = SessionProgress::new(&adventure, vec!["ada".into()], 1_000);
        assert_eq!(progress.scene_status("lobby"), SceneStatus::Locked);
        assert_eq!(progress.hint_tokens, 4);
        assert_eq!(progress.completed_puzzles(), 0);
        assert_eq!(progress.fingerprint, adventure.fingerprint());
        assert!(progress.completion_ratio().abs() < f32::EPSILON);
    }

    #[test]
    fn unknown_puzzles_get_no_progress_entry() {
        let adventure = mini();
        let mut progress = SessionProgress::new(&adventure, Vec::new(), 0);
        assert_eq!(
            progress.puzzle_mut("extra-0").unwrap_err(),
            EngineError::not_found(EntityKind::Puzzle, "extra-0")
        );
        progress.puzzle_mut("code").unwrap().completed = true;
        assert_eq!(progress.puzzles.len(), 3);
        assert_eq!(progress.completed_puzzles(), 1);
    }

    #[test]
    fn clock_is_monotonic() {
        let adventure = mini();
        let mut progress = SessionProgress::new(&adventure, Vec::new(), 100);
        progress.advance_clock(160);
        assert_eq!(progress.elapsed_secs, 60);
        progress.advance_clock(120);
        assert_eq!(progress.elapsed_secs, 60);
        progress.advance_clock(50);
        assert_eq!(progress.elapsed_secs, 60);
    }

    #[test]
    fn hint_stamp_remaining() {
        let stamp = HintStamp {
            level: HintLevel::Subtle,
            granted_at: 100,
            cooldown_secs: 60,
        };
        assert_eq!(stamp.remaining(130), Some(30));
        assert_eq!(stamp.remaining(160), None);
    }
}
