//! Error types raised by content loading and session operations.
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::content::HintLevel;

/// Entity families that can be looked up by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Adventure,
    Session,
    Scene,
    Puzzle,
    Hint,
    Decision,
    Option,
    Ending,
    Player,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Adventure => "adventure",
            Self::Session => "session",
            Self::Scene => "scene",
            Self::Puzzle => "puzzle",
            Self::Hint => "hint",
            Self::Decision => "decision",
            Self::Option => "option",
            Self::Ending => "ending",
            Self::Player => "player",
        };
        f.write_str(label)
    }
}

/// Problems found while validating authored content.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("adventure json is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: EntityKind, id: String },
    #[error("{owner} references unknown {kind} '{id}'")]
    UnknownReference {
        owner: String,
        kind: EntityKind,
        id: String,
    },
    #[error("puzzle '{puzzle}' declares more than one {level} hint")]
    DuplicateHintLevel { puzzle: String, level: HintLevel },
    #[error("puzzle '{puzzle}' partial credit threshold {value:.2} is outside [0, 1)")]
    ThresholdOutOfRange { puzzle: String, value: f32 },
    #[error("puzzle '{puzzle}' has no accepted answers")]
    NoAcceptedAnswers { puzzle: String },
    #[error("decision '{decision}' has no options")]
    NoOptions { decision: String },
    #[error("puzzle '{puzzle}' belongs to scene '{owner}' but is listed by scene '{listed_by}'")]
    SceneMismatch {
        puzzle: String,
        owner: String,
        listed_by: String,
    },
    #[error("ending '{ending}' requires consensus on non-consensus decision '{decision}'")]
    ConsensusNotVoted { ending: String, decision: String },
    #[error("adventure declares no default ending")]
    MissingDefaultEnding,
    #[error("adventure declares more than one default ending ('{first}', '{second}')")]
    MultipleDefaultEndings { first: String, second: String },
}

/// Reasons an operation was refused in the current session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Rejection {
    SceneLocked { scene: String },
    PuzzleCompleted { puzzle: String },
    HintCooldown { puzzle: String, remaining_secs: u64 },
    HintBudgetExhausted { cost: u32, remaining: u32 },
    DecisionMade { decision: String },
    AlreadyVoted { decision: String, player: String },
    SceneFailed { scene: String },
    SceneNotInProgress { scene: String },
    SessionEnded,
    ContentMismatch { expected: u64, found: u64 },
}

impl Rejection {
    /// Stable reason code for callers that branch on the rejection.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::SceneLocked { .. } => "scene_locked",
            Self::PuzzleCompleted { .. } => "puzzle_completed",
            Self::HintCooldown { .. } => "hint_cooldown",
            Self::HintBudgetExhausted { .. } => "hint_budget_exhausted",
            Self::DecisionMade { .. } => "decision_made",
            Self::AlreadyVoted { .. } => "already_voted",
            Self::SceneFailed { .. } => "scene_failed",
            Self::SceneNotInProgress { .. } => "scene_not_in_progress",
            Self::SessionEnded => "session_ended",
            Self::ContentMismatch { .. } => "content_mismatch",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SceneLocked { scene } => write!(f, "scene '{scene}' is locked"),
            Self::PuzzleCompleted { puzzle } => write!(f, "puzzle '{puzzle}' is already solved"),
            Self::HintCooldown {
                puzzle,
                remaining_secs,
            } => write!(
                f,
                "hint for '{puzzle}' is cooling down ({remaining_secs}s remaining)"
            ),
            Self::HintBudgetExhausted { cost, remaining } => {
                write!(f, "hint costs {cost} tokens but only {remaining} remain")
            }
            Self::DecisionMade { decision } => {
                write!(f, "decision '{decision}' has already been made")
            }
            Self::AlreadyVoted { decision, player } => {
                write!(f, "player '{player}' already voted on '{decision}'")
            }
            Self::SceneFailed { scene } => write!(f, "scene '{scene}' has failed"),
            Self::SceneNotInProgress { scene } => write!(f, "scene '{scene}' is not in progress"),
            Self::SessionEnded => write!(f, "session has ended"),
            Self::ContentMismatch { expected, found } => write!(
                f,
                "progress was recorded against content {found:#018x}, expected {expected:#018x}"
            ),
        }
    }
}

/// Errors returned by session operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown {kind} '{id}'")]
    NotFound { kind: EntityKind, id: String },
    #[error("rejected ({code}): {0}", code = .0.code())]
    Rejected(Rejection),
}

impl EngineError {
    pub(crate) fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Reason code of a rejection, or `None` for lookups that failed.
    #[must_use]
    pub const fn rejection_code(&self) -> Option<&'static str> {
        match self {
            Self::Rejected(rejection) => Some(rejection.code()),
            Self::NotFound { .. } => None,
        }
    }
}

impl From<Rejection> for EngineError {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_codes_are_stable() {
        let err = EngineError::from(Rejection::HintCooldown {
            puzzle: "p1".into(),
            remaining_secs: 30,
        });
        assert_eq!(err.rejection_code(), Some("hint_cooldown"));
        assert_eq!(
            err.to_string(),
            "rejected (hint_cooldown): hint for 'p1' is cooling down (30s remaining)"
        );
    }

    #[test]
    fn not_found_has_no_code() {
        let err = EngineError::not_found(EntityKind::Puzzle, "ghost");
        assert_eq!(err.rejection_code(), None);
        assert_eq!(err.to_string(), "unknown puzzle 'ghost'");
    }
}
