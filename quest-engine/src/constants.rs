//! Centralized scoring and tuning constants for quest progression.
//!
//! Score thresholds are part of the adventure format. Authors tune content
//! through puzzle points and ending rewards, not through these values.

// Message keys ---------------------------------------------------------------
pub(crate) const MSG_ANSWER_CORRECT: &str = "answer.correct";
pub(crate) const MSG_ANSWER_CLOSE: &str = "answer.close";
pub(crate) const MSG_ANSWER_INCORRECT: &str = "answer.incorrect";
pub(crate) const MSG_ANSWER_EMPTY: &str = "answer.empty";
pub(crate) const MSG_MAJORITY_DISCLOSURE: &str = "ending.majority_disclosure";

// Log keys -------------------------------------------------------------------
pub(crate) const LOG_SCENE_AVAILABLE: &str = "log.scene.available";
pub(crate) const LOG_SCENE_STARTED: &str = "log.scene.started";
pub(crate) const LOG_SCENE_COMPLETED: &str = "log.scene.completed";
pub(crate) const LOG_SCENE_FAILED: &str = "log.scene.failed";
pub(crate) const LOG_PUZZLE_SOLVED: &str = "log.puzzle.solved";
pub(crate) const LOG_HINT_GRANTED: &str = "log.hint.granted";
pub(crate) const LOG_DECISION_RESOLVED: &str = "log.decision.resolved";
pub(crate) const LOG_DECISION_MAJORITY: &str = "log.decision.majority";
pub(crate) const LOG_SESSION_ENDED: &str = "log.session.ended";

// Puzzle defaults ------------------------------------------------------------
pub(crate) const DEFAULT_PUZZLE_POINTS: u32 = 100;

// Score tuning ---------------------------------------------------------------
pub const BASE_POINTS_PER_PUZZLE: u32 = 100;
pub const NO_HINT_BONUS: u32 = 500;
pub const FEW_HINTS_BONUS: u32 = 200;
pub const FEW_HINTS_MAX: u32 = 3;
pub const ON_TARGET_TIME_BONUS: u32 = 300;
pub const NEAR_TARGET_TIME_BONUS: u32 = 100;
/// Near-target window expressed as a ratio `NUM / DEN` of the target (1.2x).
pub const NEAR_TARGET_NUM: u64 = 6;
pub const NEAR_TARGET_DEN: u64 = 5;

// Session defaults -----------------------------------------------------------
pub(crate) const DEFAULT_TARGET_MINUTES: u32 = 60;
pub(crate) const DEFAULT_HINT_TOKENS: u32 = 10;
pub(crate) const SECONDS_PER_MINUTE: u64 = 60;

// Bundled content ------------------------------------------------------------
pub const MIDNIGHT_EXPRESS_DATA: &str = include_str!("../data/midnight_express.json");
