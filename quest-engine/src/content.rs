//! Authored adventure content as it appears on disk.
//!
//! These types mirror the JSON shape one-to-one. They are validated and
//! indexed by [`crate::Adventure`] before a session may use them.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::constants::{DEFAULT_HINT_TOKENS, DEFAULT_PUZZLE_POINTS, DEFAULT_TARGET_MINUTES};

/// Consequence tags carried by a decision option.
pub type TagList = SmallVec<[String; 4]>;

/// How free-text answers are compared against accepted answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Exact,
    Fuzzy,
}

/// Escalating hint specificity. Ordering follows specificity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintLevel {
    Subtle,
    Obvious,
    Direct,
}

impl HintLevel {
    pub const ALL: [Self; 3] = [Self::Subtle, Self::Obvious, Self::Direct];

    /// Ladder position for a given attempt count. Saturates at `Direct`.
    #[must_use]
    pub const fn for_attempt(attempt: u32) -> Option<Self> {
        match attempt {
            0 => None,
            1 => Some(Self::Subtle),
            2 => Some(Self::Obvious),
            _ => Some(Self::Direct),
        }
    }
}

impl fmt::Display for HintLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subtle => write!(f, "subtle"),
            Self::Obvious => write!(f, "obvious"),
            Self::Direct => write!(f, "direct"),
        }
    }
}

/// Adventure-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdventureMeta {
    pub id: String,
    pub title: String,
    #[serde(default = "AdventureMeta::default_target_minutes")]
    pub target_minutes: u32,
    #[serde(default = "AdventureMeta::default_hint_tokens")]
    pub hint_tokens: u32,
    #[serde(default)]
    pub max_team_size: Option<u32>,
}

impl AdventureMeta {
    const fn default_target_minutes() -> u32 {
        DEFAULT_TARGET_MINUTES
    }

    const fn default_hint_tokens() -> u32 {
        DEFAULT_HINT_TOKENS
    }
}

/// A free-text puzzle owned by a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puzzle {
    pub id: String,
    pub scene: String,
    #[serde(default)]
    pub title: String,
    pub answers: Vec<String>,
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub allow_partial_credit: bool,
    #[serde(default)]
    pub partial_credit_threshold: Option<f32>,
    #[serde(default = "default_points")]
    pub points: u32,
}

const fn default_points() -> u32 {
    DEFAULT_PUZZLE_POINTS
}

/// Prerequisites a scene needs before it opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UnlockCondition {
    #[serde(default)]
    pub required_scenes: Vec<String>,
    #[serde(default)]
    pub required_puzzles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub order: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub puzzles: Vec<String>,
    #[serde(default)]
    pub unlock: Option<UnlockCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    pub puzzle: String,
    pub level: HintLevel,
    pub text: String,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub cooldown_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOption {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub tags: TagList,
    #[serde(default)]
    pub unlocks: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub scene: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub consensus: bool,
    pub options: Vec<DecisionOption>,
}

impl Decision {
    #[must_use]
    pub fn option(&self, option_id: &str) -> Option<&DecisionOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

/// A single condition an ending needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    Decision { decision: String, option: String },
    PuzzlesCompleted { at_least: u32 },
    Consensus { decision: String },
    Tag { tag: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ending {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub narrative: String,
    #[serde(default)]
    pub reward: u32,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub default: bool,
}

/// Container for one authored adventure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdventureData {
    pub meta: AdventureMeta,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub puzzles: Vec<Puzzle>,
    #[serde(default)]
    pub hints: Vec<Hint>,
    #[serde(default)]
    pub decisions: Vec<Decision>,
    #[serde(default)]
    pub endings: Vec<Ending>,
}

impl AdventureData {
    /// Load adventure data from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into adventure data.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
