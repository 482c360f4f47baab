//! Quest Progression Engine
//!
//! Platform-agnostic rules engine for scripted escape-room adventures: answer
//! validation, scene unlocking, the hint ladder, team decisions, ending
//! resolution and scoring. No UI or platform-specific dependencies; content
//! arrives as JSON and progress leaves as serializable snapshots.

pub mod action;
pub mod adventure;
pub mod clock;
pub mod constants;
pub mod content;
pub mod endings;
pub mod error;
pub mod hints;
pub mod progress;
pub mod registry;
pub mod score;
pub mod session;
pub mod unlock;
pub mod validator;

use std::sync::Arc;

// Re-export commonly used types
pub use action::{ActionError, ActionOutcome, PlayerAction};
pub use adventure::Adventure;
pub use clock::{Clock, ManualClock, SystemClock};
pub use content::{
    AdventureData, AdventureMeta, Decision, DecisionOption, Ending, Hint, HintLevel, MatchMode,
    Puzzle, Requirement, Scene, UnlockCondition,
};
pub use endings::{DecisionReceipt, ResolvedEnding, resolve_ending};
pub use error::{ContentError, EngineError, EntityKind, Rejection};
pub use hints::{HintGrant, get_hint};
pub use progress::{
    DecisionRecord, PuzzleProgress, Resolution, SceneStatus, SessionProgress, Vote,
};
pub use registry::SessionRegistry;
pub use score::{ScoreBreakdown, compute_score};
pub use session::{QuestSession, SessionOutcome};
pub use unlock::{SceneTransition, is_unlocked};
pub use validator::{AnswerVerdict, MatchKind, validate};

/// Source of adventure content.
/// Platform-specific implementations should provide this
pub trait AdventureLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the raw content of one adventure.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be found or parsed.
    fn load_adventure(&self, adventure_id: &str) -> Result<AdventureData, Self::Error>;
}

/// Trait for abstracting save/load of session progress
pub trait ProgressStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error if the progress cannot be saved.
    fn save_progress(&self, slot: &str, progress: &SessionProgress) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the progress cannot be loaded.
    fn load_progress(&self, slot: &str) -> Result<Option<SessionProgress>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the slot cannot be deleted.
    fn delete_progress(&self, slot: &str) -> Result<(), Self::Error>;
}

/// Creates sessions from loaded content and persists their progress.
pub struct QuestEngine<L, S>
where
    L: AdventureLoader,
    S: ProgressStorage,
{
    loader: L,
    storage: S,
}

impl<L, S> QuestEngine<L, S>
where
    L: AdventureLoader,
    S: ProgressStorage,
{
    pub const fn new(loader: L, storage: S) -> Self {
        Self { loader, storage }
    }

    /// Load and validate an adventure.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the content does not validate.
    pub fn load_adventure(&self, adventure_id: &str) -> anyhow::Result<Adventure>
    where
        L::Error: Into<anyhow::Error>,
    {
        let data = self.loader.load_adventure(adventure_id).map_err(Into::into)?;
        let adventure = Adventure::from_data(data)?;
        log::debug!(
            "loaded adventure {} fingerprint={:#018x}",
            adventure.id(),
            adventure.fingerprint()
        );
        Ok(adventure)
    }

    /// Start a new session on freshly loaded content.
    ///
    /// # Errors
    ///
    /// Returns an error if the adventure cannot be loaded.
    pub fn create_session(
        &self,
        adventure_id: &str,
        team: Vec<String>,
        now: u64,
    ) -> anyhow::Result<QuestSession>
    where
        L::Error: Into<anyhow::Error>,
    {
        let adventure = self.load_adventure(adventure_id)?;
        Ok(QuestSession::new(Arc::new(adventure), team, now))
    }

    /// Save a session's progress
    ///
    /// # Errors
    ///
    /// Returns an error if the progress cannot be saved.
    pub fn save_session(&self, slot: &str, session: &QuestSession) -> Result<(), S::Error> {
        self.storage.save_progress(slot, session.progress())
    }

    /// Restore a saved session against the current content.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the content changed since the save.
    pub fn load_session(&self, slot: &str) -> anyhow::Result<Option<QuestSession>>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let Some(progress) = self.storage.load_progress(slot).map_err(Into::into)? else {
            return Ok(None);
        };
        let adventure = self.load_adventure(&progress.adventure_id)?;
        let session = QuestSession::from_progress(Arc::new(adventure), progress)?;
        Ok(Some(session))
    }

    /// # Errors
    ///
    /// Returns an error if the slot cannot be deleted.
    pub fn delete_session(&self, slot: &str) -> Result<(), S::Error> {
        self.storage.delete_progress(slot)
    }
}
