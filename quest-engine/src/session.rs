use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::{ActionOutcome, PlayerAction};
use crate::adventure::Adventure;
use crate::constants::{LOG_SCENE_FAILED, LOG_SESSION_ENDED};
use crate::endings::{self, DecisionReceipt, ResolvedEnding};
use crate::error::{EngineError, EntityKind, Rejection};
use crate::hints::{self, HintGrant};
use crate::progress::{SceneStatus, SessionProgress};
use crate::score::{ScoreBreakdown, compute_score};
use crate::unlock::{self, SceneTransition};
use crate::validator::{self, AnswerVerdict};

/// Final result of a closed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub ending: ResolvedEnding,
    pub score: ScoreBreakdown,
    pub elapsed_secs: u64,
    pub completed_puzzles: u32,
    pub hints_used: u32,
}

/// High-level session wrapper binding shared adventure content to one team's progress.
#[derive(Debug, Clone)]
pub struct QuestSession {
    adventure: Arc<Adventure>,
    progress: SessionProgress,
    transitions: Vec<SceneTransition>,
}

impl QuestSession {
    /// Start a fresh playthrough; scenes without an unlock condition open immediately.
    #[must_use]
    pub fn new(adventure: Arc<Adventure>, team: Vec<String>, now: u64) -> Self {
        let mut progress = SessionProgress::new(&adventure, team, now);
        let transitions = unlock::refresh_scenes(&adventure, &mut progress);
        log::info!(
            "session started adventure={} team={} scenes_open={}",
            adventure.id(),
            progress.team.len(),
            transitions.len()
        );
        Self {
            adventure,
            progress,
            transitions,
        }
    }

    /// Resume from persisted progress.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the progress belongs to another
    /// adventure, or a `content_mismatch` rejection if the adventure content
    /// changed since the progress was recorded.
    pub fn from_progress(
        adventure: Arc<Adventure>,
        mut progress: SessionProgress,
    ) -> Result<Self, EngineError> {
        if progress.adventure_id != adventure.id() {
            return Err(EngineError::not_found(
                EntityKind::Adventure,
                progress.adventure_id,
            ));
        }
        if progress.fingerprint != adventure.fingerprint() {
            return Err(Rejection::ContentMismatch {
                expected: adventure.fingerprint(),
                found: progress.fingerprint,
            }
            .into());
        }
        let transitions = unlock::refresh_scenes(&adventure, &mut progress);
        Ok(Self {
            adventure,
            progress,
            transitions,
        })
    }

    #[must_use]
    pub fn adventure(&self) -> &Adventure {
        &self.adventure
    }

    #[must_use]
    pub const fn progress(&self) -> &SessionProgress {
        &self.progress
    }

    /// Consume the session, returning its progress for persistence.
    #[must_use]
    pub fn into_progress(self) -> SessionProgress {
        self.progress
    }

    /// Scene transitions not yet collected by the caller.
    pub fn take_transitions(&mut self) -> Vec<SceneTransition> {
        std::mem::take(&mut self.transitions)
    }

    fn settle(&mut self) -> Vec<SceneTransition> {
        let fresh = unlock::refresh_scenes(&self.adventure, &mut self.progress);
        self.transitions.extend(fresh.iter().cloned());
        fresh
    }

    /// Check an answer, record the attempt and re-evaluate scene statuses.
    ///
    /// # Errors
    ///
    /// See [`validator::submit_answer`].
    pub fn submit_answer(
        &mut self,
        puzzle_id: &str,
        raw: &str,
        now: u64,
    ) -> Result<AnswerVerdict, EngineError> {
        self.progress.ensure_active()?;
        self.progress.advance_clock(now);
        let verdict =
            validator::submit_answer(&self.adventure, &mut self.progress, puzzle_id, raw)?;
        self.settle();
        Ok(verdict)
    }

    /// Request the hint for a puzzle's current attempt count.
    ///
    /// # Errors
    ///
    /// See [`hints::request_hint`].
    pub fn request_hint(
        &mut self,
        puzzle_id: &str,
        now: u64,
    ) -> Result<Option<HintGrant>, EngineError> {
        self.progress.ensure_active()?;
        self.progress.advance_clock(now);
        hints::request_hint(&self.adventure, &mut self.progress, puzzle_id, now)
    }

    /// Submit one player's choice.
    ///
    /// # Errors
    ///
    /// See [`endings::submit_decision`].
    pub fn submit_decision(
        &mut self,
        decision_id: &str,
        option_id: &str,
        player_id: &str,
        now: u64,
    ) -> Result<DecisionReceipt, EngineError> {
        self.progress.ensure_active()?;
        self.progress.advance_clock(now);
        let receipt = endings::submit_decision(
            &self.adventure,
            &mut self.progress,
            decision_id,
            option_id,
            player_id,
            now,
        )?;
        self.settle();
        Ok(receipt)
    }

    /// Mark an in-progress scene as failed. Its puzzles and decisions stay closed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown scene, or a rejection
    /// when the session ended or the scene is not in progress.
    pub fn fail_scene(&mut self, scene_id: &str, now: u64) -> Result<SceneTransition, EngineError> {
        self.progress.ensure_active()?;
        self.adventure.scene(scene_id)?;
        let current = self.progress.scene_status(scene_id);
        if current != SceneStatus::InProgress {
            return Err(Rejection::SceneNotInProgress {
                scene: scene_id.to_string(),
            }
            .into());
        }
        self.progress.advance_clock(now);
        self.progress
            .scenes
            .insert(scene_id.to_string(), SceneStatus::Failed);
        log::info!("{LOG_SCENE_FAILED} scene={scene_id}");
        let transition = SceneTransition {
            scene: scene_id.to_string(),
            from: current,
            to: SceneStatus::Failed,
        };
        self.transitions.push(transition.clone());
        Ok(transition)
    }

    /// Current status of a scene.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown scene id.
    pub fn scene_status(&self, scene_id: &str) -> Result<SceneStatus, EngineError> {
        self.adventure.scene(scene_id)?;
        Ok(self.progress.scene_status(scene_id))
    }

    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown scene id.
    pub fn is_unlocked(&self, scene_id: &str) -> Result<bool, EngineError> {
        unlock::is_unlocked(&self.adventure, scene_id, &self.progress)
    }

    /// The ending the team would get if the session ended now.
    #[must_use]
    pub fn preview_ending(&self) -> ResolvedEnding {
        endings::resolve_ending(
            &self.adventure,
            &self.progress.decisions,
            self.progress.completed_puzzles(),
        )
    }

    /// Close the session, resolve the ending and compute the final score.
    ///
    /// Consensus decisions with only some votes in are settled by majority
    /// over the votes cast before the ending is resolved.
    ///
    /// # Errors
    ///
    /// Returns a `session_ended` rejection if the session was already closed.
    pub fn end_session(&mut self, now: u64) -> Result<SessionOutcome, EngineError> {
        self.progress.ensure_active()?;
        self.progress.advance_clock(now);
        if !endings::settle_pending_votes(&mut self.progress, now).is_empty() {
            self.settle();
        }
        self.progress.ended = true;

        let ending = self.preview_ending();
        let score = compute_score(&self.progress, self.adventure.meta().target_minutes, &ending);
        log::info!(
            "{LOG_SESSION_ENDED} adventure={} ending={} total={} elapsed={}s",
            self.adventure.id(),
            ending.id,
            score.total,
            self.progress.elapsed_secs
        );
        Ok(SessionOutcome {
            ending,
            score,
            elapsed_secs: self.progress.elapsed_secs,
            completed_puzzles: self.progress.completed_puzzles(),
            hints_used: self.progress.total_hints_used(),
        })
    }

    /// Route a validated action to the matching operation.
    ///
    /// # Errors
    ///
    /// Propagates the error of the underlying operation.
    pub fn apply(&mut self, action: PlayerAction, now: u64) -> Result<ActionOutcome, EngineError> {
        log::debug!("applying {} at t={now}", action.label());
        match action {
            PlayerAction::SubmitAnswer { puzzle, text } => {
                let verdict = self.submit_answer(&puzzle, &text, now)?;
                Ok(ActionOutcome::Answer {
                    verdict,
                    transitions: self.take_transitions(),
                })
            }
            PlayerAction::RequestHint { puzzle } => Ok(ActionOutcome::Hint {
                grant: self.request_hint(&puzzle, now)?,
            }),
            PlayerAction::SubmitDecision {
                decision,
                option,
                player,
            } => {
                let receipt = self.submit_decision(&decision, &option, &player, now)?;
                Ok(ActionOutcome::Decision {
                    receipt,
                    transitions: self.take_transitions(),
                })
            }
            PlayerAction::EndSession => Ok(ActionOutcome::Ended {
                outcome: self.end_session(now)?,
            }),
        }
    }
}
