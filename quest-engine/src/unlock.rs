//! Scene unlock gate and status propagation.
use serde::{Deserialize, Serialize};

use crate::adventure::Adventure;
use crate::constants::{LOG_SCENE_AVAILABLE, LOG_SCENE_COMPLETED, LOG_SCENE_STARTED};
use crate::error::{EngineError, Rejection};
use crate::progress::{SceneStatus, SessionProgress};

/// A status change produced by [`refresh_scenes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneTransition {
    pub scene: String,
    pub from: SceneStatus,
    pub to: SceneStatus,
}

/// Whether a scene's unlock condition currently holds.
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] for an unknown scene id.
pub fn is_unlocked(
    adventure: &Adventure,
    scene_id: &str,
    progress: &SessionProgress,
) -> Result<bool, EngineError> {
    let scene = adventure.scene(scene_id)?;
    let Some(unlock) = &scene.unlock else {
        return Ok(true);
    };
    let scenes_done = unlock
        .required_scenes
        .iter()
        .all(|id| progress.scene_status(id) == SceneStatus::Completed);
    let puzzles_done = unlock
        .required_puzzles
        .iter()
        .all(|id| progress.is_puzzle_completed(id));
    Ok(scenes_done && puzzles_done)
}

/// Refuse interaction with a scene the team cannot currently play.
pub(crate) fn ensure_scene_open(
    progress: &SessionProgress,
    scene_id: &str,
) -> Result<(), Rejection> {
    match progress.scene_status(scene_id) {
        SceneStatus::Locked => Err(Rejection::SceneLocked {
            scene: scene_id.to_string(),
        }),
        SceneStatus::Failed => Err(Rejection::SceneFailed {
            scene: scene_id.to_string(),
        }),
        SceneStatus::Available | SceneStatus::InProgress | SceneStatus::Completed => Ok(()),
    }
}

/// First interaction with an available scene starts it.
pub(crate) fn mark_in_progress(progress: &mut SessionProgress, scene_id: &str) {
    if progress.scene_status(scene_id) == SceneStatus::Available {
        log::debug!("{LOG_SCENE_STARTED} scene={scene_id}");
        progress
            .scenes
            .insert(scene_id.to_string(), SceneStatus::InProgress);
    }
}

fn is_scene_done(adventure: &Adventure, scene_id: &str, progress: &SessionProgress) -> bool {
    let Ok(scene) = adventure.scene(scene_id) else {
        return false;
    };
    scene.puzzles.iter().all(|id| progress.is_puzzle_completed(id))
        && adventure
            .decisions_in_scene(scene_id)
            .all(|decision| progress.decision(&decision.id).is_some())
}

/// Re-evaluate every scene until nothing changes.
///
/// Locked scenes whose condition holds become available; open scenes whose
/// puzzles are solved and decisions made become completed. Completing a
/// scene can open the next one, so the pass repeats until a fixpoint.
pub fn refresh_scenes(
    adventure: &Adventure,
    progress: &mut SessionProgress,
) -> Vec<SceneTransition> {
    let mut transitions = Vec::new();
    loop {
        let mut changed = false;
        for scene in adventure.scenes() {
            let current = progress.scene_status(&scene.id);
            let next = match current {
                SceneStatus::Locked
                    if is_unlocked(adventure, &scene.id, progress).unwrap_or(false) =>
                {
                    SceneStatus::Available
                }
                status if status.is_open() && is_scene_done(adventure, &scene.id, progress) => {
                    SceneStatus::Completed
                }
                _ => continue,
            };
            debug_assert!(current.can_become(next));
            log::debug!(
                "{} scene={} {current} -> {next}",
                if next == SceneStatus::Completed {
                    LOG_SCENE_COMPLETED
                } else {
                    LOG_SCENE_AVAILABLE
                },
                scene.id
            );
            progress.scenes.insert(scene.id.clone(), next);
            transitions.push(SceneTransition {
                scene: scene.id.clone(),
                from: current,
                to: next,
            });
            changed = true;
        }
        if !changed {
            return transitions;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adventure::tests::mini;

    #[test]
    fn scene_without_condition_is_unlocked() {
        let adventure = mini();
        let progress = SessionProgress::new(&adventure, Vec::new(), 0);
        assert!(is_unlocked(&adventure, "lobby", &progress).unwrap());
        assert!(!is_unlocked(&adventure, "hall", &progress).unwrap());
        assert!(is_unlocked(&adventure, "attic", &progress).is_err());
    }

    #[test]
    fn unlock_is_monotonic_and_instant() {
        let adventure = mini();
        let mut progress = SessionProgress::new(&adventure, Vec::new(), 0);
        refresh_scenes(&adventure, &mut progress);
        assert_eq!(progress.scene_status("lobby"), SceneStatus::Available);

        progress.puzzle_mut("riddle").unwrap().completed = true;
        refresh_scenes(&adventure, &mut progress);
        assert!(!is_unlocked(&adventure, "hall", &progress).unwrap());
        assert_eq!(progress.scene_status("hall"), SceneStatus::Locked);

        progress.puzzle_mut("code").unwrap().completed = true;
        let transitions = refresh_scenes(&adventure, &mut progress);
        assert!(is_unlocked(&adventure, "hall", &progress).unwrap());
        assert_eq!(progress.scene_status("lobby"), SceneStatus::Completed);
        assert_eq!(progress.scene_status("hall"), SceneStatus::Available);
        assert_eq!(
            transitions,
            vec![
                SceneTransition {
                    scene: "lobby".into(),
                    from: SceneStatus::Available,
                    to: SceneStatus::Completed,
                },
                SceneTransition {
                    scene: "hall".into(),
                    from: SceneStatus::Locked,
                    to: SceneStatus::Available,
                },
            ]
        );
    }

    #[test]
    fn locked_and_failed_scenes_refuse_interaction() {
        let adventure = mini();
        let mut progress = SessionProgress::new(&adventure, Vec::new(), 0);
        refresh_scenes(&adventure, &mut progress);
        assert!(ensure_scene_open(&progress, "lobby").is_ok());
        assert_eq!(
            ensure_scene_open(&progress, "hall"),
            Err(Rejection::SceneLocked {
                scene: "hall".into()
            })
        );

        mark_in_progress(&mut progress, "lobby");
        assert_eq!(progress.scene_status("lobby"), SceneStatus::InProgress);
        progress.scenes.insert("lobby".into(), SceneStatus::Failed);
        assert_eq!(
            ensure_scene_open(&progress, "lobby").unwrap_err().code(),
            "scene_failed"
        );
    }

    #[test]
    fn refresh_is_idempotent() {
        let adventure = mini();
        let mut progress = SessionProgress::new(&adventure, Vec::new(), 0);
        refresh_scenes(&adventure, &mut progress);
        let snapshot = progress.clone();
        assert!(refresh_scenes(&adventure, &mut progress).is_empty());
        assert_eq!(progress, snapshot);
    }

    #[test]
    fn scene_waits_for_its_decisions() {
        let adventure = mini();
        let mut progress = SessionProgress::new(&adventure, Vec::new(), 0);
        for id in ["riddle", "code", "door"] {
            progress.puzzle_mut(id).unwrap().completed = true;
        }
        refresh_scenes(&adventure, &mut progress);
        assert_eq!(progress.scene_status("hall"), SceneStatus::Available);
    }
}
