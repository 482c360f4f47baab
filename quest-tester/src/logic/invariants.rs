//! Engine invariants checked after every applied action and at session end.
use quest_engine::constants::BASE_POINTS_PER_PUZZLE;
use quest_engine::{
    Adventure, HintLevel, SceneStatus, SessionOutcome, SessionProgress, resolve_ending,
};

/// Whether `to` can follow `from` through zero or more legal moves.
fn reachable(from: SceneStatus, to: SceneStatus) -> bool {
    const ORDER: [SceneStatus; 5] = [
        SceneStatus::Locked,
        SceneStatus::Available,
        SceneStatus::InProgress,
        SceneStatus::Completed,
        SceneStatus::Failed,
    ];
    let mut frontier = vec![from];
    let mut seen = vec![from];
    while let Some(current) = frontier.pop() {
        if current == to {
            return true;
        }
        for next in ORDER {
            if current.can_become(next) && !seen.contains(&next) {
                seen.push(next);
                frontier.push(next);
            }
        }
    }
    false
}

/// Compare two consecutive snapshots of one session.
#[must_use]
pub fn check_step(
    adventure: &Adventure,
    before: &SessionProgress,
    after: &SessionProgress,
) -> Vec<String> {
    let mut violations = Vec::new();

    for scene in adventure.scenes() {
        let from = before.scene_status(&scene.id);
        let to = after.scene_status(&scene.id);
        if !reachable(from, to) {
            violations.push(format!("scene {} moved backwards: {from} -> {to}", scene.id));
        }
    }

    for puzzle in adventure.puzzles() {
        let was = before.is_puzzle_completed(&puzzle.id);
        let is = after.is_puzzle_completed(&puzzle.id);
        if was && !is {
            violations.push(format!("puzzle {} lost its completion", puzzle.id));
        }
        if is && after.scene_status(&puzzle.scene) == SceneStatus::Locked {
            violations.push(format!(
                "puzzle {} completed inside locked scene {}",
                puzzle.id, puzzle.scene
            ));
        }
        if let Some(state) = after.puzzle(&puzzle.id) {
            let ceiling = HintLevel::for_attempt(state.attempts);
            if let Some(level) = state.revealed.iter().max()
                && ceiling.is_none_or(|ceiling| *level > ceiling)
            {
                violations.push(format!(
                    "puzzle {} revealed {level} after {} attempts",
                    puzzle.id, state.attempts
                ));
            }
        }
    }

    if after.score < before.score {
        violations.push(format!("score fell from {} to {}", before.score, after.score));
    }
    if after.hint_tokens > before.hint_tokens {
        violations.push(format!(
            "hint tokens grew from {} to {}",
            before.hint_tokens, after.hint_tokens
        ));
    }
    if after.elapsed_secs < before.elapsed_secs {
        violations.push("elapsed time went backwards".to_string());
    }
    violations
}

/// Cross-check the final outcome against the progress that produced it.
#[must_use]
pub fn check_outcome(
    adventure: &Adventure,
    progress: &SessionProgress,
    outcome: &SessionOutcome,
) -> Vec<String> {
    let mut violations = Vec::new();
    let score = &outcome.score;

    if score.base.saturating_add(score.bonus) != score.total {
        violations.push(format!(
            "score parts do not sum: {} + {} != {}",
            score.base, score.bonus, score.total
        ));
    }
    let bonus = score
        .hint_bonus
        .saturating_add(score.time_bonus)
        .saturating_add(score.ending_bonus);
    if bonus != score.bonus {
        violations.push(format!("bonus {} != parts {bonus}", score.bonus));
    }
    if score.base != progress.completed_puzzles() * BASE_POINTS_PER_PUZZLE {
        violations.push(format!(
            "base {} does not match {} completed puzzles",
            score.base,
            progress.completed_puzzles()
        ));
    }
    if score.ending_bonus != outcome.ending.reward {
        violations.push("ending bonus differs from ending reward".to_string());
    }

    let again = resolve_ending(adventure, &progress.decisions, progress.completed_puzzles());
    if again != outcome.ending {
        violations.push(format!(
            "ending resolution is not deterministic: {} vs {}",
            outcome.ending.id, again.id
        ));
    }
    if outcome.ending.disclosure.is_some() == outcome.ending.majority_decisions.is_empty() {
        violations.push("majority disclosure does not match majority decisions".to_string());
    }
    if adventure.ending(&outcome.ending.id).is_err() {
        violations.push(format!("unknown ending {}", outcome.ending.id));
    }
    let fallback = &adventure.default_ending().id;
    if outcome.ending.candidates.contains(fallback) {
        violations.push(format!("default ending {fallback} listed as a candidate"));
    }
    if outcome.ending.defaulted != outcome.ending.candidates.is_empty() {
        violations.push("defaulted flag disagrees with the candidate list".to_string());
    }
    if !progress.pending_votes.is_empty() {
        violations.push(format!(
            "votes left unsettled at session end: {:?}",
            progress.pending_votes.keys().collect::<Vec<_>>()
        ));
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_engine::QuestSession;
    use std::sync::Arc;

    #[test]
    fn reachability_follows_scene_lifecycle() {
        assert!(reachable(SceneStatus::Locked, SceneStatus::Completed));
        assert!(reachable(SceneStatus::Available, SceneStatus::Failed));
        assert!(reachable(SceneStatus::Failed, SceneStatus::Failed));
        assert!(!reachable(SceneStatus::Completed, SceneStatus::Available));
        assert!(!reachable(SceneStatus::Failed, SceneStatus::InProgress));
    }

    #[test]
    fn real_sessions_hold_every_invariant() {
        let adventure = Arc::new(Adventure::midnight_express().unwrap());
        let mut session = QuestSession::new(Arc::clone(&adventure), Vec::new(), 0);
        let before = session.progress().clone();
        session.submit_answer("ticket-cipher", "midnight", 10).unwrap();
        session.submit_answer("station-clock", "noon", 20).unwrap();
        session.request_hint("station-clock", 30).unwrap();
        assert!(check_step(&adventure, &before, session.progress()).is_empty());

        let outcome = session.end_session(40).unwrap();
        assert!(check_outcome(&adventure, session.progress(), &outcome).is_empty());
    }

    #[test]
    fn forged_outcome_is_reported() {
        let adventure = Arc::new(Adventure::midnight_express().unwrap());
        let mut session = QuestSession::new(Arc::clone(&adventure), Vec::new(), 0);
        let mut outcome = session.end_session(40).unwrap();
        assert!(outcome.ending.defaulted);
        outcome.ending.candidates.push(outcome.ending.id.clone());
        let violations = check_outcome(&adventure, session.progress(), &outcome);
        assert!(
            violations.iter().any(|v| v.contains("listed as a candidate")),
            "{violations:?}"
        );
        assert!(
            violations.iter().any(|v| v.contains("defaulted flag")),
            "{violations:?}"
        );
    }

    #[test]
    fn tampered_progress_is_reported() {
        let adventure = Adventure::midnight_express().unwrap();
        let before = SessionProgress::new(&adventure, Vec::new(), 0);
        let mut after = before.clone();
        after
            .puzzles
            .get_mut("brake-code")
            .unwrap()
            .completed = true;
        after.hint_tokens += 1;
        let violations = check_step(&adventure, &before, &after);
        assert_eq!(violations.len(), 2, "{violations:?}");
    }
}
