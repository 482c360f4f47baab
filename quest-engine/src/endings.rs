//! Decision collection and ending resolution.
//!
//! Endings are evaluated in a fixed priority order: the ending with the most
//! requirements first, ties broken by authored order. The first ending whose
//! requirements all hold wins; if none holds the default ending is returned.
//! Consensus decisions that fell back to a majority vote are reported on the
//! resolved ending so the caller can disclose it.
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::adventure::Adventure;
use crate::constants::{LOG_DECISION_MAJORITY, LOG_DECISION_RESOLVED, MSG_MAJORITY_DISCLOSURE};
use crate::content::{Ending, Requirement};
use crate::error::{EngineError, EntityKind, Rejection};
use crate::progress::{DecisionRecord, Resolution, SessionProgress, Vote};
use crate::unlock::{ensure_scene_open, mark_in_progress};

/// Result of submitting one choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DecisionReceipt {
    Resolved(DecisionRecord),
    Pending {
        decision: String,
        votes_cast: u32,
        votes_needed: u32,
    },
}

/// The ending a session qualified for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEnding {
    pub id: String,
    pub title: String,
    pub narrative: String,
    pub reward: u32,
    /// No ending qualified and the default was used.
    pub defaulted: bool,
    /// Every qualifying ending, in priority order.
    pub candidates: Vec<String>,
    /// Consensus decisions settled by majority vote.
    pub majority_decisions: Vec<String>,
    pub disclosure: Option<String>,
}

impl ResolvedEnding {
    fn from_ending(ending: &Ending, defaulted: bool) -> Self {
        Self {
            id: ending.id.clone(),
            title: ending.title.clone(),
            narrative: ending.narrative.clone(),
            reward: ending.reward,
            defaulted,
            candidates: Vec::new(),
            majority_decisions: Vec::new(),
            disclosure: None,
        }
    }
}

struct Choices<'a> {
    chosen: HashMap<&'a str, &'a DecisionRecord>,
    tags: HashSet<&'a str>,
    blocked: HashSet<&'a str>,
}

impl<'a> Choices<'a> {
    fn collect(adventure: &'a Adventure, decisions: &'a [DecisionRecord]) -> Self {
        let mut chosen = HashMap::new();
        let mut tags = HashSet::new();
        let mut blocked = HashSet::new();
        for record in decisions {
            chosen.insert(record.decision.as_str(), record);
            let option = adventure
                .decision(&record.decision)
                .ok()
                .and_then(|d| d.option(&record.option));
            if let Some(option) = option {
                tags.extend(option.tags.iter().map(String::as_str));
                blocked.extend(option.blocks.iter().map(String::as_str));
            }
        }
        Self {
            chosen,
            tags,
            blocked,
        }
    }

    fn chose(&self, decision: &str, option: &str) -> bool {
        self.chosen
            .get(decision)
            .is_some_and(|record| record.option == option)
    }

    fn holds(&self, requirement: &Requirement, completed: u32) -> bool {
        match requirement {
            Requirement::Decision { decision, option } => self.chose(decision, option),
            Requirement::PuzzlesCompleted { at_least } => completed >= *at_least,
            Requirement::Consensus { decision } => self.chosen.get(decision.as_str()).is_some_and(
                |record| matches!(record.resolution, Resolution::Unanimous { .. }),
            ),
            Requirement::Tag { tag } => self.tags.contains(tag.as_str()),
        }
    }

    fn qualifies(&self, adventure: &Adventure, ending: &Ending, completed: u32) -> bool {
        if self.blocked.contains(ending.id.as_str()) {
            return false;
        }
        let gates = adventure.gates_for(&ending.id);
        if !gates.is_empty() && !gates.iter().any(|(d, o)| self.chose(d, o)) {
            return false;
        }
        ending
            .requirements
            .iter()
            .all(|requirement| self.holds(requirement, completed))
    }
}

/// Pick the ending for a set of decisions and a puzzle completion count.
///
/// The default ending is never a candidate; it is used only when no other
/// ending qualifies. Deterministic: the same inputs always produce the same ending.
#[must_use]
pub fn resolve_ending(
    adventure: &Adventure,
    decisions: &[DecisionRecord],
    completed_puzzles: u32,
) -> ResolvedEnding {
    let choices = Choices::collect(adventure, decisions);
    let candidates: Vec<&Ending> = adventure
        .endings_by_priority()
        .filter(|ending| !ending.default)
        .filter(|ending| choices.qualifies(adventure, ending, completed_puzzles))
        .collect();

    if candidates.len() > 1 {
        log::debug!(
            "ending resolution ambiguous: {} candidates, picking '{}'",
            candidates.len(),
            candidates[0].id
        );
    }

    let mut resolved = match candidates.first() {
        Some(ending) => ResolvedEnding::from_ending(ending, false),
        None => ResolvedEnding::from_ending(adventure.default_ending(), true),
    };
    resolved.candidates = candidates.iter().map(|e| e.id.clone()).collect();
    resolved.majority_decisions = decisions
        .iter()
        .filter(|record| record.resolution.is_majority_fallback())
        .map(|record| record.decision.clone())
        .collect();
    if !resolved.majority_decisions.is_empty() {
        resolved.disclosure = Some(MSG_MAJORITY_DISCLOSURE.to_string());
    }
    resolved
}

/// Majority winner; ties go to the option that was submitted first.
fn tally(votes: &[Vote]) -> (String, Resolution) {
    let mut counts: Vec<(&str, u32)> = Vec::new();
    for vote in votes {
        match counts.iter_mut().find(|(option, _)| *option == vote.option) {
            Some((_, count)) => *count += 1,
            None => counts.push((vote.option.as_str(), 1)),
        }
    }
    let total = u32::try_from(votes.len()).unwrap_or(u32::MAX);
    let mut winner = ("", 0);
    for &(option, count) in &counts {
        if count > winner.1 {
            winner = (option, count);
        }
    }
    let resolution = if counts.len() == 1 {
        Resolution::Unanimous { votes: total }
    } else {
        Resolution::Majority {
            votes_for: winner.1,
            total,
        }
    };
    (winner.0.to_string(), resolution)
}

fn record(
    progress: &mut SessionProgress,
    decision: &str,
    option: String,
    resolution: Resolution,
    now: u64,
) -> DecisionRecord {
    if resolution.is_majority_fallback() {
        log::info!("{LOG_DECISION_MAJORITY} decision={decision} option={option} {resolution:?}");
    } else {
        log::info!("{LOG_DECISION_RESOLVED} decision={decision} option={option}");
    }
    let entry = DecisionRecord {
        decision: decision.to_string(),
        option,
        resolution,
        decided_at: now,
    };
    progress.decisions.push(entry.clone());
    entry
}

/// Settle consensus decisions still waiting for votes when the session closes.
///
/// Each is decided by majority over the votes actually cast and recorded as a
/// majority fallback out of the full team, so the ending discloses it.
pub(crate) fn settle_pending_votes(
    progress: &mut SessionProgress,
    now: u64,
) -> Vec<DecisionRecord> {
    let team_size = u32::try_from(progress.team.len()).unwrap_or(u32::MAX);
    let pending = std::mem::take(&mut progress.pending_votes);
    let mut settled = Vec::new();
    for (decision, votes) in pending {
        if votes.is_empty() || progress.decision(&decision).is_some() {
            continue;
        }
        let (option, _) = tally(&votes);
        let votes_for = votes.iter().filter(|vote| vote.option == option).count();
        let votes_for = u32::try_from(votes_for).unwrap_or(u32::MAX);
        let resolution = Resolution::Majority {
            votes_for,
            total: team_size,
        };
        settled.push(record(progress, &decision, option, resolution, now));
    }
    settled
}

/// Submit one player's choice for a decision.
///
/// Ordinary decisions resolve on the first submission. Consensus decisions
/// wait for one vote per team member; a team of one resolves immediately.
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] for an unknown decision, option or
/// player, or a rejection when the session ended, the scene is closed, the
/// decision was already made, or the player already voted.
pub fn submit_decision(
    adventure: &Adventure,
    progress: &mut SessionProgress,
    decision_id: &str,
    option_id: &str,
    player_id: &str,
    now: u64,
) -> Result<DecisionReceipt, EngineError> {
    progress.ensure_active()?;
    let decision = adventure.decision(decision_id)?;
    if decision.option(option_id).is_none() {
        return Err(EngineError::not_found(
            EntityKind::Option,
            format!("{decision_id}/{option_id}"),
        ));
    }
    if progress.decision(decision_id).is_some() {
        return Err(Rejection::DecisionMade {
            decision: decision_id.to_string(),
        }
        .into());
    }
    ensure_scene_open(progress, &decision.scene)?;
    if !progress.team.is_empty() && !progress.team.iter().any(|p| p == player_id) {
        return Err(EngineError::not_found(EntityKind::Player, player_id));
    }

    let team_size = u32::try_from(progress.team.len()).unwrap_or(u32::MAX);
    if !decision.consensus || team_size <= 1 {
        let resolution = if decision.consensus {
            Resolution::Unanimous { votes: 1 }
        } else {
            Resolution::Single
        };
        mark_in_progress(progress, &decision.scene);
        let entry = record(progress, decision_id, option_id.to_string(), resolution, now);
        return Ok(DecisionReceipt::Resolved(entry));
    }

    let votes = progress
        .pending_votes
        .entry(decision_id.to_string())
        .or_default();
    if votes.iter().any(|vote| vote.player == player_id) {
        return Err(Rejection::AlreadyVoted {
            decision: decision_id.to_string(),
            player: player_id.to_string(),
        }
        .into());
    }
    votes.push(Vote {
        player: player_id.to_string(),
        option: option_id.to_string(),
    });
    let votes_cast = u32::try_from(votes.len()).unwrap_or(u32::MAX);
    mark_in_progress(progress, &decision.scene);

    if votes_cast < team_size {
        return Ok(DecisionReceipt::Pending {
            decision: decision_id.to_string(),
            votes_cast,
            votes_needed: team_size,
        });
    }

    let votes = progress
        .pending_votes
        .remove(decision_id)
        .unwrap_or_default();
    let (option, resolution) = tally(&votes);
    let entry = record(progress, decision_id, option, resolution, now);
    Ok(DecisionReceipt::Resolved(entry))
}
