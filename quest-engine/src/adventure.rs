//! Validated, indexed adventure configuration.
//!
//! An [`Adventure`] is built once from [`AdventureData`] and then shared
//! read-only (typically behind an `Arc`) by every session playing it.
use std::collections::{HashMap, HashSet};
use std::hash::Hasher;

use twox_hash::XxHash64;

use crate::constants::MIDNIGHT_EXPRESS_DATA;
use crate::content::{
    AdventureData, AdventureMeta, Decision, Ending, Hint, HintLevel, Puzzle, Requirement, Scene,
};
use crate::error::{ContentError, EngineError, EntityKind};

/// A choice that gates an ending: `(decision, option)`.
pub type Gate = (String, String);

#[derive(Debug, Clone)]
pub struct Adventure {
    data: AdventureData,
    fingerprint: u64,
    scene_index: HashMap<String, usize>,
    puzzle_index: HashMap<String, usize>,
    decision_index: HashMap<String, usize>,
    ending_index: HashMap<String, usize>,
    hint_index: HashMap<String, [Option<usize>; 3]>,
    scene_decisions: HashMap<String, Vec<usize>>,
    ending_priority: Vec<usize>,
    ending_gates: HashMap<String, Vec<Gate>>,
    default_ending: usize,
}

impl Adventure {
    /// Validate and index authored content.
    ///
    /// # Errors
    ///
    /// Returns an error if identifiers collide, references dangle, or the
    /// content violates a structural rule (see [`ContentError`]).
    pub fn from_data(mut data: AdventureData) -> Result<Self, ContentError> {
        data.scenes.sort_by_key(|scene| scene.order);
        let fingerprint = fingerprint_of(&data)?;

        let scene_index = index_ids(&data.scenes, EntityKind::Scene, |s| &s.id)?;
        let puzzle_index = index_ids(&data.puzzles, EntityKind::Puzzle, |p| &p.id)?;
        let decision_index = index_ids(&data.decisions, EntityKind::Decision, |d| &d.id)?;
        let ending_index = index_ids(&data.endings, EntityKind::Ending, |e| &e.id)?;

        validate_puzzles(&data, &scene_index)?;
        validate_scenes(&data, &scene_index, &puzzle_index)?;
        let hint_index = index_hints(&data, &puzzle_index)?;
        let scene_decisions = index_decisions(&data, &scene_index, &ending_index)?;
        validate_requirements(&data, &decision_index)?;
        let default_ending = find_default_ending(&data.endings)?;

        let mut ending_priority: Vec<usize> = (0..data.endings.len()).collect();
        ending_priority.sort_by(|a, b| {
            data.endings[*b]
                .requirements
                .len()
                .cmp(&data.endings[*a].requirements.len())
                .then(a.cmp(b))
        });

        let mut ending_gates: HashMap<String, Vec<Gate>> = HashMap::new();
        for decision in &data.decisions {
            for option in &decision.options {
                for ending in &option.unlocks {
                    ending_gates
                        .entry(ending.clone())
                        .or_default()
                        .push((decision.id.clone(), option.id.clone()));
                }
            }
        }

        Ok(Self {
            data,
            fingerprint,
            scene_index,
            puzzle_index,
            decision_index,
            ending_index,
            hint_index,
            scene_decisions,
            ending_priority,
            ending_gates,
            default_ending,
        })
    }

    /// Parse, validate and index adventure JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        Self::from_data(AdventureData::from_json(json)?)
    }

    /// The bundled "Midnight Express" demo adventure.
    ///
    /// # Errors
    ///
    /// Returns an error only if the bundled data fails validation.
    pub fn midnight_express() -> Result<Self, ContentError> {
        Self::from_json(MIDNIGHT_EXPRESS_DATA)
    }

    #[must_use]
    pub const fn meta(&self) -> &AdventureMeta {
        &self.data.meta
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.data.meta.id
    }

    /// Stable digest of the authored content.
    #[must_use]
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    #[must_use]
    pub const fn data(&self) -> &AdventureData {
        &self.data
    }

    /// Scenes in authored order.
    #[must_use]
    pub fn scenes(&self) -> &[Scene] {
        &self.data.scenes
    }

    #[must_use]
    pub fn puzzles(&self) -> &[Puzzle] {
        &self.data.puzzles
    }

    #[must_use]
    pub fn decisions(&self) -> &[Decision] {
        &self.data.decisions
    }

    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown scene id.
    pub fn scene(&self, id: &str) -> Result<&Scene, EngineError> {
        self.scene_index
            .get(id)
            .map(|&i| &self.data.scenes[i])
            .ok_or_else(|| EngineError::not_found(EntityKind::Scene, id))
    }

    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown puzzle id.
    pub fn puzzle(&self, id: &str) -> Result<&Puzzle, EngineError> {
        self.puzzle_index
            .get(id)
            .map(|&i| &self.data.puzzles[i])
            .ok_or_else(|| EngineError::not_found(EntityKind::Puzzle, id))
    }

    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown decision id.
    pub fn decision(&self, id: &str) -> Result<&Decision, EngineError> {
        self.decision_index
            .get(id)
            .map(|&i| &self.data.decisions[i])
            .ok_or_else(|| EngineError::not_found(EntityKind::Decision, id))
    }

    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown ending id.
    pub fn ending(&self, id: &str) -> Result<&Ending, EngineError> {
        self.ending_index
            .get(id)
            .map(|&i| &self.data.endings[i])
            .ok_or_else(|| EngineError::not_found(EntityKind::Ending, id))
    }

    /// Hint authored for a puzzle at a given level, if any.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown puzzle id.
    pub fn hint(&self, puzzle_id: &str, level: HintLevel) -> Result<Option<&Hint>, EngineError> {
        self.puzzle(puzzle_id)?;
        Ok(self
            .hint_index
            .get(puzzle_id)
            .and_then(|slots| slots[level as usize])
            .map(|i| &self.data.hints[i]))
    }

    /// Decisions that belong to a scene.
    pub fn decisions_in_scene<'a>(
        &'a self,
        scene_id: &str,
    ) -> impl Iterator<Item = &'a Decision> + use<'a> {
        self.scene_decisions
            .get(scene_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.data.decisions[i])
    }

    /// Endings in resolution order: most requirements first, then authored order.
    pub fn endings_by_priority(&self) -> impl Iterator<Item = &Ending> {
        self.ending_priority.iter().map(|&i| &self.data.endings[i])
    }

    #[must_use]
    pub fn default_ending(&self) -> &Ending {
        &self.data.endings[self.default_ending]
    }

    /// Options that must have been chosen for an ending to be reachable.
    #[must_use]
    pub fn gates_for(&self, ending_id: &str) -> &[Gate] {
        self.ending_gates
            .get(ending_id)
            .map_or(&[], Vec::as_slice)
    }
}

fn fingerprint_of(data: &AdventureData) -> Result<u64, ContentError> {
    let canonical = serde_json::to_vec(data)?;
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&canonical);
    Ok(hasher.finish())
}

fn index_ids<T>(
    items: &[T],
    kind: EntityKind,
    id_of: impl Fn(&T) -> &String,
) -> Result<HashMap<String, usize>, ContentError> {
    let mut index = HashMap::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let id = id_of(item);
        if index.insert(id.clone(), i).is_some() {
            return Err(ContentError::DuplicateId {
                kind,
                id: id.clone(),
            });
        }
    }
    Ok(index)
}

fn ensure_known(
    index: &HashMap<String, usize>,
    owner: &str,
    kind: EntityKind,
    id: &str,
) -> Result<(), ContentError> {
    if index.contains_key(id) {
        Ok(())
    } else {
        Err(ContentError::UnknownReference {
            owner: owner.to_string(),
            kind,
            id: id.to_string(),
        })
    }
}

fn validate_puzzles(
    data: &AdventureData,
    scenes: &HashMap<String, usize>,
) -> Result<(), ContentError> {
    for puzzle in &data.puzzles {
        ensure_known(scenes, &puzzle.id, EntityKind::Scene, &puzzle.scene)?;
        if puzzle.answers.iter().all(|a| a.trim().is_empty()) {
            return Err(ContentError::NoAcceptedAnswers {
                puzzle: puzzle.id.clone(),
            });
        }
        if let Some(value) = puzzle.partial_credit_threshold
            && !(0.0..1.0).contains(&value)
        {
            return Err(ContentError::ThresholdOutOfRange {
                puzzle: puzzle.id.clone(),
                value,
            });
        }
    }
    Ok(())
}

fn validate_scenes(
    data: &AdventureData,
    scenes: &HashMap<String, usize>,
    puzzles: &HashMap<String, usize>,
) -> Result<(), ContentError> {
    for scene in &data.scenes {
        for puzzle_id in &scene.puzzles {
            ensure_known(puzzles, &scene.id, EntityKind::Puzzle, puzzle_id)?;
            let owner = &data.puzzles[puzzles[puzzle_id]].scene;
            if owner != &scene.id {
                return Err(ContentError::SceneMismatch {
                    puzzle: puzzle_id.clone(),
                    owner: owner.clone(),
                    listed_by: scene.id.clone(),
                });
            }
        }
        if let Some(unlock) = &scene.unlock {
            for required in &unlock.required_scenes {
                ensure_known(scenes, &scene.id, EntityKind::Scene, required)?;
            }
            for required in &unlock.required_puzzles {
                ensure_known(puzzles, &scene.id, EntityKind::Puzzle, required)?;
            }
        }
    }
    Ok(())
}

fn index_hints(
    data: &AdventureData,
    puzzles: &HashMap<String, usize>,
) -> Result<HashMap<String, [Option<usize>; 3]>, ContentError> {
    let mut index: HashMap<String, [Option<usize>; 3]> = HashMap::new();
    for (i, hint) in data.hints.iter().enumerate() {
        ensure_known(puzzles, "hint", EntityKind::Puzzle, &hint.puzzle)?;
        let slot = &mut index.entry(hint.puzzle.clone()).or_default()[hint.level as usize];
        if slot.is_some() {
            return Err(ContentError::DuplicateHintLevel {
                puzzle: hint.puzzle.clone(),
                level: hint.level,
            });
        }
        *slot = Some(i);
    }
    Ok(index)
}

fn index_decisions(
    data: &AdventureData,
    scenes: &HashMap<String, usize>,
    endings: &HashMap<String, usize>,
) -> Result<HashMap<String, Vec<usize>>, ContentError> {
    let mut by_scene: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, decision) in data.decisions.iter().enumerate() {
        ensure_known(scenes, &decision.id, EntityKind::Scene, &decision.scene)?;
        if decision.options.is_empty() {
            return Err(ContentError::NoOptions {
                decision: decision.id.clone(),
            });
        }
        let mut seen = HashSet::new();
        for option in &decision.options {
            if !seen.insert(option.id.as_str()) {
                return Err(ContentError::DuplicateId {
                    kind: EntityKind::Option,
                    id: format!("{}/{}", decision.id, option.id),
                });
            }
            for ending in option.unlocks.iter().chain(&option.blocks) {
                ensure_known(endings, &decision.id, EntityKind::Ending, ending)?;
            }
        }
        by_scene.entry(decision.scene.clone()).or_default().push(i);
    }
    Ok(by_scene)
}

fn validate_requirements(
    data: &AdventureData,
    decisions: &HashMap<String, usize>,
) -> Result<(), ContentError> {
    for ending in &data.endings {
        for requirement in &ending.requirements {
            match requirement {
                Requirement::Decision { decision, option } => {
                    ensure_known(decisions, &ending.id, EntityKind::Decision, decision)?;
                    if data.decisions[decisions[decision]].option(option).is_none() {
                        return Err(ContentError::UnknownReference {
                            owner: ending.id.clone(),
                            kind: EntityKind::Option,
                            id: format!("{decision}/{option}"),
                        });
                    }
                }
                Requirement::Consensus { decision } => {
                    ensure_known(decisions, &ending.id, EntityKind::Decision, decision)?;
                    if !data.decisions[decisions[decision]].consensus {
                        return Err(ContentError::ConsensusNotVoted {
                            ending: ending.id.clone(),
                            decision: decision.clone(),
                        });
                    }
                }
                Requirement::PuzzlesCompleted { .. } | Requirement::Tag { .. } => {}
            }
        }
    }
    Ok(())
}

fn find_default_ending(endings: &[Ending]) -> Result<usize, ContentError> {
    let mut defaults = endings.iter().enumerate().filter(|(_, e)| e.default);
    let Some((index, first)) = defaults.next() else {
        return Err(ContentError::MissingDefaultEnding);
    };
    if let Some((_, second)) = defaults.next() {
        return Err(ContentError::MultipleDefaultEndings {
            first: first.id.clone(),
            second: second.id.clone(),
        });
    }
    Ok(index)
}
