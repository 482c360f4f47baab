use std::fmt;

use quest_engine::{Adventure, PlayerAction, Puzzle, SessionProgress};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Voter id used when a session has no roster.
pub const SOLO_PLAYER: &str = "solo";

/// Policy interface for automated play.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Next action to take, or `None` when the bot is done and the session
    /// should end.
    fn next_action(&mut self, adventure: &Adventure, progress: &SessionProgress)
    -> Option<PlayerAction>;
}

/// Built-in bot temperaments for seeded sweeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BotStrategy {
    /// Mostly right, rarely asks for help.
    Diligent,
    /// Guesses often and pokes at locked content.
    Careless,
    /// Leans on the hint ladder.
    HintHungry,
}

impl BotStrategy {
    pub const ALL: [Self; 3] = [Self::Diligent, Self::Careless, Self::HintHungry];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Diligent => "diligent",
            Self::Careless => "careless",
            Self::HintHungry => "hint-hungry",
        }
    }

    const fn temperament(self) -> Temperament {
        match self {
            Self::Diligent => Temperament {
                correct: 0.8,
                hint: 0.05,
                wander: 0.02,
            },
            Self::Careless => Temperament {
                correct: 0.35,
                hint: 0.05,
                wander: 0.2,
            },
            Self::HintHungry => Temperament {
                correct: 0.4,
                hint: 0.45,
                wander: 0.05,
            },
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        Box::new(RandomBot {
            strategy: self,
            temperament: self.temperament(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            wrong_guesses: 0,
        })
    }
}

impl fmt::Display for BotStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy)]
struct Temperament {
    correct: f64,
    hint: f64,
    wander: f64,
}

struct RandomBot {
    strategy: BotStrategy,
    temperament: Temperament,
    rng: ChaCha8Rng,
    wrong_guesses: u32,
}

impl RandomBot {
    fn answer(&mut self, puzzle: &Puzzle, correct: bool) -> PlayerAction {
        let text = if correct {
            let answer = puzzle.answers.choose(&mut self.rng).cloned().unwrap_or_default();
            perturb_answer(&mut self.rng, &answer, puzzle.case_sensitive)
        } else {
            self.wrong_guesses += 1;
            format!("wrong guess {}", self.wrong_guesses)
        };
        PlayerAction::SubmitAnswer {
            puzzle: puzzle.id.clone(),
            text,
        }
    }
}

impl PlayerPolicy for RandomBot {
    fn name(&self) -> &'static str {
        self.strategy.label()
    }

    fn next_action(
        &mut self,
        adventure: &Adventure,
        progress: &SessionProgress,
    ) -> Option<PlayerAction> {
        if progress.ended {
            return None;
        }

        let open_puzzles: Vec<&Puzzle> = adventure
            .puzzles()
            .iter()
            .filter(|p| {
                progress.scene_status(&p.scene).is_open() && !progress.is_puzzle_completed(&p.id)
            })
            .collect();
        let open_decisions: Vec<(&str, Vec<&str>)> = adventure
            .decisions()
            .iter()
            .filter(|d| {
                progress.scene_status(&d.scene).is_open() && progress.decision(&d.id).is_none()
            })
            .map(|d| (d.id.as_str(), d.options.iter().map(|o| o.id.as_str()).collect()))
            .collect();

        if open_puzzles.is_empty() && open_decisions.is_empty() {
            return None;
        }

        if self.rng.gen_bool(self.temperament.wander)
            && let Some(puzzle) = adventure.puzzles().choose(&mut self.rng)
        {
            return Some(self.answer(puzzle, true));
        }

        let decide =
            !open_decisions.is_empty() && (open_puzzles.is_empty() || self.rng.gen_bool(0.3));
        if decide {
            let (decision, options) = open_decisions.choose(&mut self.rng)?;
            let option = options.choose(&mut self.rng)?;
            let player = next_voter(progress, decision);
            return Some(PlayerAction::SubmitDecision {
                decision: (*decision).to_string(),
                option: (*option).to_string(),
                player,
            });
        }

        let puzzle = *open_puzzles.choose(&mut self.rng)?;
        if self.rng.gen_bool(self.temperament.hint) {
            return Some(PlayerAction::RequestHint {
                puzzle: puzzle.id.clone(),
            });
        }
        let correct = self.rng.gen_bool(self.temperament.correct);
        Some(self.answer(puzzle, correct))
    }
}

/// First roster member who has not voted on `decision` yet.
fn next_voter(progress: &SessionProgress, decision: &str) -> String {
    let voted = progress.pending_votes.get(decision);
    progress
        .team
        .iter()
        .find(|player| voted.is_none_or(|votes| votes.iter().all(|v| &v.player != *player)))
        .cloned()
        .unwrap_or_else(|| SOLO_PLAYER.to_string())
}

/// Re-case and pad an answer the way a player might type it.
pub fn perturb_answer(rng: &mut impl Rng, answer: &str, case_sensitive: bool) -> String {
    let body: String = if case_sensitive {
        answer.to_string()
    } else {
        answer
            .chars()
            .map(|c| {
                if rng.gen_bool(0.5) {
                    c.to_ascii_uppercase()
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect()
    };
    let lead = " ".repeat(rng.gen_range(0..3));
    let trail = if rng.gen_bool(0.3) { "\n" } else { "" };
    format!("{lead}{body}{trail}")
}
