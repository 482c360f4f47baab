use anyhow::Result;
use quest_engine::PlayerAction;
use std::sync::Arc;

use crate::logic::BotStrategy;
use crate::logic::runner::RunSummary;

pub mod catalog;

pub use catalog::{find_scenario, scenario_catalog};

type ExpectationFn = Arc<dyn Fn(&RunSummary) -> Result<()> + Send + Sync + 'static>;

/// Check applied to a finished run.
#[derive(Clone)]
pub struct Expectation(ExpectationFn);

impl std::fmt::Debug for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expectation").finish()
    }
}

impl Expectation {
    pub fn evaluate(&self, summary: &RunSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for Expectation
where
    F: Fn(&RunSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// One scripted player action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub action: PlayerAction,
    /// Seconds that pass before the action is applied.
    pub advance_secs: u64,
    /// Rejection code the engine must answer with, if any.
    pub expect_rejection: Option<&'static str>,
    /// Re-case and pad answer text before submitting.
    pub perturb: bool,
}

impl Step {
    fn new(action: PlayerAction) -> Self {
        Self {
            action,
            advance_secs: 10,
            expect_rejection: None,
            perturb: false,
        }
    }

    /// A correct answer, typed sloppily.
    #[must_use]
    pub fn answer(puzzle: &str, text: &str) -> Self {
        Self {
            perturb: true,
            ..Self::new(PlayerAction::SubmitAnswer {
                puzzle: puzzle.to_string(),
                text: text.to_string(),
            })
        }
    }

    /// Text submitted verbatim; usually wrong.
    #[must_use]
    pub fn guess(puzzle: &str, text: &str) -> Self {
        Self::new(PlayerAction::SubmitAnswer {
            puzzle: puzzle.to_string(),
            text: text.to_string(),
        })
    }

    #[must_use]
    pub fn hint(puzzle: &str) -> Self {
        Self::new(PlayerAction::RequestHint {
            puzzle: puzzle.to_string(),
        })
    }

    #[must_use]
    pub fn decide(decision: &str, option: &str, player: &str) -> Self {
        Self::new(PlayerAction::SubmitDecision {
            decision: decision.to_string(),
            option: option.to_string(),
            player: player.to_string(),
        })
    }

    #[must_use]
    pub const fn after(mut self, secs: u64) -> Self {
        self.advance_secs = secs;
        self
    }

    #[must_use]
    pub const fn rejected(mut self, code: &'static str) -> Self {
        self.expect_rejection = Some(code);
        self
    }
}

/// How a run picks its actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Driver {
    Script(Vec<Step>),
    Bot(BotStrategy),
}

#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    pub team: Vec<String>,
    pub driver: Driver,
    /// Upper bound on bot actions before the session is closed.
    pub max_actions: usize,
    /// Longest simulated pause between two bot actions.
    pub max_think_secs: u64,
    /// Time that passes between the last action and closing the session.
    pub finish_after_secs: u64,
    pub expectations: Vec<Expectation>,
}

impl ScenarioPlan {
    #[must_use]
    pub fn scripted(team: &[&str], steps: Vec<Step>) -> Self {
        Self::new(team, Driver::Script(steps))
    }

    #[must_use]
    pub fn bot(team: &[&str], strategy: BotStrategy) -> Self {
        Self::new(team, Driver::Bot(strategy))
    }

    fn new(team: &[&str], driver: Driver) -> Self {
        Self {
            team: team.iter().map(ToString::to_string).collect(),
            driver,
            max_actions: 400,
            max_think_secs: 45,
            finish_after_secs: 60,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<Expectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }

    #[must_use]
    pub const fn finishing_after(mut self, secs: u64) -> Self {
        self.finish_after_secs = secs;
        self
    }

    #[must_use]
    pub const fn with_max_actions(mut self, max_actions: usize) -> Self {
        self.max_actions = max_actions;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub description: &'static str,
    pub plan: ScenarioPlan,
}

impl TestScenario {
    #[must_use]
    pub const fn new(key: &'static str, description: &'static str, plan: ScenarioPlan) -> Self {
        Self {
            key,
            description,
            plan,
        }
    }
}

/// Keys and descriptions of every built-in scenario.
#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    scenario_catalog()
        .into_iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}
