//! Drives one session from a scenario plan and records what happened.
use std::sync::Arc;

use colored::Colorize;
use quest_engine::{
    ActionOutcome, Adventure, Clock, EngineError, ManualClock, PlayerAction, QuestSession,
    SessionOutcome,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use super::invariants;
use super::policy::perturb_answer;
use crate::scenario::{Driver, ScenarioPlan, Step};

/// A scripted step that did not go the way the script said.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("step {step} ({action}) was rejected with {code}")]
    UnexpectedRejection {
        step: usize,
        action: &'static str,
        code: &'static str,
    },
    #[error("step {step} ({action}) should have been rejected with {expected}")]
    MissingRejection {
        step: usize,
        action: &'static str,
        expected: &'static str,
    },
    #[error("step {step} ({action}) was rejected with {found}, expected {expected}")]
    WrongRejection {
        step: usize,
        action: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("step {step}: answer {text:?} was not accepted ({message})")]
    AnswerRefused {
        step: usize,
        text: String,
        message: String,
    },
    #[error("step {step} ({action}) failed: {message}")]
    Lookup {
        step: usize,
        action: &'static str,
        message: String,
    },
}

/// Everything observed while running one plan with one seed.
#[derive(Debug)]
pub struct RunSummary {
    pub seed: u64,
    pub driver: String,
    pub actions: usize,
    /// Rejection codes in the order the engine produced them.
    pub rejections: Vec<String>,
    pub script_errors: Vec<ScriptError>,
    pub violations: Vec<String>,
    pub outcome: Option<SessionOutcome>,
    pub session: QuestSession,
}

impl RunSummary {
    #[must_use]
    pub fn ending_id(&self) -> Option<&str> {
        self.outcome.as_ref().map(|outcome| outcome.ending.id.as_str())
    }

    #[must_use]
    pub fn total_score(&self) -> u32 {
        self.outcome.as_ref().map_or(0, |outcome| outcome.score.total)
    }
}

pub struct QuestRunner {
    adventure: Arc<Adventure>,
    verbose: bool,
}

impl QuestRunner {
    #[must_use]
    pub const fn new(adventure: Arc<Adventure>, verbose: bool) -> Self {
        Self { adventure, verbose }
    }

    /// Play `plan` to completion. Never panics on engine errors; they are
    /// recorded in the summary instead.
    pub fn run_plan(&self, plan: &ScenarioPlan, seed: u64) -> RunSummary {
        let clock = ManualClock::starting_at(0);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut run = Run {
            session: QuestSession::new(
                Arc::clone(&self.adventure),
                plan.team.clone(),
                clock.now_secs(),
            ),
            actions: 0,
            rejections: Vec::new(),
            violations: Vec::new(),
            outcome: None,
            verbose: self.verbose,
        };
        let mut script_errors = Vec::new();

        let driver = match &plan.driver {
            Driver::Script(steps) => {
                for (index, step) in steps.iter().enumerate() {
                    clock.advance(step.advance_secs);
                    let action = prepare(step, &self.adventure, &mut rng);
                    let result = run.apply(action, clock.now_secs());
                    if let Some(error) = check_step_result(index + 1, step, &result) {
                        script_errors.push(error);
                    }
                }
                "script".to_string()
            }
            Driver::Bot(strategy) => {
                let mut policy = strategy.create_policy(seed);
                while run.actions < plan.max_actions && !run.session.progress().ended {
                    let Some(action) =
                        policy.next_action(run.session.adventure(), run.session.progress())
                    else {
                        break;
                    };
                    clock.advance(rng.gen_range(5..=plan.max_think_secs.max(5)));
                    // Bots are expected to bump into rejections.
                    let _ = run.apply(action, clock.now_secs());
                }
                policy.name().to_string()
            }
        };

        if run.outcome.is_none() {
            clock.advance(plan.finish_after_secs);
            match run.session.end_session(clock.now_secs()) {
                Ok(outcome) => run.outcome = Some(outcome),
                Err(err) => run.violations.push(format!("closing session failed: {err}")),
            }
        }
        if let Some(outcome) = &run.outcome {
            run.violations.extend(invariants::check_outcome(
                &self.adventure,
                run.session.progress(),
                outcome,
            ));
        }

        RunSummary {
            seed,
            driver,
            actions: run.actions,
            rejections: run.rejections,
            script_errors,
            violations: run.violations,
            outcome: run.outcome,
            session: run.session,
        }
    }
}

struct Run {
    session: QuestSession,
    actions: usize,
    rejections: Vec<String>,
    violations: Vec<String>,
    outcome: Option<SessionOutcome>,
    verbose: bool,
}

impl Run {
    fn apply(&mut self, action: PlayerAction, now: u64) -> Result<ActionOutcome, EngineError> {
        let label = action.label();
        let before = self.session.progress().clone();
        let result = self.session.apply(action, now);
        self.actions += 1;

        match &result {
            Ok(ActionOutcome::Ended { outcome }) => self.outcome = Some(outcome.clone()),
            Ok(_) => {}
            Err(err) => {
                if let Some(code) = err.rejection_code() {
                    self.rejections.push(code.to_string());
                }
                if self.verbose {
                    println!("      {} {label}: {err}", "↳".dimmed());
                }
            }
        }

        let found =
            invariants::check_step(self.session.adventure(), &before, self.session.progress());
        for violation in &found {
            log::warn!("invariant violated after {label} at t={now}: {violation}");
        }
        self.violations.extend(found);
        result
    }
}

fn prepare(step: &Step, adventure: &Adventure, rng: &mut ChaCha8Rng) -> PlayerAction {
    match &step.action {
        PlayerAction::SubmitAnswer { puzzle, text } if step.perturb => {
            let case_sensitive = adventure
                .puzzle(puzzle)
                .is_ok_and(|puzzle| puzzle.case_sensitive);
            PlayerAction::SubmitAnswer {
                puzzle: puzzle.clone(),
                text: perturb_answer(rng, text, case_sensitive),
            }
        }
        action => action.clone(),
    }
}

fn check_step_result(
    step_no: usize,
    step: &Step,
    result: &Result<ActionOutcome, EngineError>,
) -> Option<ScriptError> {
    let action = step.action.label();
    match (result, step.expect_rejection) {
        (Ok(outcome), None) => match outcome {
            ActionOutcome::Answer { verdict, .. } if step.perturb && !verdict.accepted => {
                let text = match &step.action {
                    PlayerAction::SubmitAnswer { text, .. } => text.clone(),
                    _ => String::new(),
                };
                Some(ScriptError::AnswerRefused {
                    step: step_no,
                    text,
                    message: verdict.message.clone(),
                })
            }
            _ => None,
        },
        (Ok(_), Some(expected)) => Some(ScriptError::MissingRejection {
            step: step_no,
            action,
            expected,
        }),
        (Err(err), expected) => match (err.rejection_code(), expected) {
            (Some(found), Some(expected)) if found == expected => None,
            (Some(found), Some(expected)) => Some(ScriptError::WrongRejection {
                step: step_no,
                action,
                expected,
                found,
            }),
            (Some(code), None) => Some(ScriptError::UnexpectedRejection {
                step: step_no,
                action,
                code,
            }),
            (None, _) => Some(ScriptError::Lookup {
                step: step_no,
                action,
                message: err.to_string(),
            }),
        },
    }
}
