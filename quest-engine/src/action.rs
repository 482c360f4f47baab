//! Player actions accepted at the engine boundary and their outcomes.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::endings::DecisionReceipt;
use crate::hints::HintGrant;
use crate::session::SessionOutcome;
use crate::unlock::SceneTransition;
use crate::validator::AnswerVerdict;

/// One thing a player can do during a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub enum PlayerAction {
    SubmitAnswer {
        puzzle: String,
        text: String,
    },
    RequestHint {
        puzzle: String,
    },
    SubmitDecision {
        decision: String,
        option: String,
        player: String,
    },
    EndSession,
}

/// Payloads that never reach the engine.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("action payload is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("action field '{0}' must not be empty")]
    EmptyField(&'static str),
}

impl PlayerAction {
    /// Parse and check an action payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a known action or an
    /// identifier field is blank.
    pub fn from_json(json: &str) -> Result<Self, ActionError> {
        let action: Self = serde_json::from_str(json)?;
        action.validate()?;
        Ok(action)
    }

    /// Reject blank identifiers. Answer text may be blank; it simply won't match.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::EmptyField`] naming the first blank identifier.
    pub fn validate(&self) -> Result<(), ActionError> {
        let fields: Vec<(&'static str, &str)> = match self {
            Self::SubmitAnswer { puzzle, .. } | Self::RequestHint { puzzle } => {
                vec![("puzzle", puzzle.as_str())]
            }
            Self::SubmitDecision {
                decision,
                option,
                player,
            } => vec![
                ("decision", decision.as_str()),
                ("option", option.as_str()),
                ("player", player.as_str()),
            ],
            Self::EndSession => Vec::new(),
        };
        match fields.into_iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(ActionError::EmptyField(name)),
            None => Ok(()),
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SubmitAnswer { .. } => "submit_answer",
            Self::RequestHint { .. } => "request_hint",
            Self::SubmitDecision { .. } => "submit_decision",
            Self::EndSession => "end_session",
        }
    }
}

/// What an applied action produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionOutcome {
    Answer {
        verdict: AnswerVerdict,
        transitions: Vec<SceneTransition>,
    },
    Hint {
        grant: Option<HintGrant>,
    },
    Decision {
        receipt: DecisionReceipt,
        transitions: Vec<SceneTransition>,
    },
    Ended {
        outcome: SessionOutcome,
    },
}
