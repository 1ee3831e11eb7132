//! Error types for the meal planner.
//!
//! [`AgentError`] covers the retrieval and agent pipeline, [`LifecycleError`] the plan state
//! machine, [`SessionError`] the adjustment session, and [`BotError`] is the top-level error of
//! one conversation update.

use std::time::Duration;

use chrono::NaiveDate;
use llm_client::{AgentMeta, LlmError};
use prompt::PromptError;
use storage::{PlanStatus, StorageError};
use thiserror::Error;

use crate::planner::CadenceViolation;

/// Chat transport failure (send, keyboard, API).
#[derive(Error, Debug)]
#[error("Transport error: {0}")]
pub struct TransportError(pub String);

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("No candidate recipes available")]
    NoCandidates,

    #[error("Embedding failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error("{stage} generation failed: {source}")]
    Generation {
        stage: &'static str,
        #[source]
        source: LlmError,
    },

    /// The model replied with something that is not the requested JSON.
    #[error("{stage} returned malformed output: {source}")]
    MalformedOutput {
        stage: &'static str,
        raw: String,
        meta: AgentMeta,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON that lacks what the stage must return.
    #[error("{stage} returned an unusable reply: {reason}")]
    InvalidShape {
        stage: &'static str,
        raw: String,
        meta: AgentMeta,
        reason: String,
    },

    #[error("Proposal violates cadence: {}", format_violations(.0))]
    Cadence(Vec<CadenceViolation>),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AgentError {
    pub(crate) fn generation(stage: &'static str) -> impl FnOnce(LlmError) -> Self {
        move |source| AgentError::Generation { stage, source }
    }

    /// Usage record of the failed stage, when the provider was reached.
    pub fn meta(&self) -> Option<&AgentMeta> {
        match self {
            AgentError::MalformedOutput { meta, .. } | AgentError::InvalidShape { meta, .. } => {
                Some(meta)
            }
            _ => None,
        }
    }
}

fn format_violations(violations: &[CadenceViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Meal plan {0} not found")]
    PlanNotFound(i64),

    #[error("Week start {0} is not a Monday")]
    InvalidWeekStart(NaiveDate),

    #[error("User {user_id} already has a plan for the week of {week_start}")]
    WeekOccupied { user_id: i64, week_start: NaiveDate },

    #[error("Meal plan {plan_id} cannot move from {from} to {to}")]
    InvalidTransition {
        plan_id: i64,
        from: PlanStatus,
        to: PlanStatus,
    },

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failure of saving a recipe from a link.
#[derive(Error, Debug)]
pub enum ClipError {
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("No recipe found at {0}")]
    NoRecipe(String),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("Publishing failed: {0:#}")]
    Publish(anyhow::Error),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session {session_id} has an unreadable context: {source}")]
    InvalidContext {
        session_id: i64,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Top-level error of handling one inbound text or action.
#[derive(Error, Debug)]
pub enum BotError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Clip(#[from] ClipError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid action: {0}")]
    InvalidAction(String),
}

impl BotError {
    /// Short text shown to the user; the full chain goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            BotError::Agent(e)
            | BotError::Lifecycle(LifecycleError::Agent(e))
            | BotError::Clip(ClipError::Agent(e @ AgentError::Generation { .. })) => agent_message(e),
            BotError::Clip(ClipError::Fetch { .. } | ClipError::Status { .. }) => {
                "I couldn't open that link.".to_string()
            }
            BotError::Clip(ClipError::NoRecipe(_) | ClipError::Agent(_)) => {
                "I couldn't find a recipe on that page.".to_string()
            }
            BotError::Clip(ClipError::Publish(_)) => {
                "I couldn't save the recipe to the blog. Please try again.".to_string()
            }
            BotError::Lifecycle(LifecycleError::PlanNotFound(_)) => {
                "I couldn't find that meal plan anymore.".to_string()
            }
            BotError::Lifecycle(LifecycleError::WeekOccupied { week_start, .. }) => {
                format!("You already have a plan for the week of {}.", week_start)
            }
            BotError::Lifecycle(LifecycleError::InvalidWeekStart(_)) => {
                "Plans always start on a Monday.".to_string()
            }
            BotError::Lifecycle(LifecycleError::InvalidTransition { to, .. }) => match to {
                PlanStatus::Final => "This plan is already confirmed.".to_string(),
                _ => "This plan can no longer be changed.".to_string(),
            },
            BotError::Timeout(_) => {
                "That took too long. Please try again in a moment.".to_string()
            }
            BotError::InvalidAction(_) => "That button is no longer valid.".to_string(),
            BotError::Session(_)
            | BotError::Storage(_)
            | BotError::Lifecycle(LifecycleError::Storage(_))
            | BotError::Transport(_) => "Something went wrong on my side. Please try again.".to_string(),
        }
    }
}

fn agent_message(err: &AgentError) -> String {
    match err {
        AgentError::NoCandidates => {
            "I don't have any recipes to plan with yet.".to_string()
        }
        AgentError::Generation { source, .. } if rate_limited(source) => {
            "The planner is busy right now. Please try again in a few minutes.".to_string()
        }
        AgentError::Generation { .. } | AgentError::Embedding(_) => {
            "I couldn't reach the planning service. Please try again.".to_string()
        }
        AgentError::MalformedOutput { .. }
        | AgentError::InvalidShape { .. }
        | AgentError::Cadence(_) => {
            "I couldn't put together a sensible plan. Please try rephrasing your request.".to_string()
        }
        AgentError::Prompt(_) | AgentError::Storage(_) => {
            "Something went wrong on my side. Please try again.".to_string()
        }
    }
}

fn rate_limited(err: &LlmError) -> bool {
    match err {
        LlmError::RetriesExhausted { last, .. } => last.is_rate_limit(),
        other => other.is_rate_limit(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_hide_internals() {
        let err = BotError::from(StorageError::InvalidData("bad row".to_string()));
        assert!(!err.user_message().contains("bad row"));

        let err = BotError::from(LifecycleError::Agent(AgentError::NoCandidates));
        assert!(err.user_message().contains("recipes"));

        let err = BotError::from(AgentError::Generation {
            stage: "Chef",
            source: LlmError::RetriesExhausted {
                attempts: 3,
                last: Box::new(LlmError::RateLimited {
                    retry_after: Duration::from_secs(5),
                    message: "slow down".to_string(),
                }),
            },
        });
        assert!(err.user_message().contains("busy"));

        let err = BotError::from(ClipError::Status {
            url: "https://example.com/soup".to_string(),
            status: 404,
        });
        assert_eq!(err.user_message(), "I couldn't open that link.");
        let err = BotError::from(ClipError::Agent(AgentError::NoCandidates));
        assert_eq!(err.user_message(), "I couldn't find a recipe on that page.");
    }

    #[test]
    fn test_malformed_output_exposes_meta() {
        let source = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        let err = AgentError::MalformedOutput {
            stage: "Analyst",
            raw: "nope".to_string(),
            meta: AgentMeta::free("Analyst"),
            source,
        };
        assert_eq!(err.meta().map(|m| m.agent_name.as_str()), Some("Analyst"));
        assert!(AgentError::NoCandidates.meta().is_none());
    }
}
