//! Adjustment sessions: a short-lived marker that routes the user's next message to the
//! Reviewer as feedback on a pending draft.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use storage::SessionRepository;
use tracing::{debug, info, warn};

use crate::core::SessionError;

pub const ADJUST_PLAN: &str = "adjust_plan";
pub const AWAITING_FEEDBACK: &str = "awaiting_feedback";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustContext {
    pub plan_id: i64,
    pub original_request: String,
}

/// A live adjustment session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAdjustment {
    pub session_id: i64,
    pub context: AdjustContext,
}

pub struct AdjustmentSessions {
    repo: Arc<dyn SessionRepository>,
    ttl: Duration,
}

impl AdjustmentSessions {
    pub fn new(repo: Arc<dyn SessionRepository>, ttl_secs: u64) -> Self {
        Self {
            repo,
            ttl: Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX / 1000)),
        }
    }

    pub async fn start(&self, user_id: i64, context: &AdjustContext) -> Result<i64, SessionError> {
        self.start_at(user_id, context, Utc::now()).await
    }

    pub async fn start_at(
        &self,
        user_id: i64,
        context: &AdjustContext,
        now: DateTime<Utc>,
    ) -> Result<i64, SessionError> {
        let value = serde_json::to_value(context).map_err(|source| SessionError::InvalidContext {
            session_id: 0,
            source,
        })?;
        let id = self
            .repo
            .create(user_id, ADJUST_PLAN, AWAITING_FEEDBACK, &value, now + self.ttl)
            .await?;
        info!(user_id, session_id = id, plan_id = context.plan_id, "step: adjustment session started");
        Ok(id)
    }

    pub async fn active_adjustment(&self, user_id: i64) -> Result<Option<ActiveAdjustment>, SessionError> {
        self.active_adjustment_at(user_id, Utc::now()).await
    }

    /// The newest unexpired session if it awaits plan feedback. A session with an unreadable
    /// context is deleted and reported as [`SessionError::InvalidContext`].
    pub async fn active_adjustment_at(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ActiveAdjustment>, SessionError> {
        let Some(session) = self.repo.get_active(user_id, now).await? else {
            return Ok(None);
        };
        if session.session_type != ADJUST_PLAN || session.state != AWAITING_FEEDBACK {
            debug!(session_id = session.id, session_type = %session.session_type, "ignoring non-adjustment session");
            return Ok(None);
        }
        match serde_json::from_value::<AdjustContext>(session.context) {
            Ok(context) => Ok(Some(ActiveAdjustment {
                session_id: session.id,
                context,
            })),
            Err(source) => {
                warn!(session_id = session.id, error = %source, "Dropping session with unreadable context");
                self.repo.delete(session.id).await?;
                Err(SessionError::InvalidContext {
                    session_id: session.id,
                    source,
                })
            }
        }
    }

    pub async fn finish(&self, session_id: i64) -> Result<(), SessionError> {
        self.repo.delete(session_id).await?;
        debug!(session_id, "adjustment session closed");
        Ok(())
    }

    pub async fn cleanup_expired(&self) -> Result<u64, SessionError> {
        let removed = self.repo.cleanup_expired(Utc::now()).await?;
        if removed > 0 {
            info!(removed, "step: expired sessions removed");
        }
        Ok(removed)
    }
}
