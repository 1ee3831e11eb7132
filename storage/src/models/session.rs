use chrono::{DateTime, Utc};

/// A short-lived conversational state for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub session_type: String,
    pub state: String,
    /// Opaque JSON payload owned by the session type.
    pub context: serde_json::Value,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
