//! Outbound chat seam. The dispatcher only talks to [`ChatTransport`]; Telegram is one
//! implementation, tests record messages in memory.

use async_trait::async_trait;

use super::TransportError;

/// One inline button: visible label plus the opaque callback payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    pub label: String,
    pub data: String,
}

impl ActionButton {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TransportError>;

    /// Sends `text` with one row of action buttons.
    async fn send_with_actions(
        &self,
        chat_id: i64,
        text: &str,
        actions: &[ActionButton],
    ) -> Result<(), TransportError>;
}
