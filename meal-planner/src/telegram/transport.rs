//! [`ChatTransport`] over teloxide. Action buttons become one row of inline callback buttons.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup};

use crate::core::{ActionButton, ChatTransport, TransportError};

pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        self.bot
            .send_message(ChatId(chat_id), text.to_string())
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(())
    }

    async fn send_with_actions(
        &self,
        chat_id: i64,
        text: &str,
        actions: &[ActionButton],
    ) -> Result<(), TransportError> {
        let row: Vec<InlineKeyboardButton> = actions
            .iter()
            .map(|a| InlineKeyboardButton::callback(a.label.clone(), a.data.clone()))
            .collect();
        self.bot
            .send_message(ChatId(chat_id), text.to_string())
            .reply_markup(InlineKeyboardMarkup::new(vec![row]))
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(())
    }
}
