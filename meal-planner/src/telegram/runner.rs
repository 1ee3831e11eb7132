//! Update loop: text messages and callback queries are converted to inbound events and handed
//! to the [`ConversationHandler`] in a spawned task, so the dispatcher returns immediately.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{error, info, instrument, warn};

use crate::bot::{ConversationHandler, InboundAction, InboundText};

/// Creates the teloxide Bot, pointing it at `api_url` when set.
pub fn build_bot(token: &str, api_url: Option<&str>) -> Bot {
    let bot = Bot::new(token);
    match api_url {
        Some(url_str) => match reqwest::Url::parse(url_str) {
            Ok(url) => bot.set_api_url(url),
            Err(e) => {
                error!(error = %e, url = %url_str, "Invalid TELEGRAM_API_URL, using default");
                bot
            }
        },
        None => bot,
    }
}

async fn on_message(msg: Message, handler: Arc<ConversationHandler>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        info!(chat_id = msg.chat.id.0, "Received non-text message");
        return Ok(());
    };
    let Some(user) = msg.from.as_ref() else {
        warn!(chat_id = msg.chat.id.0, "Received message without sender");
        return Ok(());
    };
    let inbound = InboundText {
        user_id: user.id.0 as i64,
        chat_id: msg.chat.id.0,
        text: text.to_string(),
    };
    info!(user_id = inbound.user_id, chat_id = inbound.chat_id, "Received message");

    tokio::spawn(async move {
        handler.handle_text(&inbound).await;
    });
    Ok(())
}

async fn on_callback(bot: Bot, query: CallbackQuery, handler: Arc<ConversationHandler>) -> ResponseResult<()> {
    if let Err(e) = bot.answer_callback_query(query.id.clone()).await {
        warn!(error = %e, "Failed to answer callback query");
    }
    let Some(data) = query.data.clone() else {
        return Ok(());
    };
    let user_id = query.from.id.0 as i64;
    let chat_id = query
        .message
        .as_ref()
        .map(|m| m.chat().id.0)
        .unwrap_or(user_id);
    let inbound = InboundAction {
        user_id,
        chat_id,
        data,
    };
    info!(user_id, chat_id, "Received action");

    tokio::spawn(async move {
        handler.handle_action(&inbound).await;
    });
    Ok(())
}

/// Runs until Ctrl-C.
#[instrument(skip(bot, handler))]
pub async fn run_dispatcher(bot: Bot, handler: Arc<ConversationHandler>) -> Result<()> {
    match bot.get_me().await {
        Ok(me) => info!(username = ?me.user.username, "Bot connected"),
        Err(e) => error!(error = %e, "get_me failed, continuing"),
    }

    let schema = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    info!("step: dispatcher started");
    Dispatcher::builder(bot, schema)
        .dependencies(dptree::deps![handler])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    Ok(())
}
