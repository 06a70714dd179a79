//! Telegram update handlers.
//!
//! Commands run serialized per chat; ordinary text is recorded into the
//! channel history that backs `/summarize`.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use herald_core::domain::ChatId;

use crate::router::AppState;

mod commands;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        // Photos, stickers, voice: nothing to relay or record.
        return Ok(());
    };

    if text.starts_with('/') {
        let _guard = state.chat_locks.lock_chat(msg.chat.id.0).await;
        return commands::handle_command(bot, msg, state).await;
    }

    let author = msg
        .from()
        .map(|u| u.full_name())
        .unwrap_or_else(|| "unknown".to_string());
    state
        .history
        .record(ChatId(msg.chat.id.0), &author, text)
        .await;

    Ok(())
}
