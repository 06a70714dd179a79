//! Polling router: builds the shared app state, registers the command menu,
//! and dispatches Telegram updates to the handlers.

use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::BotCommand};

use tokio::sync::{Mutex, OwnedMutexGuard};

use herald_core::audit::RequestLog;
use herald_core::commands::Command;
use herald_core::completion::CompletionClient;
use herald_core::config::Config;
use herald_core::history::ChannelHistory;
use herald_core::messaging::port::MessagingPort;
use herald_core::messaging::throttled::{ThrottleConfig, ThrottledMessenger};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub client: Arc<dyn CompletionClient>,
    pub messenger: Arc<dyn MessagingPort>,
    pub history: Arc<ChannelHistory>,
    pub chat_locks: Arc<ChatLocks>,
    pub request_log: Arc<RequestLog>,
    /// Chunk limit after clamping to the messenger's own message cap.
    pub chunk_limit: usize,
}

/// Per-chat serialization: one command runs to completion before the next
/// command in the same chat starts.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub async fn run_polling(
    cfg: Arc<Config>,
    client: Arc<dyn CompletionClient>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        tracing::info!("herald started: @{}", me.username());
    }
    tracing::info!("completion model: {}", client.model());

    // Explicit command registration from the table; Telegram shows these in
    // the chat menu.
    let menu: Vec<BotCommand> = Command::ALL
        .iter()
        .map(|c| BotCommand::new(c.name(), c.description()))
        .collect();
    if let Err(e) = bot.set_my_commands(menu).await {
        tracing::warn!("failed to register command menu: {e}");
    }

    // Wrap the raw messenger with throttling: chunked replies send several
    // messages back to back and must stay under platform flood control.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let chunk_limit = cfg
        .message_chunk_limit
        .min(messenger.capabilities().max_message_len);

    let request_log = RequestLog::create(&cfg.log_dir, cfg.request_log_json)?;
    tracing::info!("request log: {}", request_log.path().display());

    let state = Arc::new(AppState {
        client,
        messenger,
        history: Arc::new(ChannelHistory::new(cfg.history_limit)),
        chat_locks: Arc::new(ChatLocks::default()),
        request_log: Arc::new(request_log),
        chunk_limit,
        cfg,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
