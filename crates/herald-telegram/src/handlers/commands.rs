use std::sync::Arc;

use teloxide::prelude::*;

use herald_core::audit::{truncate_text, RequestEvent};
use herald_core::commands::{self, Command};
use herald_core::domain::ChatId;
use herald_core::messaging::port::ChatAction;

use crate::router::AppState;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(
    _bot: Bot,
    msg: Message,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let text = msg.text().unwrap_or("");
    let (name, args) = parse_command(text);

    let Some(command) = Command::parse(&name) else {
        tracing::debug!("ignoring unknown command /{name}");
        return Ok(());
    };

    let chat_id = ChatId(msg.chat.id.0);
    let user_id = msg.from().map(|u| u.id.0 as i64).unwrap_or(0);
    let username = msg
        .from()
        .map(|u| u.username.clone().unwrap_or_else(|| u.full_name()))
        .unwrap_or_else(|| "unknown".to_string());

    if let Err(e) = state
        .request_log
        .write(RequestEvent::command(user_id, &username, command.name(), &args))
    {
        tracing::warn!("failed to write request log: {e}");
    }

    // Gather the completion input up front so usage errors never reach the
    // gateway.
    let input = if command.takes_argument() {
        if args.is_empty() {
            let _ = state.messenger.send_text(chat_id, command.usage()).await;
            return Ok(());
        }
        args
    } else {
        match state.history.transcript(chat_id).await {
            Some(transcript) => transcript,
            None => {
                let _ = state
                    .messenger
                    .send_text(chat_id, "There are no recent messages to summarize.")
                    .await;
                return Ok(());
            }
        }
    };

    let _ = state.messenger.send_text(chat_id, command.ack()).await;

    // Typing loop while the completion call is in flight (best-effort).
    let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel::<()>();
    let typing_messenger = state.messenger.clone();
    let typing_task = tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(3));
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let _ = typing_messenger.send_chat_action(chat_id, ChatAction::Typing).await;
                }
                _ = &mut stop_rx => break,
            }
        }
    });

    let result = commands::execute(command, &input, state.client.as_ref(), state.chunk_limit).await;

    let _ = stop_tx.send(());
    let _ = typing_task.await;

    match result {
        Ok(reply) => {
            if let Err(e) = state.request_log.write(RequestEvent::completion(
                user_id,
                &username,
                command.name(),
                &reply.chunks.join("\n"),
                reply.cost,
                reply.prompt_tokens,
                reply.completion_tokens,
            )) {
                tracing::warn!("failed to write request log: {e}");
            }

            // Chunks in order, then the metadata line as its own message.
            for chunk in &reply.chunks {
                if let Err(e) = state.messenger.send_text(chat_id, chunk).await {
                    tracing::error!("failed to send reply chunk: {e}");
                    return Ok(());
                }
            }
            if let Err(e) = state.messenger.send_text(chat_id, &reply.metadata).await {
                tracing::error!("failed to send metadata line: {e}");
            }
        }
        Err(err) => {
            tracing::error!("/{} failed: {err}", command.name());
            if let Err(e) = state.request_log.write(RequestEvent::error(
                user_id,
                &username,
                command.name(),
                &err.to_string(),
            )) {
                tracing::warn!("failed to write request log: {e}");
            }

            // Exactly one user-visible message per failure.
            let error_message = format!(
                "An error occurred while {}: {}",
                command.failure_context(),
                truncate_text(&err.to_string(), 200)
            );
            let _ = state.messenger.send_text(chat_id, &error_message).await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_command() {
        assert_eq!(parse_command("/summarize"), ("summarize".into(), "".into()));
    }

    #[test]
    fn parses_command_with_bot_suffix_and_args() {
        assert_eq!(
            parse_command("/ask@herald_bot what is rust?"),
            ("ask".into(), "what is rust?".into())
        );
    }

    #[test]
    fn lowercases_and_trims() {
        assert_eq!(
            parse_command("  /Generate_Code   print hello  "),
            ("generate_code".into(), "print hello".into())
        );
    }
}
