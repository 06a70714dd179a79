//! In-memory channel history backing the summarize command.
//!
//! The bot only sees messages as they arrive, so the transcript is recorded
//! live: one ring buffer per chat, capped at the configured history limit.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::domain::ChatId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelMessage {
    pub author: String,
    pub text: String,
}

pub struct ChannelHistory {
    capacity: usize,
    chats: tokio::sync::Mutex<HashMap<ChatId, VecDeque<ChannelMessage>>>,
}

impl ChannelHistory {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "history capacity must be positive");
        Self {
            capacity,
            chats: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Record one message; the oldest entry is evicted at capacity.
    pub async fn record(&self, chat_id: ChatId, author: &str, text: &str) {
        debug!("Message read: {author}: {text}");
        let mut chats = self.chats.lock().await;
        let buf = chats.entry(chat_id).or_default();
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(ChannelMessage {
            author: author.to_string(),
            text: text.to_string(),
        });
    }

    /// Recorded messages oldest first, one `"author: text"` line each.
    ///
    /// `None` when nothing has been recorded for the chat yet.
    pub async fn transcript(&self, chat_id: ChatId) -> Option<String> {
        let chats = self.chats.lock().await;
        let buf = chats.get(&chat_id)?;
        if buf.is_empty() {
            return None;
        }
        Some(
            buf.iter()
                .map(|m| format!("{}: {}", m.author, m.text))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transcript_is_oldest_first() {
        let history = ChannelHistory::new(200);
        history.record(ChatId(1), "alice", "pizza tonight?").await;
        history.record(ChatId(1), "bob", "yes, 7pm").await;

        assert_eq!(
            history.transcript(ChatId(1)).await.unwrap(),
            "alice: pizza tonight?\nbob: yes, 7pm"
        );
    }

    #[tokio::test]
    async fn evicts_oldest_at_capacity() {
        let history = ChannelHistory::new(3);
        for i in 0..5 {
            history.record(ChatId(1), "alice", &format!("msg {i}")).await;
        }

        assert_eq!(
            history.transcript(ChatId(1)).await.unwrap(),
            "alice: msg 2\nalice: msg 3\nalice: msg 4"
        );
    }

    #[tokio::test]
    async fn chats_are_isolated() {
        let history = ChannelHistory::new(10);
        history.record(ChatId(1), "alice", "hello").await;
        history.record(ChatId(2), "bob", "world").await;

        assert_eq!(history.transcript(ChatId(1)).await.unwrap(), "alice: hello");
        assert_eq!(history.transcript(ChatId(2)).await.unwrap(), "bob: world");
    }

    #[tokio::test]
    async fn empty_history_has_no_transcript() {
        let history = ChannelHistory::new(10);
        assert!(history.transcript(ChatId(9)).await.is_none());
    }
}
