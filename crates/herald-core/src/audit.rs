//! Durable request log: one file per bot session, one event per command,
//! completion, or error.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{Local, Utc};
use serde::Serialize;

use crate::Result;

const LOG_MAX_TEXT: usize = 500;

/// RFC3339 timestamp in UTC (for logs/telemetry).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

#[derive(Clone, Debug, Serialize)]
pub struct RequestEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestEvent {
    fn base(event: &str, user_id: i64, username: &str, command: &str) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            user_id: Some(user_id),
            username: Some(username.to_string()),
            command: Some(command.to_string()),
            content: None,
            response: None,
            cost: None,
            prompt_tokens: None,
            completion_tokens: None,
            error: None,
        }
    }

    pub fn command(user_id: i64, username: &str, command: &str, content: &str) -> Self {
        let mut ev = Self::base("command", user_id, username, command);
        ev.content = Some(content.to_string());
        ev
    }

    pub fn completion(
        user_id: i64,
        username: &str,
        command: &str,
        response: &str,
        cost: Option<f64>,
        prompt_tokens: u64,
        completion_tokens: u64,
    ) -> Self {
        let mut ev = Self::base("completion", user_id, username, command);
        ev.response = Some(response.to_string());
        ev.cost = cost;
        ev.prompt_tokens = Some(prompt_tokens);
        ev.completion_tokens = Some(completion_tokens);
        ev
    }

    pub fn error(user_id: i64, username: &str, command: &str, error: &str) -> Self {
        let mut ev = Self::base("error", user_id, username, command);
        ev.error = Some(error.to_string());
        ev
    }
}

#[derive(Clone, Debug)]
pub struct RequestLog {
    path: PathBuf,
    json: bool,
}

impl RequestLog {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    /// Open a fresh timestamped log file under `log_dir`, creating the
    /// directory if needed.
    pub fn create(log_dir: &Path, json: bool) -> Result<Self> {
        fs::create_dir_all(log_dir)?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = log_dir.join(format!("messages_{stamp}.log"));
        Ok(Self { path, json })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: RequestEvent) -> Result<()> {
        // Truncate potentially large payloads.
        if let Some(s) = &event.content {
            event.content = Some(truncate_text(s, LOG_MAX_TEXT));
        }
        if let Some(s) = &event.response {
            event.response = Some(truncate_text(s, LOG_MAX_TEXT));
        }
        if let Some(s) = &event.error {
            event.error = Some(truncate_text(s, LOG_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            writeln!(file, "{value}")?;
            return Ok(());
        };

        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&json_value_to_display(v));
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.log"))
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        let s = "a".repeat(LOG_MAX_TEXT + 10);
        let t = truncate_text(&s, LOG_MAX_TEXT);
        assert!(t.ends_with("..."));
        assert!(t.len() >= LOG_MAX_TEXT);
    }

    #[test]
    fn write_truncates_long_responses() {
        let log = RequestLog::new(tmp_file("herald-log-test"), true);
        let response = "y".repeat(LOG_MAX_TEXT + 50);
        let ev = RequestEvent::completion(1, "u", "ask", &response, Some(0.12), 5, 10);

        log.write(ev).unwrap();
        let written = std::fs::read_to_string(log.path()).unwrap();
        assert!(written.contains("..."));
        assert!(!written.contains(&response));
    }

    #[test]
    fn json_mode_writes_parseable_lines() {
        let log = RequestLog::new(tmp_file("herald-log-json-test"), true);
        log.write(RequestEvent::command(7, "alice", "summarize", ""))
            .unwrap();
        log.write(RequestEvent::error(7, "alice", "summarize", "boom"))
            .unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(v["user_id"], 7);
        }
    }

    #[test]
    fn plain_mode_writes_field_lines() {
        let log = RequestLog::new(tmp_file("herald-log-plain-test"), false);
        log.write(RequestEvent::completion(1, "bob", "ask", "done", None, 3, 4))
            .unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        assert!(written.contains("event: completion"));
        assert!(written.contains("response: done"));
    }
}
