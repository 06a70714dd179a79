use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Typed configuration for the bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,

    // Completion gateway (OpenAI-compatible chat completions)
    pub completion_api_base: String,
    pub completion_api_key: Option<String>,
    pub completion_model: String,
    pub completion_timeout: Duration,

    // Reply limits
    pub message_chunk_limit: usize,
    pub history_limit: usize,

    // Request log
    pub log_dir: PathBuf,
    pub request_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let completion_api_base = env_str("COMPLETION_API_BASE")
            .and_then(non_empty)
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| "http://localhost:4000".to_string());
        let completion_api_key = env_str("COMPLETION_API_KEY").and_then(non_empty);
        let completion_model = env_str("COMPLETION_MODEL")
            .and_then(non_empty)
            .unwrap_or_else(|| "gemini/gemini-pro".to_string());
        let completion_timeout =
            Duration::from_secs(env_u64("COMPLETION_TIMEOUT_SECS").unwrap_or(120));

        // Chunk/history limits are preconditions elsewhere; reject bad
        // values here at the boundary.
        let message_chunk_limit = env_usize("MESSAGE_CHUNK_LIMIT").unwrap_or(1900);
        if message_chunk_limit == 0 {
            return Err(Error::Config(
                "MESSAGE_CHUNK_LIMIT must be positive".to_string(),
            ));
        }
        let history_limit = env_usize("HISTORY_LIMIT").unwrap_or(200);
        if history_limit == 0 {
            return Err(Error::Config("HISTORY_LIMIT must be positive".to_string()));
        }

        let log_dir = env_path("LOG_DIR").unwrap_or_else(|| PathBuf::from("logs"));
        let request_log_json = env_bool("REQUEST_LOG_JSON").unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            completion_api_base,
            completion_api_key,
            completion_model,
            completion_timeout,
            message_chunk_limit,
            history_limit,
            log_dir,
            request_log_json,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
