//! Cross-messenger abstractions (Telegram today; other chat SDKs later).

pub mod port;
pub mod throttled;
