//! Core domain + application logic for the channel LLM relay bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the
//! completion gateway live behind ports (traits) implemented in adapter
//! crates.

pub mod audit;
pub mod commands;
pub mod completion;
pub mod config;
pub mod domain;
pub mod errors;
pub mod history;
pub mod logging;
pub mod messaging;
pub mod reply;

pub use errors::{Error, Result};
