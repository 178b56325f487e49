//! Telegram Bot API transport
//!
//! A small hand-written client over `reqwest` covering the methods the bot
//! needs, plus the long-poll loop that feeds updates into the runtimes.

mod client;
mod error;
mod poller;
mod types;

#[cfg(test)]
pub mod fake_api;

pub use client::{TelegramClient, DEFAULT_API_URL};
pub use poller::Poller;
pub use types::{BotCommand, InlineKeyboardMarkup, ParseMode};
