//! Telegram Bot API errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered `ok: false`
    #[error("Telegram API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("Failed to parse Telegram response: {0}")]
    Parse(String),

    #[error("Failed to read upload file: {0}")]
    Io(#[from] std::io::Error),
}

impl TelegramError {
    /// Telegram rejected the message's Markdown/HTML entities
    pub fn is_entity_parse_error(&self) -> bool {
        matches!(
            self,
            TelegramError::Api { code: 400, description } if description.contains("can't parse entities")
        )
    }
}
