//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::llm::{LlmError, LlmRequest, LlmService, SpeechRequest, SpeechService};
use crate::session::UserId;
use crate::state_machine::TextFormat;
use crate::telegram::{InlineKeyboardMarkup, ParseMode, TelegramClient};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Outbound messaging to a user's chat
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, user: UserId, text: &str, format: TextFormat)
        -> Result<(), String>;

    /// Send text with one button per option, laid out in the given rows
    async fn send_options(
        &self,
        user: UserId,
        text: &str,
        rows: &[Vec<String>],
    ) -> Result<(), String>;

    /// Upload an audio file with a caption
    async fn send_audio(&self, user: UserId, path: &Path, caption: &str) -> Result<(), String>;

    /// Acknowledge a button press
    async fn answer_callback(&self, callback_id: &str) -> Result<(), String>;
}

/// Prompt in, completion text out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Script in, encoded audio out
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, LlmError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: Messenger + ?Sized> Messenger for Arc<T> {
    async fn send_text(
        &self,
        user: UserId,
        text: &str,
        format: TextFormat,
    ) -> Result<(), String> {
        (**self).send_text(user, text, format).await
    }

    async fn send_options(
        &self,
        user: UserId,
        text: &str,
        rows: &[Vec<String>],
    ) -> Result<(), String> {
        (**self).send_options(user, text, rows).await
    }

    async fn send_audio(&self, user: UserId, path: &Path, caption: &str) -> Result<(), String> {
        (**self).send_audio(user, path, caption).await
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), String> {
        (**self).answer_callback(callback_id).await
    }
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).complete(prompt).await
    }
}

#[async_trait]
impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<T> {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, LlmError> {
        (**self).synthesize(text).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use the Telegram client as the `Messenger`
#[derive(Clone)]
pub struct TelegramMessenger {
    client: TelegramClient,
}

impl TelegramMessenger {
    pub fn new(client: TelegramClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(
        &self,
        user: UserId,
        text: &str,
        format: TextFormat,
    ) -> Result<(), String> {
        let parse_mode = match format {
            TextFormat::Plain => None,
            TextFormat::Markdown => Some(ParseMode::Markdown),
        };
        match self.client.send_message(user.0, text, parse_mode, None).await {
            Ok(()) => Ok(()),
            // Model output is not guaranteed to be valid Markdown
            Err(e) if parse_mode.is_some() && e.is_entity_parse_error() => {
                tracing::warn!(user_id = %user, error = %e, "Markdown rejected, resending as plain text");
                self.client
                    .send_message(user.0, text, None, None)
                    .await
                    .map_err(|e| e.to_string())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    async fn send_options(
        &self,
        user: UserId,
        text: &str,
        rows: &[Vec<String>],
    ) -> Result<(), String> {
        let markup = InlineKeyboardMarkup::from_rows(rows);
        self.client
            .send_message(user.0, text, None, Some(markup))
            .await
            .map_err(|e| e.to_string())
    }

    async fn send_audio(&self, user: UserId, path: &Path, caption: &str) -> Result<(), String> {
        self.client
            .send_audio(user.0, path, caption)
            .await
            .map_err(|e| e.to_string())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), String> {
        self.client
            .answer_callback_query(callback_id)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Adapter from a chat completion service to a `TextGenerator`
#[derive(Clone)]
pub struct LlmTextGenerator {
    service: Arc<dyn LlmService>,
}

impl LlmTextGenerator {
    pub fn new(service: Arc<dyn LlmService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl TextGenerator for LlmTextGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.service.complete(&LlmRequest::user_prompt(prompt)).await?;
        Ok(response.text)
    }
}

/// Adapter from a text-to-speech service to a `SpeechSynthesizer`
#[derive(Clone)]
pub struct LlmSpeechSynthesizer {
    service: Arc<dyn SpeechService>,
}

impl LlmSpeechSynthesizer {
    pub fn new(service: Arc<dyn SpeechService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl SpeechSynthesizer for LlmSpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, LlmError> {
        let response = self.service.synthesize(&SpeechRequest::new(text)).await?;
        Ok(response.audio)
    }
}
