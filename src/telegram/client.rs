//! Telegram Bot API client

use super::error::TelegramError;
use super::types::{
    AnswerCallbackQueryRequest, ApiResponse, BotCommand, GetUpdatesRequest, InlineKeyboardMarkup,
    ParseMode, SendMessageRequest, SetMyCommandsRequest, Update, User,
};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Extra time on top of the long-poll timeout before the HTTP request gives up
const LONG_POLL_GRACE: Duration = Duration::from_secs(10);

/// Thin JSON-over-HTTP client; cheap to clone
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(client: Client, token: &str, api_url: &str) -> Self {
        Self {
            client,
            base_url: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn call<Req, Resp>(&self, method: &str, request: &Req) -> Result<Resp, TelegramError>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn parse_response<Resp: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Resp, TelegramError> {
        let body = response.text().await?;
        let envelope: ApiResponse<Resp> = serde_json::from_str(&body)
            .map_err(|e| TelegramError::Parse(format!("{e} - body: {body}")))?;

        if !envelope.ok {
            return Err(TelegramError::Api {
                code: envelope.error_code.unwrap_or_default(),
                description: envelope.description.unwrap_or_default(),
            });
        }
        envelope
            .result
            .ok_or_else(|| TelegramError::Parse("ok response without result".to_string()))
    }

    /// Validate the token and identify the bot
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: &["message", "callback_query"],
        };
        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .timeout(timeout + LONG_POLL_GRACE)
            .json(&request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode,
            reply_markup,
        };
        let _: serde_json::Value = self.call("sendMessage", &request).await?;
        Ok(())
    }

    /// Upload a local audio file as an attachment
    pub async fn send_audio(
        &self,
        chat_id: i64,
        path: &Path,
        caption: &str,
    ) -> Result<(), TelegramError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "podcast.mp3".to_string(), |n| n.to_string_lossy().into_owned());

        let part = Part::bytes(bytes).file_name(file_name).mime_str("audio/mpeg")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("audio", part);

        let response = self
            .client
            .post(self.method_url("sendAudio"))
            .multipart(form)
            .send()
            .await?;
        let _: serde_json::Value = Self::parse_response(response).await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &AnswerCallbackQueryRequest { callback_query_id },
            )
            .await?;
        Ok(())
    }

    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<(), TelegramError> {
        let _: bool = self
            .call("setMyCommands", &SetMyCommandsRequest { commands })
            .await?;
        Ok(())
    }
}
