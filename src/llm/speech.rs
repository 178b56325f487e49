//! `OpenAI` text-to-speech provider

use super::openai::{classify_send_error, classify_status};
use super::types::{SpeechRequest, SpeechResponse};
use super::{LlmError, SpeechService};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;

/// `audio/speech` client with one fixed model and voice
pub struct OpenAISpeechService {
    client: Client,
    api_key: String,
    model: String,
    voice: String,
    url: String,
}

impl OpenAISpeechService {
    pub fn new(client: Client, api_key: String, model: String, voice: String, base_url: &str) -> Self {
        Self {
            client,
            api_key,
            model,
            voice,
            url: format!("{}/audio/speech", base_url.trim_end_matches('/')),
        }
    }

    fn translate_request<'a>(&'a self, request: &'a SpeechRequest) -> OpenAISpeechRequest<'a> {
        OpenAISpeechRequest {
            model: &self.model,
            input: &request.input,
            voice: &self.voice,
            response_format: "mp3",
        }
    }
}

#[async_trait]
impl SpeechService for OpenAISpeechService {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechResponse, LlmError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.translate_request(request))
            .send()
            .await
            .map_err(|e| classify_send_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        let audio = response
            .bytes()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read audio: {e}")))?;

        if audio.is_empty() {
            return Err(LlmError::empty_response("Speech response had no audio"));
        }

        Ok(SpeechResponse {
            audio: audio.to_vec(),
            content_type,
        })
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct OpenAISpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}
