//! Effects produced by state transitions

use crate::prompts;

/// How the transport should render message text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    /// Telegram legacy Markdown; the runtime falls back to plain on parse errors
    Markdown,
}

/// Effects to be executed after a transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a text message
    SendText { text: String, format: TextFormat },

    /// Send a message with rows of selectable options
    SendOptions { text: String, rows: Vec<Vec<String>> },

    /// Clear the pending state of a pressed button
    AnswerCallback { callback_id: String },

    /// Ask the text service for topic suggestions
    GenerateTopics { prompt: String },

    /// Ask the text service for a script
    GenerateScript { prompt: String },

    /// Turn the script into audio
    SynthesizeSpeech { script: String },

    /// Upload synthesized audio as an attachment
    SendAudio { audio: Vec<u8>, caption: String },
}

impl Effect {
    pub fn send_text(text: impl Into<String>) -> Self {
        Effect::SendText {
            text: text.into(),
            format: TextFormat::Plain,
        }
    }

    pub fn offer_categories() -> Self {
        Effect::SendOptions {
            text: prompts::CHOOSE_CATEGORY.to_string(),
            rows: prompts::category_rows(),
        }
    }

    pub fn offer_topics(topics: &[String]) -> Self {
        Effect::SendOptions {
            text: prompts::CHOOSE_TOPIC.to_string(),
            rows: prompts::topic_rows(topics),
        }
    }

    pub fn answer_callback(callback_id: impl Into<String>) -> Self {
        Effect::AnswerCallback {
            callback_id: callback_id.into(),
        }
    }
}
