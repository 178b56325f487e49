//! Runtime configuration from environment variables

use crate::llm::DEFAULT_BASE_URL;
use crate::telegram::DEFAULT_API_URL;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TTS_MODEL: &str = "tts-1";
pub const DEFAULT_TTS_VOICE: &str = "alloy";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} must be a whole number of seconds, got {value:?}")]
    InvalidSeconds { key: &'static str, value: String },
}

/// Everything `main` needs to wire the bot
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    pub telegram_api_url: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub chat_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    /// Long-poll wait passed to `getUpdates`
    pub poll_timeout: Duration,
    /// Whole-request limit for Telegram and `OpenAI` calls other than long polls
    pub http_timeout: Duration,
    /// Sessions untouched for this long are evicted
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    /// Per-user runtimes exit after this long without events
    pub runtime_idle_timeout: Duration,
    /// Staging directory for synthesized audio; system temp dir when unset
    pub audio_dir: Option<PathBuf>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let seconds = |key: &'static str, default: u64| -> Result<Duration, ConfigError> {
            match get(key) {
                None => Ok(Duration::from_secs(default)),
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| ConfigError::InvalidSeconds { key, value }),
            }
        };

        Ok(Self {
            telegram_token: required("TELEGRAM_BOT_TOKEN")?,
            telegram_api_url: or_default("TELEGRAM_API_URL", DEFAULT_API_URL),
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_base_url: or_default("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            chat_model: or_default("PODCASTER_CHAT_MODEL", DEFAULT_CHAT_MODEL),
            tts_model: or_default("PODCASTER_TTS_MODEL", DEFAULT_TTS_MODEL),
            tts_voice: or_default("PODCASTER_TTS_VOICE", DEFAULT_TTS_VOICE),
            poll_timeout: seconds("PODCASTER_POLL_TIMEOUT_SECS", 60)?,
            http_timeout: seconds("PODCASTER_HTTP_TIMEOUT_SECS", 300)?,
            session_ttl: seconds("PODCASTER_SESSION_TTL_SECS", 24 * 60 * 60)?,
            sweep_interval: seconds("PODCASTER_SWEEP_INTERVAL_SECS", 600)?,
            runtime_idle_timeout: seconds("PODCASTER_RUNTIME_IDLE_SECS", 600)?,
            audio_dir: get("PODCASTER_AUDIO_DIR").map(PathBuf::from),
        })
    }
}
