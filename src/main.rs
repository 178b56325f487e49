//! podcaster - Telegram bot that turns a chosen topic into a short podcast
//!
//! Users pick a category and a topic from inline keyboards; a chat model
//! writes the script and a text-to-speech model voices it.

mod config;
mod llm;
mod prompts;
mod runtime;
mod session;
mod state_machine;
mod telegram;

use config::BotConfig;
use llm::{
    LlmService, LoggingService, LoggingSpeechService, OpenAIService, OpenAISpeechService,
    SpeechService,
};
use runtime::{
    LlmSpeechSynthesizer, LlmTextGenerator, ProductionManager, RuntimeSettings, TelegramMessenger,
};
use session::{InMemorySessionStore, SessionStore};
use state_machine::Command;
use std::sync::Arc;
use std::time::Duration;
use telegram::{BotCommand, Poller, TelegramClient};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long runtimes get to finish after shutdown is requested
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "podcaster=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = BotConfig::from_env()?;

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    // Telegram: validate the token before doing anything else
    let telegram =
        TelegramClient::new(http.clone(), &config.telegram_token, &config.telegram_api_url);
    let me = telegram.get_me().await?;
    tracing::info!(bot_id = me.id, "Authorized with Telegram");

    let commands: Vec<BotCommand> = Command::all()
        .into_iter()
        .map(|c| BotCommand {
            command: c.name().to_string(),
            description: c.description().to_string(),
        })
        .collect();
    if let Err(e) = telegram.set_my_commands(&commands).await {
        tracing::warn!(error = %e, "Failed to register bot commands");
    }

    // OpenAI services
    let chat: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(OpenAIService::new(
        http.clone(),
        config.openai_api_key.clone(),
        config.chat_model.clone(),
        &config.openai_base_url,
    ))));
    let speech: Arc<dyn SpeechService> =
        Arc::new(LoggingSpeechService::new(Arc::new(OpenAISpeechService::new(
            http,
            config.openai_api_key.clone(),
            config.tts_model.clone(),
            config.tts_voice.clone(),
            &config.openai_base_url,
        ))));
    tracing::info!(
        chat_model = %config.chat_model,
        tts_model = %config.tts_model,
        voice = %config.tts_voice,
        "LLM services initialized"
    );

    let cancel = CancellationToken::new();
    let store = Arc::new(InMemorySessionStore::new());
    let manager = Arc::new(ProductionManager::new(
        store.clone(),
        Arc::new(TelegramMessenger::new(telegram.clone())),
        Arc::new(LlmTextGenerator::new(chat)),
        Arc::new(LlmSpeechSynthesizer::new(speech)),
        RuntimeSettings {
            idle_timeout: config.runtime_idle_timeout,
            audio_dir: config.audio_dir.clone(),
        },
        cancel.clone(),
    ));

    tokio::spawn(sweep_idle(
        store,
        manager.clone(),
        config.session_ttl,
        config.sweep_interval,
        cancel.clone(),
    ));

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            tracing::info!("Shutdown requested");
            cancel.cancel();
        });
    }

    Poller::new(telegram, config.poll_timeout, cancel.clone())
        .run(&manager)
        .await;

    manager.shutdown(SHUTDOWN_GRACE).await;
    Ok(())
}

/// Periodically evict stale sessions and forget exited runtimes
async fn sweep_idle(
    store: Arc<InMemorySessionStore>,
    manager: Arc<ProductionManager>,
    session_ttl: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    let Ok(ttl) = chrono::Duration::from_std(session_ttl) else {
        tracing::warn!("Session TTL out of range, eviction disabled");
        return;
    };
    let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(cutoff) = chrono::Utc::now().checked_sub_signed(ttl) else {
            continue;
        };
        let evicted = store.evict_idle(cutoff).await;
        let pruned = manager.prune_finished().await;
        let sessions = store.len().await;
        let runtimes = manager.active_count().await;
        tracing::info!(evicted, pruned, sessions, runtimes, "Idle sweep");
    }
}
