//! Long-poll ingestion loop

use super::client::TelegramClient;
use super::types::Update;
use crate::runtime::{Messenger, RuntimeManager, SpeechSynthesizer, TextGenerator};
use crate::session::UserId;
use crate::state_machine::Event;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Single ingestion point: pulls updates and routes them to per-user runtimes
pub struct Poller {
    client: TelegramClient,
    timeout: Duration,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(client: TelegramClient, timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            client,
            timeout,
            cancel,
        }
    }

    pub async fn run<M, T, S>(self, manager: &RuntimeManager<M, T, S>)
    where
        M: Messenger + 'static,
        T: TextGenerator + 'static,
        S: SpeechSynthesizer + 'static,
    {
        tracing::info!(timeout_secs = self.timeout.as_secs(), "Telegram poller started");

        let mut offset = 0;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                result = self.client.get_updates(offset, self.timeout) => result,
            };

            match result {
                Ok(updates) => {
                    backoff = INITIAL_BACKOFF;
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let Some((user, event)) = route_update(&update) else {
                            tracing::debug!(update_id = update.update_id, "Skipping update");
                            continue;
                        };
                        if let Err(e) = manager.send_event(user, event).await {
                            tracing::warn!(user_id = %user, error = %e, "Failed to route update");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        backoff_ms = backoff.as_millis(),
                        "Failed to fetch updates"
                    );
                    tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => break,
                        () = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }

        tracing::info!("Telegram poller stopped");
    }
}

/// Map an update to the user it belongs to and the event it carries.
///
/// Button presses become selections, message text becomes a command or free
/// text, and anything else (edits, stickers, messages from bots) is skipped.
pub fn route_update(update: &Update) -> Option<(UserId, Event)> {
    if let Some(query) = &update.callback_query {
        return Some((
            UserId(query.chat_id()),
            Event::Selection {
                callback_id: query.id.clone(),
                label: query.data.clone().unwrap_or_default(),
            },
        ));
    }

    let message = update.message.as_ref()?;
    if message.from.as_ref().is_some_and(|from| from.is_bot) {
        return None;
    }
    let text = message.text.as_ref()?;
    Some((UserId(message.chat.id), Event::from_message_text(text.as_str())))
}
