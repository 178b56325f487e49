//! Runtime for executing podcast conversations
//!
//! Each user gets a [`ConversationRuntime`] task fed through an unbounded mpsc
//! channel, so a user's events apply strictly in arrival order while different
//! users proceed independently. Queueing never waits on a busy runtime, so the
//! single poller cannot be stalled by one user's slow generation.

mod executor;
pub mod traits;


pub use executor::{ConversationRuntime, DEFAULT_IDLE_TIMEOUT};
pub use traits::*;

use crate::session::{SessionStore, UserId};
use crate::state_machine::Event;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Type alias for the manager wired to Telegram and `OpenAI`
pub type ProductionManager =
    RuntimeManager<TelegramMessenger, LlmTextGenerator, LlmSpeechSynthesizer>;

/// Settings shared by every spawned runtime
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub idle_timeout: Duration,
    pub audio_dir: Option<PathBuf>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            audio_dir: None,
        }
    }
}

/// Handle to interact with a running conversation
struct RuntimeHandle {
    event_tx: mpsc::UnboundedSender<Event>,
    task: JoinHandle<()>,
}

/// Manager for all per-user runtimes
pub struct RuntimeManager<M, T, S>
where
    M: Messenger + 'static,
    T: TextGenerator + 'static,
    S: SpeechSynthesizer + 'static,
{
    store: Arc<dyn SessionStore>,
    messenger: Arc<M>,
    text: Arc<T>,
    speech: Arc<S>,
    settings: RuntimeSettings,
    cancel: CancellationToken,
    runtimes: RwLock<HashMap<UserId, RuntimeHandle>>,
}

impl<M, T, S> RuntimeManager<M, T, S>
where
    M: Messenger + 'static,
    T: TextGenerator + 'static,
    S: SpeechSynthesizer + 'static,
{
    pub fn new(
        store: Arc<dyn SessionStore>,
        messenger: Arc<M>,
        text: Arc<T>,
        speech: Arc<S>,
        settings: RuntimeSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            messenger,
            text,
            speech,
            settings,
            cancel,
            runtimes: RwLock::new(HashMap::new()),
        }
    }

    /// Queue an event for a user's runtime, starting one if needed.
    ///
    /// Only the map lock is awaited; the queue itself never applies backpressure.
    pub async fn send_event(&self, user: UserId, event: Event) -> Result<(), String> {
        let event_tx = self.get_or_create(user).await;
        match event_tx.send(event) {
            Ok(()) => Ok(()),
            // The runtime went idle between lookup and send
            Err(mpsc::error::SendError(event)) => self
                .get_or_create(user)
                .await
                .send(event)
                .map_err(|e| format!("Failed to send event: {e}")),
        }
    }

    /// Get the sender for a user's live runtime, spawning one if it is missing or has exited
    async fn get_or_create(&self, user: UserId) -> mpsc::UnboundedSender<Event> {
        // Check if already running
        {
            let runtimes = self.runtimes.read().await;
            if let Some(handle) = runtimes.get(&user) {
                if !handle.event_tx.is_closed() {
                    return handle.event_tx.clone();
                }
            }
        }

        let mut runtimes = self.runtimes.write().await;
        if let Some(handle) = runtimes.get(&user) {
            if !handle.event_tx.is_closed() {
                return handle.event_tx.clone();
            }
        }

        // A closing predecessor may still be finishing events; the successor waits for it
        let predecessor = runtimes.remove(&user).map(|h| h.task);
        let handle = self.spawn(user, predecessor);
        let event_tx = handle.event_tx.clone();
        runtimes.insert(user, handle);
        event_tx
    }

    fn spawn(&self, user: UserId, predecessor: Option<JoinHandle<()>>) -> RuntimeHandle {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let runtime = ConversationRuntime::new(
            user,
            self.store.clone(),
            self.messenger.clone(),
            self.text.clone(),
            self.speech.clone(),
            event_rx,
            self.cancel.child_token(),
        )
        .with_idle_timeout(self.settings.idle_timeout)
        .with_audio_dir(self.settings.audio_dir.clone());

        let task = tokio::spawn(async move {
            if let Some(previous) = predecessor {
                let _ = previous.await;
            }
            runtime.run().await;
        });

        RuntimeHandle { event_tx, task }
    }

    /// Forget runtimes that have exited. Returns how many were removed.
    pub async fn prune_finished(&self) -> usize {
        let mut runtimes = self.runtimes.write().await;
        let before = runtimes.len();
        runtimes.retain(|_, handle| !(handle.event_tx.is_closed() && handle.task.is_finished()));
        before - runtimes.len()
    }

    pub async fn active_count(&self) -> usize {
        self.runtimes.read().await.len()
    }

    /// Wait up to `grace` for every runtime to exit after cancellation
    pub async fn shutdown(&self, grace: Duration) {
        self.cancel.cancel();
        let handles: Vec<_> = self.runtimes.write().await.drain().collect();
        let count = handles.len();
        let join_all = async {
            for (_, handle) in handles {
                let _ = handle.task.await;
            }
        };
        if tokio::time::timeout(grace, join_all).await.is_err() {
            tracing::warn!(runtimes = count, "Runtimes did not stop within grace period");
        } else {
            tracing::info!(runtimes = count, "All runtimes stopped");
        }
    }
}
