//! Per-user conversation runtime executor

use super::traits::{Messenger, SpeechSynthesizer, TextGenerator};

use crate::llm::LlmError;
use crate::session::{Session, SessionStore, UserId};
use crate::state_machine::{transition, Command, Effect, Event, GenerationStage};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How long a runtime waits for the next event before exiting
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Runtime for one user, generic over its collaborators so tests can use mocks
pub struct ConversationRuntime<M, T, S>
where
    M: Messenger + 'static,
    T: TextGenerator + 'static,
    S: SpeechSynthesizer + 'static,
{
    user: UserId,
    store: Arc<dyn SessionStore>,
    messenger: Arc<M>,
    text: Arc<T>,
    speech: Arc<S>,
    event_rx: mpsc::UnboundedReceiver<Event>,
    /// Process shutdown; drops in-flight calls without telling the user
    cancel: CancellationToken,
    idle_timeout: Duration,
    /// Where synthesized audio is staged before upload (system temp dir if unset)
    audio_dir: Option<PathBuf>,
}

impl<M, T, S> ConversationRuntime<M, T, S>
where
    M: Messenger + 'static,
    T: TextGenerator + 'static,
    S: SpeechSynthesizer + 'static,
{
    pub fn new(
        user: UserId,
        store: Arc<dyn SessionStore>,
        messenger: Arc<M>,
        text: Arc<T>,
        speech: Arc<S>,
        event_rx: mpsc::UnboundedReceiver<Event>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            user,
            store,
            messenger,
            text,
            speech,
            event_rx,
            cancel,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            audio_dir: None,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_audio_dir(mut self, audio_dir: Option<PathBuf>) -> Self {
        self.audio_dir = audio_dir;
        self
    }

    pub async fn run(mut self) {
        tracing::debug!(user_id = %self.user, "Starting conversation runtime");

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,

                received = tokio::time::timeout(self.idle_timeout, self.event_rx.recv()) => {
                    match received {
                        Ok(Some(event)) => self.process_event(event).await,
                        Ok(None) => break,
                        Err(_) => {
                            // Refuse further sends so the manager spawns a successor,
                            // then finish anything that slipped in before the close
                            self.event_rx.close();
                            while let Ok(event) = self.event_rx.try_recv() {
                                self.process_event(event).await;
                            }
                            tracing::debug!(user_id = %self.user, "Conversation runtime idle");
                            break;
                        }
                    }
                }
            }
        }

        tracing::debug!(user_id = %self.user, "Conversation runtime stopped");
    }

    /// Apply one inbound event, then every event its effects generate, to completion
    async fn process_event(&self, event: Event) {
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let session = self.load_session(&current_event).await;
            let kind = current_event.kind();

            // Pure state transition
            let result = transition(&session, current_event);

            tracing::debug!(
                user_id = %self.user,
                event = kind,
                from = %session.phase,
                to = %result.new_session.phase,
                effects = result.effects.len(),
                "Transition"
            );

            // Any processed event counts as activity for idle eviction
            if result.new_session.same_progress(&session) {
                self.store.touch(self.user).await;
            } else {
                self.store.save(self.user, result.new_session).await;
            }

            for effect in result.effects {
                let Some(generated) = self.until_shutdown(self.execute_effect(effect)).await else {
                    tracing::info!(user_id = %self.user, "Shutdown during effect, dropping it");
                    return;
                };
                if let Some(generated_event) = generated {
                    events_to_process.push(generated_event);
                }
            }
        }
    }

    /// `/new` always starts from a fresh record; `/text` must not create one
    async fn load_session(&self, event: &Event) -> Session {
        match event {
            Event::Command(Command::NewSession) => self.store.reset(self.user).await,
            Event::Command(Command::GetText) => self.store.get(self.user).await,
            _ => self.store.get_or_create(self.user).await,
        }
    }

    /// Race a future against process shutdown
    async fn until_shutdown<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            output = fut => Some(output),
        }
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(&self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::SendText { text, format } => {
                if let Err(e) = self.messenger.send_text(self.user, &text, format).await {
                    tracing::warn!(user_id = %self.user, error = %e, "Failed to send message");
                }
                None
            }

            Effect::SendOptions { text, rows } => {
                if let Err(e) = self.messenger.send_options(self.user, &text, &rows).await {
                    tracing::warn!(user_id = %self.user, error = %e, "Failed to send options");
                }
                None
            }

            Effect::AnswerCallback { callback_id } => {
                if let Err(e) = self.messenger.answer_callback(&callback_id).await {
                    tracing::warn!(user_id = %self.user, error = %e, "Failed to answer callback");
                }
                None
            }

            Effect::GenerateTopics { prompt } => Some(match self.text.complete(&prompt).await {
                Ok(text) => Event::TopicsGenerated { text },
                Err(e) => self.generation_failed(GenerationStage::Topics, &e),
            }),

            Effect::GenerateScript { prompt } => Some(match self.text.complete(&prompt).await {
                Ok(script) => Event::ScriptGenerated { script },
                Err(e) => self.generation_failed(GenerationStage::Script, &e),
            }),

            Effect::SynthesizeSpeech { script } => {
                Some(match self.speech.synthesize(&script).await {
                    Ok(audio) => Event::SpeechSynthesized { audio },
                    Err(e) => self.generation_failed(GenerationStage::Speech, &e),
                })
            }

            Effect::SendAudio { audio, caption } => {
                let file = match self.stage_audio(&audio).await {
                    Ok(file) => file,
                    Err(e) => {
                        tracing::warn!(
                            user_id = %self.user,
                            stage = %GenerationStage::AudioFile,
                            error = %e,
                            "Failed to stage audio"
                        );
                        return Some(Event::GenerationFailed {
                            stage: GenerationStage::AudioFile,
                            message: e.to_string(),
                        });
                    }
                };

                if let Err(e) = self.messenger.send_audio(self.user, file.path(), &caption).await {
                    tracing::warn!(user_id = %self.user, error = %e, "Failed to send audio");
                }
                // Dropping the guard removes the file whether or not the upload worked
                drop(file);
                None
            }
        }
    }

    fn generation_failed(&self, stage: GenerationStage, error: &LlmError) -> Event {
        tracing::warn!(
            user_id = %self.user,
            stage = %stage,
            kind = error.kind.as_str(),
            error = %error,
            "Generation failed"
        );
        Event::GenerationFailed {
            stage,
            message: error.message.clone(),
        }
    }

    /// Write audio to a uniquely named `.mp3` file removed on drop
    async fn stage_audio(&self, audio: &[u8]) -> std::io::Result<NamedTempFile> {
        let prefix = format!("{}-", self.user);
        let file = {
            let mut builder = tempfile::Builder::new();
            builder.prefix(&prefix).suffix(".mp3");
            match &self.audio_dir {
                Some(dir) => builder.tempfile_in(dir)?,
                None => builder.tempfile()?,
            }
        };
        tokio::fs::write(file.path(), audio).await?;
        Ok(file)
    }
}
