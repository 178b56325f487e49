//! Pure state transition function

use super::{Command, Effect, Event, TextFormat};
use crate::prompts;
use crate::session::{Phase, Session};

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_session: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: Session) -> Self {
        Self {
            new_session: session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    /// Session unchanged, nothing to do
    fn ignore(session: &Session) -> Self {
        Self::new(session.clone())
    }
}

/// Pure transition function
///
/// Given the same session and event it always produces the same result, with
/// no I/O. Every `(Phase, Event)` pair has an outcome; events with no meaning
/// in the current phase leave the session untouched.
pub fn transition(session: &Session, event: Event) -> TransitionResult {
    match (session.phase, event) {
        // ============================================================
        // Commands
        // ============================================================

        // Any phase + /new -> fresh session, categories offered
        (_, Event::Command(Command::NewSession)) => offer_categories(Session::new()),

        // Any phase + /text -> stored script or notice
        (_, Event::Command(Command::GetText)) => {
            let effect = if session.has_script() {
                Effect::SendText {
                    text: prompts::truncate_script(&session.script),
                    format: TextFormat::Markdown,
                }
            } else {
                Effect::send_text(prompts::NO_SCRIPT)
            };
            TransitionResult::ignore(session).with_effect(effect)
        }

        // ============================================================
        // Free text
        // ============================================================
        (Phase::Initial, Event::Text { .. }) => offer_categories(session.clone()),

        (Phase::Category | Phase::Topic, Event::Text { .. }) => TransitionResult::ignore(session),

        // ============================================================
        // Selections (always acknowledged exactly once)
        // ============================================================
        (phase, Event::Selection { callback_id, label }) => {
            let ack = Effect::answer_callback(callback_id);
            if label.is_empty() {
                return TransitionResult::ignore(session).with_effect(ack);
            }
            match phase {
                Phase::Initial => TransitionResult::ignore(session).with_effect(ack),

                // Category chosen -> Topic, ask for suggestions
                Phase::Category => {
                    let prompt = prompts::topics_prompt(&label);
                    let mut next = session.clone();
                    next.category = label;
                    next.phase = Phase::Topic;
                    TransitionResult::new(next)
                        .with_effect(ack)
                        .with_effect(Effect::GenerateTopics { prompt })
                }

                // Topic chosen -> ask for a script within the recorded category
                Phase::Topic => {
                    let prompt = prompts::script_prompt(&session.category, &label);
                    let mut next = session.clone();
                    next.topic = label;
                    TransitionResult::new(next)
                        .with_effect(ack)
                        .with_effect(Effect::GenerateScript { prompt })
                }
            }
        }

        // ============================================================
        // Generation results
        // ============================================================
        (_, Event::TopicsGenerated { text }) => {
            let topics = prompts::split_topics(&text);
            if topics.is_empty() {
                return generation_failed(session);
            }
            TransitionResult::ignore(session).with_effect(Effect::offer_topics(&topics))
        }

        (_, Event::ScriptGenerated { script }) => {
            if script.trim().is_empty() {
                return generation_failed(session);
            }
            let mut next = session.clone();
            next.script.clone_from(&script);
            TransitionResult::new(next).with_effect(Effect::SynthesizeSpeech { script })
        }

        (_, Event::SpeechSynthesized { audio }) => {
            TransitionResult::ignore(session).with_effect(Effect::SendAudio {
                audio,
                caption: prompts::AUDIO_CAPTION.to_string(),
            })
        }

        // Which stage failed only matters for logging; the user sees one notice
        (_, Event::GenerationFailed { .. }) => generation_failed(session),
    }
}

/// Offer the category menu; offering it always moves the session to `Category`
fn offer_categories(mut session: Session) -> TransitionResult {
    session.phase = Phase::Category;
    TransitionResult::new(session).with_effect(Effect::offer_categories())
}

/// Generic notice, then restart the selection flow. Category, topic and
/// script stay as they were.
fn generation_failed(session: &Session) -> TransitionResult {
    let mut next = session.clone();
    next.phase = Phase::Category;
    TransitionResult::new(next).with_effects([
        Effect::send_text(prompts::GENERATION_ERROR),
        Effect::offer_categories(),
    ])
}
