//! Podcast conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! `transition(session, event)` returns the next session plus the effects the
//! runtime must execute. Service results come back in as events.

mod effect;
pub mod event;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, TextFormat};
pub use event::{Command, Event, GenerationStage};
pub use transition::transition;
