//! Events that drive a podcast session

use std::fmt;

/// Bot commands recognised in message text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `/new`: discard progress and start over
    NewSession,
    /// `/text`: return the last generated script
    GetText,
}

impl Command {
    /// Parse message text as a command. Accepts the `/cmd@botname` form
    /// Telegram uses in group chats.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        match name {
            "new" => Some(Command::NewSession),
            "text" => Some(Command::GetText),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::NewSession => "new",
            Command::GetText => "text",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Command::NewSession => "Start new podcast creation",
            Command::GetText => "Get generated podcast text",
        }
    }

    pub fn all() -> [Command; 2] {
        [Command::NewSession, Command::GetText]
    }
}

/// Which external call produced a generation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Topics,
    Script,
    Speech,
    /// Staging the synthesized audio on disk before upload
    AudioFile,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GenerationStage::Topics => "topics",
            GenerationStage::Script => "script",
            GenerationStage::Speech => "speech",
            GenerationStage::AudioFile => "audio_file",
        })
    }
}

/// Events that trigger session transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Inbound from the transport
    Command(Command),
    Text {
        text: String,
    },
    Selection {
        callback_id: String,
        label: String,
    },

    // Results of effects
    TopicsGenerated {
        text: String,
    },
    ScriptGenerated {
        script: String,
    },
    SpeechSynthesized {
        audio: Vec<u8>,
    },
    GenerationFailed {
        stage: GenerationStage,
        message: String,
    },
}

impl Event {
    /// Build the inbound event for a plain message
    pub fn from_message_text(text: impl Into<String>) -> Self {
        let text = text.into();
        match Command::parse(&text) {
            Some(command) => Event::Command(command),
            None => Event::Text { text },
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Command(Command::NewSession) => "command_new",
            Event::Command(Command::GetText) => "command_text",
            Event::Text { .. } => "text",
            Event::Selection { .. } => "selection",
            Event::TopicsGenerated { .. } => "topics_generated",
            Event::ScriptGenerated { .. } => "script_generated",
            Event::SpeechSynthesized { .. } => "speech_synthesized",
            Event::GenerationFailed { .. } => "generation_failed",
        }
    }
}
