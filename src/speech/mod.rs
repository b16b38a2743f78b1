//! Text-to-speech capability used for radio commentary.
//!
//! The engine itself is opaque: it speaks an utterance and reports its
//! lifecycle through a channel of [`SpeechEvent`]s.

mod console;
mod voice;

pub use console::ConsoleSpeech;
pub use voice::{build_utterance, select_voice, VoicePreferences};

use thiserror::Error;
use tokio::sync::mpsc;

/// A voice offered by the speech engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    /// BCP 47 language tag, e.g. `en-US`.
    pub lang: String,
}

impl Voice {
    pub fn new(name: &str, lang: &str) -> Self {
        Voice { name: name.to_string(), lang: lang.to_string() }
    }
}

/// Text plus the cosmetic settings to speak it with.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<Voice>,
    /// 1.0 is normal speed.
    pub rate: f32,
    /// 1.0 is normal pitch.
    pub pitch: f32,
}

impl Utterance {
    pub fn new(text: &str) -> Self {
        Utterance { text: text.to_string(), voice: None, rate: 1.0, pitch: 1.0 }
    }
}

/// Lifecycle notifications for one utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    Started,
    Ended,
    Error(String),
}

/// Error types for the speech capability.
#[derive(Debug, Error, PartialEq)]
pub enum SpeechError {
    #[error("speech synthesis is not available")]
    Unavailable,
    #[error("speech engine error: {0}")]
    Engine(String),
}

pub type SpeechEvents = mpsc::UnboundedReceiver<SpeechEvent>;

/// Trait defining the speech synthesis capability.
pub trait SpeechEngine: Send + Sync {
    /// Lists voices the engine can speak with.
    fn voices(&self) -> Result<Vec<Voice>, SpeechError>;

    /// Queues `utterance` and returns its lifecycle events. The channel closing
    /// without `Ended` or `Error` means the utterance was cancelled.
    fn speak(&self, utterance: Utterance) -> Result<SpeechEvents, SpeechError>;

    /// Stops the current utterance and drops anything queued.
    fn cancel_all(&self);
}
