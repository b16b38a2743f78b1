// src/speech/voice.rs
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{SpeechEngine, Utterance, Voice};

const VOICE_LOG_TARGET: &str = "r_radiocli::speech::voice";

/// Best-effort voice policy for the radio host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicePreferences {
    /// Case-insensitive fragments of preferred voice names.
    #[serde(default = "default_name_hints")]
    pub name_hints: Vec<String>,
    /// Language used when no name hint matches.
    #[serde(default = "default_fallback_lang")]
    pub fallback_lang: String,
    #[serde(default = "default_rate")]
    pub rate: f32,
    #[serde(default = "default_pitch")]
    pub pitch: f32,
}

fn default_name_hints() -> Vec<String> {
    ["female", "woman", "girl", "zira", "susan", "google us english"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_fallback_lang() -> String {
    "en-US".to_string()
}

fn default_rate() -> f32 {
    1.15
}

fn default_pitch() -> f32 {
    1.1
}

impl Default for VoicePreferences {
    fn default() -> Self {
        VoicePreferences {
            name_hints: default_name_hints(),
            fallback_lang: default_fallback_lang(),
            rate: default_rate(),
            pitch: default_pitch(),
        }
    }
}

/// True when "male" appears as a whole word, so "Female" does not count.
fn names_male(name: &str) -> bool {
    name.split(|c: char| !c.is_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case("male"))
}

/// Picks a voice: first one whose name matches a hint, else the first
/// fallback-language voice not named as male, else the last fallback-language
/// voice seen.
pub fn select_voice(voices: &[Voice], prefs: &VoicePreferences) -> Option<Voice> {
    let hints: Vec<String> = prefs.name_hints.iter().map(|h| h.to_lowercase()).collect();
    if let Some(voice) = voices.iter().find(|v| {
        let name = v.name.to_lowercase();
        hints.iter().any(|h| name.contains(h.as_str()))
    }) {
        return Some(voice.clone());
    }

    let mut candidate = None;
    for voice in voices.iter().filter(|v| v.lang == prefs.fallback_lang) {
        candidate = Some(voice);
        if !names_male(&voice.name) {
            break;
        }
    }
    candidate.cloned()
}

/// Builds the utterance for `text`, applying the voice policy. Voice lookup
/// failures only lose the cosmetic settings.
pub fn build_utterance(text: &str, engine: &dyn SpeechEngine, prefs: &VoicePreferences) -> Utterance {
    let mut utterance = Utterance::new(text);
    utterance.rate = prefs.rate;
    utterance.pitch = prefs.pitch;

    match engine.voices() {
        Ok(voices) => match select_voice(&voices, prefs) {
            Some(voice) => {
                debug!(target: VOICE_LOG_TARGET, voice = %voice.name, "Using voice.");
                utterance.voice = Some(voice);
            }
            None => warn!(target: VOICE_LOG_TARGET, "No preferred voice found, using the engine default."),
        },
        Err(e) => warn!(target: VOICE_LOG_TARGET, "Could not list voices: {}", e),
    }
    utterance
}
