// src/speech/console.rs
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{SpeechEngine, SpeechError, SpeechEvent, SpeechEvents, Utterance, Voice};

const CONSOLE_SPEECH_LOG_TARGET: &str = "r_radiocli::speech::console";

/// Speech engine for terminals: prints the commentary and holds the floor for
/// as long as reading it aloud would take.
pub struct ConsoleSpeech {
    words_per_minute: u32,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ConsoleSpeech {
    pub fn new(words_per_minute: u32) -> Self {
        ConsoleSpeech { words_per_minute: words_per_minute.max(1), tasks: Mutex::new(Vec::new()) }
    }

    /// Simulated speaking time for `utterance`, scaled by its rate.
    pub fn reading_time(&self, utterance: &Utterance) -> Duration {
        let words = utterance.text.split_whitespace().count().max(1) as f64;
        let rate = if utterance.rate > 0.0 { utterance.rate as f64 } else { 1.0 };
        Duration::from_secs_f64(words * 60.0 / (self.words_per_minute as f64 * rate))
    }
}

impl SpeechEngine for ConsoleSpeech {
    fn voices(&self) -> Result<Vec<Voice>, SpeechError> {
        Ok(vec![Voice::new("Console", "en-US")])
    }

    fn speak(&self, utterance: Utterance) -> Result<SpeechEvents, SpeechError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let duration = self.reading_time(&utterance);
        debug!(target: CONSOLE_SPEECH_LOG_TARGET, ?duration, "Speaking {} characters.", utterance.text.len());

        let handle = tokio::spawn(async move {
            let _ = tx.send(SpeechEvent::Started);
            println!("\n[ON AIR] {}\n", utterance.text);
            tokio::time::sleep(duration).await;
            let _ = tx.send(SpeechEvent::Ended);
        });

        match self.tasks.lock() {
            Ok(mut tasks) => {
                tasks.retain(|t| !t.is_finished());
                tasks.push(handle);
            }
            Err(poisoned) => warn!(target: CONSOLE_SPEECH_LOG_TARGET, "Speech task list poisoned: {}", poisoned),
        }
        Ok(rx)
    }

    fn cancel_all(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            if !tasks.is_empty() {
                info!(target: CONSOLE_SPEECH_LOG_TARGET, "Cancelling {} utterance(s).", tasks.len());
            }
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}
