//! Spoken commentary over a ducked background bed.
//!
//! [`CommentaryPlayer::speak`] always ends in exactly one
//! [`CommentaryEvent::Finished`] unless it is cancelled first. The player is the
//! only writer of the background channel's volume.

mod background;
mod fade;

pub use background::{BackgroundChannel, BackgroundError, VirtualChannel, VOLUME_LOG_CAPACITY};
pub use fade::{FadeSettings, VolumeRamp};

use crate::speech::{build_utterance, SpeechEngine, SpeechError, SpeechEvent, SpeechEvents, VoicePreferences};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

pub(crate) const COMMENTARY_LOG_TARGET: &str = "r_radiocli::commentary";

/// How a commentary ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentaryOutcome {
    Completed,
    /// The engine reported an error mid-utterance.
    Errored(String),
    /// No speech engine is available.
    Unsupported,
    /// Nothing to say (empty text).
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommentaryEvent {
    /// Speech is audible; the song should pause.
    Started,
    /// The bed is faded out and paused.
    Finished(CommentaryOutcome),
}

pub type CommentaryCallback = Box<dyn Fn(CommentaryEvent) + Send + Sync + 'static>;

/// Speaks commentary and ducks the background bed around it.
pub struct CommentaryPlayer {
    speech: Arc<dyn SpeechEngine>,
    channel: Arc<dyn BackgroundChannel>,
    fade: FadeSettings,
    voice: VoicePreferences,
    task: Option<JoinHandle<()>>,
}

impl CommentaryPlayer {
    pub fn new(
        speech: Arc<dyn SpeechEngine>,
        channel: Arc<dyn BackgroundChannel>,
        fade: FadeSettings,
        voice: VoicePreferences,
    ) -> Self {
        CommentaryPlayer { speech, channel, fade, voice, task: None }
    }

    pub fn fade_settings(&self) -> FadeSettings {
        self.fade
    }

    /// Whether a commentary task is still running (speaking or fading).
    pub fn is_active(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Speaks `text`, reporting its lifecycle through `on_event`.
    ///
    /// Any commentary in flight is cancelled and the bed silenced first. Empty
    /// text and an unavailable engine finish immediately without speaking.
    #[instrument(skip(self, text, on_event), fields(chars = text.len()))]
    pub fn speak(&mut self, text: &str, on_event: CommentaryCallback) {
        self.cancel();

        let text = text.trim();
        if text.is_empty() {
            debug!(target: COMMENTARY_LOG_TARGET, "Empty commentary; nothing to say.");
            on_event(CommentaryEvent::Finished(CommentaryOutcome::Skipped));
            return;
        }

        let utterance = build_utterance(text, self.speech.as_ref(), &self.voice);
        let events = match self.speech.speak(utterance) {
            Ok(events) => events,
            Err(SpeechError::Unavailable) => {
                warn!(target: COMMENTARY_LOG_TARGET, "Speech synthesis unavailable; skipping commentary.");
                on_event(CommentaryEvent::Finished(CommentaryOutcome::Unsupported));
                return;
            }
            Err(e) => {
                warn!(target: COMMENTARY_LOG_TARGET, "Speech engine refused commentary: {}", e);
                on_event(CommentaryEvent::Finished(CommentaryOutcome::Errored(e.to_string())));
                return;
            }
        };

        info!(target: COMMENTARY_LOG_TARGET, "Commentary queued.");
        self.task = Some(tokio::spawn(run_commentary(events, self.channel.clone(), self.fade, on_event)));
    }

    /// Stops speech and any fade, and silences the bed. No event is emitted for
    /// the cancelled commentary. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!(target: COMMENTARY_LOG_TARGET, "Cancelling commentary in flight.");
            }
            task.abort();
        }
        self.speech.cancel_all();
        self.channel.set_volume(0.0);
        self.channel.pause();
    }
}

impl Drop for CommentaryPlayer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct FadeIn {
    ramp: VolumeRamp,
    next_at: Instant,
}

async fn run_commentary(
    mut events: SpeechEvents,
    channel: Arc<dyn BackgroundChannel>,
    fade: FadeSettings,
    on_event: CommentaryCallback,
) {
    let step = fade.step_interval();
    let mut fade_in: Option<FadeIn> = None;

    let outcome = loop {
        let deadline = fade_in.as_ref().map_or_else(Instant::now, |f| f.next_at);
        tokio::select! {
            event = events.recv() => match event {
                Some(SpeechEvent::Started) => {
                    on_event(CommentaryEvent::Started);
                    channel.reset();
                    channel.set_volume(0.0);
                    match channel.play() {
                        Ok(()) => {
                            fade_in = Some(FadeIn {
                                ramp: VolumeRamp::new(0.0, fade.target_volume, fade.steps()),
                                next_at: Instant::now() + step,
                            });
                        }
                        Err(e) => warn!(target: COMMENTARY_LOG_TARGET, "Background bed unavailable: {}", e),
                    }
                }
                Some(SpeechEvent::Ended) => break CommentaryOutcome::Completed,
                Some(SpeechEvent::Error(message)) => {
                    warn!(target: COMMENTARY_LOG_TARGET, "Speech failed mid-utterance: {}", message);
                    break CommentaryOutcome::Errored(message);
                }
                None => {
                    warn!(target: COMMENTARY_LOG_TARGET, "Speech events closed without an end.");
                    break CommentaryOutcome::Errored("speech stream closed".to_string());
                }
            },
            _ = sleep_until(deadline), if fade_in.is_some() => {
                if let Some(current) = fade_in.as_mut() {
                    if let Some(volume) = current.ramp.next() {
                        channel.set_volume(volume);
                    }
                    current.next_at += step;
                    if current.ramp.is_done() {
                        fade_in = None;
                    }
                }
            }
        }
    };

    if channel.is_playing() {
        let mut ramp = VolumeRamp::new(channel.volume(), 0.0, fade.steps());
        let mut ticker = interval_at(Instant::now() + step, step);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        while let Some(volume) = ramp.next() {
            ticker.tick().await;
            channel.set_volume(volume);
        }
        channel.pause();
    }

    debug!(target: COMMENTARY_LOG_TARGET, ?outcome, "Commentary finished.");
    on_event(CommentaryEvent::Finished(outcome));
}
