//! Integration tests for spoken commentary over the background bed

use crate::test_utils::{MockSpeech, SpeechScript};
use r_radiocli::commentary::{
    BackgroundChannel, CommentaryCallback, CommentaryEvent, CommentaryOutcome, CommentaryPlayer, FadeSettings,
    VirtualChannel,
};
use r_radiocli::speech::{ConsoleSpeech, VoicePreferences};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[cfg(test)]
mod commentary_integration_tests {
    use super::*;

    fn events() -> (CommentaryCallback, mpsc::UnboundedReceiver<(Instant, CommentaryEvent)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: CommentaryCallback = Box::new(move |event: CommentaryEvent| {
            let _ = tx.send((Instant::now(), event));
        });
        (callback, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_console_speech_ducks_and_restores() {
        let channel = Arc::new(VirtualChannel::new());
        let speech = Arc::new(ConsoleSpeech::new(120));
        let mut player = CommentaryPlayer::new(speech, channel.clone(), FadeSettings::default(), VoicePreferences::default());
        let (callback, mut rx) = events();

        // Six words at 120 wpm and rate 1.15 take a little over 2.6s
        player.speak("That was a great track, everyone.", callback);

        let (started_at, started) = rx.recv().await.unwrap();
        assert_eq!(started, CommentaryEvent::Started);
        let (finished_at, finished) = rx.recv().await.unwrap();
        assert_eq!(finished, CommentaryEvent::Finished(CommentaryOutcome::Completed));

        let on_air = finished_at - started_at;
        assert!(on_air >= Duration::from_millis(2600 + 1500), "finished after {:?}", on_air);
        assert!(on_air < Duration::from_millis(2700 + 1500 + 50), "finished after {:?}", on_air);

        let peak = channel.volume_log().iter().map(|(_, v)| *v).fold(0.0f32, f32::max);
        assert!((peak - 0.15).abs() < 1e-6);
        assert_eq!(channel.volume(), 0.0);
        assert!(!channel.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_fade_settings() {
        let channel = Arc::new(VirtualChannel::new());
        let speech = Arc::new(MockSpeech::new(SpeechScript::Speak(Duration::from_secs(5))));
        let fade = FadeSettings { duration_ms: 1000, step_ms: 100, target_volume: 0.4 };
        let mut player = CommentaryPlayer::new(speech.clone(), channel.clone(), fade, VoicePreferences::default());
        let (callback, mut rx) = events();

        player.speak("Slow fade.", callback);
        let (started_at, _) = rx.recv().await.unwrap();
        channel.clear_volume_log();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let log = channel.volume_log();
        assert_eq!(log.len(), 10);
        assert_eq!(log.last().unwrap().0 - started_at, Duration::from_millis(1000));
        assert!((channel.volume() - 0.4).abs() < 1e-6);

        let (_, finished) = rx.recv().await.unwrap();
        assert_eq!(finished, CommentaryEvent::Finished(CommentaryOutcome::Completed));
        assert_eq!(speech.spoken(), vec!["Slow fade.".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speech_error_reports_after_fade_out() {
        let channel = Arc::new(VirtualChannel::new());
        let speech = Arc::new(MockSpeech::new(SpeechScript::FailAfter(Duration::from_secs(3))));
        let mut player = CommentaryPlayer::new(speech, channel.clone(), FadeSettings::default(), VoicePreferences::default());
        let (callback, mut rx) = events();

        player.speak("This will not finish.", callback);
        let (started_at, _) = rx.recv().await.unwrap();
        let (finished_at, finished) = rx.recv().await.unwrap();

        assert_eq!(finished, CommentaryEvent::Finished(CommentaryOutcome::Errored("synthesis-failed".to_string())));
        assert_eq!(finished_at - started_at, Duration::from_millis(3000 + 1500));
        assert!(!channel.is_playing());
    }
}
