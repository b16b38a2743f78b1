//! Integration tests for the radio orchestrator
//!
//! These run the full radio task against the simulated device, a scripted
//! speech engine and the virtual background channel, on paused tokio time.

use crate::test_utils::{phases, uniform_plan, SpeechScript, TestRadio};
use r_radiocli::commentary::BackgroundChannel;
use r_radiocli::device::{spawn_state_watcher, DeviceCall};
use r_radiocli::radio::{self, Phase, RadioCommand, RadioError, RadioOptions, RadioStateUpdate};
use std::time::Duration;

#[cfg(test)]
mod orchestration_integration_tests {
    use super::*;
    use Phase::*;

    #[tokio::test(start_paused = true)]
    async fn test_three_segments_with_two_commentaries() {
        let mut radio = TestRadio::start(SpeechScript::Speak(Duration::from_secs(4)));
        radio::load_plan(&radio.commands, uniform_plan(3, 0.0, 90.0, &[0, 1])).await.unwrap();

        let started = tokio::time::Instant::now();
        let updates = radio.collect_until_phase(Finished).await;

        assert_eq!(
            phases(&updates),
            vec![
                (PlayingSegment, Some(0)),
                (BoundaryReached, Some(0)),
                (Commentary, Some(0)),
                (Advancing, Some(0)),
                (PlayingSegment, Some(1)),
                (BoundaryReached, Some(1)),
                (Commentary, Some(1)),
                (Advancing, Some(1)),
                (PlayingSegment, Some(2)),
                (BoundaryReached, Some(2)),
                (Advancing, Some(2)),
                (Finished, Some(2)),
            ]
        );

        // Three 90s segments, never cut short
        assert!(started.elapsed() >= Duration::from_secs(270));
        let commentaries: Vec<usize> = updates
            .iter()
            .filter_map(|u| match u {
                RadioStateUpdate::CommentaryStarted { after_index, .. } => Some(*after_index),
                _ => None,
            })
            .collect();
        assert_eq!(commentaries, vec![0, 1]);
        assert_eq!(radio.speech.spoken(), vec!["That was track 0.".to_string(), "That was track 1.".to_string()]);
        assert_eq!(radio.device.played_tracks(), vec!["t0", "t1", "t2"]);

        assert!(!radio.channel.is_playing());

        let device = radio.device.clone();
        radio.shutdown().await;
        // Song paused for each commentary, then once at the end
        let pauses = device.calls().iter().filter(|c| **c == DeviceCall::Pause).count();
        assert_eq!(pauses, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_segment_plan() {
        let mut radio = TestRadio::start(SpeechScript::Speak(Duration::from_secs(4)));
        radio::load_plan(&radio.commands, uniform_plan(1, 20.0, 50.0, &[])).await.unwrap();

        let updates = radio.collect_until_phase(Finished).await;
        assert_eq!(
            phases(&updates),
            vec![(PlayingSegment, Some(0)), (BoundaryReached, Some(0)), (Advancing, Some(0)), (Finished, Some(0))]
        );
        let progress = updates.iter().filter(|u| matches!(u, RadioStateUpdate::Progress { .. })).count();
        // 30 ticks, the last of which crosses the boundary
        assert_eq!(progress, 29);
        assert!(radio.speech.spoken().is_empty());
        assert_eq!(
            radio.device.calls().first(),
            Some(&DeviceCall::PlayAt { track_id: "t0".to_string(), offset_seconds: 20.0 })
        );

        radio.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_inactive_mid_segment_then_reload() {
        let mut radio = TestRadio::start(SpeechScript::Speak(Duration::from_secs(4)));
        let watcher = spawn_state_watcher(radio.device.clone(), Duration::from_secs(5), radio.commands.clone());
        radio::load_plan(&radio.commands, uniform_plan(3, 0.0, 90.0, &[0, 1])).await.unwrap();

        // Let the segment run a while, then lose the device
        radio
            .collect_until(|u| matches!(u, RadioStateUpdate::Progress { elapsed_ms, .. } if *elapsed_ms >= 30_000))
            .await;
        radio.device.set_active(false);

        let updates = radio.collect_until_phase(Idle).await;
        assert!(updates.iter().any(|u| matches!(u, RadioStateUpdate::Error(_))));
        let state = radio::get_state(&radio.commands).await.unwrap();
        assert_eq!(state.phase, Idle);
        assert!(state.cursor.is_none());

        // A fresh plan starts over from the first segment
        radio::load_plan(&radio.commands, uniform_plan(2, 0.0, 10.0, &[0])).await.unwrap();
        let updates = radio.collect_until_phase(Finished).await;
        assert_eq!(phases(&updates)[0], (PlayingSegment, Some(0)));
        assert_eq!(radio.device.played_tracks(), vec!["t0", "t0", "t1"]);

        watcher.abort();
        radio.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_commentary_stops_everything() {
        let mut radio = TestRadio::start(SpeechScript::Speak(Duration::from_secs(20)));
        radio::load_plan(&radio.commands, uniform_plan(3, 0.0, 10.0, &[0, 1])).await.unwrap();

        radio.collect_until(|u| matches!(u, RadioStateUpdate::CommentaryStarted { .. })).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(radio.channel.volume() > 0.0);

        radio.commands.send(RadioCommand::Cancel).await.unwrap();
        radio.collect_until_phase(Idle).await;
        assert_eq!(radio.channel.volume(), 0.0);
        assert!(!radio.channel.is_playing());

        // Old speech and timers would have finished by now
        tokio::time::sleep(Duration::from_secs(120)).await;
        while let Ok(update) = radio.updates.try_recv() {
            assert!(
                !matches!(update, RadioStateUpdate::PhaseChanged { .. } | RadioStateUpdate::Progress { .. }),
                "unexpected update after cancel: {:?}",
                update
            );
        }
        assert_eq!(radio.device.played_tracks(), vec!["t0"]);

        // Cancelling again is harmless
        radio.commands.send(RadioCommand::Cancel).await.unwrap();
        let state = radio::get_state(&radio.commands).await.unwrap();
        assert_eq!(state.phase, Idle);

        radio.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_speech_failure_still_advances() {
        let mut radio = TestRadio::start(SpeechScript::FailAfter(Duration::from_secs(1)));
        radio::load_plan(&radio.commands, uniform_plan(2, 0.0, 5.0, &[0])).await.unwrap();

        radio.collect_until_phase(Commentary).await;
        let commentary_at = tokio::time::Instant::now();
        radio.collect_until_phase(Advancing).await;
        // One second of speech plus the fade-out
        assert!(commentary_at.elapsed() <= Duration::from_secs(3));

        let updates = radio.collect_until_phase(Finished).await;
        assert!(!updates.iter().any(|u| matches!(u, RadioStateUpdate::Error(_))));

        radio.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_speech_skips_commentary() {
        let mut radio = TestRadio::start(SpeechScript::Unavailable);
        radio::load_plan(&radio.commands, uniform_plan(2, 0.0, 5.0, &[0])).await.unwrap();

        let updates = radio.collect_until_phase(Finished).await;
        assert_eq!(phases(&updates).iter().filter(|(p, _)| *p == Commentary).count(), 1);
        assert!(!updates.iter().any(|u| matches!(u, RadioStateUpdate::CommentaryStarted { .. })));

        let device = radio.device.clone();
        radio.shutdown().await;
        // No speech start, so only the final pause
        let pauses = device.calls().iter().filter(|c| **c == DeviceCall::Pause).count();
        assert_eq!(pauses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_failure_fails_without_retry() {
        let mut radio = TestRadio::start(SpeechScript::Speak(Duration::from_secs(1)));
        radio.device.fail_next_play("Player command failed: Restriction violated");
        radio::load_plan(&radio.commands, uniform_plan(2, 0.0, 5.0, &[0])).await.unwrap();

        let updates = radio.collect_until_phase(Failed).await;
        let errors: Vec<&String> = updates
            .iter()
            .filter_map(|u| match u {
                RadioStateUpdate::Error(message) => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Restriction violated"));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(radio.device.played_tracks(), vec!["t0"]);

        // A failed run accepts a new plan
        radio::load_plan(&radio.commands, uniform_plan(1, 0.0, 2.0, &[])).await.unwrap();
        radio.collect_until_phase(Finished).await;

        radio.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_device_times_out() {
        let options = RadioOptions { play_timeout: Duration::from_secs(10), state_update_capacity: 1024, ..RadioOptions::default() };
        let mut radio = TestRadio::start_with(SpeechScript::Speak(Duration::from_secs(1)), options);
        radio.device.set_play_delay(Some(Duration::from_secs(60)));
        radio::load_plan(&radio.commands, uniform_plan(2, 0.0, 5.0, &[0])).await.unwrap();

        let started = tokio::time::Instant::now();
        radio.collect_until_phase(Failed).await;
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(started.elapsed() < Duration::from_secs(60));

        radio.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_while_running_is_rejected() {
        let mut radio = TestRadio::start(SpeechScript::Speak(Duration::from_secs(1)));
        radio::load_plan(&radio.commands, uniform_plan(2, 0.0, 30.0, &[0])).await.unwrap();
        radio.collect_until_phase(PlayingSegment).await;

        let err = radio::load_plan(&radio.commands, uniform_plan(1, 0.0, 5.0, &[])).await.unwrap_err();
        assert_eq!(err, RadioError::InvalidState(PlayingSegment));

        radio.commands.send(RadioCommand::Cancel).await.unwrap();
        radio::load_plan(&radio.commands, uniform_plan(1, 0.0, 5.0, &[])).await.unwrap();
        radio.collect_until_phase(Finished).await;

        radio.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_resume_and_skip_commands() {
        let mut radio = TestRadio::start(SpeechScript::Speak(Duration::from_secs(2)));
        radio::load_plan(&radio.commands, uniform_plan(2, 0.0, 20.0, &[0])).await.unwrap();

        radio
            .collect_until(|u| matches!(u, RadioStateUpdate::Progress { elapsed_ms, .. } if *elapsed_ms >= 5_000))
            .await;
        radio.commands.send(RadioCommand::Pause).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        let state = radio::get_state(&radio.commands).await.unwrap();
        assert_eq!(state.phase, PlayingSegment);
        let paused_at = state.cursor.unwrap().elapsed_ms;
        assert!(paused_at <= 6_000);

        radio.commands.send(RadioCommand::Resume).await.unwrap();
        radio.commands.send(RadioCommand::Skip).await.unwrap();
        radio.collect_until_phase(Commentary).await;
        radio.commands.send(RadioCommand::Skip).await.unwrap();
        let updates = radio.collect_until_phase(PlayingSegment).await;
        assert_eq!(phases(&updates).last(), Some(&(PlayingSegment, Some(1))));

        let device = radio.device.clone();
        radio.shutdown().await;
        assert!(device.calls().contains(&DeviceCall::Resume));
    }
}
