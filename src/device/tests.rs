//! Tests for device clients

#[cfg(test)]
mod tests {
    use super::super::web_api::parse_player_state;
    use super::super::*;
    use crate::radio::RadioCommand;
    use crate::session::Session;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};
    use tokio::sync::mpsc;

    #[test]
    fn test_track_uri() {
        assert_eq!(track_uri("abc123"), "spotify:track:abc123");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let device = WebApiDevice::new("https://api.example.com/v1", "dev-1", Session::new("tok")).unwrap();
        let url = device.endpoint("me/player/play", true).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/me/player/play?device_id=dev-1");

        let url = device.endpoint("me/player", false).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/me/player");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            WebApiDevice::new("not a url", "dev", Session::new("tok")),
            Err(DeviceError::Url(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_session_fails_before_network() {
        let expired = Session::new("tok").with_expiry(SystemTime::now() - Duration::from_secs(1));
        let device = WebApiDevice::new("http://127.0.0.1:9", "dev", expired).unwrap();
        assert!(matches!(device.play_at("t1", 0.0).await, Err(DeviceError::SessionExpired)));
        assert!(matches!(device.active_state().await, Err(DeviceError::SessionExpired)));
    }

    #[test]
    fn test_parse_player_state() {
        let body = r#"{"is_playing":true,"progress_ms":4200,"item":{"duration_ms":180000},"device":{"id":"dev-1"}}"#;
        let state = parse_player_state(body, "dev-1").unwrap();
        assert_eq!(
            state,
            DeviceState { active: true, paused: false, position_ms: 4200, duration_ms: 180000 }
        );

        // Playing somewhere else
        let state = parse_player_state(body, "dev-2").unwrap();
        assert!(!state.active);

        let state = parse_player_state(r#"{"is_playing":false}"#, "dev-1").unwrap();
        assert!(state.active);
        assert!(state.paused);

        assert_eq!(parse_player_state("", "dev-1").unwrap(), DeviceState::inactive());
        assert!(matches!(parse_player_state("{", "dev-1"), Err(DeviceError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_simulated_device_records_calls() {
        let device = SimulatedDevice::new();
        device.play_at("t1", 12.5).await.unwrap();
        device.pause().await.unwrap();
        device.resume().await.unwrap();

        assert_eq!(
            device.calls(),
            vec![
                DeviceCall::PlayAt { track_id: "t1".to_string(), offset_seconds: 12.5 },
                DeviceCall::Pause,
                DeviceCall::Resume,
            ]
        );
        let state = device.active_state().await.unwrap();
        assert!(state.active);
        assert!(!state.paused);
        assert_eq!(state.position_ms, 12500);
    }

    #[tokio::test]
    async fn test_simulated_device_queued_failure() {
        let device = SimulatedDevice::new();
        device.fail_next_play("boom");
        assert!(matches!(device.play_at("t1", 0.0).await, Err(DeviceError::Rejected { status: 502, .. })));
        assert!(device.play_at("t1", 0.0).await.is_ok());
        assert_eq!(device.played_tracks(), vec!["t1".to_string(), "t1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_reports_changes_only() {
        let device = Arc::new(SimulatedDevice::new());
        let (tx, mut rx) = mpsc::channel(8);
        let handle = spawn_state_watcher(device.clone(), Duration::from_secs(1), tx);

        // Never-active device stays silent
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(rx.try_recv().is_err());

        device.set_active(true);
        match rx.recv().await {
            Some(RadioCommand::DeviceStateChanged(state)) => assert!(state.active),
            other => panic!("unexpected command: {:?}", other),
        }

        device.set_active(false);
        match rx.recv().await {
            Some(RadioCommand::DeviceStateChanged(state)) => assert!(!state.active),
            other => panic!("unexpected command: {:?}", other),
        }

        handle.abort();
    }
}
