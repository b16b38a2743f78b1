//! Integration tests for plan loading
//!
//! These go from the segmentation service's raw output to a running show.

use crate::test_utils::{fixtures, phases, SpeechScript, TestRadio};
use r_radiocli::plan::{AnalysisResponse, PlanError, SegmentPlan, TrackSummary};
use r_radiocli::radio::{self, Phase};
use r_radiocli::ui::read_plan;
use std::error::Error;
use std::time::Duration;
use tempfile::tempdir;

#[cfg(test)]
mod plan_integration_tests {
    use super::*;

    #[test]
    fn test_analysis_response_to_plan() -> Result<(), Box<dyn Error>> {
        let tracks: Vec<TrackSummary> = serde_json::from_str(fixtures::TRACKS)?;
        let response = AnalysisResponse::parse(fixtures::ANALYSIS_RESPONSE)?;
        let plan = SegmentPlan::from_analysis(&response, &tracks)?;

        assert_eq!(plan.len(), 3);
        let ids: Vec<&str> = plan.segments().iter().map(|s| s.track_id.as_str()).collect();
        assert_eq!(ids, vec!["4uLU6hMCjMI75M1A2tKUQC", "7GhIk7Il098yCjg4BQjzvb", "0VjIjW4GlUZAMYd2vXMi3b"]);
        assert_eq!(plan.segment(1).unwrap().track_name, "Take On Me");
        assert_eq!(plan.segment(1).unwrap().start_offset_seconds, 30.5);
        assert_eq!(plan.commentary_count(), 2);
        assert!(plan.commentary_after(2).is_none());
        assert_eq!(plan.total_music_seconds(), 60.0 + 59.5 + 60.0);
        Ok(())
    }

    #[test]
    fn test_segment_beyond_track_duration_rejected() -> Result<(), Box<dyn Error>> {
        let mut tracks: Vec<TrackSummary> = serde_json::from_str(fixtures::TRACKS)?;
        tracks[0].duration_seconds = Some(100.0);
        let response = AnalysisResponse::parse(fixtures::ANALYSIS_RESPONSE)?;

        assert!(matches!(
            SegmentPlan::from_analysis(&response, &tracks),
            Err(PlanError::BeyondDuration { index: 0, .. })
        ));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_plan_file_plays_through() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let plan_path = dir.path().join("plan.json");
        let tracks_path = dir.path().join("tracks.json");
        std::fs::write(&plan_path, fixtures::ANALYSIS_RESPONSE)?;
        std::fs::write(&tracks_path, fixtures::TRACKS)?;

        let plan = read_plan(&plan_path, Some(&tracks_path))?;
        let mut radio = TestRadio::start(SpeechScript::Speak(Duration::from_secs(3)));
        radio::load_plan(&radio.commands, plan).await?;

        let updates = radio.collect_until_phase(Phase::Finished).await;
        let playing = phases(&updates).iter().filter(|(p, _)| *p == Phase::PlayingSegment).count();
        let commentary = phases(&updates).iter().filter(|(p, _)| *p == Phase::Commentary).count();
        assert_eq!((playing, commentary), (3, 2));
        assert_eq!(
            radio.device.played_tracks(),
            vec!["4uLU6hMCjMI75M1A2tKUQC", "7GhIk7Il098yCjg4BQjzvb", "0VjIjW4GlUZAMYd2vXMi3b"]
        );

        radio.shutdown().await;
        Ok(())
    }
}
