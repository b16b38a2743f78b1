//! Parsing of the segmentation/commentary service's JSON response.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{CommentaryEntry, PlanError, SegmentPlan, SongSegment, PLAN_LOG_TARGET};

/// Track metadata sent to the segmentation service.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub track_id: String,
    pub track_name: String,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub album_name: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub popularity: Option<u32>,
}

/// Top-level response of the segmentation service.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AnalysisResponse {
    pub song_segments: Vec<AnalysisSegment>,
    #[serde(default)]
    pub radio_commentary: Vec<AnalysisCommentary>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AnalysisSegment {
    #[serde(default)]
    pub track_id: String,
    #[serde(default)]
    pub track_name: String,
    pub best_segment_start_seconds: f64,
    pub best_segment_end_seconds: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AnalysisCommentary {
    pub insert_after_track_index: usize,
    #[serde(default)]
    pub commentary_text: String,
}

/// Removes a surrounding ```` ```json ```` fence, if the service added one.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```json").or_else(|| trimmed.strip_prefix("```")) else {
        return trimmed;
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

impl AnalysisResponse {
    /// Parses raw service output, tolerating a markdown code fence.
    pub fn parse(text: &str) -> Result<Self, PlanError> {
        Ok(serde_json::from_str(strip_code_fence(text))?)
    }

    /// Commentary for a plan of the first `segment_count` segments. Entries
    /// after a dropped segment go with it; everything else is left for
    /// `SegmentPlan::new` to validate.
    fn commentary_entries(&self, segment_count: usize) -> Vec<CommentaryEntry> {
        let truncated = segment_count < self.song_segments.len();
        let gaps = segment_count.saturating_sub(1);
        self.radio_commentary
            .iter()
            .filter(|c| {
                let kept = !truncated || c.insert_after_track_index < gaps;
                if !kept {
                    warn!(target: PLAN_LOG_TARGET, after_index = c.insert_after_track_index, "Dropping commentary for a dropped segment.");
                }
                kept
            })
            .map(|c| CommentaryEntry::new(c.insert_after_track_index, &c.commentary_text))
            .collect()
    }
}

impl SegmentPlan {
    /// Builds a plan from a service response, taking track ids and names from
    /// the input tracks at the same position rather than trusting the response.
    ///
    /// Segments beyond the track list are dropped along with the commentary
    /// that follows them. Fewer segments than tracks is rejected.
    pub fn from_analysis(response: &AnalysisResponse, tracks: &[TrackSummary]) -> Result<Self, PlanError> {
        if response.song_segments.len() < tracks.len() {
            return Err(PlanError::SegmentCount { expected: tracks.len(), actual: response.song_segments.len() });
        }
        if response.song_segments.len() > tracks.len() {
            warn!(
                target: PLAN_LOG_TARGET,
                "Response has {} segments for {} tracks; dropping the extras.",
                response.song_segments.len(),
                tracks.len()
            );
        }

        let segments = response
            .song_segments
            .iter()
            .zip(tracks)
            .map(|(segment, track)| {
                let mut song = SongSegment::new(
                    &track.track_id,
                    &track.track_name,
                    segment.best_segment_start_seconds,
                    segment.best_segment_end_seconds,
                );
                song.duration_seconds = track.duration_seconds;
                song
            })
            .collect::<Vec<_>>();

        let plan = SegmentPlan::new(segments, response.commentary_entries(tracks.len()))?;
        info!(target: PLAN_LOG_TARGET, "Built plan with {} segments and {} commentary entries.", plan.len(), plan.commentary_count());
        Ok(plan)
    }

    /// Builds a plan using the ids carried in the response itself.
    pub fn from_analysis_untracked(response: &AnalysisResponse) -> Result<Self, PlanError> {
        let segments = response
            .song_segments
            .iter()
            .map(|s| SongSegment::new(&s.track_id, &s.track_name, s.best_segment_start_seconds, s.best_segment_end_seconds))
            .collect();
        SegmentPlan::new(segments, response.commentary_entries(response.song_segments.len()))
    }
}
