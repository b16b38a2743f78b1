//! Segment plan: per-track play windows plus the commentary spoken between them

mod analysis;

pub use analysis::*;

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

const PLAN_LOG_TARGET: &str = "r_radiocli::plan";

/// Error types for plan construction and parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    #[error("plan has no segments")]
    Empty,
    #[error("segment {index}: track id is empty")]
    MissingTrackId { index: usize },
    #[error("segment {index}: invalid offsets {start}s..{end}s")]
    InvalidOffsets { index: usize, start: f64, end: f64 },
    #[error("segment {index}: end offset {end}s is beyond the track duration {duration}s")]
    BeyondDuration { index: usize, end: f64, duration: f64 },
    #[error("commentary after index {after_index} is out of range for {segment_count} segments")]
    CommentaryOutOfRange { after_index: usize, segment_count: usize },
    #[error("commentary after index {after_index} has no text")]
    EmptyCommentary { after_index: usize },
    #[error("expected {expected} commentary entries, got {actual}")]
    CommentaryCount { expected: usize, actual: usize },
    #[error("expected {expected} segments, got {actual}")]
    SegmentCount { expected: usize, actual: usize },
    #[error("malformed analysis response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::Malformed(err.to_string())
    }
}

/// A bounded window of one track chosen for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct SongSegment {
    pub track_id: String,
    /// Display label only.
    pub track_name: String,
    pub start_offset_seconds: f64,
    pub end_offset_seconds: f64,
    /// Known track duration, used to check the end boundary is reachable.
    pub duration_seconds: Option<f64>,
}

impl SongSegment {
    pub fn new(track_id: &str, track_name: &str, start_offset_seconds: f64, end_offset_seconds: f64) -> Self {
        SongSegment {
            track_id: track_id.to_string(),
            track_name: track_name.to_string(),
            start_offset_seconds,
            end_offset_seconds,
            duration_seconds: None,
        }
    }

    pub fn with_duration(mut self, duration_seconds: f64) -> Self {
        self.duration_seconds = Some(duration_seconds);
        self
    }

    /// End boundary in milliseconds.
    pub fn end_ms(&self) -> u64 {
        (self.end_offset_seconds * 1000.0).ceil() as u64
    }

    /// Length of the play window in seconds.
    pub fn window_seconds(&self) -> f64 {
        self.end_offset_seconds - self.start_offset_seconds
    }

    fn validate(&self, index: usize) -> Result<(), PlanError> {
        if self.track_id.trim().is_empty() {
            return Err(PlanError::MissingTrackId { index });
        }
        let (start, end) = (self.start_offset_seconds, self.end_offset_seconds);
        if !start.is_finite() || !end.is_finite() || start < 0.0 || start >= end {
            return Err(PlanError::InvalidOffsets { index, start, end });
        }
        if let Some(duration) = self.duration_seconds {
            if end > duration {
                return Err(PlanError::BeyondDuration { index, end, duration });
            }
        }
        Ok(())
    }
}

/// Spoken narration inserted after the segment at `after_index`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentaryEntry {
    pub after_index: usize,
    pub text: String,
}

impl CommentaryEntry {
    pub fn new(after_index: usize, text: &str) -> Self {
        CommentaryEntry { after_index, text: text.to_string() }
    }
}

/// The ordered, immutable playback plan.
///
/// Built once through [`SegmentPlan::new`] and shared read-only afterwards;
/// loading a different plan replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPlan {
    segments: Vec<SongSegment>,
    commentary: BTreeMap<usize, CommentaryEntry>,
}

impl SegmentPlan {
    /// Validates and builds a plan.
    ///
    /// There must be exactly one commentary entry per gap between segments,
    /// counted before duplicates are dropped. When two entries share an
    /// `after_index` the first one is kept and that gap advances directly.
    pub fn new(segments: Vec<SongSegment>, commentary: Vec<CommentaryEntry>) -> Result<Self, PlanError> {
        if segments.is_empty() {
            return Err(PlanError::Empty);
        }
        for (index, segment) in segments.iter().enumerate() {
            segment.validate(index)?;
        }

        let gaps = segments.len() - 1;
        if commentary.len() != gaps {
            return Err(PlanError::CommentaryCount { expected: gaps, actual: commentary.len() });
        }

        let mut by_index = BTreeMap::new();
        for entry in commentary {
            if entry.after_index >= gaps {
                return Err(PlanError::CommentaryOutOfRange {
                    after_index: entry.after_index,
                    segment_count: segments.len(),
                });
            }
            if entry.text.trim().is_empty() {
                return Err(PlanError::EmptyCommentary { after_index: entry.after_index });
            }
            if by_index.contains_key(&entry.after_index) {
                warn!(target: PLAN_LOG_TARGET, after_index = entry.after_index, "Duplicate commentary entry dropped; keeping the first one.");
                continue;
            }
            by_index.insert(entry.after_index, entry);
        }

        if by_index.len() < gaps {
            debug!(target: PLAN_LOG_TARGET, "Plan has {} of {} commentary slots filled.", by_index.len(), gaps);
        }

        Ok(SegmentPlan { segments, commentary: by_index })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false for a constructed plan; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, index: usize) -> Option<&SongSegment> {
        self.segments.get(index)
    }

    pub fn segments(&self) -> &[SongSegment] {
        &self.segments
    }

    /// Commentary to speak once the segment at `index` has ended.
    pub fn commentary_after(&self, index: usize) -> Option<&CommentaryEntry> {
        self.commentary.get(&index)
    }

    pub fn commentary_count(&self) -> usize {
        self.commentary.len()
    }

    pub fn commentary(&self) -> impl Iterator<Item = &CommentaryEntry> {
        self.commentary.values()
    }

    /// Sum of all segment windows, excluding commentary.
    pub fn total_music_seconds(&self) -> f64 {
        self.segments.iter().map(SongSegment::window_seconds).sum()
    }
}
