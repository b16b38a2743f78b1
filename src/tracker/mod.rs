//! Position tracking for the segment that is currently playing.
//!
//! The tracker never reads the device clock. It counts fixed ticks from the
//! moment a segment starts, which keeps boundary detection deterministic and
//! lets tests drive it without a real player.

mod ticker;

pub use ticker::Ticker;

use crate::plan::SongSegment;
use std::time::Duration;
use tracing::{debug, trace};

const TRACKER_LOG_TARGET: &str = "r_radiocli::tracker";

/// Default tick granularity.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Conditions that must all hold for the tracker to advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackingGate {
    /// Orchestrator is in `PlayingSegment` and the play command was confirmed.
    pub segment_playing: bool,
    pub device_active: bool,
    pub device_paused: bool,
    pub speaking: bool,
}

impl TrackingGate {
    pub fn is_open(&self) -> bool {
        self.segment_playing && self.device_active && !self.device_paused && !self.speaking
    }
}

/// Result of feeding one tick to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Gate closed or no segment armed; the counter did not move.
    Suspended,
    Advanced { elapsed_ms: u64 },
    /// Emitted once per segment.
    BoundaryCrossed { elapsed_ms: u64 },
}

/// Counts elapsed time within a segment and flags its end boundary.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    tick_ms: u64,
    elapsed_ms: u64,
    start_seconds: f64,
    end_seconds: f64,
    armed: bool,
    crossed: bool,
}

impl PositionTracker {
    pub fn new(tick_interval: Duration) -> Self {
        PositionTracker {
            tick_ms: tick_interval.as_millis().max(1) as u64,
            elapsed_ms: 0,
            start_seconds: 0.0,
            end_seconds: 0.0,
            armed: false,
            crossed: false,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Resets the counter to 0 and arms the tracker for `segment`.
    pub fn begin_segment(&mut self, segment: &SongSegment) {
        debug!(
            target: TRACKER_LOG_TARGET,
            track_id = %segment.track_id,
            "Tracking segment {:.1}s..{:.1}s",
            segment.start_offset_seconds,
            segment.end_offset_seconds
        );
        self.elapsed_ms = 0;
        self.start_seconds = segment.start_offset_seconds;
        self.end_seconds = segment.end_offset_seconds;
        self.armed = true;
        self.crossed = false;
    }

    /// Stops tracking entirely; the next segment must call `begin_segment`.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.elapsed_ms = 0;
        self.crossed = false;
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Track position implied by the counter, in seconds.
    pub fn position_seconds(&self) -> f64 {
        self.start_seconds + self.elapsed_ms as f64 / 1000.0
    }

    pub fn has_crossed(&self) -> bool {
        self.crossed
    }

    /// Whether ticks should currently be scheduled at all.
    pub fn wants_ticks(&self, gate: TrackingGate) -> bool {
        self.armed && !self.crossed && gate.is_open()
    }

    pub fn tick(&mut self, gate: TrackingGate) -> TickOutcome {
        if !self.wants_ticks(gate) {
            trace!(target: TRACKER_LOG_TARGET, ?gate, "Tick ignored while suspended.");
            return TickOutcome::Suspended;
        }

        self.elapsed_ms += self.tick_ms;
        // Compare the reached position with the end offset; never end early.
        if self.position_seconds() >= self.end_seconds {
            self.crossed = true;
            debug!(target: TRACKER_LOG_TARGET, elapsed_ms = self.elapsed_ms, "Segment boundary crossed.");
            TickOutcome::BoundaryCrossed { elapsed_ms: self.elapsed_ms }
        } else {
            TickOutcome::Advanced { elapsed_ms: self.elapsed_ms }
        }
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}
