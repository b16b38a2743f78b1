use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Background-bed fade parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeSettings {
    pub duration_ms: u64,
    pub step_ms: u64,
    /// Volume the bed settles at while commentary is on air (0..=1).
    pub target_volume: f32,
}

impl Default for FadeSettings {
    fn default() -> Self {
        FadeSettings { duration_ms: 1500, step_ms: 50, target_volume: 0.15 }
    }
}

impl FadeSettings {
    /// Number of equal volume steps in one fade. Always at least 1.
    pub fn steps(&self) -> u32 {
        if self.step_ms == 0 {
            return 1;
        }
        (self.duration_ms / self.step_ms).max(1) as u32
    }

    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_ms.max(1))
    }
}

/// Linear volume ramp from `from` to `to` in a fixed number of equal steps.
///
/// Yields the volume to apply after each step; the last value is exactly `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeRamp {
    from: f32,
    to: f32,
    steps: u32,
    taken: u32,
}

impl VolumeRamp {
    pub fn new(from: f32, to: f32, steps: u32) -> Self {
        VolumeRamp { from: from.clamp(0.0, 1.0), to: to.clamp(0.0, 1.0), steps: steps.max(1), taken: 0 }
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn remaining(&self) -> u32 {
        self.steps - self.taken
    }

    pub fn is_done(&self) -> bool {
        self.taken >= self.steps
    }
}

impl Iterator for VolumeRamp {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.is_done() {
            return None;
        }
        self.taken += 1;
        if self.taken == self.steps {
            return Some(self.to);
        }
        let progress = self.taken as f32 / self.steps as f32;
        Some((self.from + (self.to - self.from) * progress).clamp(0.0, 1.0))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining() as usize;
        (remaining, Some(remaining))
    }
}
