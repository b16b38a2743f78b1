// src/device/simulated.rs
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

use super::{DeviceError, DeviceState, PlaybackDevice};

const SIMULATED_LOG_TARGET: &str = "r_radiocli::device::simulated";

/// A command received by the simulated device.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    PlayAt { track_id: String, offset_seconds: f64 },
    Pause,
    Resume,
}

#[derive(Debug, Default)]
struct SimulatedInner {
    state: DeviceState,
    calls: Vec<DeviceCall>,
    play_failures: VecDeque<String>,
    play_delay: Option<Duration>,
}

/// In-memory device for dry runs and tests. Accepts every command unless a
/// failure was queued, and records what it was asked to do.
#[derive(Debug, Default)]
pub struct SimulatedDevice {
    inner: Mutex<SimulatedInner>,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedInner> {
        // A poisoned lock only means a test panicked mid-call; keep the data.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.lock().calls.clone()
    }

    /// Track ids passed to `play_at`, in order.
    pub fn played_tracks(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::PlayAt { track_id, .. } => Some(track_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Makes the next `play_at` call fail with `message`.
    pub fn fail_next_play(&self, message: &str) {
        self.lock().play_failures.push_back(message.to_string());
    }

    /// Delays every `play_at` answer, to exercise timeouts and stale results.
    pub fn set_play_delay(&self, delay: Option<Duration>) {
        self.lock().play_delay = delay;
    }

    pub fn set_active(&self, active: bool) {
        self.lock().state.active = active;
    }
}

#[async_trait]
impl PlaybackDevice for SimulatedDevice {
    async fn play_at(&self, track_id: &str, offset_seconds: f64) -> Result<(), DeviceError> {
        let delay = {
            let mut inner = self.lock();
            inner.calls.push(DeviceCall::PlayAt { track_id: track_id.to_string(), offset_seconds });
            inner.play_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();
        if let Some(message) = inner.play_failures.pop_front() {
            debug!(target: SIMULATED_LOG_TARGET, track_id, "Simulated play failure: {}", message);
            return Err(DeviceError::Rejected { status: 502, body: message });
        }
        info!(target: SIMULATED_LOG_TARGET, "Playing {} from {:.1}s", track_id, offset_seconds);
        inner.state = DeviceState {
            active: true,
            paused: false,
            position_ms: (offset_seconds * 1000.0) as u64,
            duration_ms: inner.state.duration_ms,
        };
        Ok(())
    }

    async fn pause(&self) -> Result<(), DeviceError> {
        let mut inner = self.lock();
        inner.calls.push(DeviceCall::Pause);
        inner.state.paused = true;
        Ok(())
    }

    async fn resume(&self) -> Result<(), DeviceError> {
        let mut inner = self.lock();
        inner.calls.push(DeviceCall::Resume);
        if !inner.state.active {
            return Err(DeviceError::Inactive);
        }
        inner.state.paused = false;
        Ok(())
    }

    async fn active_state(&self) -> Result<DeviceState, DeviceError> {
        Ok(self.lock().state)
    }
}
