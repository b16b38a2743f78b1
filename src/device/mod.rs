//! External playback device control.
//!
//! The orchestrator only talks to the [`PlaybackDevice`] trait; the web API
//! client and the in-memory simulator are the two implementations.

mod error;
mod simulated;
mod watcher;
mod web_api;
#[cfg(test)]
mod tests;

pub use error::DeviceError;
pub use simulated::{DeviceCall, SimulatedDevice};
pub use watcher::spawn_state_watcher;
pub use web_api::{track_uri, WebApiDevice};

use async_trait::async_trait;

/// Snapshot of the remote player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceState {
    pub active: bool,
    pub paused: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
}

impl DeviceState {
    pub fn inactive() -> Self {
        DeviceState::default()
    }
}

/// Trait defining control of the playback device.
#[async_trait]
pub trait PlaybackDevice: Send + Sync {
    /// Starts `track_id` on the device at `offset_seconds`.
    async fn play_at(&self, track_id: &str, offset_seconds: f64) -> Result<(), DeviceError>;

    async fn pause(&self) -> Result<(), DeviceError>;

    async fn resume(&self) -> Result<(), DeviceError>;

    /// Current device state; an inactive state when nothing is playing here.
    async fn active_state(&self) -> Result<DeviceState, DeviceError>;
}
