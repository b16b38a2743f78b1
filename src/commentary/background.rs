// src/commentary/background.rs
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::time::Instant;
use tracing::trace;

use super::COMMENTARY_LOG_TARGET;

/// Volume changes kept by [`VirtualChannel`]; older ones are dropped.
pub const VOLUME_LOG_CAPACITY: usize = 256;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackgroundError {
    #[error("background channel failed to start: {0}")]
    Playback(String),
}

/// A looping background bed whose volume the commentary player ramps.
pub trait BackgroundChannel: Send + Sync {
    /// Sets the volume, clamped to 0..=1.
    fn set_volume(&self, volume: f32);

    fn volume(&self) -> f32;

    fn play(&self) -> Result<(), BackgroundError>;

    fn pause(&self);

    /// Rewinds the bed to its beginning.
    fn reset(&self);

    fn is_playing(&self) -> bool;
}

#[derive(Debug, Default)]
struct ChannelState {
    volume: f32,
    playing: bool,
    resets: u32,
    fail_play: bool,
    volume_log: VecDeque<(Instant, f32)>,
}

/// In-memory background channel. Holds volume and play state and keeps a
/// timestamped log of the most recent volume changes.
#[derive(Debug, Default)]
pub struct VirtualChannel {
    state: Mutex<ChannelState>,
}

impl VirtualChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes every subsequent `play` fail until cleared.
    pub fn set_fail_play(&self, fail: bool) {
        self.lock().fail_play = fail;
    }

    pub fn resets(&self) -> u32 {
        self.lock().resets
    }

    /// The last [`VOLUME_LOG_CAPACITY`] `set_volume` calls with the (tokio)
    /// instant each happened at, oldest first.
    pub fn volume_log(&self) -> Vec<(Instant, f32)> {
        self.lock().volume_log.iter().copied().collect()
    }

    pub fn clear_volume_log(&self) {
        self.lock().volume_log.clear();
    }
}

impl BackgroundChannel for VirtualChannel {
    fn set_volume(&self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        trace!(target: COMMENTARY_LOG_TARGET, volume, "Background volume.");
        let mut state = self.lock();
        state.volume = volume;
        if state.volume_log.len() == VOLUME_LOG_CAPACITY {
            state.volume_log.pop_front();
        }
        state.volume_log.push_back((Instant::now(), volume));
    }

    fn volume(&self) -> f32 {
        self.lock().volume
    }

    fn play(&self) -> Result<(), BackgroundError> {
        let mut state = self.lock();
        if state.fail_play {
            return Err(BackgroundError::Playback("virtual channel set to fail".to_string()));
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&self) {
        self.lock().playing = false;
    }

    fn reset(&self) {
        self.lock().resets += 1;
    }

    fn is_playing(&self) -> bool {
        self.lock().playing
    }
}
