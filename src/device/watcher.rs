// src/device/watcher.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{DeviceState, PlaybackDevice};
use crate::radio::RadioCommand;

const WATCHER_LOG_TARGET: &str = "r_radiocli::device::watcher";

/// Polls the device and forwards changes of its active/paused flags to the
/// orchestrator as `DeviceStateChanged` commands.
///
/// The watcher starts from "inactive", so a device that has never been seen
/// active produces no notification. The task ends when the command channel closes.
pub fn spawn_state_watcher(
    device: Arc<dyn PlaybackDevice>,
    period: Duration,
    commands: mpsc::Sender<RadioCommand>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(target: WATCHER_LOG_TARGET, ?period, "Device state watcher started.");
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = DeviceState::inactive();

        loop {
            ticker.tick().await;
            let state = match device.active_state().await {
                Ok(state) => state,
                Err(e) => {
                    warn!(target: WATCHER_LOG_TARGET, "Failed to read device state: {}", e);
                    continue;
                }
            };

            if (state.active, state.paused) == (last.active, last.paused) {
                continue;
            }
            debug!(target: WATCHER_LOG_TARGET, ?state, "Device state changed.");
            last = state;
            if commands.send(RadioCommand::DeviceStateChanged(state)).await.is_err() {
                info!(target: WATCHER_LOG_TARGET, "Command channel closed; watcher exiting.");
                break;
            }
        }
    })
}
