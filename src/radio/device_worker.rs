// src/radio/device_worker.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, trace, warn};

use super::{RadioEvent, Token, RADIO_LOG_TARGET};
use crate::device::{DeviceError, PlaybackDevice};

/// A device call requested by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum DeviceOp {
    Play { token: Token, track_id: String, offset_seconds: f64 },
    Pause,
    Resume,
}

/// Runs device calls one at a time, in the order they were requested, and
/// reports play results back as tokened events.
///
/// Queued plays from an older epoch are skipped without touching the device.
#[derive(Debug)]
pub(super) struct DeviceWorker {
    ops_tx: mpsc::UnboundedSender<DeviceOp>,
    current_epoch: Arc<AtomicU64>,
    handle: JoinHandle<()>,
}

impl DeviceWorker {
    pub(super) fn spawn(
        device: Arc<dyn PlaybackDevice>,
        play_timeout: Duration,
        events: mpsc::UnboundedSender<RadioEvent>,
    ) -> Self {
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        let current_epoch = Arc::new(AtomicU64::new(0));
        let handle = tokio::spawn(run_device_worker(ops_rx, device, play_timeout, current_epoch.clone(), events));
        DeviceWorker { ops_tx, current_epoch, handle }
    }

    pub(super) fn set_epoch(&self, epoch: u64) {
        self.current_epoch.store(epoch, Ordering::SeqCst);
    }

    pub(super) fn submit(&self, op: DeviceOp) {
        trace!(target: RADIO_LOG_TARGET, ?op, "Queueing device call.");
        if self.ops_tx.send(op).is_err() {
            error!(target: RADIO_LOG_TARGET, "Device worker is gone; call dropped.");
        }
    }

    /// Lets queued calls drain, then waits for the worker to exit.
    pub(super) async fn shutdown(self) {
        let DeviceWorker { ops_tx, handle, .. } = self;
        drop(ops_tx);
        if let Err(e) = handle.await {
            error!(target: RADIO_LOG_TARGET, "Device worker panicked: {:?}", e);
        }
    }
}

async fn run_device_worker(
    mut ops_rx: mpsc::UnboundedReceiver<DeviceOp>,
    device: Arc<dyn PlaybackDevice>,
    play_timeout: Duration,
    current_epoch: Arc<AtomicU64>,
    events: mpsc::UnboundedSender<RadioEvent>,
) {
    while let Some(op) = ops_rx.recv().await {
        match op {
            DeviceOp::Play { token, track_id, offset_seconds } => {
                if token.epoch != current_epoch.load(Ordering::SeqCst) {
                    debug!(target: RADIO_LOG_TARGET, ?token, "Skipping play from a cancelled run.");
                    continue;
                }
                let event = match timeout(play_timeout, device.play_at(&track_id, offset_seconds)).await {
                    Ok(Ok(())) => RadioEvent::PlayConfirmed(token),
                    Ok(Err(e)) => RadioEvent::PlayFailed(token, e.to_string()),
                    Err(_) => RadioEvent::PlayFailed(token, DeviceError::Timeout(play_timeout).to_string()),
                };
                // The orchestrator dropping its receiver means it has shut down.
                let _ = events.send(event);
            }
            DeviceOp::Pause => {
                if let Err(e) = device.pause().await {
                    warn!(target: RADIO_LOG_TARGET, "Pause failed: {}", e);
                }
            }
            DeviceOp::Resume => {
                if let Err(e) = device.resume().await {
                    warn!(target: RADIO_LOG_TARGET, "Resume failed: {}", e);
                }
            }
        }
    }
    debug!(target: RADIO_LOG_TARGET, "Device worker finished.");
}
