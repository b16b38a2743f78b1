//! Playback orchestration: drives a [`SegmentPlan`] through the device, the
//! position tracker and the commentary player.
//!
//! [`RadioMachine`] holds all transition logic. [`Radio`] is the task that owns
//! it, feeds it commands and results, and carries out the effects it returns.

mod command_handler;
mod device_worker;
mod error;
mod machine;
mod run_loop;
mod state;

pub use error::RadioError;
pub use machine::RadioMachine;
pub use state::{Effect, Phase, PlaybackCursor, RadioCommand, RadioEvent, RadioSnapshot, RadioStateUpdate, Token};

use crate::commentary::{CommentaryEvent, CommentaryPlayer};
use crate::device::PlaybackDevice;
use crate::plan::SegmentPlan;
use crate::tracker::{Ticker, DEFAULT_TICK_INTERVAL};
use device_worker::{DeviceOp, DeviceWorker};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, trace};

pub(crate) const RADIO_LOG_TARGET: &str = "r_radiocli::radio";

/// Tunables for a [`Radio`] task.
#[derive(Debug, Clone)]
pub struct RadioOptions {
    pub tick_interval: Duration,
    /// Upper bound on a single play call.
    pub play_timeout: Duration,
    pub state_update_capacity: usize,
    pub command_buffer_size: usize,
}

impl Default for RadioOptions {
    fn default() -> Self {
        RadioOptions {
            tick_interval: DEFAULT_TICK_INTERVAL,
            play_timeout: Duration::from_secs(10),
            state_update_capacity: 64,
            command_buffer_size: 32,
        }
    }
}

/// The orchestrator task: owns the state machine and every timer, speech and
/// device resource it drives.
pub struct Radio {
    machine: RadioMachine,
    commentary: CommentaryPlayer,
    ticker: Ticker,
    device_worker: Option<DeviceWorker>,

    // --- Communication ---
    command_rx: mpsc::Receiver<RadioCommand>,
    event_tx: mpsc::UnboundedSender<RadioEvent>,
    event_rx: mpsc::UnboundedReceiver<RadioEvent>,
    state_update_tx: broadcast::Sender<RadioStateUpdate>,
}

impl Radio {
    /// Creates a new Radio instance and the command channel sender.
    /// The Radio itself should be run in a separate task using `Radio::run`.
    pub fn new(
        device: Arc<dyn PlaybackDevice>,
        commentary: CommentaryPlayer,
        options: RadioOptions,
    ) -> (Self, mpsc::Sender<RadioCommand>) {
        let (command_tx, command_rx) = mpsc::channel(options.command_buffer_size.max(1));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_update_tx, _) = broadcast::channel(options.state_update_capacity.max(1));
        let device_worker = DeviceWorker::spawn(device, options.play_timeout, event_tx.clone());

        let radio = Radio {
            machine: RadioMachine::new(options.tick_interval),
            commentary,
            ticker: Ticker::new(options.tick_interval),
            device_worker: Some(device_worker),
            command_rx,
            event_tx,
            event_rx,
            state_update_tx,
        };
        (radio, command_tx)
    }

    /// Subscribes to radio state updates.
    pub fn subscribe_state_updates(&self) -> broadcast::Receiver<RadioStateUpdate> {
        self.state_update_tx.subscribe()
    }

    /// Processes commands until `Shutdown` or until every command sender is dropped.
    pub async fn run(&mut self) {
        run_loop::run_radio_loop(self).await;
    }

    // --- Private Helper Methods ---

    fn dispatch(&mut self, event: RadioEvent) {
        trace!(target: RADIO_LOG_TARGET, ?event, "Dispatching event.");
        let effects = self.machine.handle(event);
        self.apply(effects);
    }

    /// Carries out the machine's effects in order.
    fn apply(&mut self, effects: Vec<Effect>) {
        if let Some(worker) = &self.device_worker {
            worker.set_epoch(self.machine.epoch());
        }

        for effect in effects {
            match effect {
                Effect::PlaySegment { token, track_id, offset_seconds } => {
                    self.submit_device_op(DeviceOp::Play { token, track_id, offset_seconds })
                }
                Effect::PauseDevice => self.submit_device_op(DeviceOp::Pause),
                Effect::ResumeDevice => self.submit_device_op(DeviceOp::Resume),
                Effect::StartTicker(token) => {
                    let events = self.event_tx.clone();
                    self.ticker.start(move || events.send(RadioEvent::Tick(token)).is_ok());
                }
                Effect::StopTicker => self.ticker.stop(),
                Effect::SpeakCommentary { token, text } => {
                    let events = self.event_tx.clone();
                    self.commentary.speak(
                        &text,
                        Box::new(move |event: CommentaryEvent| {
                            let event = match event {
                                CommentaryEvent::Started => RadioEvent::SpeechStarted(token),
                                CommentaryEvent::Finished(outcome) => RadioEvent::CommentaryFinished(token, outcome),
                            };
                            let _ = events.send(event);
                        }),
                    );
                }
                Effect::CancelCommentary => self.commentary.cancel(),
                Effect::Notify(update) => self.broadcast_update(update),
            }
        }
    }

    fn submit_device_op(&self, op: DeviceOp) {
        match &self.device_worker {
            Some(worker) => worker.submit(op),
            None => debug!(target: RADIO_LOG_TARGET, ?op, "Device worker already shut down; call dropped."),
        }
    }

    /// Sends a state update via the broadcast channel, logging errors.
    fn broadcast_update(&self, update: RadioStateUpdate) {
        trace!(target: RADIO_LOG_TARGET, "Broadcasting state update: {:?}", update);
        if self.state_update_tx.send(update).is_err() {
            // No receivers is normal when nothing is listening.
            trace!(target: RADIO_LOG_TARGET, "No active listeners for state update.");
        }
    }

    fn snapshot(&self) -> RadioSnapshot {
        let cursor = self.machine.cursor();
        let plan = self.machine.plan();
        RadioSnapshot {
            phase: self.machine.phase(),
            cursor,
            segment_count: plan.map_or(0, |p| p.len()),
            track_name: cursor
                .and_then(|c| plan.and_then(|p| p.segment(c.current_index)))
                .map(|s| s.track_name.clone()),
            position_seconds: self.machine.position_seconds(),
        }
    }
}

/// Loads `plan` into a running radio and waits for it to be accepted.
pub async fn load_plan(commands: &mpsc::Sender<RadioCommand>, plan: SegmentPlan) -> Result<(), RadioError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    commands
        .send(RadioCommand::LoadPlan(Arc::new(plan), reply_tx))
        .await
        .map_err(|_| RadioError::ChannelClosed)?;
    reply_rx.await.map_err(|_| RadioError::ChannelClosed)?
}

/// Asks a running radio for its current state.
pub async fn get_state(commands: &mpsc::Sender<RadioCommand>) -> Result<RadioSnapshot, RadioError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    commands.send(RadioCommand::GetState(reply_tx)).await.map_err(|_| RadioError::ChannelClosed)?;
    reply_rx.await.map_err(|_| RadioError::ChannelClosed)
}
