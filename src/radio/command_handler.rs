use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, instrument, warn};

use super::{Effect, Radio, RadioError, RADIO_LOG_TARGET};
use crate::plan::SegmentPlan;

#[instrument(skip(radio, plan, reply), fields(segments = plan.len()))]
pub fn handle_load_plan(radio: &mut Radio, plan: Arc<SegmentPlan>, reply: oneshot::Sender<Result<(), RadioError>>) {
    let result = match radio.machine.load_plan(plan) {
        Ok(effects) => {
            radio.apply(effects);
            Ok(())
        }
        Err(e) => {
            warn!(target: RADIO_LOG_TARGET, "LoadPlan rejected: {}", e);
            Err(e)
        }
    };
    // Ignore error if the caller stopped waiting.
    let _ = reply.send(result);
}

#[instrument(skip(radio))]
pub fn handle_cancel(radio: &mut Radio) {
    info!(target: RADIO_LOG_TARGET, "Handling Cancel command.");
    let effects = radio.machine.cancel();
    radio.apply(effects);
}

/// Stops the run (if any) ahead of shutting the task down.
#[instrument(skip(radio))]
pub fn handle_shutdown(radio: &mut Radio) {
    info!(target: RADIO_LOG_TARGET, "Shutdown command received.");
    let effects = radio.machine.cancel();
    let stopped_run = effects.iter().any(|e| matches!(e, Effect::PauseDevice));
    radio.apply(effects);
    if stopped_run {
        info!(target: RADIO_LOG_TARGET, "Active run stopped for shutdown.");
    }
}
