// src/radio/run_loop.rs
use super::{command_handler, Radio, RadioCommand, RadioEvent, RadioStateUpdate, RADIO_LOG_TARGET};
use tracing::{info, trace};

/// Runs the radio's command and event processing loop.
pub async fn run_radio_loop(radio: &mut Radio) {
    info!(target: RADIO_LOG_TARGET, "Radio run loop started.");

    loop {
        tokio::select! {
            biased; // Check commands first

            command = radio.command_rx.recv() => {
                let Some(command) = command else {
                    info!(target: RADIO_LOG_TARGET, "Command channel closed. Exiting run loop.");
                    command_handler::handle_shutdown(radio);
                    break;
                };
                trace!(target: RADIO_LOG_TARGET, "Received command: {:?}", command);
                match command {
                    RadioCommand::LoadPlan(plan, reply) => command_handler::handle_load_plan(radio, plan, reply),
                    RadioCommand::Cancel => command_handler::handle_cancel(radio),
                    RadioCommand::Pause => radio.dispatch(RadioEvent::PauseRequested),
                    RadioCommand::Resume => radio.dispatch(RadioEvent::ResumeRequested),
                    RadioCommand::Skip => radio.dispatch(RadioEvent::SkipRequested),
                    RadioCommand::DeviceStateChanged(state) => radio.dispatch(RadioEvent::DeviceStateChanged(state)),
                    RadioCommand::GetState(responder) => {
                        let _ = responder.send(radio.snapshot()); // Ignore error if receiver dropped
                    }
                    RadioCommand::Shutdown => {
                        command_handler::handle_shutdown(radio);
                        break;
                    }
                }
            }

            // --- Results from timers, speech and the device ---
            Some(event) = radio.event_rx.recv() => {
                radio.dispatch(event);
            }
        }
    }

    info!(target: RADIO_LOG_TARGET, "Radio run loop finished. Performing final cleanup.");
    radio.ticker.stop();
    radio.commentary.cancel();
    if let Some(worker) = radio.device_worker.take() {
        worker.shutdown().await;
    }
    radio.broadcast_update(RadioStateUpdate::Stopped);
    info!(target: RADIO_LOG_TARGET, "Radio task cleanup complete.");
}
