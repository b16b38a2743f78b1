// src/tracker/ticker.rs
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use super::TRACKER_LOG_TARGET;

/// Owned periodic timer with explicit start/stop.
///
/// At most one timer task exists per `Ticker`; `start` replaces a running one
/// and `stop` is safe to call any number of times. Dropping the ticker stops it.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Ticker { period, handle: None }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Starts calling `on_tick` every period, first call one period from now.
    /// The timer ends when `on_tick` returns false.
    pub fn start<F>(&mut self, mut on_tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.stop();
        let period = self.period;
        debug!(target: TRACKER_LOG_TARGET, ?period, "Starting ticker.");
        self.handle = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !on_tick() {
                    trace!(target: TRACKER_LOG_TARGET, "Tick receiver gone; ticker exiting.");
                    break;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!(target: TRACKER_LOG_TARGET, "Stopping ticker.");
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
