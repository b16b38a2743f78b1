// src/radio/machine.rs
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::{Effect, Phase, PlaybackCursor, RadioError, RadioEvent, RadioStateUpdate, Token, RADIO_LOG_TARGET};
use crate::commentary::CommentaryOutcome;
use crate::device::DeviceState;
use crate::plan::{PlanError, SegmentPlan};
use crate::tracker::{PositionTracker, TickOutcome, TrackingGate};

/// The orchestration state machine.
///
/// Pure: it never touches the device, speech or timers itself. Every input is
/// a [`RadioEvent`] (or `load_plan`/`cancel`) and every output is a list of
/// [`Effect`]s for the caller to carry out.
#[derive(Debug)]
pub struct RadioMachine {
    phase: Phase,
    plan: Option<Arc<SegmentPlan>>,
    index: usize,
    epoch: u64,
    tracker: PositionTracker,
    play_confirmed: bool,
    device_active: bool,
    device_paused: bool,
    /// Pause asked for by the listener. Survives play confirmations and device reports.
    user_paused: bool,
    speaking: bool,
    ticking: bool,
}

impl RadioMachine {
    pub fn new(tick_interval: Duration) -> Self {
        RadioMachine {
            phase: Phase::Idle,
            plan: None,
            index: 0,
            epoch: 0,
            tracker: PositionTracker::new(tick_interval),
            play_confirmed: false,
            device_active: false,
            device_paused: false,
            user_paused: false,
            speaking: false,
            ticking: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn plan(&self) -> Option<&Arc<SegmentPlan>> {
        self.plan.as_ref()
    }

    pub fn tick_interval(&self) -> Duration {
        self.tracker.tick_interval()
    }

    /// The cursor exists from `load_plan` until cancel, device loss or a new plan.
    pub fn cursor(&self) -> Option<PlaybackCursor> {
        self.plan.as_ref().map(|_| PlaybackCursor {
            current_index: self.index,
            phase: self.phase,
            elapsed_ms: self.tracker.elapsed_ms(),
        })
    }

    /// Track position implied by the tracker while a segment is playing.
    pub fn position_seconds(&self) -> Option<f64> {
        match self.phase {
            Phase::PlayingSegment => Some(self.tracker.position_seconds()),
            _ => None,
        }
    }

    pub fn gate(&self) -> TrackingGate {
        TrackingGate {
            segment_playing: self.phase == Phase::PlayingSegment && self.play_confirmed,
            device_active: self.device_active,
            device_paused: self.device_paused || self.user_paused,
            speaking: self.speaking,
        }
    }

    fn token(&self) -> Token {
        Token { epoch: self.epoch, index: self.index }
    }

    /// Starts a new run at index 0.
    pub fn load_plan(&mut self, plan: Arc<SegmentPlan>) -> Result<Vec<Effect>, RadioError> {
        if !self.phase.accepts_plan() {
            warn!(target: RADIO_LOG_TARGET, phase = %self.phase, "Plan rejected while a run is active.");
            return Err(RadioError::InvalidState(self.phase));
        }
        if plan.is_empty() {
            return Err(RadioError::InvalidPlan(PlanError::Empty));
        }

        self.epoch += 1;
        info!(
            target: RADIO_LOG_TARGET,
            epoch = self.epoch,
            "Loading plan with {} segments and {} commentary entries.",
            plan.len(),
            plan.commentary_count()
        );
        self.plan = Some(plan);
        self.speaking = false;

        let mut effects = Vec::new();
        self.enter_segment(0, &mut effects);
        Ok(effects)
    }

    /// Stops the run from any phase and returns to `Idle`. Idempotent.
    pub fn cancel(&mut self) -> Vec<Effect> {
        self.epoch += 1;
        if self.phase == Phase::Idle && self.plan.is_none() {
            trace!(target: RADIO_LOG_TARGET, "Cancel while idle; nothing to do.");
            return Vec::new();
        }

        info!(target: RADIO_LOG_TARGET, phase = %self.phase, "Cancelling run.");
        let was_running = self.phase.is_running();
        let mut effects = self.discard_run();
        if was_running {
            effects.push(Effect::PauseDevice);
        }
        self.set_phase(Phase::Idle, &mut effects);
        effects
    }

    /// Applies one event and returns the effects it requires.
    pub fn handle(&mut self, event: RadioEvent) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            RadioEvent::Tick(token) => {
                if self.accept(token, Phase::PlayingSegment) {
                    self.on_tick(&mut effects);
                }
            }
            RadioEvent::PlayConfirmed(token) => {
                if self.accept(token, Phase::PlayingSegment) {
                    debug!(target: RADIO_LOG_TARGET, index = self.index, "Play confirmed.");
                    self.play_confirmed = true;
                    self.device_active = true;
                    self.device_paused = false;
                }
            }
            RadioEvent::PlayFailed(token, message) => {
                if self.accept(token, Phase::PlayingSegment) {
                    self.fail(RadioError::PlaybackDevice(message), &mut effects);
                }
            }
            RadioEvent::SpeechStarted(token) => {
                if self.accept(token, Phase::Commentary) {
                    self.speaking = true;
                    // Only the orchestrator drives the device.
                    effects.push(Effect::PauseDevice);
                    if let Some(entry) = self.plan.as_ref().and_then(|p| p.commentary_after(self.index)) {
                        effects.push(Effect::Notify(RadioStateUpdate::CommentaryStarted {
                            after_index: entry.after_index,
                            text: entry.text.clone(),
                        }));
                    }
                }
            }
            RadioEvent::CommentaryFinished(token, outcome) => {
                if self.accept(token, Phase::Commentary) {
                    self.on_commentary_finished(outcome, &mut effects);
                }
            }
            RadioEvent::DeviceStateChanged(state) => self.on_device_state(state, &mut effects),
            RadioEvent::PauseRequested => {
                if self.phase == Phase::PlayingSegment && !self.user_paused {
                    info!(target: RADIO_LOG_TARGET, "Pausing segment.");
                    self.user_paused = true;
                    effects.push(Effect::PauseDevice);
                }
            }
            RadioEvent::ResumeRequested => {
                if self.phase == Phase::PlayingSegment && (self.user_paused || self.device_paused) {
                    info!(target: RADIO_LOG_TARGET, "Resuming segment.");
                    self.user_paused = false;
                    self.device_paused = false;
                    effects.push(Effect::ResumeDevice);
                }
            }
            RadioEvent::SkipRequested => match self.phase {
                Phase::PlayingSegment => {
                    info!(target: RADIO_LOG_TARGET, index = self.index, "Skipping rest of segment.");
                    self.tracker.disarm();
                    self.on_boundary(&mut effects);
                }
                Phase::Commentary => {
                    info!(target: RADIO_LOG_TARGET, index = self.index, "Cutting commentary short.");
                    effects.push(Effect::CancelCommentary);
                    self.speaking = false;
                    self.advance(&mut effects);
                }
                _ => trace!(target: RADIO_LOG_TARGET, phase = %self.phase, "Skip ignored."),
            },
        }
        self.sync_ticker(&mut effects);
        effects
    }

    // --- Private Helper Methods ---

    /// Drops events from an older run, an earlier segment or the wrong phase.
    fn accept(&self, token: Token, expected: Phase) -> bool {
        if token != self.token() {
            let stale = RadioError::StaleEvent { epoch: token.epoch, index: token.index };
            trace!(target: RADIO_LOG_TARGET, current = ?self.token(), "Discarding {}", stale);
            return false;
        }
        if self.phase != expected {
            trace!(target: RADIO_LOG_TARGET, phase = %self.phase, ?expected, "Discarding event for another phase.");
            return false;
        }
        true
    }

    fn set_phase(&mut self, phase: Phase, effects: &mut Vec<Effect>) {
        debug!(target: RADIO_LOG_TARGET, from = %self.phase, to = %phase, index = self.index, "Phase change.");
        self.phase = phase;
        let index = self.plan.as_ref().map(|_| self.index);
        effects.push(Effect::Notify(RadioStateUpdate::PhaseChanged { phase, index }));
    }

    fn enter_segment(&mut self, index: usize, effects: &mut Vec<Effect>) {
        let Some(segment) = self.plan.as_ref().and_then(|p| p.segment(index)).cloned() else {
            self.fail(RadioError::InvalidPlan(PlanError::Empty), effects);
            return;
        };

        self.index = index;
        self.play_confirmed = false;
        self.user_paused = false;
        self.tracker.begin_segment(&segment);
        self.set_phase(Phase::PlayingSegment, effects);
        info!(
            target: RADIO_LOG_TARGET,
            index,
            track = %segment.track_name,
            "Playing segment {:.1}s..{:.1}s",
            segment.start_offset_seconds,
            segment.end_offset_seconds
        );
        effects.push(Effect::PlaySegment {
            token: self.token(),
            track_id: segment.track_id,
            offset_seconds: segment.start_offset_seconds,
        });
    }

    fn on_tick(&mut self, effects: &mut Vec<Effect>) {
        match self.tracker.tick(self.gate()) {
            TickOutcome::Suspended => {}
            TickOutcome::Advanced { elapsed_ms } => {
                effects.push(Effect::Notify(RadioStateUpdate::Progress {
                    index: self.index,
                    elapsed_ms,
                    position_seconds: self.tracker.position_seconds(),
                }));
            }
            TickOutcome::BoundaryCrossed { elapsed_ms } => {
                debug!(target: RADIO_LOG_TARGET, index = self.index, elapsed_ms, "Segment boundary crossed.");
                self.on_boundary(effects);
            }
        }
    }

    fn on_boundary(&mut self, effects: &mut Vec<Effect>) {
        self.set_phase(Phase::BoundaryReached, effects);
        let commentary = self.plan.as_ref().and_then(|p| p.commentary_after(self.index)).map(|c| c.text.clone());
        match commentary {
            Some(text) => {
                self.set_phase(Phase::Commentary, effects);
                effects.push(Effect::SpeakCommentary { token: self.token(), text });
            }
            None => self.advance(effects),
        }
    }

    fn on_commentary_finished(&mut self, outcome: CommentaryOutcome, effects: &mut Vec<Effect>) {
        self.speaking = false;
        match &outcome {
            CommentaryOutcome::Completed | CommentaryOutcome::Skipped => {
                debug!(target: RADIO_LOG_TARGET, ?outcome, "Commentary done.");
            }
            CommentaryOutcome::Errored(message) => {
                warn!(target: RADIO_LOG_TARGET, "{}; continuing.", RadioError::Speech(message.clone()));
            }
            CommentaryOutcome::Unsupported => {
                warn!(target: RADIO_LOG_TARGET, "Speech unsupported; continuing without commentary.");
            }
        }
        self.advance(effects);
    }

    fn advance(&mut self, effects: &mut Vec<Effect>) {
        self.set_phase(Phase::Advancing, effects);
        let len = self.plan.as_ref().map_or(0, |p| p.len());
        let next = self.index + 1;
        if next >= len {
            info!(target: RADIO_LOG_TARGET, "Plan finished after {} segments.", len);
            self.tracker.disarm();
            effects.push(Effect::PauseDevice);
            self.set_phase(Phase::Finished, effects);
        } else {
            self.enter_segment(next, effects);
        }
    }

    fn fail(&mut self, error: RadioError, effects: &mut Vec<Effect>) {
        warn!(target: RADIO_LOG_TARGET, index = self.index, "Run failed: {}", error);
        self.tracker.disarm();
        self.speaking = false;
        effects.push(Effect::CancelCommentary);
        effects.push(Effect::Notify(RadioStateUpdate::Error(error.to_string())));
        self.set_phase(Phase::Failed, effects);
    }

    fn on_device_state(&mut self, state: DeviceState, effects: &mut Vec<Effect>) {
        trace!(target: RADIO_LOG_TARGET, ?state, "Device state.");
        self.device_active = state.active;
        self.device_paused = state.paused;
        if state.active || (self.phase == Phase::Idle && self.plan.is_none()) {
            return;
        }

        self.epoch += 1;
        let was_running = self.phase.is_running();
        effects.extend(self.discard_run());
        if was_running {
            warn!(target: RADIO_LOG_TARGET, phase = %self.phase, "Playback device went inactive; abandoning run.");
            effects.push(Effect::Notify(RadioStateUpdate::Error("playback device is no longer active".to_string())));
        } else {
            info!(target: RADIO_LOG_TARGET, phase = %self.phase, "Playback device went inactive; clearing finished run.");
        }
        self.set_phase(Phase::Idle, effects);
    }

    /// Drops the cursor and stops everything that could still report back.
    fn discard_run(&mut self) -> Vec<Effect> {
        self.tracker.disarm();
        self.plan = None;
        self.index = 0;
        self.play_confirmed = false;
        self.user_paused = false;
        self.speaking = false;
        self.ticking = false;
        vec![Effect::StopTicker, Effect::CancelCommentary]
    }

    /// Starts or stops the tick source when the tracking gate changes.
    fn sync_ticker(&mut self, effects: &mut Vec<Effect>) {
        let wanted = self.tracker.wants_ticks(self.gate());
        if wanted == self.ticking {
            return;
        }
        self.ticking = wanted;
        if wanted {
            effects.push(Effect::StartTicker(self.token()));
        } else {
            effects.push(Effect::StopTicker);
        }
    }
}

impl Default for RadioMachine {
    fn default() -> Self {
        Self::new(crate::tracker::DEFAULT_TICK_INTERVAL)
    }
}
