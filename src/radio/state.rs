use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

use super::RadioError;
use crate::commentary::CommentaryOutcome;
use crate::device::DeviceState;
use crate::plan::SegmentPlan;

/// Orchestrator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    PlayingSegment,
    /// Transient: the end boundary of the current segment was crossed.
    BoundaryReached,
    Commentary,
    /// Transient: moving to the next segment or finishing.
    Advancing,
    Finished,
    Failed,
}

impl Phase {
    /// True while a plan is being played.
    pub fn is_running(self) -> bool {
        matches!(self, Phase::PlayingSegment | Phase::BoundaryReached | Phase::Commentary | Phase::Advancing)
    }

    /// Phases from which a new plan may be loaded.
    pub fn accepts_plan(self) -> bool {
        matches!(self, Phase::Idle | Phase::Finished | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::PlayingSegment => "playing segment",
            Phase::BoundaryReached => "boundary reached",
            Phase::Commentary => "commentary",
            Phase::Advancing => "advancing",
            Phase::Finished => "finished",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Identifies which run and which segment an asynchronous result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub epoch: u64,
    pub index: usize,
}

/// Position of the orchestrator within the current plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackCursor {
    pub current_index: usize,
    pub phase: Phase,
    pub elapsed_ms: u64,
}

/// Point-in-time view returned by `RadioCommand::GetState`.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioSnapshot {
    pub phase: Phase,
    pub cursor: Option<PlaybackCursor>,
    pub segment_count: usize,
    pub track_name: Option<String>,
    pub position_seconds: Option<f64>,
}

/// Commands that can be sent to the Radio task.
#[derive(Debug)]
pub enum RadioCommand {
    LoadPlan(Arc<SegmentPlan>, oneshot::Sender<Result<(), RadioError>>),
    Cancel,
    Pause,
    Resume,
    /// Ends the current segment now, or cuts the current commentary short.
    Skip,
    DeviceStateChanged(DeviceState),
    GetState(oneshot::Sender<RadioSnapshot>),
    Shutdown,
}

/// Inputs to the transition function. Everything produced by a spawned task
/// carries the token it was started with.
#[derive(Debug, Clone, PartialEq)]
pub enum RadioEvent {
    Tick(Token),
    PlayConfirmed(Token),
    PlayFailed(Token, String),
    SpeechStarted(Token),
    CommentaryFinished(Token, CommentaryOutcome),
    DeviceStateChanged(DeviceState),
    PauseRequested,
    ResumeRequested,
    SkipRequested,
}

/// Side effects requested by the transition function.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PlaySegment { token: Token, track_id: String, offset_seconds: f64 },
    PauseDevice,
    ResumeDevice,
    StartTicker(Token),
    StopTicker,
    SpeakCommentary { token: Token, text: String },
    CancelCommentary,
    Notify(RadioStateUpdate),
}

/// Updates broadcast by the Radio task about its state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum RadioStateUpdate {
    PhaseChanged { phase: Phase, index: Option<usize> },
    Progress { index: usize, elapsed_ms: u64, position_seconds: f64 },
    CommentaryStarted { after_index: usize, text: String },
    Error(String),
    Stopped,
}
