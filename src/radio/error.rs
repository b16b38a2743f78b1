use thiserror::Error;

use super::Phase;
use crate::plan::PlanError;

/// Error types for the orchestrator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RadioError {
    #[error("invalid plan: {0}")]
    InvalidPlan(#[from] PlanError),
    #[error("cannot load a plan while {0}; cancel first")]
    InvalidState(Phase),
    #[error("playback device error: {0}")]
    PlaybackDevice(String),
    #[error("speech error: {0}")]
    Speech(String),
    #[error("stale event for epoch {epoch}, index {index}")]
    StaleEvent { epoch: u64, index: usize },
    #[error("radio task is not running")]
    ChannelClosed,
}
