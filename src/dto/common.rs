use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::room::ControlMode;
use crate::state::timer::Phase;

/// Cycle stage exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PhaseDto {
    /// Work interval.
    Focus,
    /// Short recovery interval.
    Break,
    /// Long recovery interval.
    LongBreak,
}

impl From<Phase> for PhaseDto {
    fn from(value: Phase) -> Self {
        match value {
            Phase::Focus => PhaseDto::Focus,
            Phase::Break => PhaseDto::Break,
            Phase::LongBreak => PhaseDto::LongBreak,
        }
    }
}

impl From<PhaseDto> for Phase {
    fn from(value: PhaseDto) -> Self {
        match value {
            PhaseDto::Focus => Phase::Focus,
            PhaseDto::Break => Phase::Break,
            PhaseDto::LongBreak => Phase::LongBreak,
        }
    }
}

/// Control mode exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ControlModeDto {
    /// Every participant may drive the timer.
    Collab,
    /// Only the designated host may drive the timer.
    Host,
}

impl From<ControlMode> for ControlModeDto {
    fn from(value: ControlMode) -> Self {
        match value {
            ControlMode::Collab => ControlModeDto::Collab,
            ControlMode::Host => ControlModeDto::Host,
        }
    }
}

impl From<ControlModeDto> for ControlMode {
    fn from(value: ControlModeDto) -> Self {
        match value {
            ControlModeDto::Collab => ControlMode::Collab,
            ControlModeDto::Host => ControlMode::Host,
        }
    }
}
