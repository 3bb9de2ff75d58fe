//! Telemetry, state and command types for the gate API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single `diagnosis` snapshot of both engines.
///
/// Positions are percentages (0 = fully closed, 100 = fully open), velocities
/// are zero when an engine is at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateTelemetry {
    #[serde(rename = "first_engine_pos_int")]
    pub first_engine_pos: i32,
    #[serde(rename = "second_engine_pos_int")]
    pub second_engine_pos: i32,
    #[serde(rename = "first_engine_vel_int")]
    pub first_engine_vel: i32,
    #[serde(rename = "second_engine_vel_int")]
    pub second_engine_vel: i32,
}

impl GateTelemetry {
    pub fn new(first_pos: i32, second_pos: i32, first_vel: i32, second_vel: i32) -> Self {
        Self {
            first_engine_pos: first_pos,
            second_engine_pos: second_pos,
            first_engine_vel: first_vel,
            second_engine_vel: second_vel,
        }
    }
}

/// Discrete operational state of a cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    Open,
    Closed,
    Moving,
    Stopped,
    /// Set by the controller when the device cannot be reached.
    Offline,
    /// Telemetry matched no classification rule.
    Unknown,
}

impl GateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateState::Open => "open",
            GateState::Closed => "closed",
            GateState::Moving => "moving",
            GateState::Stopped => "stopped",
            GateState::Offline => "offline",
            GateState::Unknown => "unknown",
        }
    }

    /// Any state other than `Moving`.
    pub fn is_settled(&self) -> bool {
        !matches!(self, GateState::Moving)
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Motion command accepted by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateCommand {
    Open,
    Close,
    Stop,
}

impl GateCommand {
    /// Path segment used by the dispatcher's `execute` endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            GateCommand::Open => "open",
            GateCommand::Close => "close",
            GateCommand::Stop => "stop",
        }
    }

    /// State the gate settles in once the command completes.
    pub fn target_state(&self) -> GateState {
        match self {
            GateCommand::Open => GateState::Open,
            GateCommand::Close => GateState::Closed,
            GateCommand::Stop => GateState::Stopped,
        }
    }
}

impl fmt::Display for GateCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immediate dispatcher reply to a command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    #[serde(default)]
    pub status: Option<String>,
}

impl CommandResult {
    /// `"done"` means confirmed; anything else is accepted but unconfirmed.
    pub fn is_done(&self) -> bool {
        self.status.as_deref() == Some("done")
    }
}
