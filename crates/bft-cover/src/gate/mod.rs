//! Vendor API client and telemetry classification for BFT gates.

mod api;
mod classify;
mod client;
mod error;
mod types;

pub use api::{GateApi, TokenProvider};
pub use classify::classify;
pub use client::{ClientConfig, HttpGateClient};
pub use error::{GateError, check_response_error};
pub use types::{CommandResult, GateCommand, GateState, GateTelemetry};
