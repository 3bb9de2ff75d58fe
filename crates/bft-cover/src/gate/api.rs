//! Capability traits over the vendor API.

use async_trait::async_trait;

use super::error::GateError;
use super::types::{CommandResult, GateCommand, GateTelemetry};

/// Remote operations against a single automation.
#[async_trait]
pub trait GateApi: Send + Sync {
    /// Read the `diagnosis` variable.
    async fn fetch_telemetry(&self, device_id: &str, token: &str)
    -> Result<GateTelemetry, GateError>;

    /// Issue a motion command.
    async fn send_command(
        &self,
        device_id: &str,
        token: &str,
        command: GateCommand,
    ) -> Result<CommandResult, GateError>;

    /// Find the uuid of the automation registered under `name`.
    async fn resolve_device_id(&self, name: &str, token: &str) -> Result<String, GateError>;
}

/// Simple credential exchange for access tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire_token(&self, username: &str, password: &str) -> Result<String, GateError>;

    async fn revoke_token(&self, token: &str, username: &str, password: &str)
    -> Result<(), GateError>;
}
