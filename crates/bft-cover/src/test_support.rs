//! Shared in-memory gate for registry and handler tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::gate::{CommandResult, GateApi, GateCommand, GateError, GateTelemetry, TokenProvider};

/// Transport error built without touching the network.
pub(crate) async fn transport_error() -> GateError {
    GateError::Transport(reqwest::get("http://").await.unwrap_err())
}

/// Reports fixed telemetry; only the automation named `Driveway` exists.
pub(crate) struct StaticGate {
    pub telemetry: Mutex<GateTelemetry>,
    pub commands: Mutex<Vec<(String, GateCommand)>>,
    /// Every call fails with a transport error.
    pub unreachable: AtomicBool,
    /// Commands fail with a transport error; polls still succeed.
    pub fail_commands: AtomicBool,
}

impl StaticGate {
    pub fn new(telemetry: GateTelemetry) -> Self {
        Self {
            telemetry: Mutex::new(telemetry),
            commands: Mutex::new(Vec::new()),
            unreachable: AtomicBool::new(false),
            fail_commands: AtomicBool::new(false),
        }
    }

    pub fn closed() -> Self {
        Self::new(GateTelemetry::new(0, 0, 0, 0))
    }

    pub fn commands(&self) -> Vec<(String, GateCommand)> {
        self.commands.lock().unwrap().clone()
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn set_fail_commands(&self, fail: bool) {
        self.fail_commands.store(fail, Ordering::SeqCst);
    }

    fn is_unreachable(&self) -> bool {
        self.unreachable.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GateApi for StaticGate {
    async fn fetch_telemetry(
        &self,
        _device_id: &str,
        _token: &str,
    ) -> Result<GateTelemetry, GateError> {
        if self.is_unreachable() {
            return Err(transport_error().await);
        }
        Ok(*self.telemetry.lock().unwrap())
    }

    async fn send_command(
        &self,
        device_id: &str,
        _token: &str,
        command: GateCommand,
    ) -> Result<CommandResult, GateError> {
        if self.is_unreachable() || self.fail_commands.load(Ordering::SeqCst) {
            return Err(transport_error().await);
        }
        self.commands
            .lock()
            .unwrap()
            .push((device_id.to_string(), command));
        Ok(CommandResult {
            status: Some("done".to_string()),
        })
    }

    async fn resolve_device_id(&self, name: &str, _token: &str) -> Result<String, GateError> {
        if self.is_unreachable() {
            return Err(transport_error().await);
        }
        match name {
            "Driveway" => Ok("uuid-1".to_string()),
            other => Err(GateError::NotFound(other.to_string())),
        }
    }
}

/// Hands out `tok` and counts revocations.
#[derive(Default)]
pub(crate) struct CountingTokens {
    pub revoked: AtomicUsize,
}

impl CountingTokens {
    pub fn revoked(&self) -> usize {
        self.revoked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for CountingTokens {
    async fn acquire_token(&self, _username: &str, _password: &str) -> Result<String, GateError> {
        Ok("tok".to_string())
    }

    async fn revoke_token(
        &self,
        _token: &str,
        _username: &str,
        _password: &str,
    ) -> Result<(), GateError> {
        self.revoked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
