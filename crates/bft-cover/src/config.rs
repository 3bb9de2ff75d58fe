use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use tokio::fs;

use serde::Deserialize;
use thiserror::Error;

use crate::gate::ClientConfig;

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// Covers keyed by slug.
    #[serde(default)]
    pub covers: BTreeMap<String, CoverConfig>,
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Ok(serde_saphyr::from_str(&contents)?)
    }
}

// ============================================================================
// ServerConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

// ============================================================================
// ApiConfig
// ============================================================================

/// Vendor API endpoints and timing.
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_dispatcher_url")]
    pub dispatcher_url: String,
    /// Upper bound for every remote call.
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,
    /// Motion watcher poll period.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            dispatcher_url: default_dispatcher_url(),
            timeout_seconds: default_api_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl ApiConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            auth_url: self.auth_url.clone(),
            dispatcher_url: self.dispatcher_url.clone(),
            timeout: Duration::from_secs(self.timeout_seconds),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

fn default_auth_url() -> String {
    ClientConfig::DEFAULT_AUTH_URL.to_string()
}

fn default_dispatcher_url() -> String {
    ClientConfig::DEFAULT_DISPATCHER_URL.to_string()
}

fn default_api_timeout() -> u64 {
    ClientConfig::DEFAULT_TIMEOUT.as_secs()
}

fn default_poll_interval() -> u64 {
    1000
}

// ============================================================================
// CoverConfig
// ============================================================================

/// One gate. Needs `access_token` or `username`/`password`, and `device` or
/// `device_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct CoverConfig {
    #[serde(default = "default_cover_name")]
    pub name: String,
    /// Automation name as registered in the U-Control app.
    #[serde(default)]
    pub device: Option<String>,
    /// Automation uuid; skips the name lookup when set.
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

fn default_cover_name() -> String {
    "BFT".to_string()
}

// ============================================================================
// ConfigError
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),
}

// ============================================================================
// Tests
// ============================================================================
