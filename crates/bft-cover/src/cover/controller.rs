//! Cover controller.
//!
//! Owns one cover's entity state behind a single async mutex. Commands,
//! polls and watcher ticks all go through that mutex, so no two remote
//! calls for the same cover ever run at once. Distinct covers share nothing.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::error::CoverError;
use super::watcher::MotionWatcher;
use crate::config::CoverConfig;
use crate::gate::{GateApi, GateCommand, GateError, GateState, TokenProvider, classify};

/// Device class reported to the host.
pub const DEVICE_CLASS: &str = "door";

// ============================================================================
// Types
// ============================================================================

/// What a motion command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    /// Cover already in the target state; nothing was sent.
    Skipped,
    /// Dispatcher confirmed the command.
    Done,
    /// Dispatcher accepted the command without confirming it.
    Accepted,
}

/// Snapshot of a cover as exposed to the host.
#[derive(Debug, Clone, Serialize)]
pub struct CoverAttributes {
    pub slug: String,
    pub name: String,
    pub available: bool,
    pub state: Option<GateState>,
    pub is_closed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_state_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_changed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub device_class: &'static str,
    pub watcher_active: bool,
}

struct Credentials {
    username: String,
    password: String,
}

/// Mutable per-cover state. Only reachable through the controller's mutex.
struct CoverEntity {
    name: String,
    /// `None` until the device name lookup succeeds.
    device_id: Option<String>,
    /// `None` until a token is obtained, and again after dispose.
    access_token: Option<String>,
    disposed: bool,
    current_state: Option<GateState>,
    available: bool,
    state_since: Option<Instant>,
    state_changed_at: Option<DateTime<Utc>>,
    watcher: Option<MotionWatcher>,
}

impl CoverEntity {
    fn set_state(&mut self, state: GateState) {
        if self.current_state != Some(state) {
            self.current_state = Some(state);
            self.state_since = Some(Instant::now());
            self.state_changed_at = Some(Utc::now());
        }
    }
}

struct Inner {
    slug: String,
    api: Arc<dyn GateApi>,
    tokens: Arc<dyn TokenProvider>,
    credentials: Option<Credentials>,
    /// Automation name used to resolve a pending device id.
    device_name: Option<String>,
    /// Set when the token is acquired here and must be revoked on dispose.
    obtained_token: bool,
    poll_interval: Duration,
    entity: Mutex<CoverEntity>,
}

/// Handle to a single cover. Cheap to clone; all clones share one entity.
#[derive(Clone)]
pub struct CoverController {
    inner: Arc<Inner>,
}

/// Non-owning handle held by the motion watcher.
pub(super) struct WeakCover {
    slug: String,
    inner: Weak<Inner>,
}

impl WeakCover {
    pub(super) fn slug(&self) -> &str {
        &self.slug
    }

    pub(super) fn upgrade(&self) -> Option<CoverController> {
        self.inner.upgrade().map(|inner| CoverController { inner })
    }
}

// ============================================================================
// Construction & teardown
// ============================================================================

impl CoverController {
    /// Build a cover and run its first poll.
    ///
    /// Obtains a token when none is configured and resolves the device id
    /// from the device name when no id is configured. Rejected credentials
    /// and unknown devices are returned as errors. When the API cannot be
    /// reached the cover starts offline and later polls retry the lookup.
    pub async fn connect(
        slug: impl Into<String>,
        config: &CoverConfig,
        api: Arc<dyn GateApi>,
        tokens: Arc<dyn TokenProvider>,
        poll_interval: Duration,
    ) -> Result<Self, CoverError> {
        let slug = slug.into();
        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };
        let obtained_token = config.access_token.is_none();

        if obtained_token && credentials.is_none() {
            return Err(CoverError::MissingCredentials(slug));
        }
        if config.device_id.is_none() && config.device.is_none() {
            return Err(CoverError::MissingDevice(slug));
        }

        let controller = Self {
            inner: Arc::new(Inner {
                slug,
                api,
                tokens,
                credentials,
                device_name: config.device.clone(),
                obtained_token,
                poll_interval,
                entity: Mutex::new(CoverEntity {
                    name: config.name.clone(),
                    device_id: config.device_id.clone(),
                    access_token: config.access_token.clone(),
                    disposed: false,
                    current_state: None,
                    available: true,
                    state_since: None,
                    state_changed_at: None,
                    watcher: None,
                }),
            }),
        };

        {
            let mut entity = controller.inner.entity.lock().await;
            match controller.ensure_session(&mut entity).await {
                Ok(_) => {}
                Err(e) if e.is_unreachable() => {
                    warn!(
                        cover = %controller.inner.slug,
                        error = %e,
                        "Gate API unreachable, lookup deferred"
                    );
                }
                Err(e) => {
                    controller.release_token(&mut entity).await;
                    return Err(e.into());
                }
            }
        }

        controller.update().await;
        Ok(controller)
    }

    /// Stop the watcher and revoke a self-acquired token.
    ///
    /// Only the first call has any effect. Revocation failures are logged.
    pub async fn dispose(&self) {
        let mut entity = self.inner.entity.lock().await;
        if entity.disposed {
            return;
        }
        entity.disposed = true;

        if let Some(watcher) = entity.watcher.take() {
            watcher.stop();
        }
        self.release_token(&mut entity).await;
        debug!(cover = %self.inner.slug, "Cover disposed");
    }

    /// Drop the token, revoking it when it was acquired here.
    async fn release_token(&self, entity: &mut CoverEntity) {
        let Some(token) = entity.access_token.take() else {
            return;
        };
        if !self.inner.obtained_token {
            return;
        }
        let Some(creds) = &self.inner.credentials else {
            return;
        };

        let slug = &self.inner.slug;
        match self
            .inner
            .tokens
            .revoke_token(&token, &creds.username, &creds.password)
            .await
        {
            Ok(()) => info!(cover = %slug, "Revoked access token"),
            Err(e) => warn!(cover = %slug, error = %e, "Failed to revoke access token"),
        }
    }

    /// Complete any pending token or device lookup.
    ///
    /// Returns the device id and token to use for remote calls.
    async fn ensure_session(
        &self,
        entity: &mut CoverEntity,
    ) -> Result<(String, String), GateError> {
        let slug = &self.inner.slug;

        let token = match &entity.access_token {
            Some(token) => token.clone(),
            None => {
                let creds = self
                    .inner
                    .credentials
                    .as_ref()
                    .ok_or_else(|| GateError::Auth("no credentials configured".to_string()))?;
                let token = self
                    .inner
                    .tokens
                    .acquire_token(&creds.username, &creds.password)
                    .await?;
                info!(cover = %slug, "Obtained access token");
                entity.access_token = Some(token.clone());
                token
            }
        };

        let device_id = match &entity.device_id {
            Some(id) => id.clone(),
            None => {
                let name = self.inner.device_name.as_deref().unwrap_or_default();
                let id = self.inner.api.resolve_device_id(name, &token).await?;
                info!(cover = %slug, device = %name, device_id = %id, "Resolved device id");
                entity.device_id = Some(id.clone());
                id
            }
        };

        Ok((device_id, token))
    }
}

// ============================================================================
// Operations
// ============================================================================

impl CoverController {
    pub fn slug(&self) -> &str {
        &self.inner.slug
    }

    pub async fn open(&self) -> Result<CommandOutcome, CoverError> {
        self.command(GateCommand::Open).await
    }

    pub async fn close(&self) -> Result<CommandOutcome, CoverError> {
        self.command(GateCommand::Close).await
    }

    pub async fn stop(&self) -> Result<CommandOutcome, CoverError> {
        self.command(GateCommand::Stop).await
    }

    /// Poll the gate and record its state.
    ///
    /// Never fails: an unreachable gate is recorded as `Offline` and
    /// unavailable. Stops the watcher once the state is settled.
    pub async fn update(&self) -> GateState {
        let mut entity = self.inner.entity.lock().await;
        self.refresh(&mut entity).await
    }

    /// Watcher tick. Dropped when another operation holds the cover.
    pub(super) async fn poll_from_watcher(&self) {
        match self.inner.entity.try_lock() {
            Ok(mut entity) => {
                self.refresh(&mut entity).await;
            }
            Err(_) => {
                debug!(cover = %self.inner.slug, "Cover busy, dropping watcher tick");
            }
        }
    }

    /// `None` until a state has been established.
    pub async fn is_closed(&self) -> Option<bool> {
        let entity = self.inner.entity.lock().await;
        entity.current_state.map(|s| s == GateState::Closed)
    }

    pub async fn state(&self) -> Option<GateState> {
        self.inner.entity.lock().await.current_state
    }

    pub async fn is_available(&self) -> bool {
        self.inner.entity.lock().await.available
    }

    pub async fn watcher_active(&self) -> bool {
        self.inner.entity.lock().await.watcher.is_some()
    }

    /// Time since the state last changed.
    pub async fn time_in_state(&self) -> Option<Duration> {
        let entity = self.inner.entity.lock().await;
        entity.state_since.map(|since| since.elapsed())
    }

    pub async fn attributes(&self) -> CoverAttributes {
        let entity = self.inner.entity.lock().await;
        CoverAttributes {
            slug: self.inner.slug.clone(),
            name: entity.name.clone(),
            available: entity.available,
            state: entity.current_state,
            is_closed: entity.current_state.map(|s| s == GateState::Closed),
            time_in_state_secs: entity.state_since.map(|since| since.elapsed().as_secs()),
            state_changed_at: entity.state_changed_at,
            access_token: entity.access_token.clone(),
            device_class: DEVICE_CLASS,
            watcher_active: entity.watcher.is_some(),
        }
    }

    async fn command(&self, command: GateCommand) -> Result<CommandOutcome, CoverError> {
        let mut entity = self.inner.entity.lock().await;

        if entity.current_state == Some(command.target_state()) {
            debug!(cover = %self.inner.slug, command = %command, "Already in target state");
            return Ok(CommandOutcome::Skipped);
        }

        if entity.disposed {
            return Err(CoverError::Disposed(self.inner.slug.clone()));
        }
        let (device_id, token) = self.ensure_session(&mut entity).await?;

        let result = self
            .inner
            .api
            .send_command(&device_id, &token, command)
            .await?;
        debug!(
            cover = %self.inner.slug,
            command = %command,
            status = ?result.status,
            "Command sent"
        );

        if entity.watcher.is_none() {
            entity.watcher = Some(MotionWatcher::spawn(
                self.downgrade(),
                self.inner.poll_interval,
                command,
            ));
        }

        Ok(if result.is_done() {
            CommandOutcome::Done
        } else {
            CommandOutcome::Accepted
        })
    }

    async fn refresh(&self, entity: &mut CoverEntity) -> GateState {
        let slug = &self.inner.slug;
        if entity.disposed {
            warn!(cover = %slug, "Update on disposed cover ignored");
            return entity.current_state.unwrap_or(GateState::Offline);
        }

        let telemetry = match self.ensure_session(entity).await {
            Ok((device_id, token)) => self.inner.api.fetch_telemetry(&device_id, &token).await,
            Err(e) => Err(e),
        };

        let state = match telemetry {
            Ok(telemetry) => {
                entity.available = true;
                classify(&telemetry)
            }
            Err(e) => {
                match &e {
                    GateError::Transport(_) => {
                        error!(cover = %slug, error = %e, "Unable to connect to server");
                    }
                    GateError::MalformedResponse(_) => {
                        warn!(
                            cover = %slug,
                            device_id = ?entity.device_id,
                            "Device seems to be offline"
                        );
                    }
                    _ => {
                        warn!(cover = %slug, error = %e, "Failed to read gate status");
                    }
                }
                entity.available = false;
                GateState::Offline
            }
        };

        entity.set_state(state);
        debug!(cover = %slug, state = %state, "Updated gate state");

        if state.is_settled()
            && let Some(watcher) = entity.watcher.take()
        {
            watcher.stop();
            debug!(cover = %slug, state = %state, "Gate settled, watcher stopped");
        }

        state
    }

    fn downgrade(&self) -> WeakCover {
        WeakCover {
            slug: self.inner.slug.clone(),
            inner: Arc::downgrade(&self.inner),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
