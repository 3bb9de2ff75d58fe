//! Cover lifecycle errors.

use thiserror::Error;

use crate::gate::GateError;

/// Errors surfaced by cover construction and commands.
#[derive(Debug, Error)]
pub enum CoverError {
    /// No access token configured and no credentials to obtain one.
    #[error("cover '{0}' needs an access_token or a username and password")]
    MissingCredentials(String),

    /// Neither a device id nor a device name to resolve one.
    #[error("cover '{0}' needs a device name or device_id")]
    MissingDevice(String),

    /// The cover was disposed and its token released.
    #[error("cover '{0}' has been disposed")]
    Disposed(String),

    /// Remote call failed.
    #[error(transparent)]
    Gate(#[from] GateError),
}
