//! Gate API error types.

use thiserror::Error;

/// Pass success responses through; map everything else to an error,
/// treating 401/403 as `Auth`.
pub async fn check_response_error(
    response: reqwest::Response,
) -> Result<reqwest::Response, GateError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let code = status.as_u16();
    let message = response.text().await.unwrap_or_default();
    if code == 401 || code == 403 {
        return Err(GateError::Auth(message));
    }
    Err(GateError::Api {
        status: code,
        message,
    })
}

/// Errors that can occur when talking to the gate vendor API.
#[derive(Debug, Error)]
pub enum GateError {
    /// Connection failure or timeout.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Credentials or token rejected.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Device name did not match any registered automation.
    #[error("automation not found: {0}")]
    NotFound(String),

    /// Response body lacked expected fields.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// API returned a non-success status.
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Configured base URL could not be parsed.
    #[error("invalid endpoint url: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

impl From<reqwest::Error> for GateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GateError::MalformedResponse(err.to_string())
        } else {
            GateError::Transport(err)
        }
    }
}

impl GateError {
    /// Whether the failure means the device could not be reached or read.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, GateError::Transport(_) | GateError::MalformedResponse(_))
    }
}
