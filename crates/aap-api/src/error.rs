//! Error types for aap-api

use thiserror::Error;

/// Errors that can occur while talking to the platform API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FacadeError {
    /// The remote object does not exist (HTTP 404)
    #[error("remote object not found: {path}")]
    NotFound { path: String },

    /// The request never produced an HTTP response
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with an unexpected status code
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// A lookup was built without enough information to address an object
    #[error("invalid lookup parameters: {0}")]
    InvalidLookup(String),

    /// Connection settings are malformed
    #[error("invalid connection configuration: {0}")]
    InvalidConfig(String),
}

impl FacadeError {
    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, 5xx, 408 and 429 are transient.
    pub fn is_transient(&self) -> bool {
        match self {
            FacadeError::Transport(_) => true,
            FacadeError::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            _ => false,
        }
    }

    /// Whether the error confirms the object is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FacadeError::NotFound { .. })
    }
}

impl From<reqwest::Error> for FacadeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FacadeError::Decode(err.to_string())
        } else {
            FacadeError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FacadeError {
    fn from(err: serde_json::Error) -> Self {
        FacadeError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for FacadeError {
    fn from(err: url::ParseError) -> Self {
        FacadeError::InvalidConfig(err.to_string())
    }
}
