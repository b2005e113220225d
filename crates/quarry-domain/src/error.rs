//! Error taxonomy for remote collaborator calls

use std::time::Duration;
use thiserror::Error;

/// Errors returned by a generation service or evidence source
///
/// Every variant is either transient (worth escalating to another tier or
/// retrying after a delay), fatal (abort the current run), or a cancellation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The remote side failed (5xx and similar)
    #[error("Server error: {0}")]
    Server(String),

    /// Network or transport failure
    #[error("Communication error: {0}")]
    Communication(String),

    /// The per-call timeout elapsed before a response arrived
    #[error("Call timed out after {0:?}")]
    Timeout(Duration),

    /// The response envelope could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The request was rejected as malformed
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Credentials were missing or rejected
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// The requested model does not exist on the service
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// The cancellation token was observed
    #[error("Cancelled")]
    Cancelled,
}

impl ServiceError {
    /// Whether escalating or retrying may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::RateLimited
                | ServiceError::Server(_)
                | ServiceError::Communication(_)
                | ServiceError::Timeout(_)
                | ServiceError::InvalidResponse(_)
        )
    }

    /// Whether the error must abort the current run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ServiceError::BadRequest(_)
                | ServiceError::Unauthorized(_)
                | ServiceError::ModelNotAvailable(_)
        )
    }

    /// Whether this is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ServiceError::Cancelled)
    }
}
