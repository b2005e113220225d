//! Synthesizer error types

use quarry_domain::ServiceError;
use thiserror::Error;

/// Errors that end a synthesis call
///
/// Transient service errors and extraction failures never surface here; they
/// move escalation on to the next tier.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    /// The service rejected the request in a way no tier can recover from
    #[error("Fatal service error: {0}")]
    Fatal(ServiceError),

    /// The run was cancelled
    #[error("Synthesis cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
