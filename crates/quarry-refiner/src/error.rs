//! Refinement error types

use quarry_domain::ServiceError;
use quarry_gatekeeper::GatekeeperError;
use quarry_synthesizer::SynthesisError;
use thiserror::Error;

/// Errors that end a refinement run without a result
///
/// Once an initial result exists, fatal errors and cancellation no longer
/// surface here: the run ends `Aborted` and returns its best result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RefineError {
    /// No tier produced a structurally valid result
    #[error("No tier produced a structurally valid result")]
    NoInitialResult,

    /// Fatal service error before any result existed
    #[error("Fatal service error: {0}")]
    Fatal(ServiceError),

    /// Cancelled before any result existed
    #[error("Refinement cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<SynthesisError> for RefineError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::Fatal(e) => RefineError::Fatal(e),
            SynthesisError::Cancelled => RefineError::Cancelled,
            SynthesisError::Config(msg) => RefineError::Config(msg),
        }
    }
}

impl From<GatekeeperError> for RefineError {
    fn from(err: GatekeeperError) -> Self {
        match err {
            GatekeeperError::Config(msg) => RefineError::Config(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_error_conversion() {
        assert_eq!(RefineError::from(SynthesisError::Cancelled), RefineError::Cancelled);
        assert_eq!(
            RefineError::from(SynthesisError::Fatal(ServiceError::RateLimited)),
            RefineError::Fatal(ServiceError::RateLimited)
        );
        assert_eq!(
            RefineError::from(GatekeeperError::Config("x".into())),
            RefineError::Config("x".into())
        );
    }
}
