//! Gatekeeper error types

use thiserror::Error;

/// Errors that can occur during gatekeeper operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatekeeperError {
    /// Rule set is malformed or inconsistent
    #[error("Configuration error: {0}")]
    Config(String),
}
