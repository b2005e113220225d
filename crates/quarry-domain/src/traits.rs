//! Trait definitions for external interactions
//!
//! These traits define the boundary between the core and the remote services
//! it depends on. Implementations live in other crates (quarry-llm).

use crate::{Capability, ServiceError};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Options for one generation call
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Ask the service to return structured data directly
    pub strict_structured_mode: bool,

    /// Maximum output units (tokens) the service may produce
    pub max_output_units: u32,

    /// Per-call timeout; callers also race the call against it
    pub timeout: Duration,

    /// Capability level to route the call to
    pub capability: Capability,

    /// Run-wide cancellation token
    pub cancel: CancellationToken,
}

impl GenerateOptions {
    /// Options for a strict-mode call with a fresh token
    pub fn strict(max_output_units: u32, timeout: Duration) -> Self {
        Self {
            strict_structured_mode: true,
            max_output_units,
            timeout,
            capability: Capability::Economy,
            cancel: CancellationToken::new(),
        }
    }
}

/// Text returned by a generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedText {
    /// Untrusted response text
    pub text: String,
}

impl GeneratedText {
    /// Wrap response text
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Remote text-generation capability
///
/// Implemented by the infrastructure layer (quarry-llm)
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate a completion for `prompt`
    ///
    /// Successful responses may still be truncated or contain prose around
    /// the JSON; callers always run them through extraction.
    async fn generate(
        &self,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<GeneratedText, ServiceError>;
}

/// Remote evidence lookup used to fill gaps
///
/// Implemented by the infrastructure layer (quarry-llm provides a mock)
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    /// Fetch raw evidence text for a follow-up query
    async fn fetch(&self, query: &str, cancel: &CancellationToken) -> Result<String, ServiceError>;
}
