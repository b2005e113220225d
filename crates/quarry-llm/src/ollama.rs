//! Ollama Provider Implementation
//!
//! Reference `GenerationService` backed by a local Ollama instance.
//!
//! # Features
//!
//! - Async HTTP communication with the Ollama generate API
//! - Strict structured mode mapped to Ollama's JSON output format
//! - Output budget mapped to `num_predict`
//! - Separate models for economy and premium capability levels
//! - HTTP status codes classified into transient and fatal errors
//!
//! Retries are not handled here; callers wrap calls in a
//! [`RetryPolicy`](crate::RetryPolicy) or escalate tiers.
//!
//! # Examples
//!
//! ```no_run
//! use quarry_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3.1:8b")
//!     .with_premium_model("llama3.1:70b");
//! ```

use async_trait::async_trait;
use quarry_domain::{Capability, GenerateOptions, GeneratedText, GenerationService, ServiceError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Ollama API provider for local LLM inference
pub struct OllamaProvider {
    endpoint: String,
    economy_model: String,
    premium_model: String,
    client: reqwest::Client,
}

/// Request body for Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

/// Response from Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[serde(default)]
    done_reason: Option<String>,
}

impl OllamaProvider {
    /// Create a new Ollama provider using one model for every capability level
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3.1:8b")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            endpoint: endpoint.into(),
            economy_model: model.clone(),
            premium_model: model,
            client: reqwest::Client::new(),
        }
    }

    /// Create a new Ollama provider at the default endpoint
    pub fn default_endpoint(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Use a different model for premium-capability calls
    pub fn with_premium_model(mut self, model: impl Into<String>) -> Self {
        self.premium_model = model.into();
        self
    }

    /// Model used for a capability level
    pub fn model_for(&self, capability: Capability) -> &str {
        match capability {
            Capability::Economy => &self.economy_model,
            Capability::Premium => &self.premium_model,
        }
    }
}

/// Classify a non-success HTTP status
fn classify_status(status: reqwest::StatusCode, body: String, model: &str) -> ServiceError {
    match status.as_u16() {
        404 => ServiceError::ModelNotAvailable(model.to_string()),
        401 | 403 => ServiceError::Unauthorized(format!("HTTP {}: {}", status, body)),
        429 => ServiceError::RateLimited,
        400..=499 => ServiceError::BadRequest(format!("HTTP {}: {}", status, body)),
        _ => ServiceError::Server(format!("HTTP {}: {}", status, body)),
    }
}

#[async_trait]
impl GenerationService for OllamaProvider {
    async fn generate(
        &self,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<GeneratedText, ServiceError> {
        let url = format!("{}/api/generate", self.endpoint);
        let model = self.model_for(options.capability);

        let request_body = OllamaGenerateRequest {
            model,
            prompt,
            stream: false,
            format: options.strict_structured_mode.then_some("json"),
            options: OllamaOptions {
                num_predict: options.max_output_units,
            },
        };

        let response = self
            .client
            .post(&url)
            .timeout(options.timeout)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout(options.timeout)
                } else {
                    ServiceError::Communication(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status, error_text, model));
        }

        let body = response
            .json::<OllamaGenerateResponse>()
            .await
            .map_err(|e| ServiceError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        debug!(
            model,
            chars = body.response.len(),
            done_reason = body.done_reason.as_deref().unwrap_or("unknown"),
            "Ollama generation complete"
        );

        Ok(GeneratedText::new(body.response))
    }
}
