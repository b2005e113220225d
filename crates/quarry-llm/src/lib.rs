//! Quarry Generation Provider Layer
//!
//! Implementations of the collaborator traits from `quarry-domain`, plus the
//! shared retry policy every remote call site goes through.
//!
//! # Providers
//!
//! - `MockProvider`: Scripted, deterministic generation for testing
//! - `MockEvidenceSource`: Scripted evidence lookups for testing
//! - `OllamaProvider`: Local Ollama API integration
//!
//! # Examples
//!
//! ```
//! use quarry_llm::MockProvider;
//! use quarry_domain::{GenerateOptions, GenerationService};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let provider = MockProvider::new(r#"{"overview": "ok"}"#);
//! let options = GenerateOptions::strict(1000, Duration::from_secs(5));
//! let result = provider.generate("any prompt", options).await.unwrap();
//! assert_eq!(result.text, r#"{"overview": "ok"}"#);
//! # });
//! ```

#![warn(missing_docs)]

pub mod evidence;
pub mod mock;
pub mod ollama;
pub mod retry;

pub use evidence::MockEvidenceSource;
pub use mock::{MockProvider, MockReply, RecordedCall};
pub use ollama::OllamaProvider;
pub use retry::{call_with_timeout, cancellable_sleep, RetryPolicy};
