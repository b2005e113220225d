//! Quarry Synthesizer
//!
//! Turns a prompt into a structured result by escalating across service tiers.
//!
//! # Architecture
//!
//! ```text
//! prompt → tier 1 → extract (→ repair → extract) ──success──→ SynthesisResult
//!            │ failure
//!            ↓
//!          tier 2 → ...                          all failed → None
//! ```
//!
//! Tiers combine a capability level (economy, premium) with a response mode
//! (strict structured output, or free-form text with a JSON-only instruction
//! and twice the output allowance). The default escalation is
//! `economy-strict → economy-free-form → premium-strict → premium-free-form`.
//!
//! Transient errors and timeouts move on to the next tier. Fatal errors and
//! cancellation end the call immediately.
//!
//! # Example Usage
//!
//! ```
//! use quarry_synthesizer::{SynthesizerConfig, TieredSynthesizer};
//! use quarry_llm::MockProvider;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio_test::block_on(async {
//! let provider = Arc::new(MockProvider::new(r#"[{"name": "Acme"}]"#));
//! let synth = TieredSynthesizer::new(provider, SynthesizerConfig::default()).unwrap();
//!
//! let outcome = synth
//!     .synthesize("Profile the market", &[], synth.config().budget(), &CancellationToken::new())
//!     .await
//!     .unwrap();
//!
//! let result = outcome.result.unwrap();
//! assert!(result.was_array);
//! assert!(result.document.contains_key("section_0"));
//! # });
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod prompt;
mod synthesizer;

pub use config::SynthesizerConfig;
pub use error::SynthesisError;
pub use prompt::{prompt_for_tier, JSON_ONLY_INSTRUCTION};
pub use synthesizer::{AttemptOutcome, SynthesisOutcome, TierAttempt, TieredSynthesizer};
