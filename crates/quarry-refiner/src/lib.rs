//! Quarry Refiner
//!
//! The gap-analysis and refinement loop. A run synthesizes an initial result
//! through the tiered synthesizer, then repeatedly scores it, fetches evidence
//! for its top gaps and merges a revised synthesis back in, until the result
//! converges, the iteration cap is reached or the run is cancelled.
//!
//! # Scoring
//!
//! Each pass combines two scores: the service's self-assessed confidence and
//! the content validator's score. The effective confidence is the lower of
//! the two, so a confident but shallow result does not converge.
//!
//! # Example
//!
//! ```
//! use quarry_llm::{MockEvidenceSource, MockProvider};
//! use quarry_refiner::{prompts, LoopState, RefinementConfig, RefinementLoop};
//! use quarry_gatekeeper::ValidationRules;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio_test::block_on(async {
//! let provider = MockProvider::new(r#"{"overview": "A growing market."}"#);
//! provider.script(
//!     prompts::ASSESSMENT_HEADING,
//!     vec![quarry_llm::MockReply::text(r#"{"confidence_score": 90, "gaps": []}"#)],
//! );
//!
//! let config = RefinementConfig {
//!     required_sections: vec!["overview".to_string()],
//!     validation: ValidationRules::new(),
//!     ..RefinementConfig::default()
//! };
//! let refiner = RefinementLoop::new(
//!     Arc::new(provider),
//!     Arc::new(MockEvidenceSource::new("")),
//!     config,
//! )
//! .unwrap();
//!
//! let outcome = refiner
//!     .run_refinement("EV charging", "Some notes", &CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert_eq!(outcome.diagnostics.final_state, LoopState::Converged);
//! assert!(outcome.diagnostics.ready_for_client);
//! # });
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod evidence;
pub mod gaps;
pub mod merge;
pub mod prompts;
pub mod refiner;
pub mod telemetry;

pub use config::RefinementConfig;
pub use diagnostics::{AbortReason, IterationScore, RefinementDiagnostics};
pub use error::RefineError;
pub use evidence::{fetch_evidence, Evidence};
pub use gaps::{parse_assessment, SelfAssessment};
pub use merge::{merge_into, MergeReport};
pub use prompts::PromptBuilder;
pub use refiner::{LoopState, RefinementLoop, RefinementOutcome};
pub use telemetry::init_tracing;

pub use quarry_gatekeeper::{validate_only, ValidationReport, ValidationRules};
