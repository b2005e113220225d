//! Quarry Domain Layer
//!
//! Core value types and collaborator contracts shared by every Quarry crate.
//! Nothing in here performs I/O; the traits describe the remote capabilities
//! the rest of the workspace consumes.
//!
//! ## Key Concepts
//!
//! - **StructuredValue**: the object-or-array payload recovered from model output
//! - **SectionDocument**: a declared section schema plus an open extension map
//! - **Tier**: one (capability × response-strictness) escalation step
//! - **SynthesisBudget**: immutable accounting of calls and requested output units
//! - **GapDescriptor**: a prioritized follow-up query derived from a shortfall
//! - **RefinementState**: per-run progress snapshot
//!
//! ## Architecture
//!
//! - Pure data and trait definitions only
//! - Providers implement [`traits::GenerationService`] and [`traits::EvidenceSource`]
//! - Conversion to and from `serde_json::Value` happens at the edges

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod budget;
pub mod document;
pub mod error;
pub mod gap;
pub mod run;
pub mod synthesis;
pub mod tier;
pub mod traits;
pub mod value;

// Re-exports for convenience
pub use budget::SynthesisBudget;
pub use document::SectionDocument;
pub use error::ServiceError;
pub use gap::{GapDescriptor, GapPriority};
pub use run::{RefinementState, RunId};
pub use synthesis::{RawResponse, SynthesisResult};
pub use tier::{Capability, ResponseMode, Tier};
pub use traits::{EvidenceSource, GenerateOptions, GeneratedText, GenerationService};
pub use value::StructuredValue;
