//! Per-attempt responses and accepted synthesis results

use crate::{SectionDocument, Tier};

/// Raw text from one attempt against the generation service
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// Untrusted response text
    pub text: String,

    /// Tier the attempt ran at
    pub tier_used: Tier,

    /// Whether the service call itself succeeded
    pub succeeded: bool,
}

/// The accepted structured value for one unit of work
///
/// Created once by the first successful tier; refinement iterations update
/// the document in place through merges and never replace it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResult {
    /// Sections recovered so far
    pub document: SectionDocument,

    /// The service answered with an array that was wrapped into an object
    pub was_array: bool,

    /// Tier that produced the accepted response
    pub tier_used: Tier,
}

impl SynthesisResult {
    /// Create a result
    pub fn new(document: SectionDocument, was_array: bool, tier_used: Tier) -> Self {
        Self {
            document,
            was_array,
            tier_used,
        }
    }
}
