//! Quarry Extractor
//!
//! Recovers structured data from raw model output.
//!
//! # Overview
//!
//! Model responses arrive as free text: fenced, wrapped in prose, or cut off
//! mid-structure when the output budget runs out. This crate turns that text
//! into a [`StructuredValue`](quarry_domain::StructuredValue) when it can.
//!
//! ```text
//! raw text → extract ──success──→ value
//!               │
//!             failure → unfence → is_truncated? → repair → extract
//! ```
//!
//! # Key Features
//!
//! - **Multi-strategy extraction**: labeled fence, any fence, outermost array,
//!   whole text, outermost object; the first structural success wins
//! - **String-aware lexing**: brackets inside string literals never count
//! - **Truncation repair**: dangling commas and keys stripped, open strings
//!   and structures closed in LIFO order
//!
//! Everything here is pure and synchronous.
//!
//! # Example Usage
//!
//! ```
//! use quarry_extractor::{extract, is_truncated, repair, unfence};
//!
//! let raw = "```json\n{\"x\": [1,2,";
//! assert!(!extract(raw).is_success());
//!
//! let payload = unfence(raw);
//! assert!(is_truncated(payload));
//!
//! let recovered = extract(&repair(payload));
//! assert_eq!(
//!     recovered.into_data().unwrap().into_value(),
//!     serde_json::json!({"x": [1, 2]})
//! );
//! ```

#![warn(missing_docs)]

pub mod lexer;
mod extract;
mod truncation;


pub use extract::{extract, unfence, ExtractionResult, ExtractionStatus, Strategy};
pub use truncation::{is_truncated, repair};

/// Run extraction, falling back to one repair pass on truncated output
///
/// Returns the first successful result, or the original failure when the
/// payload is not truncated or still fails after repair.
pub fn extract_with_repair(text: &str) -> (ExtractionResult, bool) {
    let first = extract(text);
    if first.is_success() {
        return (first, false);
    }

    let payload = unfence(text);
    if !is_truncated(payload) {
        return (first, false);
    }

    let repaired = extract(&repair(payload));
    if repaired.is_success() {
        (repaired, true)
    } else {
        (first, true)
    }
}
