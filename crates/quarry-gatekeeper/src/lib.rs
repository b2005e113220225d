//! Quarry Gatekeeper
//!
//! Scores how complete a synthesized document is against declared section
//! rules.
//!
//! The Gatekeeper provides:
//! - Entity-list checks (complete entries, description word windows)
//! - Numeric-series checks (enough series with enough points)
//! - Profile-text checks (word window)
//! - An overall 0-100 score and named failures for every shortfall
//!
//! Validation is pure: the same value and rules always produce the same
//! report.
//!
//! # Examples
//!
//! ```
//! use quarry_gatekeeper::{validate_only, ValidationRules};
//! use serde_json::json;
//!
//! let report = validate_only(&json!({"overview": "too short"}), &ValidationRules::market_profile());
//! assert!(!report.pass);
//! assert!(report.failures.iter().any(|f| f.section == "players"));
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod validator;

pub use config::{
    DescriptionRule, EntityListRule, NumericSeriesRule, ProfileTextRule, SectionRule,
    ValidationRules,
};
pub use error::GatekeeperError;
pub use validator::{validate_only, word_count, ContentValidator, ValidationFailure, ValidationReport};
