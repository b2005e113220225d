//! Content-depth validation logic

use crate::config::{EntityListRule, NumericSeriesRule, ProfileTextRule, SectionRule};
use crate::{GatekeeperError, ValidationRules};
use quarry_domain::SectionDocument;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Score given to prose that runs past its word window
const OVERLONG_TEXT_SCORE: u8 = 70;

/// A named shortfall in one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Section the failure belongs to
    pub section: String,

    /// What is missing or out of range
    pub message: String,
}

impl ValidationFailure {
    fn new(section: &str, message: impl Into<String>) -> Self {
        Self {
            section: section.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.section, self.message)
    }
}

/// Result of content validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Overall score (0-100), the rounded mean of section scores
    pub score: u8,

    /// Per-section scores (0-100)
    pub section_scores: BTreeMap<String, u8>,

    /// Named failures, in section order
    pub failures: Vec<ValidationFailure>,

    /// True when there are no failures
    pub pass: bool,
}

impl ValidationReport {
    /// Failures rendered as `section: message` strings
    pub fn failure_messages(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }

    /// Human-readable summary
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Validation: score {} ({})",
            self.score,
            if self.pass { "pass" } else { "fail" }
        )];
        for (section, score) in &self.section_scores {
            lines.push(format!("  {}: {}", section, score));
        }
        for failure in &self.failures {
            lines.push(format!("  - {}", failure));
        }
        lines.join("\n")
    }
}

/// Count whitespace-separated words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Validates documents against a fixed rule set
#[derive(Debug, Clone)]
pub struct ContentValidator {
    rules: ValidationRules,
}

impl ContentValidator {
    /// Create a validator, rejecting inconsistent rules
    pub fn new(rules: ValidationRules) -> Result<Self, GatekeeperError> {
        rules.validate().map_err(GatekeeperError::Config)?;
        Ok(Self { rules })
    }

    /// The rule set in use
    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Validate a JSON value (normally an object keyed by section)
    pub fn validate(&self, value: &Value) -> ValidationReport {
        validate_only(value, &self.rules)
    }

    /// Validate a section document
    pub fn validate_document(&self, document: &SectionDocument) -> ValidationReport {
        self.validate(&document.to_value())
    }
}

/// Validate `value` against `rules` without constructing a validator
///
/// A value that is not an object reports every declared section as missing.
///
/// # Examples
///
/// ```
/// use quarry_gatekeeper::{validate_only, ValidationRules};
/// use serde_json::json;
///
/// let report = validate_only(&json!({}), &ValidationRules::default());
/// assert_eq!(report.score, 100);
/// assert!(report.pass);
/// ```
pub fn validate_only(value: &Value, rules: &ValidationRules) -> ValidationReport {
    let mut section_scores = BTreeMap::new();
    let mut failures = Vec::new();

    for (name, rule) in &rules.sections {
        let section = value.get(name.as_str());
        let score = match rule {
            SectionRule::EntityList(rule) => check_entity_list(name, section, rule, &mut failures),
            SectionRule::NumericSeries(rule) => check_numeric_series(name, section, rule, &mut failures),
            SectionRule::ProfileText(rule) => check_profile_text(name, section, rule, &mut failures),
        };
        section_scores.insert(name.clone(), score);
    }

    let score = if section_scores.is_empty() {
        100
    } else {
        let total: usize = section_scores.values().map(|s| *s as usize).sum();
        let count = section_scores.len();
        ((total + count / 2) / count).min(100) as u8
    };

    ValidationReport {
        score,
        section_scores,
        pass: failures.is_empty(),
        failures,
    }
}

/// Whether a value carries a number, directly or as a digit inside a string
fn is_quantified(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.chars().any(|c| c.is_ascii_digit()),
        _ => false,
    }
}

fn is_complete_entry(entry: &Value, rule: &EntityListRule) -> bool {
    let Some(object) = entry.as_object() else {
        return false;
    };

    let has_identity = object
        .get(&rule.identity_field)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    if !has_identity {
        return false;
    }

    let description_field = rule.description.as_ref().map(|d| d.field.as_str());
    if rule.attribute_fields.is_empty() {
        object
            .iter()
            .filter(|(key, _)| *key != &rule.identity_field && Some(key.as_str()) != description_field)
            .any(|(_, value)| is_quantified(value))
    } else {
        rule.attribute_fields
            .iter()
            .filter_map(|field| object.get(field))
            .any(is_quantified)
    }
}

fn check_entity_list(
    name: &str,
    section: Option<&Value>,
    rule: &EntityListRule,
    failures: &mut Vec<ValidationFailure>,
) -> u8 {
    let Some(section) = section else {
        failures.push(ValidationFailure::new(name, "missing"));
        return 0;
    };
    let Some(entries) = section.as_array() else {
        failures.push(ValidationFailure::new(name, "expected an array of entries"));
        return 0;
    };

    let complete = entries.iter().filter(|e| is_complete_entry(e, rule)).count();
    let mut score = if complete >= rule.full_count {
        100
    } else if complete >= rule.partial_count.max(1) {
        failures.push(ValidationFailure::new(
            name,
            format!("{}/{} complete entries", complete, rule.full_count),
        ));
        50
    } else {
        failures.push(ValidationFailure::new(name, "no complete entries"));
        0
    };

    if let Some(desc) = &rule.description {
        if !entries.is_empty() {
            let words: Vec<usize> = entries
                .iter()
                .map(|e| e.get(&desc.field).and_then(Value::as_str).map_or(0, word_count))
                .collect();
            let thin = words.iter().filter(|w| **w < desc.min_words).count();
            let overlong = words.iter().filter(|w| **w > desc.max_words).count();
            let out_of_window = thin + overlong;
            let ratio = out_of_window as f64 / entries.len() as f64;

            if ratio > desc.max_out_of_window_ratio {
                let window = if overlong == 0 {
                    format!("<{} words", desc.min_words)
                } else if thin == 0 {
                    format!(">{} words", desc.max_words)
                } else {
                    format!("outside {}-{} words", desc.min_words, desc.max_words)
                };
                failures.push(ValidationFailure::new(
                    name,
                    format!("{}/{} descriptions {}", out_of_window, entries.len(), window),
                ));
            }
            if ratio > desc.score_cap_ratio {
                score = score.min(desc.capped_score);
            }
        }
    }

    score
}

/// Numeric points in one series (an object with a data field, or a bare array)
fn series_points(series: &Value, rule: &NumericSeriesRule) -> usize {
    let data = match series {
        Value::Array(points) => Some(points),
        Value::Object(object) => object.get(&rule.data_field).and_then(Value::as_array),
        _ => None,
    };
    data.map_or(0, |points| points.iter().filter(|p| p.is_number()).count())
}

fn check_numeric_series(
    name: &str,
    section: Option<&Value>,
    rule: &NumericSeriesRule,
    failures: &mut Vec<ValidationFailure>,
) -> u8 {
    let Some(section) = section else {
        failures.push(ValidationFailure::new(name, "missing"));
        return 0;
    };
    let Some(series) = section.as_array() else {
        failures.push(ValidationFailure::new(name, "expected an array of series"));
        return 0;
    };

    let counting = series
        .iter()
        .filter(|s| series_points(s, rule) >= rule.min_points)
        .count();

    if counting >= rule.min_series {
        100
    } else if counting >= 1 {
        failures.push(ValidationFailure::new(
            name,
            format!("{}/{} series with >={} points", counting, rule.min_series, rule.min_points),
        ));
        50
    } else {
        failures.push(ValidationFailure::new(
            name,
            format!("no series with >={} points", rule.min_points),
        ));
        0
    }
}

fn check_profile_text(
    name: &str,
    section: Option<&Value>,
    rule: &ProfileTextRule,
    failures: &mut Vec<ValidationFailure>,
) -> u8 {
    let Some(section) = section else {
        failures.push(ValidationFailure::new(name, "missing"));
        return 0;
    };
    let Some(text) = section.as_str() else {
        failures.push(ValidationFailure::new(name, "expected text"));
        return 0;
    };

    let words = word_count(text);
    if words < rule.min_words {
        failures.push(ValidationFailure::new(
            name,
            format!("{} words (<{})", words, rule.min_words),
        ));
        // words < min_words, so this stays below 100
        ((words * 100 + rule.min_words / 2) / rule.min_words) as u8
    } else if words > rule.max_words {
        failures.push(ValidationFailure::new(
            name,
            format!("{} words (>{})", words, rule.max_words),
        ));
        OVERLONG_TEXT_SCORE
    } else {
        100
    }
}
