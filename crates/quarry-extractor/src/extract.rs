//! Multi-strategy extraction of structured data from model output

use crate::lexer::balanced_region;
use quarry_domain::StructuredValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const FENCE: &str = "```";

/// Extraction outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// A structured value was recovered
    Success,

    /// A fence or balanced region was located but nothing parsed
    ParseError,

    /// No structural boundary was found
    NoJsonFound,

    /// The input was empty or whitespace
    NoContent,
}

/// Extraction strategy, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Fenced block labeled `json`
    LabeledFence,

    /// Any fenced block
    AnyFence,

    /// Outermost balanced `[...]`
    ArrayScan,

    /// The whole trimmed text
    WholeText,

    /// Outermost balanced `{...}`
    ObjectScan,
}

impl Strategy {
    /// Strategies in priority order
    pub const ORDER: [Strategy; 5] = [
        Strategy::LabeledFence,
        Strategy::AnyFence,
        Strategy::ArrayScan,
        Strategy::WholeText,
        Strategy::ObjectScan,
    ];

    /// Short name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::LabeledFence => "labeled_fence",
            Strategy::AnyFence => "any_fence",
            Strategy::ArrayScan => "array_scan",
            Strategy::WholeText => "whole_text",
            Strategy::ObjectScan => "object_scan",
        }
    }
}

/// Result of [`extract`]
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    /// Recovered value (only on success)
    pub data: Option<StructuredValue>,

    /// Outcome
    pub status: ExtractionStatus,

    /// Strategy that produced `data`
    pub strategy: Option<Strategy>,
}

impl ExtractionResult {
    fn failed(status: ExtractionStatus) -> Self {
        Self { data: None, status, strategy: None }
    }

    /// Whether a value was recovered
    pub fn is_success(&self) -> bool {
        self.status == ExtractionStatus::Success
    }

    /// Take the recovered value
    pub fn into_data(self) -> Option<StructuredValue> {
        self.data
    }
}

/// A fenced block located in the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence<'a> {
    label: &'a str,
    body: &'a str,
}

/// Locate fenced blocks in order; an unterminated final fence runs to end of text
fn fenced_blocks(text: &str) -> Vec<Fence<'_>> {
    let mut fences = Vec::new();
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find(FENCE) {
        let after_open = cursor + found + FENCE.len();
        let rest = &text[after_open..];

        // A label is a single word directly after the fence on the same line
        let line_end = rest.find('\n').unwrap_or(rest.len());
        let first_line = rest[..line_end].trim();
        let is_label = first_line
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        let (label, body_start) = if is_label {
            (first_line, (after_open + line_end + 1).min(text.len()))
        } else {
            ("", after_open)
        };

        match text[body_start..].find(FENCE) {
            Some(close) => {
                fences.push(Fence { label, body: &text[body_start..body_start + close] });
                cursor = body_start + close + FENCE.len();
            }
            None => {
                fences.push(Fence { label, body: &text[body_start..] });
                break;
            }
        }
    }

    fences
}

/// Strip a surrounding code fence, if any
///
/// Returns the body of the first fenced block (running to end of text when
/// the closing fence was cut off). Without fences, prose before the first
/// `{` or `[` is dropped.
///
/// # Examples
///
/// ```
/// use quarry_extractor::unfence;
///
/// assert_eq!(unfence("```json\n{\"a\": [1,"), "{\"a\": [1,");
/// assert_eq!(unfence("Here you go: [1, 2"), "[1, 2");
/// ```
pub fn unfence(text: &str) -> &str {
    if let Some(fence) = fenced_blocks(text).into_iter().next() {
        return fence.body.trim();
    }
    match text.find(['{', '[']) {
        Some(start) => text[start..].trim(),
        None => text.trim(),
    }
}

fn parse_structured(candidate: &str) -> Option<StructuredValue> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }
    serde_json::from_str::<Value>(candidate)
        .ok()
        .and_then(StructuredValue::from_value)
}

/// First balanced region for `open`/`close`
fn outermost(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    balanced_region(text, start, open, close).map(|(s, e)| &text[s..e])
}

/// Outermost array, unless it sits inside an object that opens first
fn outermost_array(text: &str) -> Option<&str> {
    let bracket = text.find('[')?;
    if let Some(brace) = text.find('{') {
        if brace < bracket {
            match balanced_region(text, brace, '{', '}') {
                // Enclosed by a complete object
                Some((_, end)) if end > bracket => return None,
                // Enclosed by an object that never closes
                None => return None,
                Some(_) => {}
            }
        }
    }
    outermost(text, '[', ']')
}

/// Candidate texts a strategy proposes, in order
fn candidates(strategy: Strategy, text: &str) -> Vec<&str> {
    match strategy {
        Strategy::LabeledFence => fenced_blocks(text)
            .into_iter()
            .filter(|f| f.label.eq_ignore_ascii_case("json"))
            .map(|f| f.body)
            .collect(),
        Strategy::AnyFence => fenced_blocks(text).into_iter().map(|f| f.body).collect(),
        Strategy::ArrayScan => outermost_array(text).into_iter().collect(),
        Strategy::WholeText => vec![text.trim()],
        Strategy::ObjectScan => outermost(text, '{', '}').into_iter().collect(),
    }
}

/// Extract a structured value from raw text
///
/// Strategies are tried in [`Strategy::ORDER`]; the first candidate that
/// parses to an object or array wins. Never panics.
///
/// # Examples
///
/// ```
/// use quarry_extractor::{extract, ExtractionStatus};
///
/// let result = extract("Sure!\n```json\n{\"a\": 1}\n```\nAnything else?");
/// assert_eq!(result.status, ExtractionStatus::Success);
///
/// assert_eq!(extract("   ").status, ExtractionStatus::NoContent);
/// assert_eq!(extract("no data here").status, ExtractionStatus::NoJsonFound);
/// ```
pub fn extract(text: &str) -> ExtractionResult {
    if text.trim().is_empty() {
        return ExtractionResult::failed(ExtractionStatus::NoContent);
    }

    let mut boundary_found = false;

    for strategy in Strategy::ORDER {
        for candidate in candidates(strategy, text) {
            if strategy != Strategy::WholeText {
                boundary_found = true;
            }
            if let Some(data) = parse_structured(candidate) {
                debug!(strategy = strategy.as_str(), "Extraction succeeded");
                return ExtractionResult {
                    data: Some(data),
                    status: ExtractionStatus::Success,
                    strategy: Some(strategy),
                };
            }
            debug!(
                strategy = strategy.as_str(),
                candidate_len = candidate.len(),
                "Candidate did not parse"
            );
        }
    }

    if boundary_found {
        ExtractionResult::failed(ExtractionStatus::ParseError)
    } else {
        ExtractionResult::failed(ExtractionStatus::NoJsonFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(text: &str) -> Value {
        extract(text).into_data().unwrap().into_value()
    }

    #[test]
    fn test_labeled_fence_wins_over_unlabeled() {
        let text = "```\n[\"example\"]\n```\nReal answer:\n```json\n{\"a\": 1}\n```";
        let result = extract(text);
        assert_eq!(result.strategy, Some(Strategy::LabeledFence));
        assert_eq!(result.data.unwrap().into_value(), json!({"a": 1}));
    }

    #[test]
    fn test_unlabeled_fence() {
        let result = extract("```\n{\"a\": 2}\n```");
        assert_eq!(result.strategy, Some(Strategy::AnyFence));
    }

    #[test]
    fn test_label_case_insensitive() {
        let result = extract("```JSON\n{\"a\": 2}\n```");
        assert_eq!(result.strategy, Some(Strategy::LabeledFence));
    }

    #[test]
    fn test_inline_fence() {
        assert_eq!(data("```{\"a\": 3}```"), json!({"a": 3}));
    }

    #[test]
    fn test_array_in_prose() {
        let result = extract("The list is [1, [2, 3], \"x]\"] as requested.");
        assert_eq!(result.strategy, Some(Strategy::ArrayScan));
        assert_eq!(result.data.unwrap().into_value(), json!([1, [2, 3], "x]"]));
    }

    #[test]
    fn test_object_with_inner_array_is_not_split() {
        let result = extract(r#"{"items": [1, 2], "n": 2}"#);
        assert_eq!(result.strategy, Some(Strategy::WholeText));
        assert_eq!(result.data.unwrap().into_value(), json!({"items": [1, 2], "n": 2}));
    }

    #[test]
    fn test_object_in_prose() {
        let result = extract(r#"Result: {"a": {"b": "}"}, "c": [1]} -- done"#);
        assert_eq!(result.strategy, Some(Strategy::ObjectScan));
        assert_eq!(result.data.unwrap().into_value(), json!({"a": {"b": "}"}, "c": [1]}));
    }

    #[test]
    fn test_array_before_object_in_prose() {
        // A brace appears in prose before the array, but encloses nothing
        assert_eq!(data("Note {see below}: [1, 2]"), json!([1, 2]));
    }

    #[test]
    fn test_scalar_is_not_success() {
        assert_eq!(extract("42").status, ExtractionStatus::NoJsonFound);
        assert_eq!(extract("\"just a string\"").status, ExtractionStatus::NoJsonFound);
    }

    #[test]
    fn test_truncated_object_is_parse_error() {
        let result = extract("```json\n{\"x\": [1, 2,");
        assert_eq!(result.status, ExtractionStatus::ParseError);
        assert!(result.data.is_none());
        assert!(result.strategy.is_none());
    }

    #[test]
    fn test_truncated_object_does_not_yield_inner_array() {
        let result = extract(r#"{"x": [1, 2], "y": "cut"#);
        assert!(!result.is_success());
    }

    #[test]
    fn test_unfence_variants() {
        assert_eq!(unfence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(unfence("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(unfence("no structure"), "no structure");
    }

    #[test]
    fn test_fenced_matches_direct_parse() {
        let body = r#"{"players": [{"name": "A"}], "count": 1}"#;
        let fenced = format!("Here it is:\n```json\n{}\n```\n", body);
        let direct: Value = serde_json::from_str(body).unwrap();
        assert_eq!(data(&fenced), direct);
    }

    #[test]
    fn test_deterministic() {
        let text = "x [1] y {\"a\": 2}";
        assert_eq!(extract(text), extract(text));
    }
}
