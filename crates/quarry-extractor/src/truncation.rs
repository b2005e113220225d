//! Truncation detection and structural repair

use crate::lexer::{scan, LexState};

/// Whether `text` looks like structured output cut off mid-stream
///
/// Only applies to text whose first non-whitespace character is `{` or `[`.
///
/// # Examples
///
/// ```
/// use quarry_extractor::is_truncated;
///
/// assert!(is_truncated(r#"{"x": [1,2,"#));
/// assert!(is_truncated(r#"{"x": "unterminated"#));
/// assert!(!is_truncated(r#"{"x": [1,2]}"#));
/// assert!(!is_truncated("plain prose {"));
/// ```
pub fn is_truncated(text: &str) -> bool {
    let trimmed = text.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return false;
    }

    let nesting = scan(trimmed);
    if nesting.state != LexState::Normal || nesting.has_unclosed() {
        return true;
    }

    trimmed.trim_end().ends_with([',', ':'])
}

/// Strip dangling commas, colons and value-less keys from the end of `text`
///
/// `text` must end outside any string literal.
fn strip_dangling(text: &mut String) {
    loop {
        let trimmed_len = text.trim_end().len();
        text.truncate(trimmed_len);

        if text.ends_with(',') || text.ends_with(':') {
            text.pop();
            continue;
        }

        if text.ends_with('"') {
            let nesting = scan(text);
            if let Some(span) = nesting.last_string {
                if span.end == Some(text.len()) && span.in_key_position() {
                    text.truncate(span.start);
                    continue;
                }
            }
        }

        break;
    }
}

/// Best-effort structural repair of truncated output
///
/// Strips dangling commas and value-less keys, closes an unterminated string,
/// then appends the closers for every structure still open. Mismatched closers
/// already in the text are left alone. The output is not guaranteed to parse.
///
/// # Examples
///
/// ```
/// use quarry_extractor::repair;
///
/// assert_eq!(repair(r#"{"x": [1,2,"#), r#"{"x": [1,2]}"#);
/// assert_eq!(repair(r#"{"a": 1, "b":"#), r#"{"a": 1}"#);
/// assert_eq!(repair(r#"{"a": "hel"#), r#"{"a": "hel"}"#);
/// ```
pub fn repair(text: &str) -> String {
    let mut out = text.to_string();

    match scan(&out).state {
        LexState::Normal => strip_dangling(&mut out),
        state => {
            if state == LexState::Escaped {
                out.pop();
            }
            out.push('"');

            let nesting = scan(&out);
            if let Some(span) = nesting.last_string {
                if span.in_key_position() {
                    out.truncate(span.start);
                    strip_dangling(&mut out);
                }
            }
        }
    }

    let nesting = scan(&out);
    out.extend(nesting.pending_closers.iter().rev());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn repaired(text: &str) -> Value {
        serde_json::from_str(&repair(text)).unwrap()
    }

    #[test]
    fn test_trailing_comma_in_array() {
        assert!(is_truncated(r#"{"x": [1,2,"#));
        assert_eq!(repaired(r#"{"x": [1,2,"#), json!({"x": [1, 2]}));
    }

    #[test]
    fn test_dangling_key_with_colon() {
        assert_eq!(repaired(r#"{"a": 1, "b": "#), json!({"a": 1}));
    }

    #[test]
    fn test_dangling_key_without_colon() {
        assert_eq!(repaired(r#"{"a": 1, "b""#), json!({"a": 1}));
    }

    #[test]
    fn test_unterminated_value_string() {
        assert_eq!(repaired(r#"{"a": {"b": "partial te"#), json!({"a": {"b": "partial te"}}));
    }

    #[test]
    fn test_unterminated_key_string_dropped() {
        assert_eq!(repaired(r#"{"a": 1, "par"#), json!({"a": 1}));
        assert_eq!(repaired(r#"{"par"#), json!({}));
    }

    #[test]
    fn test_dangling_escape_dropped() {
        assert_eq!(repaired(r#"{"a": "line\"#), json!({"a": "line"}));
    }

    #[test]
    fn test_escaped_quote_kept() {
        assert_eq!(repaired(r#"{"a": "say \"hi"#), json!({"a": "say \"hi"}));
    }

    #[test]
    fn test_array_of_strings_not_treated_as_keys() {
        assert_eq!(repaired(r#"["a", "b"#), json!(["a", "b"]));
    }

    #[test]
    fn test_nested_closers_lifo() {
        assert_eq!(repair(r#"{"a": [{"b": [1"#), r#"{"a": [{"b": [1]}]}"#);
    }

    #[test]
    fn test_trailing_whitespace() {
        assert!(is_truncated("{\"a\": 1,   \n"));
        assert_eq!(repaired("{\"a\": 1,   \n"), json!({"a": 1}));
    }

    #[test]
    fn test_complete_text_unchanged() {
        let text = r#"{"a": [1, 2], "b": {"c": "d"}}"#;
        assert!(!is_truncated(text));
        assert_eq!(repair(text), text);
    }

    #[test]
    fn test_mismatched_closer_ignored() {
        let out = repair("{]");
        assert_eq!(out, "{]}");
        assert!(!is_truncated(&out));
    }

    #[test]
    fn test_not_applicable_to_prose() {
        assert!(!is_truncated("The answer is {"));
        assert!(!is_truncated(""));
    }

    #[test]
    fn test_trailing_colon_counts() {
        assert!(is_truncated(r#"{"a":1}:"#));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn structural_text() -> impl Strategy<Value = String> {
        (
            prop_oneof![Just('{'), Just('[')],
            proptest::collection::vec(
                prop_oneof![
                    Just('{'),
                    Just('}'),
                    Just('['),
                    Just(']'),
                    Just('"'),
                    Just(','),
                    Just(':'),
                    Just('\\'),
                    Just(' '),
                    Just('a'),
                    Just('1'),
                ],
                0..40,
            ),
        )
            .prop_map(|(first, rest)| std::iter::once(first).chain(rest).collect())
    }

    proptest! {
        #[test]
        fn repair_output_is_never_truncated(text in structural_text()) {
            let out = repair(&text);
            prop_assert!(!is_truncated(&out), "input {:?} repaired to {:?}", text, out);
        }

        #[test]
        fn repair_is_idempotent(text in structural_text()) {
            let once = repair(&text);
            let twice = repair(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn repair_never_panics_on_arbitrary_text(text in "\\PC{0,60}") {
            let _ = repair(&text);
            let _ = is_truncated(&text);
        }
    }
}
