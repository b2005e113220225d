//! Shape-preserving merge of a resynthesis into the current result

use quarry_domain::SectionDocument;
use serde_json::{Map, Value};

/// Which top-level keys a merge changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Keys whose value differs after the merge, in update order
    pub changed_sections: Vec<String>,
}

impl MergeReport {
    /// Number of changed top-level keys
    pub fn changed(&self) -> usize {
        self.changed_sections.len()
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

/// A non-empty previous value whose JSON kind the update would change
fn is_restructured(previous: &Value, update: &Value) -> bool {
    !is_empty_value(previous) && !same_kind(previous, update)
}

fn graft(target: &mut Map<String, Value>, update: &Map<String, Value>) {
    for (key, value) in update {
        if is_empty_value(value) {
            continue;
        }
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => graft(existing, incoming),
            (Some(existing), _) if is_restructured(existing, value) => {}
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

fn merged_value(previous: Option<&Value>, update: &Value) -> Value {
    match (previous, update) {
        (Some(Value::Object(existing)), Value::Object(incoming)) => {
            let mut combined = existing.clone();
            graft(&mut combined, incoming);
            Value::Object(combined)
        }
        (Some(existing), _) if is_restructured(existing, update) => existing.clone(),
        _ => update.clone(),
    }
}

/// Merge `update` into `document`
///
/// Every key already in `document` survives. Keys whose update is null,
/// blank, or an empty collection keep their previous value, and so do keys
/// whose update changes the JSON kind of a non-empty value (an array
/// answered with a string, an object with an array). Objects on both sides
/// are grafted key by key; values of the same kind are replaced.
///
/// # Examples
///
/// ```
/// use quarry_domain::SectionDocument;
/// use quarry_refiner::merge::merge_into;
/// use serde_json::json;
///
/// let schema = vec!["a".to_string(), "b".to_string()];
/// let mut doc = SectionDocument::from_object(
///     schema.clone(),
///     json!({"a": 1, "b": 2}).as_object().unwrap().clone(),
/// );
/// let update = SectionDocument::from_object(schema, json!({"a": 9}).as_object().unwrap().clone());
///
/// let report = merge_into(&mut doc, &update);
/// assert_eq!(doc.to_value(), json!({"a": 9, "b": 2}));
/// assert_eq!(report.changed_sections, vec!["a"]);
/// ```
pub fn merge_into(document: &mut SectionDocument, update: &SectionDocument) -> MergeReport {
    let mut report = MergeReport::default();

    for key in update.keys() {
        let Some(value) = update.get(key) else {
            continue;
        };
        if is_empty_value(value) {
            continue;
        }

        let merged = merged_value(document.get(key), value);
        if document.get(key) != Some(&merged) {
            document.set(key.to_string(), merged);
            report.changed_sections.push(key.to_string());
        }
    }

    report
}
