//! Structured value module - the payload recovered from model output

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix used for synthetic keys when an array is wrapped into an object
pub const ARRAY_SECTION_PREFIX: &str = "section_";

/// An object or an array of JSON-compatible values
///
/// Bare scalars (strings, numbers, booleans, null) are never structured values;
/// a model response that parses to one is treated as an extraction failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructuredValue {
    /// A JSON object
    Object(Map<String, Value>),

    /// A JSON array
    Array(Vec<Value>),
}

impl StructuredValue {
    /// Convert a parsed JSON value, rejecting scalars
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_domain::StructuredValue;
    /// use serde_json::json;
    ///
    /// assert!(StructuredValue::from_value(json!({"a": 1})).is_some());
    /// assert!(StructuredValue::from_value(json!([1, 2])).is_some());
    /// assert!(StructuredValue::from_value(json!(42)).is_none());
    /// ```
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::Object(map)),
            Value::Array(items) => Some(Self::Array(items)),
            _ => None,
        }
    }

    /// Convert back into a plain JSON value
    pub fn into_value(self) -> Value {
        match self {
            Self::Object(map) => Value::Object(map),
            Self::Array(items) => Value::Array(items),
        }
    }

    /// Borrow the object form, if this is an object
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            Self::Array(_) => None,
        }
    }

    /// Borrow the array form, if this is an array
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Self::Array(items) => Some(items),
            Self::Object(_) => None,
        }
    }

    /// Whether this is an array
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Coerce into an object, wrapping arrays under synthetic keys
    ///
    /// Arrays become `{"section_0": .., "section_1": ..}`. The returned flag is
    /// `true` when wrapping happened, so callers that required an object can
    /// detect the shape mismatch.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_domain::StructuredValue;
    /// use serde_json::json;
    ///
    /// let value = StructuredValue::from_value(json!(["a", "b"])).unwrap();
    /// let (object, was_array) = value.into_object();
    /// assert!(was_array);
    /// assert_eq!(object["section_1"], json!("b"));
    /// ```
    pub fn into_object(self) -> (Map<String, Value>, bool) {
        match self {
            Self::Object(map) => (map, false),
            Self::Array(items) => {
                let map = items
                    .into_iter()
                    .enumerate()
                    .map(|(idx, item)| (format!("{}{}", ARRAY_SECTION_PREFIX, idx), item))
                    .collect();
                (map, true)
            }
        }
    }
}

impl From<StructuredValue> for Value {
    fn from(value: StructuredValue) -> Self {
        value.into_value()
    }
}
