//! Section document - the schema-bearing form of a synthesis object
//!
//! Model output arrives as an open JSON object whose key set is only known at
//! runtime. A `SectionDocument` splits it into the declared sections (the keys
//! a caller requires) and an extension map for everything else. There is no
//! removal API: once a key is present it stays present, which is what keeps
//! the top-level shape stable across refinement merges.

use serde_json::{Map, Value};

/// Declared sections plus an open extension map
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SectionDocument {
    schema: Vec<String>,
    sections: Map<String, Value>,
    extensions: Map<String, Value>,
}

impl SectionDocument {
    /// Create an empty document with the given declared section keys
    pub fn new(schema: Vec<String>) -> Self {
        let mut deduped: Vec<String> = Vec::with_capacity(schema.len());
        for key in schema {
            if !deduped.contains(&key) {
                deduped.push(key);
            }
        }

        Self {
            schema: deduped,
            sections: Map::new(),
            extensions: Map::new(),
        }
    }

    /// Build a document from a parsed object
    ///
    /// Keys named in `schema` become declared sections; the rest land in the
    /// extension map.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_domain::SectionDocument;
    /// use serde_json::json;
    ///
    /// let object = json!({"overview": "text", "extra": 1});
    /// let doc = SectionDocument::from_object(
    ///     vec!["overview".to_string(), "players".to_string()],
    ///     object.as_object().unwrap().clone(),
    /// );
    /// assert!(doc.contains_key("overview"));
    /// assert!(doc.extension("extra").is_some());
    /// assert_eq!(doc.missing_sections(), vec!["players"]);
    /// ```
    pub fn from_object(schema: Vec<String>, object: Map<String, Value>) -> Self {
        let mut doc = Self::new(schema);
        for (key, value) in object {
            doc.set(key, value);
        }
        doc
    }

    /// Declared section keys, in declaration order
    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    /// Whether a key is a declared section
    pub fn is_declared(&self, key: &str) -> bool {
        self.schema.iter().any(|k| k == key)
    }

    /// Look up a value by key (declared section or extension)
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.sections.get(key).or_else(|| self.extensions.get(key))
    }

    /// Look up an extension value only
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    /// Whether the key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace a value, returning the previous one
    pub fn set(&mut self, key: String, value: Value) -> Option<Value> {
        if self.is_declared(&key) {
            self.sections.insert(key, value)
        } else {
            self.extensions.insert(key, value)
        }
    }

    /// All present keys: declared sections first, then extensions
    pub fn keys(&self) -> Vec<&str> {
        self.schema
            .iter()
            .filter(|k| self.sections.contains_key(k.as_str()))
            .map(String::as_str)
            .chain(self.extensions.keys().map(String::as_str))
            .collect()
    }

    /// Number of present keys
    pub fn len(&self) -> usize {
        self.sections.len() + self.extensions.len()
    }

    /// Whether no key is present
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Declared sections that have no value yet
    pub fn missing_sections(&self) -> Vec<&str> {
        self.schema
            .iter()
            .filter(|k| !self.sections.contains_key(k.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Render the document as a JSON object
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        for key in &self.schema {
            if let Some(value) = self.sections.get(key) {
                object.insert(key.clone(), value.clone());
            }
        }
        for (key, value) in &self.extensions {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Vec<String> {
        vec!["overview".to_string(), "players".to_string()]
    }

    #[test]
    fn test_duplicate_schema_keys_collapse() {
        let doc = SectionDocument::new(vec!["a".to_string(), "a".to_string()]);
        assert_eq!(doc.schema().len(), 1);
    }

    #[test]
    fn test_keys_order_declared_first() {
        let object = json!({"zeta": 1, "players": [], "overview": "x"});
        let doc = SectionDocument::from_object(schema(), object.as_object().unwrap().clone());
        assert_eq!(doc.keys(), vec!["overview", "players", "zeta"]);
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_set_returns_previous() {
        let mut doc = SectionDocument::new(schema());
        assert!(doc.set("overview".to_string(), json!("a")).is_none());
        assert_eq!(doc.set("overview".to_string(), json!("b")), Some(json!("a")));
        assert_eq!(doc.get("overview"), Some(&json!("b")));
    }

    #[test]
    fn test_to_value_round_trip() {
        let object = json!({"overview": "x", "custom": {"k": 1}});
        let doc = SectionDocument::from_object(schema(), object.as_object().unwrap().clone());
        assert_eq!(doc.to_value(), object);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: setting keys never shrinks the key set
        #[test]
        fn test_key_set_never_shrinks(
            ops in proptest::collection::vec(("[a-e]", 0i64..10), 1..30),
        ) {
            let mut doc = SectionDocument::new(vec!["a".to_string(), "b".to_string()]);
            let mut seen = 0usize;
            for (key, value) in ops {
                doc.set(key, serde_json::json!(value));
                prop_assert!(doc.len() >= seen);
                seen = doc.len();
            }
        }
    }
}
