//! Sparse field bags for partial updates.

use serde_json::Value as JsonValue;

use crate::entity::{Schema, Value};

/// An ordered set of (field name, value) pairs describing a partial update.
///
/// Field names are matched case-insensitively against the target schema when
/// the patch is applied; names that match nothing are ignored, and the key
/// field is never patched.
#[derive(Debug, Clone, Default)]
pub struct Patch {
    fields: Vec<(String, Value)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field to the patch, builder-style.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Builds a patch from a JSON object, coercing each member to the kind
    /// declared on the schema. Unknown members and members whose JSON value
    /// cannot represent the declared kind are dropped.
    pub fn from_json(schema: &'static Schema, json: &JsonValue) -> Self {
        let mut patch = Self::new();
        if let Some(object) = json.as_object() {
            for (name, raw) in object {
                if let Some(field) = schema.field(name) {
                    if let Some(value) = Value::from_json(raw, field.kind) {
                        patch.fields.push((field.name.to_string(), value));
                    }
                }
            }
        }
        patch
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Image;
    use crate::entity::Entity;
    use serde_json::json;

    #[test]
    fn test_from_json_matches_schema_kinds() {
        let schema = Image::static_schema();
        let patch = Patch::from_json(
            schema,
            &json!({"name": "cover.png", "size": 42, "unknown": true, "alt_text": 7}),
        );

        // unknown member and kind-mismatched alt_text are dropped
        let fields: Vec<_> = patch.iter().map(|(n, _)| n.to_string()).collect();
        assert_eq!(fields, vec!["name".to_string(), "size".to_string()]);
    }

    #[test]
    fn test_builder() {
        let patch = Patch::new().set("name", "a").set("size", 10i64);
        assert_eq!(patch.len(), 2);
        assert!(!patch.is_empty());
    }
}
