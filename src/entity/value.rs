//! Scalar field values for dynamic entity access.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

/// The scalar kinds an entity field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    DateTime,
}

/// A dynamically-typed scalar value read from (or written to) an entity field.
///
/// `Value` is what compiled path accessors produce and what sparse patches
/// carry. It defines a total order so that any resolved sort field can be
/// used as an ordering operator without per-type code.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(DateTime<Utc>),
}

impl Value {
    /// The kind of this value, or `None` for `Null`.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Int(_) => Some(ValueKind::Int),
            Value::Float(_) => Some(ValueKind::Float),
            Value::Text(_) => Some(ValueKind::Text),
            Value::DateTime(_) => Some(ValueKind::DateTime),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Total comparison across values.
    ///
    /// Null sorts first; mixed Int/Float compare numerically; otherwise
    /// values of different kinds compare by kind so the order is total.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Int(a), Float(b)) => (*a as f64).total_cmp(b),
            (Float(a), Int(b)) => a.total_cmp(&(*b as f64)),
            (Text(a), Text(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }

    /// Converts a JSON value into a `Value` aimed at the given field kind.
    ///
    /// Returns `None` when the JSON value cannot represent that kind; JSON
    /// null always maps to `Value::Null`.
    pub fn from_json(json: &JsonValue, kind: ValueKind) -> Option<Value> {
        if json.is_null() {
            return Some(Value::Null);
        }
        match kind {
            ValueKind::Bool => json.as_bool().map(Value::Bool),
            ValueKind::Int => json.as_i64().map(Value::Int),
            ValueKind::Float => json.as_f64().map(Value::Float),
            ValueKind::Text => json.as_str().map(|s| Value::Text(s.to_string())),
            ValueKind::DateTime => json
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| Value::DateTime(dt.with_timezone(&Utc))),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Float(_) => 2,
        Value::Text(_) => 3,
        Value::DateTime(_) => 4,
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sorts_first() {
        assert_eq!(Value::Null.total_cmp(&Value::Int(0)), Ordering::Less);
        assert_eq!(Value::Text("a".into()).total_cmp(&Value::Null), Ordering::Greater);
    }

    #[test]
    fn test_mixed_numeric_comparison() {
        assert_eq!(Value::Int(2).total_cmp(&Value::Float(2.5)), Ordering::Less);
        assert_eq!(Value::Float(3.0).total_cmp(&Value::Int(3)), Ordering::Equal);
    }

    #[test]
    fn test_from_json_for_kind() {
        let v = Value::from_json(&serde_json::json!("hello"), ValueKind::Text).unwrap();
        assert_eq!(v, Value::Text("hello".into()));

        assert!(Value::from_json(&serde_json::json!("hello"), ValueKind::Int).is_none());
        assert_eq!(
            Value::from_json(&serde_json::Value::Null, ValueKind::Int),
            Some(Value::Null)
        );
    }
}
