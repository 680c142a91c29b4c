//! Dynamic values exchanged between model code and the engine.
//!
//! Return values, store slots, and random draws all carry `Value`. The
//! untagged serde representation doubles as the canonical serialization the
//! marginal aggregator keys its histogram by.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// Canonical serialization used as a histogram key. Values that share a
    /// key are treated as the same support point.
    pub fn canonical_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view; integers coerce to float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_keys_distinguish_values() {
        assert_ne!(
            Value::Bool(true).canonical_key(),
            Value::Bool(false).canonical_key()
        );
        assert_ne!(Value::Int(1).canonical_key(), Value::Float(1.5).canonical_key());
        assert_eq!(Value::Float(0.5).canonical_key(), Value::Float(0.5).canonical_key());
    }

    #[test]
    fn test_canonical_key_is_plain_json() {
        assert_eq!(Value::Bool(true).canonical_key(), "true");
        assert_eq!(Value::Unit.canonical_key(), "null");
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::Str("a".into())]).canonical_key(),
            r#"[1,"a"]"#
        );
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Bool(true).as_f64(), None);
    }
}
