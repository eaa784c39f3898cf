//! Runtime values.
//!
//! Facts arrive as JSON-shaped data and are converted into this tagged
//! sum before evaluation; every operator is an exhaustive match over it.
//! `Null` and `Trinary::Unknown` are the two "unknownish" values that
//! propagate indeterminacy through arithmetic, comparisons, and guards.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::trinary::Trinary;

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON null, and the value of expressions with no result.
    Null,
    /// A JSON boolean.
    Bool(bool),
    /// A three-valued logical value; `true`/`false`/`unknown` literals
    /// evaluate to these.
    Trinary(Trinary),
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// A string.
    Str(String),
    /// An ordered list.
    List(Vec<Value>),
    /// A string-keyed record; shape-coerced facts and map literals both
    /// land here.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// The type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Trinary(_) => "trinary",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Coerces to a trinary: booleans and the integers 0/1 carry their
    /// truth value, trinaries pass through, everything else is `Unknown`.
    pub fn to_trinary(&self) -> Trinary {
        match self {
            Value::Bool(b) => Trinary::from(*b),
            Value::Trinary(t) => *t,
            Value::Int(n) => Trinary::from_i64(*n),
            _ => Trinary::Unknown,
        }
    }

    /// True for the values that propagate indeterminacy: null and the
    /// unknown trinary.
    pub fn is_unknownish(&self) -> bool {
        matches!(self, Value::Null | Value::Trinary(Trinary::Unknown))
    }

    /// Numeric view of integers and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// True when both values are numbers.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Structural equality with numeric and logical cross-type
    /// comparison: `1 == 1.0` and `true == Trinary::True` hold.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Bool(b), Value::Trinary(t)) | (Value::Trinary(t), Value::Bool(b)) => {
                Trinary::from(*b) == *t
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v.loose_eq(w)))
            }
            (a, b) => a == b,
        }
    }

    /// Converts a JSON document into a value.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts back to JSON. `Trinary::Unknown` becomes null; the other
    /// trinaries become booleans.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Trinary(Trinary::True) => serde_json::Value::Bool(true),
            Value::Trinary(Trinary::False) => serde_json::Value::Bool(false),
            Value::Trinary(Trinary::Unknown) => serde_json::Value::Null,
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(f) => {
                serde_json::Number::from_f64(*f).map_or(serde_json::Value::Null, Into::into)
            }
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Trinary(t) => write!(f, "{t}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{k}\": {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_trinary() {
        assert_eq!(Value::Bool(true).to_trinary(), Trinary::True);
        assert_eq!(Value::Int(1).to_trinary(), Trinary::True);
        assert_eq!(Value::Int(0).to_trinary(), Trinary::False);
        assert_eq!(Value::Int(7).to_trinary(), Trinary::Unknown);
        assert_eq!(Value::Null.to_trinary(), Trinary::Unknown);
        assert_eq!(Value::Str("yes".into()).to_trinary(), Trinary::Unknown);
    }

    #[test]
    fn test_loose_eq_cross_type() {
        assert!(Value::Int(1).loose_eq(&Value::Float(1.0)));
        assert!(Value::Bool(true).loose_eq(&Value::Trinary(Trinary::True)));
        assert!(!Value::Bool(false).loose_eq(&Value::Trinary(Trinary::Unknown)));
        assert!(Value::List(vec![Value::Int(1)]).loose_eq(&Value::List(vec![Value::Float(1.0)])));
        assert!(!Value::Int(1).loose_eq(&Value::Str("1".into())));
    }

    #[test]
    fn test_json_round_trip() {
        let doc = json!({
            "name": "alice",
            "age": 30,
            "score": 2.5,
            "tags": ["a", "b"],
            "active": true,
            "extra": null
        });
        let value = Value::from_json(&doc);
        assert_eq!(value.to_json(), doc);
    }

    #[test]
    fn test_unknown_serializes_as_null() {
        assert_eq!(
            Value::Trinary(Trinary::Unknown).to_json(),
            serde_json::Value::Null
        );
        assert_eq!(
            Value::Trinary(Trinary::True).to_json(),
            serde_json::Value::Bool(true)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::Str("x".into())]).to_string(),
            "[1, \"x\"]"
        );
    }
}
