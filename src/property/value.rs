//! The native value representation produced by [`super::Property::value`]
//! and consumed by `set`/`add`.

use chrono::NaiveDateTime;

/// A schema-agnostic value: nil, a typed scalar, a complex map, or a
/// multiValued list (spec §4.B).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    DateTime(NaiveDateTime),
    /// Base64 text, already validated against the wire format.
    Binary(String),
    Reference(String),
    Complex(Vec<(String, Value)>),
    MultiValued(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Reference(s) | Value::Binary(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}
