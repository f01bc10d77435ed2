//! The `Simple` property variant: a single typed scalar slot.

use std::sync::Arc;

use base64::Engine;
use chrono::NaiveDateTime;

use super::hash::fnv1a;
use super::value::Value;
use crate::error::ScimError;
use crate::schema::{Attribute, AttributeType};

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone)]
pub struct SimpleProperty {
    attribute: Arc<Attribute>,
    value: Option<Value>,
}

impl SimpleProperty {
    pub fn new(attribute: Arc<Attribute>) -> Self {
        Self {
            attribute,
            value: None,
        }
    }

    pub fn attribute(&self) -> &Arc<Attribute> {
        &self.attribute
    }

    pub fn unassigned(&self) -> bool {
        self.value.is_none()
    }

    pub fn value(&self) -> Value {
        self.value.clone().unwrap_or(Value::Null)
    }

    pub fn delete(&mut self) {
        self.value = None;
    }

    pub fn set(&mut self, v: Value) -> Result<(), ScimError> {
        if v.is_null() {
            self.delete();
            return Ok(());
        }
        self.value = Some(coerce(&self.attribute, v)?);
        Ok(())
    }

    /// `add` on a Simple property is identical to `set` (spec §4.B).
    pub fn add(&mut self, v: Value) -> Result<(), ScimError> {
        self.set(v)
    }

    pub fn hash(&self) -> u64 {
        match &self.value {
            None => 0,
            Some(v) => scalar_hash(&self.attribute, v),
        }
    }
}

/// Validates and normalizes an incoming [`Value`] against the attribute's
/// declared data type. Also accepts the legacy `"True"`/`"False"` hack for
/// boolean attributes named `active` (spec §4.G) since it is indistinguishable
/// from ordinary string-to-boolean coercion at this layer.
fn coerce(attribute: &Attribute, v: Value) -> Result<Value, ScimError> {
    match (attribute.data_type, &v) {
        (AttributeType::String, Value::String(_)) => Ok(v),
        (AttributeType::Reference, Value::Reference(_) | Value::String(_)) => {
            let s = v.as_str().unwrap().to_string();
            Ok(Value::Reference(s))
        }
        (AttributeType::Boolean, Value::Boolean(_)) => Ok(v),
        (AttributeType::Boolean, Value::String(s)) if attribute.name.eq_ignore_ascii_case("active") => {
            match s.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(invalid_value(attribute)),
            }
        }
        (AttributeType::Integer, Value::Integer(_)) => Ok(v),
        (AttributeType::Decimal, Value::Decimal(_)) => Ok(v),
        (AttributeType::Decimal, Value::Integer(i)) => Ok(Value::Decimal(i as f64)),
        (AttributeType::Binary, Value::String(s) | Value::Binary(s)) => {
            base64::engine::general_purpose::STANDARD
                .decode(&s)
                .map_err(|_| invalid_value(attribute))?;
            Ok(Value::Binary(s))
        }
        (AttributeType::DateTime, Value::String(s) | Value::DateTime(_)) => {
            let parsed = if let Value::DateTime(dt) = &v {
                *dt
            } else {
                NaiveDateTime::parse_from_str(s.as_str(), DATE_TIME_FORMAT)
                    .map_err(|_| invalid_value(attribute))?
            };
            Ok(Value::DateTime(parsed))
        }
        _ => Err(invalid_value(attribute)),
    }
}

fn invalid_value(attribute: &Attribute) -> ScimError {
    ScimError::invalid_value(format!(
        "value incompatible with attribute '{}'",
        attribute.name
    ))
}

fn scalar_hash(attribute: &Attribute, v: &Value) -> u64 {
    match v {
        Value::String(s) | Value::Reference(s) => {
            if attribute.case_exact {
                fnv1a(s.as_bytes())
            } else {
                fnv1a(s.to_lowercase().as_bytes())
            }
        }
        Value::Boolean(b) => fnv1a(&[*b as u8]),
        Value::Integer(i) => fnv1a(&i.to_le_bytes()),
        Value::Decimal(d) => {
            let normalized = if *d == 0.0 { 0.0_f64 } else { *d };
            fnv1a(&normalized.to_bits().to_le_bytes())
        }
        Value::DateTime(dt) => fnv1a(dt.format(DATE_TIME_FORMAT).to_string().as_bytes()),
        Value::Binary(s) => fnv1a(s.as_bytes()),
        Value::Null | Value::Complex(_) | Value::MultiValued(_) => 0,
    }
}
