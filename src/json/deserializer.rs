//! Schema-driven JSON deserialization into a blank [`Resource`]'s property
//! tree (spec §4.G "Deserializer").

use std::sync::Arc;

use serde_json::Value as Json;

use crate::error::ScimError;
use crate::property::Value;
use crate::resource::Resource;
use crate::schema::{Attribute, AttributeType, ResourceType};

/// Parses `bytes` as a SCIM resource body matching `resource_type`'s
/// schema, returning a freshly populated [`Resource`].
///
/// Invalid UTF-8 byte sequences are replaced with U+FFFD before parsing
/// (spec §4.G), so malformed input never causes a panic or silent
/// truncation — only a best-effort lossy decode followed by ordinary JSON
/// parsing (which still surfaces `invalidSyntax` for whatever shape results).
pub fn deserialize(resource_type: Arc<ResourceType>, bytes: &[u8]) -> Result<Resource, ScimError> {
    let text = String::from_utf8_lossy(bytes);
    let json: Json = serde_json::from_str(&text)?;
    let obj = json
        .as_object()
        .ok_or_else(|| ScimError::invalid_syntax("top-level SCIM payload must be a JSON object"))?;

    let mut resource = Resource::blank(resource_type);
    let root_attribute = Arc::clone(resource.root.attribute());

    for (key, val) in obj {
        if key.eq_ignore_ascii_case("schemas") {
            validate_schemas(val, &root_attribute)?;
            continue;
        }
        let Some(sub) = root_attribute.sub_attribute(key) else {
            return Err(ScimError::invalid_syntax(format!("unknown attribute '{key}'")).at_path(key));
        };
        let value = json_to_value(sub, val)?;
        let child = resource
            .root
            .by_index_mut(key.as_str())
            .expect("sub-attribute looked up above exists on the root complex property");
        child.set(value)?;
    }
    Ok(resource)
}

fn validate_schemas(json: &Json, root_attribute: &Attribute) -> Result<(), ScimError> {
    let arr = json
        .as_array()
        .ok_or_else(|| ScimError::invalid_syntax("'schemas' must be an array"))?;
    for item in arr {
        let s = item
            .as_str()
            .ok_or_else(|| ScimError::invalid_syntax("'schemas' entries must be strings"))?;
        let known = s == root_attribute.name
            || root_attribute.sub_attributes.iter().any(|a| a.name == s);
        if !known {
            return Err(ScimError::invalid_syntax(format!("unknown schema urn '{s}'")));
        }
    }
    Ok(())
}

/// Converts a raw JSON value into this crate's [`Value`] against `attribute`'s
/// shape (complex/multiValued/scalar), rejecting unknown complex keys with
/// `invalidSyntax` (spec §4.G). Scalar-level type coercion (string vs.
/// dateTime vs. binary vs. reference, the `active` "True"/"False" legacy
/// hack) is left to [`crate::property::Property::set`]/`add`, which already
/// implements it; this function only resolves *shape*.
pub fn json_to_value(attribute: &Arc<Attribute>, json: &Json) -> Result<Value, ScimError> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    if attribute.multi_valued {
        let arr = json.as_array().ok_or_else(|| {
            ScimError::invalid_syntax(format!("attribute '{}' expects a JSON array", attribute.name))
        })?;
        let element_attribute = attribute.as_singular();
        let mut items = Vec::with_capacity(arr.len());
        for item in arr {
            items.push(json_to_value(&element_attribute, item)?);
        }
        return Ok(Value::MultiValued(items));
    }
    if attribute.data_type == AttributeType::Complex {
        let obj = json.as_object().ok_or_else(|| {
            ScimError::invalid_syntax(format!("attribute '{}' expects a JSON object", attribute.name))
        })?;
        let mut pairs = Vec::with_capacity(obj.len());
        for (key, val) in obj {
            let Some(sub) = attribute.sub_attribute(key) else {
                return Err(
                    ScimError::invalid_syntax(format!("unknown attribute '{key}'")).at_path(&attribute.name)
                );
            };
            pairs.push((sub.name.clone(), json_to_value(sub, val)?));
        }
        return Ok(Value::Complex(pairs));
    }
    match json {
        Json::Bool(b) => Ok(Value::Boolean(*b)),
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Decimal(f))
            } else {
                Err(ScimError::invalid_syntax(format!(
                    "unsupported numeric literal for attribute '{}'",
                    attribute.name
                )))
            }
        }
        Json::Array(_) | Json::Object(_) => Err(ScimError::invalid_syntax(format!(
            "attribute '{}' expects a scalar JSON value",
            attribute.name
        ))),
        Json::Null => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Value;
    use crate::schema::builtin::user_resource_type;

    #[test]
    fn deserializes_minimal_user() {
        let body = br#"{"schemas":["urn:ietf:params:scim:schemas:core:2.0:User"],"id":"3cc032f5-...","userName":"imulab"}"#;
        let resource = deserialize(Arc::new(user_resource_type()), body).unwrap();
        let root = resource.root.as_complex().unwrap();
        assert_eq!(
            root.child("userName").unwrap().value(),
            Value::String("imulab".into())
        );
        assert!(root.child("meta").unwrap().unassigned());
    }

    #[test]
    fn legacy_true_false_strings_coerce_active() {
        let body = br#"{"schemas":["urn:ietf:params:scim:schemas:core:2.0:User"],"userName":"u","active":"True"}"#;
        let resource = deserialize(Arc::new(user_resource_type()), body).unwrap();
        let root = resource.root.as_complex().unwrap();
        assert_eq!(root.child("active").unwrap().value(), Value::Boolean(true));
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let body = br#"{"schemas":["urn:ietf:params:scim:schemas:core:2.0:User"],"bogus":"x"}"#;
        let err = deserialize(Arc::new(user_resource_type()), body).unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::InvalidSyntax);
    }

    #[test]
    fn unknown_nested_key_is_rejected() {
        let body = br#"{"schemas":["urn:ietf:params:scim:schemas:core:2.0:User"],"userName":"u","name":{"bogus":"x"}}"#;
        let err = deserialize(Arc::new(user_resource_type()), body).unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::InvalidSyntax);
    }

    #[test]
    fn multi_valued_array_deserializes_each_element() {
        let body = br#"{"schemas":["urn:ietf:params:scim:schemas:core:2.0:User"],"userName":"u",
            "emails":[{"value":"a@x","primary":true},{"value":"b@x","primary":false}]}"#;
        let resource = deserialize(Arc::new(user_resource_type()), body).unwrap();
        let root = resource.root.as_complex().unwrap();
        let emails = root.child("emails").unwrap().as_multi_valued().unwrap();
        assert_eq!(emails.len(), 2);
    }

    #[test]
    fn invalid_base64_binary_is_rejected() {
        let body = br#"{"schemas":["urn:ietf:params:scim:schemas:core:2.0:User"],"userName":"u",
            "x509Certificates":[{"value":"not base64!!"}]}"#;
        let err = deserialize(Arc::new(user_resource_type()), body).unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::InvalidValue);
    }

    #[test]
    fn extension_attribute_nests_under_its_urn() {
        let body = br#"{"schemas":["urn:ietf:params:scim:schemas:core:2.0:User","urn:ietf:params:scim:schemas:extension:enterprise:2.0:User"],
            "userName":"u","urn:ietf:params:scim:schemas:extension:enterprise:2.0:User":{"employeeNumber":"701984"}}"#;
        let resource = deserialize(Arc::new(user_resource_type()), body).unwrap();
        let root = resource.root.as_complex().unwrap();
        let ext = root
            .child("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User")
            .unwrap()
            .as_complex()
            .unwrap();
        assert_eq!(
            ext.child("employeeNumber").unwrap().value(),
            Value::String("701984".into())
        );
    }
}
