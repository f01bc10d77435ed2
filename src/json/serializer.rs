//! Selective, projection-aware JSON serialization (spec §4.G "Serializer").
//!
//! Honors each attribute's `returned` characteristic, `writeOnly` mutability,
//! and the caller's `attributes`/`excludedAttributes` projection, then
//! writes the result with a custom HTML-safe string escaper rather than
//! `serde_json`'s default (spec §4.G "Output encoding").

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Map, Number, Value as Json};

use crate::error::{ScimError, ScimResult};
use crate::property::{ComplexProperty, MultiValuedProperty, Property, Value};
use crate::resource::Resource;
use crate::schema::{Attribute, Mutability, Returned};

/// What the caller additionally asked to include/exclude on top of each
/// attribute's own `returned` characteristic (RFC 7644 §3.9
/// `attributes`/`excludedAttributes`).
#[derive(Debug, Clone, Default)]
pub struct Projection {
    /// Dot-path names requested via `attributes`. Non-empty narrows output
    /// to exactly these plus `Returned::Always` attributes.
    pub include: HashSet<String>,
    /// Dot-path names suppressed via `excludedAttributes`.
    pub exclude: HashSet<String>,
}

impl Projection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn including(paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            include: paths.into_iter().map(Into::into).collect(),
            exclude: HashSet::new(),
        }
    }

    pub fn excluding(paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            include: HashSet::new(),
            exclude: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a projection from RFC 7644 §3.9 query parameters. The two are
    /// mutually exclusive; supplying both is a client error rather than an
    /// arbitrary precedence choice.
    pub fn from_query_params(
        attributes: Option<&str>,
        excluded_attributes: Option<&str>,
    ) -> ScimResult<Self> {
        match (attributes, excluded_attributes) {
            (Some(_), Some(_)) => Err(ScimError::invalid_syntax(
                "'attributes' and 'excludedAttributes' are mutually exclusive",
            )),
            (Some(a), None) => Ok(Self::including(a.split(',').map(str::trim))),
            (None, Some(e)) => Ok(Self::excluding(e.split(',').map(str::trim))),
            (None, None) => Ok(Self::all()),
        }
    }

    fn visible(&self, returned: Returned, path: &str) -> bool {
        match returned {
            Returned::Always => true,
            Returned::Never => false,
            Returned::Request => self.include.iter().any(|p| p.eq_ignore_ascii_case(path)),
            Returned::Default => {
                if self.exclude.iter().any(|p| p.eq_ignore_ascii_case(path)) {
                    return false;
                }
                if !self.include.is_empty() {
                    return self.include.iter().any(|p| p.eq_ignore_ascii_case(path));
                }
                true
            }
        }
    }
}

/// Serializes `resource` to a SCIM JSON body, honoring `projection`.
pub fn serialize(resource: &Resource, projection: &Projection) -> ScimResult<Vec<u8>> {
    let root = resource
        .root
        .as_complex()
        .expect("a Resource's root property is always Complex");

    let mut map = Map::new();
    map.insert("schemas".to_string(), schemas_array(resource, root));
    for (key, value) in serialize_children(root, projection, "")? {
        map.insert(key, value);
    }

    let mut out = Vec::new();
    write_json(&Json::Object(map), &mut out);
    Ok(out)
}

fn schemas_array(resource: &Resource, root: &ComplexProperty) -> Json {
    let mut schemas = vec![resource.resource_type.main_schema.id.clone()];
    for ext in &resource.resource_type.extensions {
        let assigned = root
            .child(&ext.id)
            .map(|c| !c.unassigned())
            .unwrap_or(false);
        if assigned {
            schemas.push(ext.id.clone());
        }
    }
    Json::Array(schemas.into_iter().map(Json::String).collect())
}

fn serialize_children(
    complex: &ComplexProperty,
    projection: &Projection,
    prefix: &str,
) -> ScimResult<Vec<(String, Json)>> {
    let mut out = Vec::new();
    for child in complex.children() {
        let attribute = child.attribute();
        if attribute.mutability == Mutability::WriteOnly {
            continue;
        }
        if child.unassigned() {
            continue;
        }
        let path = dotted(prefix, &attribute.name);
        if !projection.visible(attribute.returned, &path) {
            continue;
        }
        let value = serialize_one(child, attribute, projection, &path)?;
        out.push((attribute.name.clone(), value));
    }
    Ok(out)
}

fn dotted(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn serialize_one(
    property: &Property,
    attribute: &Arc<Attribute>,
    projection: &Projection,
    path: &str,
) -> ScimResult<Json> {
    match property {
        Property::Simple(_) => scalar_to_json(attribute, &property.value()),
        Property::Complex(c) => {
            let fields = serialize_children(c, projection, path)?;
            Ok(Json::Object(fields.into_iter().collect()))
        }
        Property::MultiValued(m) => serialize_multi_valued(m, projection, path),
    }
}

fn serialize_multi_valued(
    multi: &MultiValuedProperty,
    projection: &Projection,
    path: &str,
) -> ScimResult<Json> {
    let element_attribute = multi.attribute().as_singular();
    let mut items = Vec::with_capacity(multi.len());
    for element in multi.elements() {
        items.push(serialize_one(element, &element_attribute, projection, path)?);
    }
    Ok(Json::Array(items))
}

/// Converts a scalar [`Value`] to JSON, rejecting non-finite decimals (spec
/// §4.G: a decimal attribute holding NaN/±Infinity fails serialization
/// rather than silently becoming `null`).
fn scalar_to_json(attribute: &Attribute, value: &Value) -> ScimResult<Json> {
    Ok(match value {
        Value::Null => Json::Null,
        Value::String(s) | Value::Reference(s) | Value::Binary(s) => Json::String(s.clone()),
        Value::Boolean(b) => Json::Bool(*b),
        Value::Integer(i) => Json::Number(Number::from(*i)),
        Value::Decimal(d) => {
            let n = Number::from_f64(*d).ok_or_else(|| {
                ScimError::invalid_value(format!(
                    "attribute '{}' holds a non-finite decimal value",
                    attribute.name
                ))
            })?;
            Json::Number(n)
        }
        Value::DateTime(dt) => Json::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
        Value::Complex(_) | Value::MultiValued(_) => {
            return Err(ScimError::internal(format!(
                "attribute '{}' is scalar but holds a structured value",
                attribute.name
            )))
        }
    })
}

/// Renders an arbitrary JSON value (e.g. a `ListResponse` envelope or a
/// `PatchOp` echo) through the same HTML-safe writer used for resources, so
/// every response body shares one escaping policy.
pub fn write_json_value(value: &Json) -> Vec<u8> {
    let mut out = Vec::new();
    write_json(value, &mut out);
    out
}

/// Writes `value` as JSON text, escaping `<`, `>`, `&`, U+2028 and U+2029 in
/// strings beyond what `serde_json`'s default escaper covers, so a SCIM
/// response embedded verbatim in an HTML/JS context can't break out of its
/// containing tag or script (spec §4.G "Output encoding").
fn write_json(value: &Json, out: &mut Vec<u8>) {
    match value {
        Json::Null => out.extend_from_slice(b"null"),
        Json::Bool(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Json::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Json::String(s) => write_json_string(s, out),
        Json::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_json(item, out);
            }
            out.push(b']');
        }
        Json::Object(map) => {
            out.push(b'{');
            for (i, (key, val)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_json_string(key, out);
                out.push(b':');
                write_json(val, out);
            }
            out.push(b'}');
        }
    }
}

fn write_json_string(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            '<' => out.extend_from_slice(b"\\u003c"),
            '>' => out.extend_from_slice(b"\\u003e"),
            '&' => out.extend_from_slice(b"\\u0026"),
            '\u{2028}' => out.extend_from_slice(b"\\u2028"),
            '\u{2029}' => out.extend_from_slice(b"\\u2029"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}
