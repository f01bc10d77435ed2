//! The PatchOp engine (spec §4.H, module H): applies RFC 7644 §3.5.2
//! PatchOp requests to a [`Resource`]'s property tree via the traversal
//! engine and the navigator.

use std::sync::Arc;

use crate::error::{ScimError, ScimResult};
use crate::json::json_to_value;
use crate::navigator::Navigator;
use crate::path::{compile_path, PathNode};
use crate::resource::Resource;
use crate::schema::{Attribute, UrnRegistry};
use crate::traversal::{self, ElementSelection};

pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOpKind {
    Add,
    Remove,
    Replace,
}

#[derive(Debug, Clone)]
pub struct PatchOperation {
    pub op: PatchOpKind,
    pub path: Option<String>,
    pub value: serde_json::Value,
}

/// A parsed, schema-validated `PatchOp` request body (spec §4.H).
#[derive(Debug, Clone)]
pub struct PatchRequest {
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    /// Parses a PatchOp request body, validating the `schemas` URN and
    /// requiring at least one operation (spec §4.H, RFC 7644 §3.5.2).
    pub fn parse(bytes: &[u8]) -> ScimResult<Self> {
        let json: serde_json::Value = serde_json::from_slice(bytes)?;
        let obj = json
            .as_object()
            .ok_or_else(|| ScimError::invalid_syntax("PatchOp body must be a JSON object"))?;

        let schemas = obj
            .get("schemas")
            .and_then(|s| s.as_array())
            .ok_or_else(|| ScimError::invalid_syntax("PatchOp body requires 'schemas'"))?;
        if !schemas.iter().any(|s| s.as_str() == Some(PATCH_OP_SCHEMA)) {
            return Err(ScimError::invalid_syntax(format!(
                "PatchOp body must declare schema '{PATCH_OP_SCHEMA}'"
            )));
        }

        let raw_ops = obj
            .get("Operations")
            .and_then(|o| o.as_array())
            .ok_or_else(|| ScimError::invalid_syntax("PatchOp body requires 'Operations'"))?;
        if raw_ops.is_empty() {
            return Err(ScimError::invalid_value(
                "PatchOp 'Operations' must be non-empty",
            ));
        }

        let operations = raw_ops
            .iter()
            .map(parse_operation)
            .collect::<ScimResult<Vec<_>>>()?;
        Ok(Self { operations })
    }
}

fn parse_operation(raw: &serde_json::Value) -> ScimResult<PatchOperation> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ScimError::invalid_syntax("each PatchOp operation must be a JSON object"))?;
    let op_str = obj
        .get("op")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ScimError::invalid_syntax("operation requires 'op'"))?;
    let op = match op_str.to_ascii_lowercase().as_str() {
        "add" => PatchOpKind::Add,
        "remove" => PatchOpKind::Remove,
        "replace" => PatchOpKind::Replace,
        other => {
            return Err(ScimError::invalid_syntax(format!(
                "unknown PatchOp operation '{other}'"
            )))
        }
    };
    let path = match obj.get("path") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        None | Some(serde_json::Value::Null) => None,
        Some(_) => return Err(ScimError::invalid_syntax("operation 'path' must be a string")),
    };
    if op == PatchOpKind::Remove && path.is_none() {
        return Err(ScimError::no_target("'remove' requires a path"));
    }
    let value = obj.get("value").cloned().unwrap_or(serde_json::Value::Null);
    Ok(PatchOperation { op, path, value })
}

/// Applies `request` to `resource` in order, returning whether the
/// resource's identity hash actually changed — a no-op patch is legal, and
/// callers use this to decide whether `meta.lastModified` should advance.
pub fn apply(resource: &mut Resource, request: &PatchRequest, urns: &UrnRegistry) -> ScimResult<bool> {
    let before = resource.hash();
    for operation in &request.operations {
        apply_one(resource, operation, urns)?;
    }
    Ok(resource.hash() != before)
}

fn apply_one(resource: &mut Resource, operation: &PatchOperation, urns: &UrnRegistry) -> ScimResult<()> {
    match operation.op {
        PatchOpKind::Add => apply_add(resource, operation, urns),
        PatchOpKind::Replace => apply_replace(resource, operation, urns),
        PatchOpKind::Remove => apply_remove(resource, operation, urns),
    }
}

fn apply_add(resource: &mut Resource, operation: &PatchOperation, urns: &UrnRegistry) -> ScimResult<()> {
    match &operation.path {
        None => apply_bare_value(resource, &operation.value, Mode::Add),
        Some(path_text) => {
            let node = compile_path(path_text, urns)?;
            let target_attribute = target_attribute_for(resource, &node, path_text)?;
            let value = json_to_value(&target_attribute, &operation.value)?;
            let mut nav = resource.navigator();
            traversal::walk(&mut nav, Some(&node), ElementSelection::SelectAll, &mut |n| {
                n.add(value.clone());
                drain(n)
            })
        }
    }
}

fn apply_replace(resource: &mut Resource, operation: &PatchOperation, urns: &UrnRegistry) -> ScimResult<()> {
    match &operation.path {
        None => apply_bare_value(resource, &operation.value, Mode::Replace),
        Some(path_text) => {
            let node = compile_path(path_text, urns)?;
            let target_attribute = target_attribute_for(resource, &node, path_text)?;
            let value = json_to_value(&target_attribute, &operation.value)?;
            let mut nav = resource.navigator();
            // spec §9 open question: a filtered path's `replace` overwrites
            // the matched sub-attribute (or element) in place; it does not
            // replace the whole multiValued attribute.
            traversal::walk(&mut nav, Some(&node), ElementSelection::SelectAll, &mut |n| {
                n.replace(value.clone());
                drain(n)
            })
        }
    }
}

fn apply_remove(resource: &mut Resource, operation: &PatchOperation, urns: &UrnRegistry) -> ScimResult<()> {
    let path_text = operation
        .path
        .as_deref()
        .ok_or_else(|| ScimError::no_target("'remove' requires a path"))?;
    let node = compile_path(path_text, urns)?;
    let mut nav = resource.navigator();
    remove_walk(&mut nav, &node)
}

/// Mirrors [`traversal::walk`]'s descent (dot into `node.name`, then either
/// fan out or evaluate a filter), but a terminal filter segment — one with
/// no further `next` — removes the matched elements from the multiValued
/// parent outright, rather than deleting them in place (spec §4.H: "when a
/// filter segment is used, selected elements are removed from the
/// multiValued parent, the opposite selection semantics to traversal").
fn remove_walk(nav: &mut Navigator, node: &PathNode) -> ScimResult<()> {
    use crate::property::Property;

    if matches!(nav.current(), Property::MultiValued(_)) {
        let count = match nav.current() {
            Property::MultiValued(m) => m.len(),
            _ => unreachable!("checked above"),
        };
        for i in 0..count {
            nav.at(i);
            drain(nav)?;
            let result = remove_walk(nav, node);
            nav.retract();
            result?;
        }
        return Ok(());
    }

    nav.dot(&node.name);
    drain(nav)?;

    let result = match &node.filter {
        Some(filter_expr) => remove_filtered(nav, node, filter_expr),
        None => match &node.next {
            None => {
                nav.delete();
                drain(nav)
            }
            Some(next) => remove_walk(nav, next),
        },
    };
    nav.retract();
    result
}

fn remove_filtered(nav: &mut Navigator, node: &PathNode, filter_expr: &crate::path::Expr) -> ScimResult<()> {
    use crate::property::Property;

    let Property::MultiValued(multi) = nav.current() else {
        return Err(ScimError::invalid_filter(format!(
            "'{}' is not multiValued, a filter cannot be applied",
            node.name
        )));
    };
    let matched: Vec<bool> = (0..multi.len())
        .map(|i| {
            let element = multi.element_at(i).expect("index in range");
            crate::filter::evaluate(element, filter_expr).map_err(|e| e.at_path(&node.name))
        })
        .collect::<ScimResult<_>>()?;
    if !matched.iter().any(|&m| m) {
        return Err(ScimError::no_target(format!(
            "no element of '{}' matched the filter",
            node.name
        )));
    }

    match &node.next {
        None => {
            let multi = nav
                .current_multi_valued_mut()
                .expect("checked MultiValued above");
            multi.remove_matched(&matched);
            Ok(())
        }
        Some(next) => {
            for (i, is_match) in matched.iter().enumerate() {
                if !is_match {
                    continue;
                }
                nav.at(i);
                drain(nav)?;
                let result = remove_walk(nav, next);
                nav.retract();
                result?;
            }
            Ok(())
        }
    }
}

#[derive(Clone, Copy)]
enum Mode {
    Add,
    Replace,
}

/// A path-less add/replace carries an object of top-level attribute names
/// to merge (add) or set (replace) on the resource root (RFC 7644
/// §3.5.2.1).
fn apply_bare_value(resource: &mut Resource, value: &serde_json::Value, mode: Mode) -> ScimResult<()> {
    let obj = value
        .as_object()
        .ok_or_else(|| ScimError::invalid_value("a path-less PatchOp value must be a JSON object"))?;
    let root_attribute = Arc::clone(resource.root.attribute());
    for (key, raw) in obj {
        let sub = root_attribute
            .sub_attribute(key)
            .ok_or_else(|| ScimError::invalid_path(format!("unknown attribute '{key}'")))?;
        let parsed = json_to_value(sub, raw)?;
        let child = resource
            .root
            .by_index_mut(key.as_str())
            .expect("sub-attribute looked up above exists on the root complex property");
        match mode {
            Mode::Add => child.add(parsed)?,
            Mode::Replace => child.set(parsed)?,
        }
    }
    Ok(())
}

fn target_attribute_for(
    resource: &Resource,
    node: &PathNode,
    path_text: &str,
) -> ScimResult<Arc<Attribute>> {
    let root_attribute = Arc::clone(resource.root.attribute());
    resolve_target_attribute(&root_attribute, node)
        .ok_or_else(|| ScimError::invalid_path(format!("unknown path '{path_text}'")))
}

/// Walks `node` against `root_attribute`'s schema (not a live property
/// tree) to determine the attribute descriptor a path targets, mirroring
/// how [`crate::traversal::walk`] navigates: a filtered segment with no
/// further path resolves to the element schema (one matched element), a
/// plain segment over a multiValued attribute descends into its singular
/// projection before resolving the next name.
fn resolve_target_attribute(root_attribute: &Arc<Attribute>, node: &PathNode) -> Option<Arc<Attribute>> {
    let sub = root_attribute.sub_attribute(&node.name)?;
    match &node.next {
        None if node.filter.is_some() => Some(sub.as_singular()),
        None => Some(Arc::clone(sub)),
        Some(next) => resolve_target_attribute(&sub.as_singular(), next),
    }
}

fn drain(nav: &mut Navigator) -> ScimResult<()> {
    if let Some(err) = nav.error() {
        let err = ScimError::new(err.kind, err.detail.clone());
        nav.clear_error();
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Value;
    use crate::schema::builtin::user_resource_type;

    fn urns_for(rt: &crate::schema::ResourceType) -> UrnRegistry {
        let mut urns = UrnRegistry::new();
        for urn in rt.urns() {
            urns.register(urn);
        }
        urns
    }

    fn patch_body(ops: &str) -> Vec<u8> {
        format!(
            r#"{{"schemas":["urn:ietf:params:scim:api:messages:2.0:PatchOp"],"Operations":[{ops}]}}"#
        )
        .into_bytes()
    }

    #[test]
    fn rejects_missing_schema_urn() {
        let body = br#"{"schemas":["bogus"],"Operations":[{"op":"add","path":"nickName","value":"x"}]}"#;
        let err = PatchRequest::parse(body).unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::InvalidSyntax);
    }

    #[test]
    fn rejects_empty_operations() {
        let body = br#"{"schemas":["urn:ietf:params:scim:api:messages:2.0:PatchOp"],"Operations":[]}"#;
        let err = PatchRequest::parse(body).unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::InvalidValue);
    }

    #[test]
    fn remove_without_path_is_rejected_at_parse_time() {
        let body = patch_body(r#"{"op":"remove"}"#);
        let err = PatchRequest::parse(&body).unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::NoTarget);
    }

    #[test]
    fn replace_with_path_sets_a_simple_attribute() {
        let rt = Arc::new(user_resource_type());
        let urns = urns_for(&rt);
        let mut resource = Resource::blank(Arc::clone(&rt));
        resource.root.by_index_mut("userName").unwrap().set(Value::String("u".into())).unwrap();

        let body = patch_body(r#"{"op":"replace","path":"nickName","value":"wonka"}"#);
        let request = PatchRequest::parse(&body).unwrap();
        let changed = apply(&mut resource, &request, &urns).unwrap();
        assert!(changed);
        let root = resource.root.as_complex().unwrap();
        assert_eq!(root.child("nickName").unwrap().value(), Value::String("wonka".into()));
    }

    #[test]
    fn add_without_path_merges_top_level_object() {
        let rt = Arc::new(user_resource_type());
        let urns = urns_for(&rt);
        let mut resource = Resource::blank(Arc::clone(&rt));

        let body = patch_body(r#"{"op":"add","value":{"userName":"u","nickName":"n"}}"#);
        let request = PatchRequest::parse(&body).unwrap();
        apply(&mut resource, &request, &urns).unwrap();
        let root = resource.root.as_complex().unwrap();
        assert_eq!(root.child("userName").unwrap().value(), Value::String("u".into()));
        assert_eq!(root.child("nickName").unwrap().value(), Value::String("n".into()));
    }

    #[test]
    fn remove_with_filter_deletes_matching_element() {
        let rt = Arc::new(user_resource_type());
        let urns = urns_for(&rt);
        let mut resource = Resource::blank(Arc::clone(&rt));
        resource
            .root
            .by_index_mut("emails")
            .unwrap()
            .add(Value::Complex(vec![
                ("value".into(), Value::String("a@x".into())),
                ("type".into(), Value::String("work".into())),
            ]))
            .unwrap();
        resource
            .root
            .by_index_mut("emails")
            .unwrap()
            .add(Value::Complex(vec![
                ("value".into(), Value::String("b@x".into())),
                ("type".into(), Value::String("home".into())),
            ]))
            .unwrap();

        let body = patch_body(r#"{"op":"remove","path":"emails[type eq \"home\"]"}"#);
        let request = PatchRequest::parse(&body).unwrap();
        apply(&mut resource, &request, &urns).unwrap();
        let emails = resource.root.as_complex().unwrap().child("emails").unwrap();
        assert_eq!(emails.as_multi_valued().unwrap().len(), 1);
    }

    #[test]
    fn remove_with_filter_and_trailing_path_clears_only_the_sub_attribute() {
        let rt = Arc::new(user_resource_type());
        let urns = urns_for(&rt);
        let mut resource = Resource::blank(Arc::clone(&rt));
        resource
            .root
            .by_index_mut("emails")
            .unwrap()
            .add(Value::Complex(vec![
                ("value".into(), Value::String("a@x".into())),
                ("type".into(), Value::String("work".into())),
            ]))
            .unwrap();

        let body = patch_body(r#"{"op":"remove","path":"emails[value eq \"a@x\"].type"}"#);
        let request = PatchRequest::parse(&body).unwrap();
        apply(&mut resource, &request, &urns).unwrap();
        let emails = resource.root.as_complex().unwrap().child("emails").unwrap().as_multi_valued().unwrap();
        assert_eq!(emails.len(), 1, "the element itself must survive, only 'type' is cleared");
        let element = emails.element_at(0).unwrap().as_complex().unwrap();
        assert!(element.child("type").unwrap().unassigned());
    }

    #[test]
    fn remove_with_filter_matching_nothing_is_no_target() {
        let rt = Arc::new(user_resource_type());
        let urns = urns_for(&rt);
        let mut resource = Resource::blank(Arc::clone(&rt));
        resource
            .root
            .by_index_mut("emails")
            .unwrap()
            .add(Value::Complex(vec![
                ("value".into(), Value::String("a@x".into())),
                ("type".into(), Value::String("work".into())),
            ]))
            .unwrap();

        let body = patch_body(r#"{"op":"remove","path":"emails[type eq \"home\"]"}"#);
        let request = PatchRequest::parse(&body).unwrap();
        let err = apply(&mut resource, &request, &urns).unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::NoTarget);
    }

    #[test]
    fn no_op_replace_reports_unchanged() {
        let rt = Arc::new(user_resource_type());
        let urns = urns_for(&rt);
        let mut resource = Resource::blank(Arc::clone(&rt));
        resource.root.by_index_mut("nickName").unwrap().set(Value::String("n".into())).unwrap();

        let body = patch_body(r#"{"op":"replace","path":"nickName","value":"n"}"#);
        let request = PatchRequest::parse(&body).unwrap();
        let changed = apply(&mut resource, &request, &urns).unwrap();
        assert!(!changed);
    }

    #[test]
    fn add_into_extension_by_urn_path() {
        let rt = Arc::new(user_resource_type());
        let urns = urns_for(&rt);
        let mut resource = Resource::blank(Arc::clone(&rt));

        let body = patch_body(
            r#"{"op":"add","path":"urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber","value":"701984"}"#,
        );
        let request = PatchRequest::parse(&body).unwrap();
        apply(&mut resource, &request, &urns).unwrap();
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

    #[test]
    fn unknown_top_level_attribute_in_bare_add_is_rejected() {
        let rt = Arc::new(user_resource_type());
        let urns = urns_for(&rt);
        let mut resource = Resource::blank(Arc::clone(&rt));
        let body = patch_body(r#"{"op":"add","value":{"bogus":"x"}}"#);
        let request = PatchRequest::parse(&body).unwrap();
        let err = apply(&mut resource, &request, &urns).unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::InvalidPath);
    }
}
