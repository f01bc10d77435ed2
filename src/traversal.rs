//! The traversal engine (spec §4.E, module E): walks a compiled path
//! against a property tree, fanning out across multiValued selections and
//! invoking a callback at each targeted property.

use crate::error::ScimError;
use crate::filter;
use crate::navigator::Navigator;
use crate::path::PathNode;
use crate::property::Property;

/// Controls how a plain path segment fans out when the current position is
/// multiValued and the segment carries no bracketed filter (spec §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementSelection {
    /// Visit every element (the default).
    SelectAll,
    /// Visit the unique primary element, or element 0 if none is primary.
    PrimaryOrFirst,
}

impl Default for ElementSelection {
    fn default() -> Self {
        Self::SelectAll
    }
}

/// Walks `nav`'s current position according to `path`, invoking `f` at each
/// targeted property (spec §4.E).
///
/// `path = None` invokes `f` at the current position. Otherwise `node.name`
/// names a child of the current position: if the current position is
/// already multiValued (because a prior step fanned out onto one of its
/// elements), `node` instead describes the sub-attribute to read from that
/// element — no further `dot` is needed, and fan-out proceeds per
/// `selection`. Otherwise the engine descends one level with `dot`; once
/// there, a filter-bearing node requires the freshly-dotted-into position
/// to be multiValued, evaluates the filter against each element, and
/// descends into each match before recursing with the node's `next`.
pub fn walk(
    nav: &mut Navigator,
    path: Option<&PathNode>,
    selection: ElementSelection,
    f: &mut impl FnMut(&mut Navigator) -> Result<(), ScimError>,
) -> Result<(), ScimError> {
    let Some(node) = path else {
        return f(nav);
    };

    if matches!(nav.current(), Property::MultiValued(_)) {
        return walk_fanned_out(nav, node, selection, f);
    }

    nav.dot(&node.name);
    if let Some(err) = nav.error() {
        let err = ScimError::new(err.kind, err.detail.clone());
        nav.retract();
        nav.clear_error();
        return Err(err.at_path(&node.name));
    }

    let result = if let Some(filter_expr) = &node.filter {
        walk_filtered(nav, node, filter_expr, selection, f)
    } else {
        walk(nav, node.next.as_deref(), selection, f)
    };
    nav.retract();
    result
}

fn walk_filtered(
    nav: &mut Navigator,
    node: &PathNode,
    filter_expr: &crate::path::Expr,
    selection: ElementSelection,
    f: &mut impl FnMut(&mut Navigator) -> Result<(), ScimError>,
) -> Result<(), ScimError> {
    let Property::MultiValued(multi) = nav.current() else {
        return Err(ScimError::invalid_filter(format!(
            "'{}' is not multiValued, a filter cannot be applied",
            node.name
        )));
    };
    let count = multi.len();
    let mut matched_any = false;
    for i in 0..count {
        let matches = {
            let Property::MultiValued(multi) = nav.current() else {
                unreachable!("position unchanged since the check above");
            };
            let element = multi.element_at(i).expect("index in range");
            filter::evaluate(element, filter_expr).map_err(|e| e.at_path(&node.name))?
        };
        if !matches {
            continue;
        }
        matched_any = true;
        nav.at(i);
        if let Some(err) = nav.error() {
            let err = ScimError::new(err.kind, err.detail.clone());
            nav.retract();
            nav.clear_error();
            return Err(err);
        }
        let result = walk(nav, node.next.as_deref(), selection, f);
        nav.retract();
        result?;
    }
    if !matched_any {
        return Err(ScimError::no_target(format!(
            "no element of '{}' matched the filter",
            node.name
        )));
    }
    Ok(())
}

fn walk_fanned_out(
    nav: &mut Navigator,
    node: &PathNode,
    selection: ElementSelection,
    f: &mut impl FnMut(&mut Navigator) -> Result<(), ScimError>,
) -> Result<(), ScimError> {
    match selection {
        ElementSelection::SelectAll => {
            let count = match nav.current() {
                Property::MultiValued(m) => m.len(),
                _ => unreachable!("caller checked MultiValued"),
            };
            for i in 0..count {
                nav.at(i);
                if let Some(err) = nav.error() {
                    let err = ScimError::new(err.kind, err.detail.clone());
                    nav.retract();
                    nav.clear_error();
                    return Err(err);
                }
                let result = walk(nav, Some(node), selection, f);
                nav.retract();
                result?;
            }
            Ok(())
        }
        ElementSelection::PrimaryOrFirst => {
            let index = match nav.current() {
                Property::MultiValued(m) => {
                    if m.is_empty() {
                        return Err(ScimError::no_target(format!(
                            "'{}' has no elements",
                            node.name
                        )));
                    }
                    m.primary_element()
                        .and_then(|primary| m.elements().iter().position(|e| std::ptr::eq(e, primary)))
                        .unwrap_or(0)
                }
                _ => unreachable!("caller checked MultiValued"),
            };
            nav.at(index);
            if let Some(err) = nav.error() {
                let err = ScimError::new(err.kind, err.detail.clone());
                nav.retract();
                nav.clear_error();
                return Err(err);
            }
            let result = walk(nav, Some(node), selection, f);
            nav.retract();
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Value;
    use crate::schema::{AttributeBuilder, AttributeType};

    fn emails_attr() -> std::sync::Arc<crate::schema::Attribute> {
        AttributeBuilder::new("emails", AttributeType::Complex)
            .multi_valued(true)
            .sub_attribute(
                AttributeBuilder::new("value", AttributeType::String)
                    .identity(true)
                    .build()
                    .unwrap(),
            )
            .sub_attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .build()
                    .unwrap(),
            )
            .sub_attribute(
                AttributeBuilder::new("primary", AttributeType::Boolean)
                    .primary(true)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    fn email(value: &str, ty: &str, primary: bool) -> Value {
        Value::Complex(vec![
            ("value".into(), Value::String(value.into())),
            ("type".into(), Value::String(ty.into())),
            ("primary".into(), Value::Boolean(primary)),
        ])
    }

    #[test]
    fn select_all_visits_every_element_in_order() {
        let mut root = Property::new(emails_attr());
        root.add(email("a@x", "work", false)).unwrap();
        root.add(email("b@x", "home", false)).unwrap();
        let urns = crate::schema::UrnRegistry::new();
        let path = crate::path::compile_path("value", &urns).unwrap();
        let mut nav = Navigator::new(&mut root);
        let mut seen = Vec::new();
        walk(&mut nav, Some(&path), ElementSelection::SelectAll, &mut |n| {
            seen.push(n.current().value().as_str().unwrap().to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec!["a@x", "b@x"]);
    }

    /// A synthetic resource root carrying `emails` as a sub-attribute,
    /// matching how a real [`crate::resource::Resource`] root is shaped —
    /// a top-level filtered path node names an attribute the navigator
    /// must still `dot` into before the filter is evaluated.
    fn resource_root_with_emails() -> Property {
        let root_attr = AttributeBuilder::new("root", AttributeType::Complex)
            .sub_attribute(emails_attr())
            .build()
            .unwrap();
        Property::new(root_attr)
    }

    #[test]
    fn filter_segment_fans_out_over_matches_only() {
        let mut root = resource_root_with_emails();
        let emails = root.as_complex_mut().unwrap().child_mut("emails").unwrap();
        emails.add(email("a@x", "work", false)).unwrap();
        emails.add(email("b@x", "home", false)).unwrap();
        let filter_expr = crate::path::parse_filter(r#"type eq "home""#).unwrap();
        let node = crate::path::PathNode {
            name: "emails".into(),
            filter: Some(Box::new(filter_expr)),
            next: Some(Box::new(crate::path::PathNode::leaf("value"))),
        };
        let mut nav = Navigator::new(&mut root);
        let mut seen = Vec::new();
        walk(&mut nav, Some(&node), ElementSelection::SelectAll, &mut |n| {
            seen.push(n.current().value().as_str().unwrap().to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec!["b@x"]);
    }

    #[test]
    fn filter_on_singular_attribute_is_rejected() {
        let simple = AttributeBuilder::new("userName", AttributeType::String)
            .build()
            .unwrap();
        let root_attr = AttributeBuilder::new("root", AttributeType::Complex)
            .sub_attribute(simple)
            .build()
            .unwrap();
        let mut root = Property::new(root_attr);
        let filter_expr = crate::path::parse_filter(r#"value eq "x""#).unwrap();
        let node = crate::path::PathNode {
            name: "userName".into(),
            filter: Some(Box::new(filter_expr)),
            next: None,
        };
        let mut nav = Navigator::new(&mut root);
        let err = walk(&mut nav, Some(&node), ElementSelection::SelectAll, &mut |_| Ok(())).unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::InvalidFilter);
    }

    #[test]
    fn primary_or_first_picks_primary_element() {
        let mut root = Property::new(emails_attr());
        root.add(email("a@x", "work", false)).unwrap();
        root.add(email("b@x", "home", true)).unwrap();
        let node = crate::path::PathNode::leaf("value");
        let mut nav = Navigator::new(&mut root);
        let mut seen = Vec::new();
        walk(&mut nav, Some(&node), ElementSelection::PrimaryOrFirst, &mut |n| {
            seen.push(n.current().value().as_str().unwrap().to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec!["b@x"]);
    }
}
