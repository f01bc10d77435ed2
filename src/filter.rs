//! The filter evaluator (spec §4.F, module F): evaluates a compiled filter
//! expression against a (sub)property.

use crate::error::ScimError;
use crate::path::{Expr, Literal, LogicalOp, PathNode, RelationalOp};
use crate::property::{Property, Value};
use crate::schema::{Attribute, AttributeType};

pub fn evaluate(property: &Property, expr: &Expr) -> Result<bool, ScimError> {
    match expr {
        Expr::Parenthesis(inner) => evaluate(property, inner),
        Expr::Logical(LogicalOp::And, left, Some(right)) => {
            Ok(evaluate(property, left)? && evaluate(property, right)?)
        }
        Expr::Logical(LogicalOp::Or, left, Some(right)) => {
            Ok(evaluate(property, left)? || evaluate(property, right)?)
        }
        Expr::Logical(LogicalOp::Not, left, None) => Ok(!evaluate(property, left)?),
        Expr::Relational(op, path, literal) => {
            evaluate_relational(property, *op, path, literal.as_ref())
        }
        _ => Err(ScimError::invalid_filter("malformed filter expression")),
    }
}

fn evaluate_relational(
    property: &Property,
    op: RelationalOp,
    path: &PathNode,
    literal: Option<&Literal>,
) -> Result<bool, ScimError> {
    let targets = collect_targets(property, path)?;
    if op == RelationalOp::Ne {
        // spec §9 open question: implement `ne` as `not eq`, not a
        // separately recursing negation.
        return Ok(!evaluate_relational(property, RelationalOp::Eq, path, literal)?);
    }
    // Existential semantics: true if any fanned-out target matches.
    for target in &targets {
        if relational_matches(target, op, literal)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn relational_matches(
    target: &Property,
    op: RelationalOp,
    literal: Option<&Literal>,
) -> Result<bool, ScimError> {
    if op == RelationalOp::Pr {
        return Ok(!target.unassigned());
    }
    let attribute = target.attribute();
    let literal = literal.ok_or_else(|| ScimError::invalid_filter("missing literal operand"))?;
    let right = coerce_literal(attribute, literal)?;
    let left = target.value();

    match op {
        RelationalOp::Eq => Ok(values_equal(&left, &right, attribute.case_exact)),
        RelationalOp::Sw | RelationalOp::Ew | RelationalOp::Co => {
            let (l, r) = (
                as_comparable_str(&left, attribute.case_exact),
                as_comparable_str(&right, attribute.case_exact),
            );
            match (l, r) {
                (Some(l), Some(r)) => Ok(match op {
                    RelationalOp::Sw => l.starts_with(&r),
                    RelationalOp::Ew => l.ends_with(&r),
                    RelationalOp::Co => l.contains(&r),
                    _ => unreachable!(),
                }),
                _ => Err(ScimError::invalid_filter(
                    "sw/ew/co require a string-valued left operand",
                )),
            }
        }
        RelationalOp::Gt | RelationalOp::Ge | RelationalOp::Lt | RelationalOp::Le => {
            let ord = compare(&left, &right, attribute.case_exact).ok_or_else(|| {
                ScimError::invalid_filter("operands are not ordinally comparable")
            })?;
            Ok(match op {
                RelationalOp::Gt => ord == std::cmp::Ordering::Greater,
                RelationalOp::Ge => ord != std::cmp::Ordering::Less,
                RelationalOp::Lt => ord == std::cmp::Ordering::Less,
                RelationalOp::Le => ord != std::cmp::Ordering::Greater,
                _ => unreachable!(),
            })
        }
        RelationalOp::Ne | RelationalOp::Pr => unreachable!("handled above"),
    }
}

/// Resolves the left operand path over `property`, fanning out across any
/// multiValued attribute it crosses (existential semantics; spec §4.F).
/// Nested filters are rejected at parse time, so every segment here is a
/// plain name.
fn collect_targets<'a>(property: &'a Property, path: &PathNode) -> Result<Vec<&'a Property>, ScimError> {
    match property {
        Property::Complex(c) => {
            let child = c.child(&path.name).ok_or_else(|| {
                ScimError::invalid_path(format!("unknown attribute '{}'", path.name))
            })?;
            match &path.next {
                Some(next) => collect_targets(child, next),
                None => Ok(vec![child]),
            }
        }
        Property::MultiValued(m) => {
            let mut results = Vec::new();
            for element in m.elements() {
                let Some(complex) = element.as_complex() else {
                    continue;
                };
                if let Some(child) = complex.child(&path.name) {
                    match &path.next {
                        Some(next) => results.extend(collect_targets(child, next)?),
                        None => results.push(child),
                    }
                }
            }
            Ok(results)
        }
        Property::Simple(_) => Err(ScimError::invalid_path(format!(
            "'{}' has no sub-attribute '{}'",
            property.attribute().name,
            path.name
        ))),
    }
}

fn coerce_literal(attribute: &Attribute, literal: &Literal) -> Result<Value, ScimError> {
    Ok(match (attribute.data_type, literal) {
        (AttributeType::String, Literal::Str(s)) => Value::String(s.clone()),
        (AttributeType::Reference, Literal::Str(s)) => Value::Reference(s.clone()),
        (AttributeType::Boolean, Literal::Bool(b)) => Value::Boolean(*b),
        (AttributeType::Integer, Literal::Integer(i)) => Value::Integer(*i),
        (AttributeType::Decimal, Literal::Decimal(d)) => Value::Decimal(*d),
        (AttributeType::Decimal, Literal::Integer(i)) => Value::Decimal(*i as f64),
        (AttributeType::DateTime, Literal::Str(s)) => {
            let dt = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .map_err(|_| ScimError::invalid_value(format!("bad dateTime literal '{s}'")))?;
            Value::DateTime(dt)
        }
        (AttributeType::Binary, Literal::Str(s)) => Value::Binary(s.clone()),
        _ => {
            return Err(ScimError::invalid_filter(format!(
                "literal is incompatible with attribute '{}'",
                attribute.name
            )))
        }
    })
}

fn values_equal(left: &Value, right: &Value, case_exact: bool) -> bool {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Decimal(_), _) | (_, Value::Decimal(_)) => left.as_f64() == right.as_f64(),
        (Value::DateTime(a), Value::DateTime(b)) => a == b,
        _ => match (as_comparable_str(left, case_exact), as_comparable_str(right, case_exact)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn as_comparable_str(v: &Value, case_exact: bool) -> Option<String> {
    v.as_str().map(|s| if case_exact { s.to_string() } else { s.to_lowercase() })
}

fn compare(left: &Value, right: &Value, case_exact: bool) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        (Value::Decimal(_), _) | (_, Value::Decimal(_)) => {
            left.as_f64()?.partial_cmp(&right.as_f64()?)
        }
        _ => {
            let (l, r) = (as_comparable_str(left, case_exact)?, as_comparable_str(right, case_exact)?);
            Some(l.cmp(&r))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeBuilder;
    use std::sync::Arc;

    fn emails_property() -> Property {
        let value = AttributeBuilder::new("value", AttributeType::String)
            .identity(true)
            .build()
            .unwrap();
        let emails = AttributeBuilder::new("emails", AttributeType::Complex)
            .multi_valued(true)
            .sub_attribute(value)
            .build()
            .unwrap();
        let mut p = Property::new(emails);
        p.add(Value::Complex(vec![(
            "value".into(),
            Value::String("user1@foo.com".into()),
        )]))
        .unwrap();
        p.add(Value::Complex(vec![(
            "value".into(),
            Value::String("user2@foo.com".into()),
        )]))
        .unwrap();
        p
    }

    #[test]
    fn starts_with_matches_existentially_across_elements() {
        let emails = emails_property();
        let expr = crate::path::parse_filter(r#"value sw "user1""#).unwrap();
        assert!(evaluate(&emails, &expr).unwrap());
    }

    #[test]
    fn ne_is_negation_of_eq() {
        let emails = emails_property();
        let eq = crate::path::parse_filter(r#"value eq "user1@foo.com""#).unwrap();
        let ne = crate::path::parse_filter(r#"value ne "user1@foo.com""#).unwrap();
        assert_eq!(evaluate(&emails, &eq).unwrap(), !evaluate(&emails, &ne).unwrap());
    }

    #[test]
    fn pr_true_only_when_assigned() {
        let nick_name = AttributeBuilder::new("nickName", AttributeType::String)
            .build()
            .unwrap();
        let wrapper = AttributeBuilder::new("wrapper", AttributeType::Complex)
            .sub_attribute(Arc::clone(&nick_name))
            .build()
            .unwrap();
        let expr = crate::path::parse_filter("nickName pr").unwrap();

        let mut assigned = Property::new(wrapper);
        assert!(!evaluate(&assigned, &expr).unwrap());
        assigned.add(Value::Complex(vec![(
            "nickName".into(),
            Value::String("jane".into()),
        )]))
        .unwrap();
        assert!(evaluate(&assigned, &expr).unwrap());
    }
}
