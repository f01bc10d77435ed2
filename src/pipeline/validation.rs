//! The "validation" pipeline row (spec §4.I): required/mutability/uniqueness
//! enforcement, run last since uniqueness needs the `Database` collaborator.

use crate::database::{Database, Pagination};
use crate::error::{ScimError, ScimResult};
use crate::path::{Expr, Literal, PathNode, RelationalOp};
use crate::pipeline::{FilterContext, Operation};
use crate::property::{Property, Value};
use crate::resource::Resource;
use crate::schema::{Mutability, Uniqueness};

/// Checks `resource` against its own schema's required/mutability
/// constraints, then asks `db` whether any uniqueness-constrained attribute
/// collides with another stored resource.
pub async fn validate<D: Database>(
    ctx: &FilterContext,
    resource: &Resource,
    reference: Option<&Resource>,
    db: &D,
) -> ScimResult<()> {
    check_required(&resource.root)?;
    check_mutability(&resource.root, reference.map(|r| &r.root))?;
    check_uniqueness(ctx, resource, db).await
}

/// Recurses the property tree; a required, non-readOnly, unassigned
/// property fails validation (spec §4.I "required" row).
fn check_required(property: &Property) -> ScimResult<()> {
    let attribute = property.attribute();
    if attribute.required && property.unassigned() && attribute.mutability != Mutability::ReadOnly {
        return Err(ScimError::invalid_value(format!(
            "'{}' is required",
            attribute.name
        )));
    }
    match property {
        Property::Complex(c) => {
            for child in c.children() {
                check_required(child)?;
            }
        }
        Property::MultiValued(m) => {
            for element in m.elements() {
                check_required(element)?;
            }
        }
        Property::Simple(_) => {}
    }
    Ok(())
}

/// An immutable attribute may not change value once a reference exists
/// (spec §4.I "mutability" row). On create there is no reference, so
/// nothing can conflict.
fn check_mutability(property: &Property, reference: Option<&Property>) -> ScimResult<()> {
    let attribute = property.attribute();
    if attribute.mutability == Mutability::Immutable {
        if let Some(reference) = reference {
            if !reference.unassigned() && property.hash() != reference.hash() {
                return Err(ScimError::mutability(format!(
                    "'{}' is immutable and cannot be changed",
                    attribute.name
                )));
            }
        }
    }
    match (property, reference) {
        (Property::Complex(c), Some(Property::Complex(r))) => {
            for (child, ref_child) in c.children().iter().zip(r.children()) {
                check_mutability(child, Some(ref_child))?;
            }
        }
        (Property::Complex(c), None) => {
            for child in c.children() {
                check_mutability(child, None)?;
            }
        }
        (Property::MultiValued(m), Some(Property::MultiValued(r))) => {
            for (element, ref_element) in m.elements().iter().zip(r.elements()) {
                check_mutability(element, Some(ref_element))?;
            }
        }
        (Property::MultiValued(m), None) => {
            for element in m.elements() {
                check_mutability(element, None)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Top-level attributes marked `uniqueness: server` or `global` must not
/// collide with another stored resource. A single match is tolerated on
/// replace/patch if it's the resource being updated itself (spec §4.I
/// "uniqueness" row).
async fn check_uniqueness<D: Database>(ctx: &FilterContext, resource: &Resource, db: &D) -> ScimResult<()> {
    let root = resource
        .root
        .as_complex()
        .expect("a Resource's root property is always Complex");
    let resource_type_name = resource.resource_type.name.clone();

    for child in root.children() {
        let attribute = child.attribute();
        if attribute.uniqueness == Uniqueness::None || child.unassigned() {
            continue;
        }
        let Some(literal) = value_to_literal(&child.value()) else {
            continue;
        };
        let filter = Expr::Relational(RelationalOp::Eq, PathNode::leaf(attribute.name.clone()), Some(literal));

        let matching = db
            .count(&resource_type_name, Some(&filter))
            .await
            .map_err(db_error)?;
        if matching == 0 {
            continue;
        }
        if matching == 1 && matches!(ctx.operation, Operation::Replace | Operation::Patch) {
            let found = db
                .query(&resource_type_name, Some(&filter), None, Pagination { start_index: 1, count: 1 })
                .await
                .map_err(db_error)?;
            if found.first().and_then(Resource::id) == resource.id() {
                continue;
            }
        }
        return Err(ScimError::uniqueness(format!(
            "'{}' must be unique",
            attribute.name
        )));
    }
    Ok(())
}

fn value_to_literal(value: &Value) -> Option<Literal> {
    match value {
        Value::String(s) | Value::Reference(s) | Value::Binary(s) => Some(Literal::Str(s.clone())),
        Value::Boolean(b) => Some(Literal::Bool(*b)),
        Value::Integer(i) => Some(Literal::Integer(*i)),
        Value::Decimal(d) => Some(Literal::Decimal(*d)),
        Value::DateTime(dt) => Some(Literal::Str(dt.format("%Y-%m-%dT%H:%M:%S").to_string())),
        Value::Null | Value::Complex(_) | Value::MultiValued(_) => None,
    }
}

fn db_error<E: std::error::Error>(e: E) -> ScimError {
    ScimError::internal(e.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::database::in_memory::InMemoryDatabase;
    use crate::schema::builtin::user_resource_type;

    fn ctx(operation: Operation) -> FilterContext {
        FilterContext {
            operation,
            bcrypt_cost: 4,
            base_url: "https://example.com".into(),
        }
    }

    fn user(id: &str, username: &str) -> Resource {
        let mut r = Resource::blank(Arc::new(user_resource_type()));
        r.root.by_index_mut("id").unwrap().set(Value::String(id.into())).unwrap();
        r.root
            .by_index_mut("userName")
            .unwrap()
            .set(Value::String(username.into()))
            .unwrap();
        r
    }

    #[test]
    fn missing_required_attribute_fails() {
        let resource = Resource::blank(Arc::new(user_resource_type()));
        let err = check_required(&resource.root).unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::InvalidValue);
    }

    #[test]
    fn changing_an_immutable_attribute_fails() {
        let reference = user("1", "alice");
        let mut incoming = reference.clone_deep();
        incoming
            .root
            .by_index_mut("id")
            .unwrap()
            .set(Value::String("2".into()))
            .unwrap();
        let err = check_mutability(&incoming.root, Some(&reference.root)).unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::Mutability);
    }

    #[tokio::test]
    async fn create_rejects_a_duplicate_username() {
        let db = InMemoryDatabase::new();
        db.insert("User", user("1", "alice")).await.unwrap();
        let incoming = user("2", "alice");
        let err = check_uniqueness(&ctx(Operation::Create), &incoming, &db).await.unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::Uniqueness);
    }

    #[tokio::test]
    async fn replace_permits_colliding_with_its_own_prior_record() {
        let db = InMemoryDatabase::new();
        db.insert("User", user("1", "alice")).await.unwrap();
        let incoming = user("1", "alice");
        check_uniqueness(&ctx(Operation::Replace), &incoming, &db).await.unwrap();
    }
}
