//! The "read-only" pipeline row (spec §4.I): readOnly properties are server-
//! owned and can never be set by an incoming representation.

use crate::error::ScimResult;
use crate::pipeline::{FilterContext, Operation, ResourceFilter};
use crate::property::Property;
use crate::resource::Resource;
use crate::schema::Mutability;

/// On create, clears every readOnly property the caller may have sent. On
/// replace/patch, restores each readOnly property to its prior persisted
/// value, so a client echoing back a prior GET can't smuggle in a change to
/// `id` or `meta`.
pub struct ReadOnlyFilter;

impl ResourceFilter for ReadOnlyFilter {
    fn apply(
        &self,
        ctx: &FilterContext,
        resource: &mut Resource,
        reference: Option<&Resource>,
    ) -> ScimResult<()> {
        match ctx.operation {
            Operation::Create => clear_read_only(&mut resource.root),
            Operation::Replace | Operation::Patch => {
                if let Some(reference) = reference {
                    restore_read_only(&mut resource.root, &reference.root);
                }
            }
        }
        Ok(())
    }
}

fn clear_read_only(property: &mut Property) {
    if property.attribute().mutability == Mutability::ReadOnly {
        property.delete();
        return;
    }
    if let Property::Complex(c) = property {
        for child in c.children_mut() {
            clear_read_only(child);
        }
    }
}

fn restore_read_only(property: &mut Property, reference: &Property) {
    if property.attribute().mutability == Mutability::ReadOnly {
        *property = reference.clone();
        return;
    }
    if let (Property::Complex(c), Property::Complex(r)) = (property, reference) {
        for (child, ref_child) in c.children_mut().iter_mut().zip(r.children()) {
            restore_read_only(child, ref_child);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::property::Value;
    use crate::schema::builtin::user_resource_type;

    fn ctx(operation: Operation) -> FilterContext {
        FilterContext {
            operation,
            bcrypt_cost: 4,
            base_url: "https://example.com".into(),
        }
    }

    #[test]
    fn create_clears_meta_even_if_the_caller_set_it() {
        let mut resource = Resource::blank(Arc::new(user_resource_type()));
        resource
            .root
            .by_index_mut("meta")
            .unwrap()
            .by_index_mut("resourceType")
            .unwrap()
            .set(Value::String("Forged".into()))
            .unwrap();
        ReadOnlyFilter.apply(&ctx(Operation::Create), &mut resource, None).unwrap();
        assert!(resource
            .root
            .by_index_mut("meta")
            .unwrap()
            .by_index_mut("resourceType")
            .unwrap()
            .unassigned());
    }

    #[test]
    fn replace_restores_id_from_reference() {
        let mut reference = Resource::blank(Arc::new(user_resource_type()));
        reference
            .root
            .by_index_mut("id")
            .unwrap()
            .set(Value::String("original-id".into()))
            .unwrap();
        let mut incoming = reference.clone_deep();
        incoming
            .root
            .by_index_mut("id")
            .unwrap()
            .set(Value::String("forged-id".into()))
            .unwrap();
        ReadOnlyFilter
            .apply(&ctx(Operation::Replace), &mut incoming, Some(&reference))
            .unwrap();
        assert_eq!(incoming.id().as_deref(), Some("original-id"));
    }
}
