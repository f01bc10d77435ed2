//! The "uuid" pipeline row (spec §4.I): assigns a server-generated
//! identifier to a newly created resource.

use uuid::Uuid;

use crate::error::ScimResult;
use crate::pipeline::{FilterContext, Operation, ResourceFilter};
use crate::property::Value;
use crate::resource::Resource;

/// On create, assigns a fresh UUID v4 to `id` if the incoming representation
/// didn't already have one set by an earlier filter.
pub struct UuidFilter;

impl ResourceFilter for UuidFilter {
    fn apply(
        &self,
        ctx: &FilterContext,
        resource: &mut Resource,
        _reference: Option<&Resource>,
    ) -> ScimResult<()> {
        if ctx.operation != Operation::Create {
            return Ok(());
        }
        let id = resource
            .root
            .as_complex_mut()
            .expect("a Resource's root property is always Complex")
            .child_mut("id")
            .expect("every resource type carries an id attribute");
        if id.unassigned() {
            id.set(Value::String(Uuid::new_v4().to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::schema::builtin::user_resource_type;

    fn ctx(operation: Operation) -> FilterContext {
        FilterContext {
            operation,
            bcrypt_cost: 4,
            base_url: "https://example.com".into(),
        }
    }

    #[test]
    fn create_assigns_an_id_when_absent() {
        let mut resource = Resource::blank(Arc::new(user_resource_type()));
        UuidFilter.apply(&ctx(Operation::Create), &mut resource, None).unwrap();
        assert!(resource.id().is_some());
    }

    #[test]
    fn create_does_not_overwrite_an_existing_id() {
        let mut resource = Resource::blank(Arc::new(user_resource_type()));
        resource
            .root
            .by_index_mut("id")
            .unwrap()
            .set(Value::String("keep-me".into()))
            .unwrap();
        UuidFilter.apply(&ctx(Operation::Create), &mut resource, None).unwrap();
        assert_eq!(resource.id().as_deref(), Some("keep-me"));
    }

    #[test]
    fn replace_never_assigns_an_id() {
        let mut resource = Resource::blank(Arc::new(user_resource_type()));
        UuidFilter.apply(&ctx(Operation::Replace), &mut resource, None).unwrap();
        assert!(resource.id().is_none());
    }
}
