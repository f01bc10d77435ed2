//! The resource-filter pipeline (spec §4.I, module I): the sequence of
//! cross-cutting transformations a service runs over a resource before
//! handing it to the [`crate::database::Database`].
//!
//! Filters run in declared order and may short-circuit the remainder by
//! returning an error. `validate` runs as a separate async step after the
//! synchronous [`Pipeline`] since it needs the `Database` collaborator to
//! check uniqueness.

mod bcrypt_filter;
mod meta;
mod read_only;
mod uuid_filter;
mod validation;

pub use bcrypt_filter::BcryptFilter;
pub use meta::MetaFilter;
pub use read_only::ReadOnlyFilter;
pub use uuid_filter::UuidFilter;
pub use validation::validate;

use crate::error::ScimResult;
use crate::property::Property;
use crate::resource::Resource;

/// Which service operation is driving the pipeline (spec §4.I/§4.J).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Replace,
    Patch,
}

/// Context shared by every filter in a single pipeline run.
#[derive(Debug, Clone)]
pub struct FilterContext {
    pub operation: Operation,
    /// Cost factor passed to [`bcrypt::hash`] by [`BcryptFilter`].
    pub bcrypt_cost: u32,
    /// Externally-visible base URL the [`MetaFilter`] composes with the
    /// resource type's endpoint to build `meta.location`.
    pub base_url: String,
}

/// One filter stage `(context, resource, reference) -> error` (spec §4.I).
/// `reference` is the resource's prior persisted state on replace/patch,
/// `None` on create.
pub trait ResourceFilter: Send + Sync {
    fn apply(
        &self,
        ctx: &FilterContext,
        resource: &mut Resource,
        reference: Option<&Resource>,
    ) -> ScimResult<()>;
}

/// The standard filter sequence (spec §4.I table): read-only, uuid,
/// bcrypt, meta.
pub struct Pipeline {
    filters: Vec<Box<dyn ResourceFilter>>,
}

impl Pipeline {
    pub fn standard(bcrypt_cost: u32) -> Self {
        Self {
            filters: vec![
                Box::new(ReadOnlyFilter),
                Box::new(UuidFilter),
                Box::new(BcryptFilter { cost: bcrypt_cost }),
                Box::new(MetaFilter),
            ],
        }
    }

    /// Runs every filter in order against `resource`, aborting on the
    /// first error (spec §4.I "a filter may short-circuit").
    pub fn run(
        &self,
        ctx: &FilterContext,
        resource: &mut Resource,
        reference: Option<&Resource>,
    ) -> ScimResult<()> {
        for filter in &self.filters {
            filter.apply(ctx, resource, reference)?;
        }
        Ok(())
    }
}

/// A content fingerprint of `resource` excluding `meta`, used to decide
/// whether a replace/patch changed anything of substance (spec §4.I "meta"
/// row: "iff the resource hash changed"). `Resource::hash`/`Property::hash`
/// can't serve this directly: `meta`'s own sub-attributes are unmarked for
/// identity, so the root hash recurses into `meta.version` itself, and a
/// version computed from that hash could never stabilize.
pub fn content_hash(resource: &Resource) -> u64 {
    let root = resource
        .root
        .as_complex()
        .expect("a Resource's root property is always Complex");
    let hashes: Vec<u64> = root
        .children()
        .iter()
        .filter(|c| !c.attribute().name.eq_ignore_ascii_case("meta"))
        .map(Property::hash)
        .collect();
    crate::property::hash::combine_ordered(&hashes)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::property::Value;
    use crate::schema::builtin::user_resource_type;

    #[test]
    fn content_hash_ignores_meta() {
        let mut a = Resource::blank(Arc::new(user_resource_type()));
        a.root
            .by_index_mut("userName")
            .unwrap()
            .set(Value::String("alice".into()))
            .unwrap();
        let mut b = a.clone_deep();
        b.root
            .by_index_mut("meta")
            .unwrap()
            .by_index_mut("version")
            .unwrap()
            .set(Value::String("W/\"different\"".into()))
            .unwrap();
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn content_hash_changes_with_business_data() {
        let mut a = Resource::blank(Arc::new(user_resource_type()));
        a.root
            .by_index_mut("userName")
            .unwrap()
            .set(Value::String("alice".into()))
            .unwrap();
        let mut b = a.clone_deep();
        b.root
            .by_index_mut("userName")
            .unwrap()
            .set(Value::String("bob".into()))
            .unwrap();
        assert_ne!(content_hash(&a), content_hash(&b));
    }
}
