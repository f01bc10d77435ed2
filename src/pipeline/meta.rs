//! The "meta" pipeline row (spec §4.I): stamps the server-owned `meta`
//! sub-attributes that record provenance and drive optimistic concurrency.

use chrono::Utc;

use crate::error::{ScimError, ScimResult};
use crate::pipeline::{content_hash, FilterContext, Operation, ResourceFilter};
use crate::property::Value;
use crate::resource::Resource;
use crate::version::ScimVersion;

/// On create, sets `resourceType`, `created`/`lastModified` to now,
/// `location`, and a fresh content-derived `version`. On replace/patch,
/// refreshes `lastModified` and regenerates `version` only if the resource's
/// business content actually changed (spec §4.I "iff the resource hash
/// changed").
pub struct MetaFilter;

impl ResourceFilter for MetaFilter {
    fn apply(
        &self,
        ctx: &FilterContext,
        resource: &mut Resource,
        reference: Option<&Resource>,
    ) -> ScimResult<()> {
        let now = Utc::now().naive_utc();
        match ctx.operation {
            Operation::Create => {
                let resource_type_name = resource.resource_type.name.clone();
                let location = resource.location(&ctx.base_url)?;
                let version = current_version(resource);
                let meta = meta_of(resource);
                meta.child_mut("resourceType")
                    .unwrap()
                    .set(Value::String(resource_type_name))?;
                meta.child_mut("created").unwrap().set(Value::DateTime(now))?;
                meta.child_mut("lastModified").unwrap().set(Value::DateTime(now))?;
                meta.child_mut("location").unwrap().set(Value::Reference(location))?;
                meta.child_mut("version").unwrap().set(Value::String(version))?;
            }
            Operation::Replace | Operation::Patch => {
                let changed = match reference {
                    Some(reference) => content_hash(resource) != content_hash(reference),
                    None => true,
                };
                meta_of(resource)
                    .child_mut("lastModified")
                    .unwrap()
                    .set(Value::DateTime(now))?;
                if changed {
                    let version = current_version(resource);
                    meta_of(resource)
                        .child_mut("version")
                        .unwrap()
                        .set(Value::String(version))?;
                }
            }
        }
        Ok(())
    }
}

fn meta_of(resource: &mut Resource) -> &mut crate::property::ComplexProperty {
    resource
        .root
        .as_complex_mut()
        .expect("a Resource's root property is always Complex")
        .child_mut("meta")
        .expect("every resource type carries a meta attribute")
        .as_complex_mut()
        .expect("meta is always Complex")
}

fn current_version(resource: &Resource) -> String {
    ScimVersion::from_content(&content_hash(resource).to_le_bytes()).to_http_header()
}
