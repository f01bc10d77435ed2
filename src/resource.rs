//! [`Resource`]: the (ResourceType, root Property) tuple (spec §3
//! "Resource").
//!
//! The root property is a single synthetic `Complex` attribute whose
//! sub-attributes are the main schema's attributes plus, for each
//! extension schema, one complex sub-attribute named after the extension's
//! URN — mirroring the SCIM wire shape where extension data is nested under
//! its schema URN as a top-level JSON key (spec §6 "Extension attributes").

use std::sync::Arc;

use crate::error::ScimError;
use crate::schema::{Attribute, AttributeBuilder, AttributeType, ResourceType};
use crate::property::Property;

/// Builds the synthetic root [`Attribute`] for a resource type: the main
/// schema's attributes, plus one complex sub-attribute per extension named
/// by the extension's URN.
pub fn root_attribute(resource_type: &ResourceType) -> Arc<Attribute> {
    let mut builder = AttributeBuilder::new(resource_type.main_schema.id.clone(), AttributeType::Complex);
    for attr in &resource_type.main_schema.attributes {
        builder = builder.sub_attribute(Arc::clone(attr));
    }
    for ext in &resource_type.extensions {
        let mut ext_builder = AttributeBuilder::new(ext.id.clone(), AttributeType::Complex);
        for attr in &ext.attributes {
            ext_builder = ext_builder.sub_attribute(Arc::clone(attr));
        }
        builder = builder.sub_attribute(ext_builder.build().expect("extension schema already validated"));
    }
    builder.build().expect("resource type schemas already validated")
}

/// The tuple (ResourceType, root complex Property) (spec §3 "Resource").
#[derive(Debug, Clone)]
pub struct Resource {
    pub resource_type: Arc<ResourceType>,
    pub root: Property,
}

impl Resource {
    /// Allocates a blank resource matching `resource_type`'s schema, via the
    /// schema factory (spec §3 "Lifecycle").
    pub fn blank(resource_type: Arc<ResourceType>) -> Self {
        let attribute = root_attribute(&resource_type);
        Self {
            root: Property::new(attribute),
            resource_type,
        }
    }

    pub fn id(&self) -> Option<String> {
        self.root
            .as_complex()?
            .child("id")?
            .value()
            .as_str()
            .map(str::to_string)
    }

    pub fn hash(&self) -> u64 {
        self.root.hash()
    }

    pub fn clone_deep(&self) -> Self {
        self.clone()
    }

    /// A navigator positioned at the resource's root, for traversal/patch
    /// callers.
    pub fn navigator(&mut self) -> crate::navigator::Navigator<'_> {
        crate::navigator::Navigator::new(&mut self.root)
    }

    /// The resource's current content-derived version, as stored in
    /// `meta.version` (spec §5 "Optimistic concurrency"). `None` until the
    /// meta filter has run at least once.
    pub fn version(&self) -> Option<crate::version::ScimVersion> {
        let raw = self
            .root
            .as_complex()?
            .child("meta")?
            .as_complex()?
            .child("version")?
            .value();
        crate::version::ScimVersion::parse_http_header(raw.as_str()?)
    }

    pub fn location(&self, base_url: &str) -> Result<String, ScimError> {
        let id = self
            .id()
            .ok_or_else(|| ScimError::internal("resource has no id"))?;
        Ok(format!(
            "{}{}/{}",
            base_url.trim_end_matches('/'),
            self.resource_type.endpoint,
            id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::builtin::user_resource_type;

    #[test]
    fn blank_resource_has_extension_under_its_urn() {
        let rt = Arc::new(user_resource_type());
        let resource = Resource::blank(rt);
        let root = resource.root.as_complex().unwrap();
        assert!(root.child("userName").is_some());
        assert!(root
            .child("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User")
            .is_some());
    }

    #[test]
    fn blank_resource_is_unassigned() {
        let rt = Arc::new(user_resource_type());
        let resource = Resource::blank(rt);
        assert!(resource.root.unassigned());
        assert_eq!(resource.hash(), 0);
    }
}
