//! [`Schema`] and [`ResourceType`]: named attribute sets and the
//! resource-type binding that combines a main schema with extensions.

use std::sync::Arc;

use super::attribute::Attribute;
use super::registry::UrnRegistry;
use crate::error::ScimError;

/// A named set of [`Attribute`]s identified by a URN (spec §3 "Schema").
#[derive(Debug, Clone)]
pub struct Schema {
    pub id: String,
    pub name: String,
    pub description: String,
    pub attributes: Vec<Arc<Attribute>>,
}

impl Schema {
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(id, name)
    }

    pub fn attribute(&self, name: &str) -> Option<&Arc<Attribute>> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

pub struct SchemaBuilder {
    id: String,
    name: String,
    description: String,
    attributes: Vec<Arc<Attribute>>,
}

impl SchemaBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            attributes: Vec::new(),
        }
    }

    pub fn description(mut self, d: impl Into<String>) -> Self {
        self.description = d.into();
        self
    }

    pub fn attribute(mut self, attr: Arc<Attribute>) -> Self {
        self.attributes.push(attr);
        self
    }

    pub fn build(self) -> Result<Schema, ScimError> {
        if self.attributes.is_empty() {
            return Err(ScimError::invalid_syntax(format!(
                "schema '{}' has no attributes",
                self.id
            )));
        }
        Ok(Schema {
            id: self.id,
            name: self.name,
            description: self.description,
            attributes: self.attributes,
        })
    }
}

/// Binds a main [`Schema`] with extension schemas and an externally-visible
/// endpoint path (spec §3 "ResourceType").
#[derive(Debug, Clone)]
pub struct ResourceType {
    pub name: String,
    pub endpoint: String,
    pub main_schema: Arc<Schema>,
    pub extensions: Vec<Arc<Schema>>,
}

impl ResourceType {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, main_schema: Arc<Schema>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            main_schema,
            extensions: Vec::new(),
        }
    }

    pub fn with_extension(mut self, schema: Arc<Schema>) -> Self {
        self.extensions.push(schema);
        self
    }

    /// All URNs this resource type exposes (main schema + extensions),
    /// used to register with the global URN registry at build time
    /// (spec §4.A).
    pub fn urns(&self) -> Vec<String> {
        let mut v = vec![self.main_schema.id.clone()];
        v.extend(self.extensions.iter().map(|s| s.id.clone()));
        v
    }

    /// Look up a schema (main or extension) by URN.
    pub fn schema_for_urn(&self, urn: &str) -> Option<&Arc<Schema>> {
        if self.main_schema.id == urn {
            return Some(&self.main_schema);
        }
        self.extensions.iter().find(|s| s.id == urn)
    }

    /// Register this resource type's URNs with the global registry.
    pub fn register_urns(&self, registry: &mut UrnRegistry) {
        for urn in self.urns() {
            registry.register(urn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::attribute::AttributeBuilder;
    use crate::schema::types::AttributeType;

    #[test]
    fn schema_requires_attributes() {
        let err = Schema::builder("urn:test:Empty", "Empty").build().unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::InvalidSyntax);
    }

    #[test]
    fn resource_type_exposes_urns() {
        let user_name = AttributeBuilder::new("userName", AttributeType::String)
            .required(true)
            .build()
            .unwrap();
        let schema = Arc::new(
            Schema::builder("urn:ietf:params:scim:schemas:core:2.0:User", "User")
                .attribute(user_name)
                .build()
                .unwrap(),
        );
        let ext = Arc::new(
            Schema::builder("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User", "Enterprise")
                .attribute(
                    AttributeBuilder::new("employeeNumber", AttributeType::String)
                        .build()
                        .unwrap(),
                )
                .build()
                .unwrap(),
        );
        let rt = ResourceType::new("User", "/Users", schema).with_extension(ext);
        assert_eq!(rt.urns().len(), 2);
    }
}
