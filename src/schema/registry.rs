//! Process-wide, write-once registries: the URN prefix trie used by the
//! path compiler and the schema registry (spec §9 "Global state").
//!
//! Both are populated at startup and read-only thereafter; nothing here is
//! mutated once a [`crate::service`] façade starts serving requests.

use std::collections::HashMap;
use std::sync::Arc;

use super::schema::{ResourceType, Schema};
use crate::error::ScimError;

/// A read-only set of registered schema URNs, consulted by the path
/// compiler to decide whether the leading segment of a path up to a colon
/// is a URN prefix (spec §4.D).
///
/// Implemented as a flat table rather than a literal trie node graph: the
/// number of registered URNs is small (one per schema) and a longest-match
/// linear scan is simpler to get right than a hand-rolled trie, while
/// presenting the same read-only, longest-prefix-wins contract.
#[derive(Debug, Default, Clone)]
pub struct UrnRegistry {
    urns: Vec<String>,
}

impl UrnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, urn: impl Into<String>) {
        let urn = urn.into();
        if !self.urns.contains(&urn) {
            self.urns.push(urn);
        }
    }

    /// Returns the longest registered URN that is a colon-terminated
    /// prefix of `path`, if any.
    pub fn longest_prefix<'a>(&self, path: &'a str) -> Option<&str> {
        self.urns
            .iter()
            .filter(|urn| {
                path.len() > urn.len()
                    && path.starts_with(urn.as_str())
                    && path.as_bytes()[urn.len()] == b':'
            })
            .max_by_key(|urn| urn.len())
            .map(|s| s.as_str())
    }

    pub fn contains(&self, urn: &str) -> bool {
        self.urns.iter().any(|u| u == urn)
    }
}

/// Write-once, read-after registry of [`Schema`]s and [`ResourceType`]s.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<Schema>>,
    resource_types: HashMap<String, Arc<ResourceType>>,
    urns: UrnRegistry,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_schema(&mut self, schema: Arc<Schema>) {
        self.urns.register(schema.id.clone());
        self.schemas.insert(schema.id.clone(), schema);
    }

    pub fn register_resource_type(&mut self, resource_type: ResourceType) -> Arc<ResourceType> {
        resource_type.register_urns(&mut self.urns);
        for schema in std::iter::once(&resource_type.main_schema).chain(resource_type.extensions.iter()) {
            self.schemas
                .entry(schema.id.clone())
                .or_insert_with(|| Arc::clone(schema));
        }
        let rt = Arc::new(resource_type);
        self.resource_types.insert(rt.name.clone(), Arc::clone(&rt));
        rt
    }

    pub fn schema(&self, urn: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(urn)
    }

    pub fn resource_type(&self, name: &str) -> Option<&Arc<ResourceType>> {
        self.resource_types.get(name)
    }

    pub fn urn_registry(&self) -> &UrnRegistry {
        &self.urns
    }

    pub fn resource_type_by_schema(&self, urn: &str) -> Result<&Arc<ResourceType>, ScimError> {
        self.resource_types
            .values()
            .find(|rt| rt.schema_for_urn(urn).is_some())
            .ok_or_else(|| ScimError::invalid_syntax(format!("unknown schema urn '{urn}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_prefix_wins() {
        let mut reg = UrnRegistry::new();
        reg.register("urn:ietf:params:scim:schemas:core:2.0:User");
        reg.register("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User");
        let path = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber";
        assert_eq!(
            reg.longest_prefix(path),
            Some("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User")
        );
    }

    #[test]
    fn non_urn_path_has_no_prefix() {
        let mut reg = UrnRegistry::new();
        reg.register("urn:ietf:params:scim:schemas:core:2.0:User");
        assert_eq!(reg.longest_prefix("emails.value"), None);
    }
}
