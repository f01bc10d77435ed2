//! The schema model (spec §3, module A): attribute descriptors, schemas,
//! resource types, and the registries that bind them together.

pub mod attribute;
pub mod builtin;
pub mod registry;
pub mod schema;
pub mod types;

pub use attribute::{Attribute, AttributeBuilder};
pub use registry::{SchemaRegistry, UrnRegistry};
pub use schema::{ResourceType, Schema, SchemaBuilder};
pub use types::{AttributeType, Mutability, Returned, Uniqueness};
