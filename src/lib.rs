//! A schema-driven SCIM 2.0 (RFC 7643/7644) resource engine.
//!
//! The crate is organized as a pipeline of small, independently testable
//! layers: a schema model describes attributes, a property tree holds data
//! bound to that schema, a path/filter compiler and traversal engine locate
//! targets inside it, a JSON codec moves resources on and off the wire, a
//! patch engine applies `PatchOp` requests, and a resource-filter pipeline
//! plus a [`service::Service`] façade tie everything to a storage
//! collaborator.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scim_property_engine::database::in_memory::InMemoryDatabase;
//! use scim_property_engine::schema::builtin::user_resource_type;
//! use scim_property_engine::schema::UrnRegistry;
//! use scim_property_engine::service::Service;
//!
//! # async fn run() -> scim_property_engine::ScimResult<()> {
//! let service = Service::new(
//!     Arc::new(user_resource_type()),
//!     InMemoryDatabase::new(),
//!     UrnRegistry::new(),
//!     "https://example.com",
//! );
//!
//! let body = br#"{"schemas":["urn:ietf:params:scim:schemas:core:2.0:User"],"userName":"alice"}"#;
//! let created = service.create(body).await?;
//! println!("created {}", created.id().unwrap());
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod error;
pub mod filter;
pub mod json;
pub mod mapping;
pub mod navigator;
pub mod patch;
pub mod path;
pub mod pipeline;
pub mod property;
pub mod resource;
pub mod schema;
pub mod service;
pub mod traversal;
pub mod version;

pub use database::Database;
pub use error::{ScimError, ScimErrorKind, ScimResult};
pub use property::{Property, Value};
pub use resource::Resource;
pub use schema::{Attribute, ResourceType, Schema, SchemaRegistry};
pub use service::Service;
pub use version::ScimVersion;
