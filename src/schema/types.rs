//! Core schema type definitions for SCIM attributes.
//!
//! These enums mirror RFC 7643 §2.2's attribute characteristics exactly;
//! see [`super::attribute::Attribute`] for how they compose into a full
//! attribute descriptor.

use serde::{Deserialize, Serialize};

/// SCIM attribute data types (RFC 7643 §2.3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    String,
    Boolean,
    Decimal,
    Integer,
    DateTime,
    Binary,
    Reference,
    Complex,
}

impl AttributeType {
    pub fn is_complex(self) -> bool {
        matches!(self, Self::Complex)
    }
}

/// Attribute mutability characteristics (RFC 7643 §2.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    ReadOnly,
    ReadWrite,
    Immutable,
    WriteOnly,
}

impl Default for Mutability {
    fn default() -> Self {
        Self::ReadWrite
    }
}

/// Controls whether/when an attribute is returned in a serialized response
/// (RFC 7643 §2.2, the `returned` characteristic).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Returned {
    /// Emitted whenever assigned, subject to projection rules.
    Default,
    /// Always emitted regardless of assignment or projection.
    Always,
    /// Never emitted.
    Never,
    /// Emitted only when explicitly requested via `attributes`.
    Request,
}

impl Default for Returned {
    fn default() -> Self {
        Self::Default
    }
}

/// Attribute uniqueness constraints (RFC 7643 §2.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Uniqueness {
    None,
    Server,
    Global,
}

impl Default for Uniqueness {
    fn default() -> Self {
        Self::None
    }
}
