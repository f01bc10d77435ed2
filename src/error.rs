//! Error types for the SCIM property engine.
//!
//! This module provides comprehensive error handling for schema, property
//! tree, path/filter, codec, patch and pipeline operations, following the
//! `scimType` classification defined by RFC 7644 §3.12.

use std::fmt;

/// Classification of a [`ScimError`], corresponding to RFC 7644's `scimType`
/// values plus the catch-all kinds (`conflict`, `notFound`, `internal`)
/// used by the service façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScimErrorKind {
    /// Malformed filter, or a filter applied to a singular attribute.
    InvalidFilter,
    /// Path references an unknown attribute.
    InvalidPath,
    /// Path has no matching target (e.g. patch remove with no matches).
    NoTarget,
    /// Malformed JSON or payload shape.
    InvalidSyntax,
    /// Value incompatible with the attribute's type or format.
    InvalidValue,
    /// Attempt to change an immutable value.
    Mutability,
    /// Duplicate value for a server-/global-unique attribute.
    Uniqueness,
    /// Result set exceeds the configured maximum.
    TooMany,
    /// ETag precondition failed.
    Conflict,
    /// Id not resolvable.
    NotFound,
    /// Reserved for write-only reads.
    Sensitive,
    /// Backend failure or programmer error.
    Internal,
}

impl ScimErrorKind {
    /// The `scimType` token used in the SCIM error JSON body.
    pub fn scim_type(self) -> &'static str {
        match self {
            Self::InvalidFilter => "invalidFilter",
            Self::InvalidPath => "invalidPath",
            Self::NoTarget => "noTarget",
            Self::InvalidSyntax => "invalidSyntax",
            Self::InvalidValue => "invalidValue",
            Self::Mutability => "mutability",
            Self::Uniqueness => "uniqueness",
            Self::TooMany => "tooMany",
            Self::Conflict => "conflict",
            Self::NotFound => "notFound",
            Self::Sensitive => "sensitive",
            Self::Internal => "internal",
        }
    }

    /// HTTP status this kind maps to, per spec §7.
    pub fn http_status(self) -> u16 {
        match self {
            Self::InvalidFilter
            | Self::InvalidPath
            | Self::NoTarget
            | Self::InvalidSyntax
            | Self::InvalidValue
            | Self::Mutability
            | Self::TooMany => 400,
            Self::Uniqueness => 409,
            Self::Conflict => 412,
            Self::NotFound => 404,
            Self::Sensitive => 403,
            Self::Internal => 500,
        }
    }
}

impl fmt::Display for ScimErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scim_type())
    }
}

/// Main error type returned by every fallible operation in this crate.
///
/// Traversal and codec call sites wrap a lower-level error with path
/// context via [`ScimError::at_path`] while preserving the original `kind`,
/// per spec §7's propagation rule ("wrapped with context but preserve the
/// root kind").
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct ScimError {
    /// The scimType classification of this error.
    pub kind: ScimErrorKind,
    /// Human-readable detail message.
    pub detail: String,
    /// Attribute path this error occurred at, if known.
    pub path: Option<String>,
}

impl ScimError {
    pub fn new(kind: ScimErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            path: None,
        }
    }

    /// Attach (or replace) the path context without changing `kind`.
    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn invalid_filter(detail: impl Into<String>) -> Self {
        Self::new(ScimErrorKind::InvalidFilter, detail)
    }

    pub fn invalid_path(detail: impl Into<String>) -> Self {
        Self::new(ScimErrorKind::InvalidPath, detail)
    }

    pub fn no_target(detail: impl Into<String>) -> Self {
        Self::new(ScimErrorKind::NoTarget, detail)
    }

    pub fn invalid_syntax(detail: impl Into<String>) -> Self {
        Self::new(ScimErrorKind::InvalidSyntax, detail)
    }

    pub fn invalid_value(detail: impl Into<String>) -> Self {
        Self::new(ScimErrorKind::InvalidValue, detail)
    }

    pub fn mutability(detail: impl Into<String>) -> Self {
        Self::new(ScimErrorKind::Mutability, detail)
    }

    pub fn uniqueness(detail: impl Into<String>) -> Self {
        Self::new(ScimErrorKind::Uniqueness, detail)
    }

    pub fn too_many(detail: impl Into<String>) -> Self {
        Self::new(ScimErrorKind::TooMany, detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(ScimErrorKind::Conflict, detail)
    }

    /// Create a resource-not-found error.
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(
            ScimErrorKind::NotFound,
            format!("{} {} not found", resource_type.into(), id.into()),
        )
    }

    /// Create an internal server error.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ScimErrorKind::Internal, detail)
    }

    /// The SCIM error envelope per spec §6:
    /// `{schemas, status, scimType, detail}`.
    pub fn to_envelope(&self) -> serde_json::Value {
        serde_json::json!({
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:Error"],
            "status": self.kind.http_status(),
            "scimType": self.kind.scim_type(),
            "detail": self.full_detail(),
        })
    }

    fn full_detail(&self) -> String {
        match &self.path {
            Some(p) => format!("{} (at {})", self.detail, p),
            None => self.detail.clone(),
        }
    }
}

impl From<serde_json::Error> for ScimError {
    fn from(e: serde_json::Error) -> Self {
        ScimError::invalid_syntax(e.to_string())
    }
}

/// Result alias used throughout the crate.
pub type ScimResult<T> = Result<T, ScimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_spec() {
        assert_eq!(ScimErrorKind::Uniqueness.http_status(), 409);
        assert_eq!(ScimErrorKind::Conflict.http_status(), 412);
        assert_eq!(ScimErrorKind::NotFound.http_status(), 404);
        assert_eq!(ScimErrorKind::Sensitive.http_status(), 403);
        assert_eq!(ScimErrorKind::Internal.http_status(), 500);
    }

    #[test]
    fn envelope_has_expected_shape() {
        let err = ScimError::invalid_path("unknown attribute 'foo'").at_path("foo");
        let env = err.to_envelope();
        assert_eq!(env["scimType"], "invalidPath");
        assert_eq!(env["status"], 400);
        assert!(env["detail"].as_str().unwrap().contains("foo"));
    }

    #[test]
    fn path_context_preserves_kind() {
        let err = ScimError::no_target("no match").at_path("emails[type eq \"x\"]");
        assert_eq!(err.kind, ScimErrorKind::NoTarget);
    }
}
