//! Content-derived, opaque resource versions used for SCIM weak ETags
//! (spec §4.I "meta" row, §5 "Optimistic concurrency").

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

/// An opaque version token, deterministic from resource content, exchanged
/// as a weak HTTP ETag (`W/"..."`) over `If-Match`/`If-None-Match`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScimVersion {
    opaque: String,
}

impl ScimVersion {
    /// Derives a version from raw content bytes: SHA-256, first 8 bytes,
    /// base64-encoded for a shorter ETag.
    pub fn from_content(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        let digest = hasher.finalize();
        Self {
            opaque: BASE64.encode(&digest[..8]),
        }
    }

    /// Wraps an already-computed opaque token (e.g. one read back out of
    /// storage) without re-hashing it.
    pub fn from_hash(hash_string: impl AsRef<str>) -> Self {
        Self {
            opaque: hash_string.as_ref().to_string(),
        }
    }

    /// Parses an `If-Match`/`If-None-Match` header value: a `W/` weak
    /// prefix is stripped if present, and the value must be quoted.
    pub fn parse_http_header(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let trimmed = trimmed.strip_prefix("W/").unwrap_or(trimmed);
        let inner = trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))?;
        if inner.is_empty() {
            return None;
        }
        Some(Self {
            opaque: inner.to_string(),
        })
    }

    /// Renders as a weak ETag header value: `W/"..."`.
    pub fn to_http_header(&self) -> String {
        format!("W/\"{}\"", self.opaque)
    }

    pub fn matches(&self, other: &ScimVersion) -> bool {
        self.opaque == other.opaque
    }

    pub fn as_str(&self) -> &str {
        &self.opaque
    }
}

impl std::fmt::Display for ScimVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_http_header())
    }
}
