//! # Core Type Definitions
//!
//! This module contains all core types for the Tessera document substrate:
//! - Logical clock values (`Timestamp`)
//! - Document values (`Value`)
//! - Attribute paths and persisted rows (`Attribute`, `TripleRow`)
//! - Error types (`TesseraError`)
//!
//! ## Determinism Guarantees
//!
//! All composite types in this module:
//! - Use `BTreeMap` for deterministic key ordering
//! - Implement `Ord` where they participate in map keys
//! - Never perform floating-point arithmetic (floats are stored, compared,
//!   never computed with)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// =============================================================================
// TIMESTAMP
// =============================================================================

/// Logical clock value stamped on every triple row.
///
/// Opaque to the core: the storage collaborator allocates these and is
/// responsible for their ordering guarantees. Every row produced by one
/// decomposition shares one timestamp.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create a timestamp from a raw clock value.
    #[must_use]
    pub const fn new(tick: u64) -> Self {
        Self(tick)
    }

    /// Get the raw clock value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

// =============================================================================
// VALUE
// =============================================================================

/// A document value.
///
/// Documents are trees of `Object`/`Array` nodes with scalar leaves.
/// Triple rows only ever store the scalar subset (`Null`, `Bool`, `Int`,
/// `Float`, `String`); the decomposer guarantees this by flattening
/// composites away.
///
/// Serialized untagged so the JSON form is the natural one
/// (`{"x": 1}` not `{"Object": ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent / null leaf.
    Null,
    /// Boolean leaf.
    Bool(bool),
    /// Integer leaf.
    Int(i64),
    /// Floating-point leaf (stored and compared, never computed with).
    Float(f64),
    /// String leaf.
    String(String),
    /// Ordered sequence; flattened by index.
    Array(Vec<Value>),
    /// Keyed map; flattened by key in `BTreeMap` order.
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Check whether this value is a scalar (a legal triple-row value).
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Array(_) | Self::Object(_))
    }

    /// Navigate a dot-separated path into this value.
    ///
    /// Objects are indexed by key, arrays by decimal index.
    /// Returns `None` if any segment is missing or mistyped.
    #[must_use]
    pub fn at_path(&self, path: &str) -> Option<&Self> {
        let mut current = self;
        for segment in path.split('.') {
            current = match current {
                Self::Object(map) => map.get(segment)?,
                Self::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

// =============================================================================
// ATTRIBUTE PATH
// =============================================================================

/// An ordered sequence of path segments locating a value inside a document.
///
/// Persisted rows store the fully-qualified path: a collection-scoped
/// attribute carries the collection name as its implicit leading segment.
/// Invariant: a stored attribute is never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attribute(pub Vec<String>);

impl Attribute {
    /// Create an attribute path from segments.
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Get the path segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check for the degenerate empty path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check whether the path begins with the given prefix segments.
    #[must_use]
    pub fn starts_with(&self, prefix: &[String]) -> bool {
        self.0.len() >= prefix.len() && self.0[..prefix.len()] == *prefix
    }
}

// =============================================================================
// TRIPLE ROW
// =============================================================================

/// A single versioned (path, value) fact about an entity.
///
/// This five-field shape is the on-disk/on-wire contract: any storage or
/// protocol layer built atop the core must preserve these fields verbatim
/// per row. `expired = true` marks a tombstone (logical deletion), never
/// physical removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripleRow {
    /// Namespaced key (or raw id) of the owning entity.
    pub id: String,
    /// Fully-qualified attribute path. Never empty.
    pub attribute: Attribute,
    /// Scalar value or null.
    pub value: Value,
    /// Logical timestamp shared by all rows of one decomposition.
    pub timestamp: Timestamp,
    /// Tombstone flag.
    pub expired: bool,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the Tessera core.
///
/// - No silent failures, no partial results
/// - All errors are raised synchronously at the point of failure and
///   propagate to the immediate caller; none are caught or retried here
/// - Rule non-match is NOT an error (see `ReadOutcome::Redacted`)
#[derive(Debug, Error)]
pub enum TesseraError {
    /// An external id violated the write-time identity rules
    /// (contains the reserved separator, or is oversized/empty).
    /// Recoverable: the caller can choose a different id.
    #[error("invalid entity id '{id}': {reason}")]
    InvalidEntityId {
        /// The offending external id.
        id: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An internal key failed to decode into exactly (collection, id).
    /// Indicates corruption or misuse of internally-generated keys.
    #[error("malformed internal id '{0}': expected exactly one separator")]
    MalformedInternalId(String),

    /// Document flattening produced a path-less leaf, which would denote
    /// an entity with no identity. Carries the offending write for
    /// diagnosis.
    #[error("empty attribute path while inserting entity '{id}'")]
    EmptyPathInsertion {
        /// Entity id of the failed write.
        id: String,
        /// Collection tag of the failed write, if any.
        collection: Option<String>,
        /// The document that flattened to an empty path.
        document: Value,
    },

    /// A filter referenced a session variable with no binding in the
    /// merged environment. Carries the original `$name` reference.
    #[error("session variable not found: {0}")]
    SessionVariableNotFound(String),

    /// A document exceeded the maximum flattening depth.
    #[error("document nesting exceeds the maximum depth")]
    DocumentTooDeep,

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
