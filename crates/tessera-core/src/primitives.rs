//! # Reserved Characters & Limits
//!
//! Hardcoded constants for the Tessera CORE.
//!
//! The store starts with zero schema but fixed encoding rules.
//! These constants are compiled into the binary and are immutable at runtime.

/// Separator between a collection name and an external id inside a
/// namespaced key.
///
/// - A well-formed internal key contains EXACTLY one occurrence.
/// - External ids must never contain it (enforced at write time).
pub const ID_SEPARATOR: char = '#';

/// Attribute of the marker row appended to every collection-tagged
/// decomposition.
///
/// The marker makes an entity's collection membership queryable as
/// ordinary triple data.
pub const COLLECTION_MARKER: &str = "_collection";

/// Prefix that marks a filter value as a session variable reference.
///
/// `"$role"` resolves to the variable named `role`.
pub const VARIABLE_SIGIL: char = '$';

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum nesting depth when flattening a document into triples.
///
/// Flattening must be computationally bounded; deeper documents are
/// rejected rather than risking unbounded recursion.
pub const MAX_DOCUMENT_DEPTH: usize = 64;

/// Maximum length for external entity ids.
///
/// Ids longer than this are rejected at write time.
/// This prevents memory exhaustion from malicious or malformed input.
pub const MAX_EXTERNAL_ID_LENGTH: usize = 1024;
