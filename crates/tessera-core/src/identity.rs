//! # Identity Codec
//!
//! Pure string encode/decode between (collection, external id) pairs and
//! the single namespaced key stored on triple rows.
//!
//! - `namespaced_id` binds a collection name and external id into one key
//! - `split_id` recovers both parts, treating malformed keys as corruption
//! - External ids must never contain the separator; this is enforced at
//!   write time, not at parse time

use crate::primitives::{ID_SEPARATOR, MAX_EXTERNAL_ID_LENGTH};
use crate::types::TesseraError;

/// Validate an external id for use in a namespaced key.
///
/// An id is valid if it is within length limits and does not contain
/// [`ID_SEPARATOR`]. The empty id is legal: it round-trips through the
/// codec like any other.
///
/// Returns `TesseraError::InvalidEntityId` otherwise — always recoverable
/// by the caller choosing a different id.
pub fn validate_external_id(id: &str) -> Result<(), TesseraError> {
    if id.len() > MAX_EXTERNAL_ID_LENGTH {
        return Err(TesseraError::InvalidEntityId {
            id: id.to_string(),
            reason: format!("id exceeds {} bytes", MAX_EXTERNAL_ID_LENGTH),
        });
    }
    if id.contains(ID_SEPARATOR) {
        return Err(TesseraError::InvalidEntityId {
            id: id.to_string(),
            reason: format!("id cannot include '{}'", ID_SEPARATOR),
        });
    }
    Ok(())
}

/// Encode a collection name and external id into a namespaced key.
///
/// Output is `collection + '#' + id`. Fails with
/// `TesseraError::InvalidEntityId` if the external id is not valid.
pub fn namespaced_id(collection: &str, id: &str) -> Result<String, TesseraError> {
    validate_external_id(id)?;
    Ok(format!("{}{}{}", collection, ID_SEPARATOR, id))
}

/// Decode a namespaced key into (collection, external id).
///
/// The split must yield exactly two parts. Zero or multiple separators
/// both break the key invariant and fail with
/// `TesseraError::MalformedInternalId`; keys reaching this function are
/// internally generated, so a failure here indicates corruption.
pub fn split_id(key: &str) -> Result<(String, String), TesseraError> {
    let mut parts = key.split(ID_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(collection), Some(id), None) => Ok((collection.to_string(), id.to_string())),
        _ => Err(TesseraError::MalformedInternalId(key.to_string())),
    }
}

/// Decode a namespaced key and discard the collection part.
pub fn strip_collection(key: &str) -> Result<String, TesseraError> {
    let (_collection, id) = split_id(key)?;
    Ok(id)
}

// =============================================================================
// TESTS
// =============================================================================
