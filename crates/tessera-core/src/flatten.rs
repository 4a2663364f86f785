//! # Document Flattening
//!
//! Deterministic tree-walk turning a nested document into an ordered
//! sequence of (path, scalar) tuples.
//!
//! - Objects recurse into child paths by key, in `BTreeMap` order
//! - Arrays recurse by index
//! - Any other value is a leaf
//!
//! Contract with the decomposer: every leaf ends in a scalar or null.
//! A bare scalar document yields a single tuple with an EMPTY path; the
//! decomposer rejects that case as `EmptyPathInsertion`.

use crate::primitives::MAX_DOCUMENT_DEPTH;
use crate::types::{TesseraError, Value};

/// Flatten a document into (path, scalar) tuples.
///
/// The walk is depth-first and bounded by [`MAX_DOCUMENT_DEPTH`];
/// documents nested deeper fail with `TesseraError::DocumentTooDeep`.
pub fn value_to_tuples(document: &Value) -> Result<Vec<(Vec<String>, Value)>, TesseraError> {
    let mut tuples = Vec::new();
    walk(document, &mut Vec::new(), &mut tuples, 0)?;
    Ok(tuples)
}

fn walk(
    value: &Value,
    path: &mut Vec<String>,
    tuples: &mut Vec<(Vec<String>, Value)>,
    depth: usize,
) -> Result<(), TesseraError> {
    if depth > MAX_DOCUMENT_DEPTH {
        return Err(TesseraError::DocumentTooDeep);
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                path.push(key.clone());
                walk(child, path, tuples, depth + 1)?;
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(index.to_string());
                walk(child, path, tuples, depth + 1)?;
                path.pop();
            }
        }
        scalar => tuples.push((path.clone(), scalar.clone())),
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
