//! # Document Decomposer
//!
//! The canonical write path for an entity: flatten a nested document into
//! a batch of attribute-path triples tagged with one logical timestamp
//! and an optional collection marker, then hand the batch to the storage
//! collaborator's bulk insert.
//!
//! The inverse transform, [`entity_from_triples`], replays a row batch
//! back into a nested document for the read path.

use crate::flatten::value_to_tuples;
use crate::log::TripleSink;
use crate::primitives::COLLECTION_MARKER;
use crate::types::{Attribute, TesseraError, Timestamp, TripleRow, Value};
use std::collections::BTreeMap;

// =============================================================================
// DECOMPOSITION
// =============================================================================

/// Decompose a document into triple rows under the given key.
///
/// Pure: the timestamp is supplied by the caller, and ALL rows of one
/// decomposition share it — that gives atomic-looking provenance for a
/// single logical write.
///
/// - `collection`, when supplied, becomes the leading path segment of
///   every row, and one extra `["_collection"] -> collection` marker row
///   is appended so membership is queryable as data.
/// - Any empty flattened path fails with
///   `TesseraError::EmptyPathInsertion`: it would denote a document with
///   no identity of its own.
pub fn decompose(
    id: &str,
    document: &Value,
    collection: Option<&str>,
    timestamp: Timestamp,
) -> Result<Vec<TripleRow>, TesseraError> {
    let tuples = value_to_tuples(document)?;

    let mut rows = Vec::with_capacity(tuples.len() + 1);
    for (path, value) in tuples {
        if path.is_empty() {
            return Err(TesseraError::EmptyPathInsertion {
                id: id.to_string(),
                collection: collection.map(ToString::to_string),
                document: document.clone(),
            });
        }
        let mut segments = Vec::with_capacity(path.len() + 1);
        if let Some(name) = collection {
            segments.push(name.to_string());
        }
        segments.extend(path);
        rows.push(TripleRow {
            id: id.to_string(),
            attribute: Attribute(segments),
            value,
            timestamp,
            expired: false,
        });
    }

    if let Some(name) = collection {
        rows.push(TripleRow {
            id: id.to_string(),
            attribute: Attribute::new([COLLECTION_MARKER]),
            value: Value::from(name.to_string()),
            timestamp,
            expired: false,
        });
    }

    Ok(rows)
}

/// Decompose a document and write the batch through a [`TripleSink`].
///
/// Takes ONE timestamp from the sink at the start; re-running the same
/// write later creates new rows under a new timestamp — dedup and merge
/// are the storage layer's concern, not this one's.
///
/// Returns the rows that were written.
pub fn insert_document<S: TripleSink>(
    sink: &mut S,
    id: &str,
    document: &Value,
    collection: Option<&str>,
) -> Result<Vec<TripleRow>, TesseraError> {
    let timestamp = sink.transaction_timestamp()?;
    let rows = decompose(id, document, collection, timestamp)?;
    sink.insert_triples(rows.clone())?;
    Ok(rows)
}

// =============================================================================
// MATERIALIZATION
// =============================================================================

/// Rebuild an entity object from its triple rows.
///
/// Rows are replayed in timestamp order (log order among equals): live
/// rows set their path, tombstones delete it. The collection prefix and
/// the `_collection` marker row are stripped. Paths whose sibling keys
/// are the consecutive integers `0..n` are rebuilt as arrays.
///
/// Returns `None` when no live attribute survives the replay.
#[must_use]
pub fn entity_from_triples(rows: &[TripleRow], collection: Option<&str>) -> Option<Value> {
    let marker = Attribute::new([COLLECTION_MARKER]);
    let mut ordered: Vec<&TripleRow> = rows.iter().filter(|r| r.attribute != marker).collect();
    ordered.sort_by_key(|r| r.timestamp);

    let mut root: BTreeMap<String, Value> = BTreeMap::new();
    for row in ordered {
        let mut segments = row.attribute.segments();
        if let Some(name) = collection {
            if segments.first().map(String::as_str) == Some(name) {
                segments = &segments[1..];
            }
        }
        if segments.is_empty() {
            continue;
        }
        if row.expired {
            remove_path(&mut root, segments);
        } else {
            set_path(&mut root, segments, row.value.clone());
        }
    }

    if root.is_empty() {
        None
    } else {
        Some(finalize(Value::Object(root)))
    }
}

/// Set a scalar at a path, materializing intermediate objects.
///
/// A scalar in the way of a deeper write is overwritten: the latest
/// row wins, matching log replay semantics.
fn set_path(map: &mut BTreeMap<String, Value>, segments: &[String], value: Value) {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return,
    };
    if rest.is_empty() {
        map.insert(head.clone(), value);
        return;
    }
    let child = map
        .entry(head.clone())
        .or_insert_with(|| Value::Object(BTreeMap::new()));
    if !matches!(child, Value::Object(_)) {
        *child = Value::Object(BTreeMap::new());
    }
    if let Value::Object(child_map) = child {
        set_path(child_map, rest, value);
    }
}

/// Remove a path, pruning any objects left empty.
fn remove_path(map: &mut BTreeMap<String, Value>, segments: &[String]) {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return,
    };
    if rest.is_empty() {
        map.remove(head);
        return;
    }
    if let Some(Value::Object(child_map)) = map.get_mut(head) {
        remove_path(child_map, rest);
        if child_map.is_empty() {
            map.remove(head);
        }
    }
}

/// Parse a key as an array index, accepting only the canonical decimal
/// form. Padded keys like `"00"` stay object keys, so the object/array
/// distinction survives a round trip.
fn array_index(key: &str) -> Option<usize> {
    let index = key.parse::<usize>().ok()?;
    (index.to_string() == key).then_some(index)
}

/// Convert assembled objects whose keys are exactly `0..n` into arrays.
fn finalize(value: Value) -> Value {
    let Value::Object(map) = value else {
        return value;
    };

    let mut indices: Vec<(usize, Value)> = Vec::with_capacity(map.len());
    let mut all_indices = !map.is_empty();
    for (key, _) in &map {
        if array_index(key).is_none() {
            all_indices = false;
            break;
        }
    }
    if all_indices {
        for (key, child) in &map {
            if let Some(index) = array_index(key) {
                indices.push((index, finalize(child.clone())));
            }
        }
        indices.sort_by_key(|(index, _)| *index);
        let contiguous = indices
            .iter()
            .enumerate()
            .all(|(position, (index, _))| position == *index);
        if contiguous {
            return Value::Array(indices.into_iter().map(|(_, child)| child).collect());
        }
    }

    Value::Object(
        map.into_iter()
            .map(|(key, child)| (key, finalize(child)))
            .collect(),
    )
}

// =============================================================================
// TESTS
// =============================================================================
