//! # Triple Log
//!
//! Storage collaborator traits plus the in-memory append-only log.
//!
//! The core's write path only ever sees the narrow [`TripleSink`]
//! interface: a logical clock and a bulk insert. The wider
//! [`TripleStore`] adds the read side used to materialize entities.
//! Both are injected, so every transform in this crate stays pure and
//! testable without a live database.

use crate::primitives::COLLECTION_MARKER;
use crate::types::{Attribute, TesseraError, Timestamp, TripleRow};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// STORAGE COLLABORATOR TRAITS
// =============================================================================

/// The narrow write interface the decomposer consumes.
///
/// Implementations own concurrency and ordering: `transaction_timestamp`
/// must hand out monotonically meaningful clock values, and
/// `insert_triples` must apply a batch as one logical write.
pub trait TripleSink {
    /// Allocate the logical timestamp for a write transaction.
    fn transaction_timestamp(&mut self) -> Result<Timestamp, TesseraError>;

    /// Append a batch of rows to the log.
    fn insert_triples(&mut self, rows: Vec<TripleRow>) -> Result<(), TesseraError>;
}

/// Read side of a triple log.
///
/// Tombstones (`expired = true`) are appended, never compacted here;
/// readers resolve the latest state per attribute.
pub trait TripleStore: TripleSink {
    /// All rows for one entity, in log order.
    fn entity_triples(&self, id: &str) -> Result<Vec<TripleRow>, TesseraError>;

    /// Namespaced keys of the live members of a collection, via the
    /// `_collection` marker rows.
    fn collection_members(&self, collection: &str) -> Result<Vec<String>, TesseraError>;

    /// Tombstone every live attribute of an entity.
    ///
    /// Returns the number of tombstone rows written.
    fn expire_entity(&mut self, id: &str) -> Result<usize, TesseraError>;

    /// Total rows in the log, tombstones included.
    fn triple_count(&self) -> Result<usize, TesseraError>;

    /// Distinct entities with at least one live row.
    fn entity_count(&self) -> Result<usize, TesseraError>;
}

// =============================================================================
// IN-MEMORY LOG
// =============================================================================

/// In-memory append-only triple log with a monotonic logical clock.
///
/// Fast and volatile; the persistent counterpart is
/// [`crate::storage::RedbLog`].
#[derive(Debug, Clone, Default)]
pub struct TripleLog {
    rows: Vec<TripleRow>,
    clock: u64,
}

impl TripleLog {
    /// Create a new empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest row per attribute for one entity, in attribute order.
    ///
    /// Later log positions win among equal timestamps, so a tombstone
    /// written in the same transaction as an earlier value shadows it.
    fn latest_by_attribute(&self, id: &str) -> BTreeMap<Attribute, TripleRow> {
        let mut latest: BTreeMap<Attribute, TripleRow> = BTreeMap::new();
        for row in self.rows.iter().filter(|r| r.id == id) {
            match latest.get(&row.attribute) {
                Some(existing) if existing.timestamp > row.timestamp => {}
                _ => {
                    latest.insert(row.attribute.clone(), row.clone());
                }
            }
        }
        latest
    }
}

impl TripleSink for TripleLog {
    fn transaction_timestamp(&mut self) -> Result<Timestamp, TesseraError> {
        self.clock = self.clock.saturating_add(1);
        Ok(Timestamp::new(self.clock))
    }

    fn insert_triples(&mut self, rows: Vec<TripleRow>) -> Result<(), TesseraError> {
        self.rows.extend(rows);
        Ok(())
    }
}

impl TripleStore for TripleLog {
    fn entity_triples(&self, id: &str) -> Result<Vec<TripleRow>, TesseraError> {
        Ok(self.rows.iter().filter(|r| r.id == id).cloned().collect())
    }

    fn collection_members(&self, collection: &str) -> Result<Vec<String>, TesseraError> {
        let marker = Attribute::new([COLLECTION_MARKER]);
        // Latest marker row per entity decides membership
        let mut markers: BTreeMap<String, TripleRow> = BTreeMap::new();
        for row in self.rows.iter().filter(|r| r.attribute == marker) {
            match markers.get(&row.id) {
                Some(existing) if existing.timestamp > row.timestamp => {}
                _ => {
                    markers.insert(row.id.clone(), row.clone());
                }
            }
        }
        Ok(markers
            .into_iter()
            .filter(|(_, row)| {
                !row.expired && row.value == crate::types::Value::from(collection.to_string())
            })
            .map(|(id, _)| id)
            .collect())
    }

    fn expire_entity(&mut self, id: &str) -> Result<usize, TesseraError> {
        let live: Vec<TripleRow> = self
            .latest_by_attribute(id)
            .into_values()
            .filter(|row| !row.expired)
            .collect();
        if live.is_empty() {
            return Ok(0);
        }

        let timestamp = self.transaction_timestamp()?;
        let tombstones: Vec<TripleRow> = live
            .into_iter()
            .map(|row| TripleRow {
                expired: true,
                timestamp,
                ..row
            })
            .collect();
        let written = tombstones.len();
        self.insert_triples(tombstones)?;
        Ok(written)
    }

    fn triple_count(&self) -> Result<usize, TesseraError> {
        Ok(self.rows.len())
    }

    fn entity_count(&self) -> Result<usize, TesseraError> {
        let ids: BTreeSet<&str> = self.rows.iter().map(|r| r.id.as_str()).collect();
        let mut live = 0;
        for id in ids {
            if self
                .latest_by_attribute(id)
                .values()
                .any(|row| !row.expired)
            {
                live += 1;
            }
        }
        Ok(live)
    }
}

// =============================================================================
// TESTS
// =============================================================================
