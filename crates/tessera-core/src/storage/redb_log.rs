//! # redb-backed Triple Log
//!
//! A disk-backed [`TripleStore`] using the redb embedded database,
//! providing:
//! - ACID batch inserts (one write transaction per triple batch)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//! - Zero configuration
//!
//! The logical clock and the append sequence are persisted in a
//! metadata table, so reopening a database resumes both monotonically.

use crate::log::{TripleSink, TripleStore};
use crate::primitives::COLLECTION_MARKER;
use crate::types::{Attribute, TesseraError, Timestamp, TripleRow, Value};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Table for triples: (entity id, sequence) -> postcard row bytes.
///
/// The sequence is global and append-ordered, so a per-entity range scan
/// returns rows in log order.
const TRIPLES: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("triples");

/// Table for metadata: key string -> value u64.
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const META_CLOCK: &str = "clock";
const META_NEXT_SEQ: &str = "next_seq";

// =============================================================================
// STORED ROW (postcard wire format)
// =============================================================================

/// Tagged twin of [`Value`] for the non-self-describing postcard format.
///
/// The public `Value` serializes untagged for natural JSON; postcard
/// needs explicit variant tags, so rows are converted through this type
/// at the storage boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum StoredValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<StoredValue>),
    Object(BTreeMap<String, StoredValue>),
}

impl From<Value> for StoredValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(v) => Self::Bool(v),
            Value::Int(v) => Self::Int(v),
            Value::Float(v) => Self::Float(v),
            Value::String(v) => Self::String(v),
            Value::Array(items) => Self::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<StoredValue> for Value {
    fn from(value: StoredValue) -> Self {
        match value {
            StoredValue::Null => Self::Null,
            StoredValue::Bool(v) => Self::Bool(v),
            StoredValue::Int(v) => Self::Int(v),
            StoredValue::Float(v) => Self::Float(v),
            StoredValue::String(v) => Self::String(v),
            StoredValue::Array(items) => Self::Array(items.into_iter().map(Into::into).collect()),
            StoredValue::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// On-disk row payload; the entity id lives in the table key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRow {
    attribute: Vec<String>,
    value: StoredValue,
    timestamp: u64,
    expired: bool,
}

impl StoredRow {
    fn from_row(row: TripleRow) -> Self {
        Self {
            attribute: row.attribute.0,
            value: row.value.into(),
            timestamp: row.timestamp.value(),
            expired: row.expired,
        }
    }

    fn into_row(self, id: &str) -> TripleRow {
        TripleRow {
            id: id.to_string(),
            attribute: Attribute(self.attribute),
            value: self.value.into(),
            timestamp: Timestamp::new(self.timestamp),
            expired: self.expired,
        }
    }
}

// =============================================================================
// REDB LOG
// =============================================================================

/// A disk-backed triple log using redb.
pub struct RedbLog {
    /// The redb database handle.
    db: Database,
    /// In-memory shadow of the persisted logical clock.
    clock: u64,
    /// Next append sequence number.
    next_seq: u64,
}

impl std::fmt::Debug for RedbLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbLog")
            .field("clock", &self.clock)
            .field("next_seq", &self.next_seq)
            .finish_non_exhaustive()
    }
}

impl RedbLog {
    /// Open or create a triple log database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TesseraError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| TesseraError::IoError(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| TesseraError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(TRIPLES)
                .map_err(|e| TesseraError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(METADATA)
                .map_err(|e| TesseraError::IoError(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| TesseraError::IoError(e.to_string()))?;
        }

        // Recover clock and sequence
        let read_txn = db
            .begin_read()
            .map_err(|e| TesseraError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(METADATA)
            .map_err(|e| TesseraError::IoError(e.to_string()))?;
        let clock = table
            .get(META_CLOCK)
            .map_err(|e| TesseraError::IoError(e.to_string()))?
            .map(|v| v.value())
            .unwrap_or(0);
        let next_seq = table
            .get(META_NEXT_SEQ)
            .map_err(|e| TesseraError::IoError(e.to_string()))?
            .map(|v| v.value())
            .unwrap_or(0);

        Ok(Self {
            db,
            clock,
            next_seq,
        })
    }

    /// Compact the database (optional optimization).
    pub fn compact(&mut self) -> Result<(), TesseraError> {
        self.db
            .compact()
            .map_err(|e| TesseraError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Scan every row in append order.
    fn scan_all(&self) -> Result<Vec<TripleRow>, TesseraError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| TesseraError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(TRIPLES)
            .map_err(|e| TesseraError::IoError(e.to_string()))?;

        let mut rows: Vec<(u64, TripleRow)> = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| TesseraError::IoError(e.to_string()))?
        {
            let (key, data) = entry.map_err(|e| TesseraError::IoError(e.to_string()))?;
            let (id, seq) = key.value();
            let stored: StoredRow = postcard::from_bytes(data.value())
                .map_err(|e| TesseraError::SerializationError(e.to_string()))?;
            rows.push((seq, stored.into_row(id)));
        }
        rows.sort_by_key(|(seq, _)| *seq);
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    /// Latest row per attribute for one entity.
    fn latest_by_attribute(
        &self,
        id: &str,
    ) -> Result<BTreeMap<Attribute, TripleRow>, TesseraError> {
        let mut latest: BTreeMap<Attribute, TripleRow> = BTreeMap::new();
        for row in self.entity_triples(id)? {
            match latest.get(&row.attribute) {
                Some(existing) if existing.timestamp > row.timestamp => {}
                _ => {
                    latest.insert(row.attribute.clone(), row);
                }
            }
        }
        Ok(latest)
    }

    fn persist_metadata(&self, key: &str, value: u64) -> Result<(), TesseraError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| TesseraError::IoError(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(METADATA)
                .map_err(|e| TesseraError::IoError(e.to_string()))?;
            table
                .insert(key, value)
                .map_err(|e| TesseraError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| TesseraError::IoError(e.to_string()))?;
        Ok(())
    }
}

impl TripleSink for RedbLog {
    fn transaction_timestamp(&mut self) -> Result<Timestamp, TesseraError> {
        self.clock = self.clock.saturating_add(1);
        // Persist eagerly so a reopened database never reissues a tick
        self.persist_metadata(META_CLOCK, self.clock)?;
        Ok(Timestamp::new(self.clock))
    }

    fn insert_triples(&mut self, rows: Vec<TripleRow>) -> Result<(), TesseraError> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut seq = self.next_seq;
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| TesseraError::IoError(e.to_string()))?;
        {
            let mut triples_table = write_txn
                .open_table(TRIPLES)
                .map_err(|e| TesseraError::IoError(e.to_string()))?;
            let mut meta_table = write_txn
                .open_table(METADATA)
                .map_err(|e| TesseraError::IoError(e.to_string()))?;

            for row in rows {
                let id = row.id.clone();
                let bytes = postcard::to_allocvec(&StoredRow::from_row(row))
                    .map_err(|e| TesseraError::SerializationError(e.to_string()))?;
                triples_table
                    .insert((id.as_str(), seq), bytes.as_slice())
                    .map_err(|e| TesseraError::IoError(e.to_string()))?;
                seq = seq.saturating_add(1);
            }

            meta_table
                .insert(META_NEXT_SEQ, seq)
                .map_err(|e| TesseraError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| TesseraError::IoError(e.to_string()))?;

        self.next_seq = seq;
        Ok(())
    }
}

impl TripleStore for RedbLog {
    fn entity_triples(&self, id: &str) -> Result<Vec<TripleRow>, TesseraError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| TesseraError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(TRIPLES)
            .map_err(|e| TesseraError::IoError(e.to_string()))?;

        let mut rows: Vec<(u64, TripleRow)> = Vec::new();
        for entry in table
            .range((id, u64::MIN)..=(id, u64::MAX))
            .map_err(|e| TesseraError::IoError(e.to_string()))?
        {
            let (key, data) = entry.map_err(|e| TesseraError::IoError(e.to_string()))?;
            let (_, seq) = key.value();
            let stored: StoredRow = postcard::from_bytes(data.value())
                .map_err(|e| TesseraError::SerializationError(e.to_string()))?;
            rows.push((seq, stored.into_row(id)));
        }
        rows.sort_by_key(|(seq, _)| *seq);
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    fn collection_members(&self, collection: &str) -> Result<Vec<String>, TesseraError> {
        let marker = Attribute::new([COLLECTION_MARKER]);
        let mut markers: BTreeMap<String, TripleRow> = BTreeMap::new();
        for row in self.scan_all()? {
            if row.attribute != marker {
                continue;
            }
            match markers.get(&row.id) {
                Some(existing) if existing.timestamp > row.timestamp => {}
                _ => {
                    markers.insert(row.id.clone(), row);
                }
            }
        }
        Ok(markers
            .into_iter()
            .filter(|(_, row)| {
                !row.expired && row.value == Value::from(collection.to_string())
            })
            .map(|(id, _)| id)
            .collect())
    }

    fn expire_entity(&mut self, id: &str) -> Result<usize, TesseraError> {
        let live: Vec<TripleRow> = self
            .latest_by_attribute(id)?
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
        Ok(self.scan_all()?.len())
    }

    fn entity_count(&self) -> Result<usize, TesseraError> {
        let mut latest: BTreeMap<(String, Attribute), TripleRow> = BTreeMap::new();
        for row in self.scan_all()? {
            let key = (row.id.clone(), row.attribute.clone());
            match latest.get(&key) {
                Some(existing) if existing.timestamp > row.timestamp => {}
                _ => {
                    latest.insert(key, row);
                }
            }
        }
        let live: std::collections::BTreeSet<&str> = latest
            .values()
            .filter(|row| !row.expired)
            .map(|row| row.id.as_str())
            .collect();
        Ok(live.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::insert_document;

    fn doc(json: &str) -> Value {
        serde_json::from_str(json).expect("parse")
    }

    #[test]
    fn insert_and_read_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut log = RedbLog::open(dir.path().join("triples.redb")).expect("open");

        insert_document(&mut log, "users#1", &doc(r#"{"name": "ada"}"#), Some("users"))
            .expect("insert");

        let rows = log.entity_triples("users#1").expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].attribute, Attribute::new(["users", "name"]));
        assert_eq!(rows[0].value, Value::from("ada"));
        assert_eq!(
            log.collection_members("users").expect("members"),
            vec!["users#1".to_string()]
        );
    }

    #[test]
    fn clock_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("triples.redb");

        let first_tick = {
            let mut log = RedbLog::open(&path).expect("open");
            log.transaction_timestamp().expect("ts")
        };

        let mut log = RedbLog::open(&path).expect("reopen");
        let second_tick = log.transaction_timestamp().expect("ts");
        assert!(second_tick > first_tick);
    }

    #[test]
    fn rows_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("triples.redb");

        {
            let mut log = RedbLog::open(&path).expect("open");
            insert_document(&mut log, "users#1", &doc(r#"{"n": 1}"#), Some("users"))
                .expect("insert");
        }

        let log = RedbLog::open(&path).expect("reopen");
        assert_eq!(log.triple_count().expect("count"), 2);
        assert_eq!(log.entity_count().expect("entities"), 1);
    }

    #[test]
    fn expire_tombstones_persist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut log = RedbLog::open(dir.path().join("triples.redb")).expect("open");

        insert_document(&mut log, "users#1", &doc(r#"{"n": 1}"#), Some("users"))
            .expect("insert");
        assert_eq!(log.expire_entity("users#1").expect("expire"), 2);

        assert!(log.collection_members("users").expect("members").is_empty());
        assert_eq!(log.entity_count().expect("entities"), 0);
        // Tombstones append, never remove
        assert_eq!(log.triple_count().expect("count"), 4);
    }
}
