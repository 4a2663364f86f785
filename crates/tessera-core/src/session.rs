//! # Session Module
//!
//! The high-level facade combining a triple log backend, the schema
//! registry, and the connection-scoped variable environment.
//!
//! A session is the unit of authorization context: every external read
//! goes through [`Session::fetch`], which gates the materialized entity
//! through its collection's read rules with this session's variables in
//! scope.
//!
//! ## Storage Backends
//!
//! Two backends are supported:
//! - `InMemory`: volatile [`TripleLog`] (fast, lost on drop)
//! - `Persistent`: [`RedbLog`] for disk-backed ACID storage

use crate::document::{entity_from_triples, insert_document};
use crate::identity::{namespaced_id, strip_collection};
use crate::log::{TripleLog, TripleStore};
use crate::matcher::BasicMatcher;
use crate::rules::{
    apply_read_rules, CollectionSchema, ReadOutcome, SchemaSource,
};
use crate::storage::RedbLog;
use crate::types::{TesseraError, TripleRow, Value};
use std::collections::BTreeMap;
use std::path::Path;

// =============================================================================
// SCHEMA REGISTRY
// =============================================================================

/// In-memory schema registry keyed by collection name.
///
/// Lookups are infallible here; the [`SchemaSource`] trait carries a
/// `Result` for implementations backed by remote or disk storage.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, CollectionSchema>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare or replace a collection schema.
    pub fn define(&mut self, collection: impl Into<String>, schema: CollectionSchema) {
        self.schemas.insert(collection.into(), schema);
    }

    /// Names of every declared collection.
    #[must_use]
    pub fn collections(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }
}

impl SchemaSource for SchemaRegistry {
    fn collection_schema(
        &self,
        collection: &str,
    ) -> Result<Option<CollectionSchema>, TesseraError> {
        Ok(self.schemas.get(collection).cloned())
    }
}

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StoreBackend {
    /// In-memory triple log (fast, volatile).
    InMemory(TripleLog),
    /// Disk-backed triple log using redb (ACID, persistent).
    Persistent(RedbLog),
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::InMemory(TripleLog::new())
    }
}

// NOTE: StoreBackend does NOT implement Clone.
// RedbLog (database handle) cannot be safely cloned.

// =============================================================================
// SESSION
// =============================================================================

/// A session: triple store plus schemas plus connection variables.
///
/// Schemas and variables live beside the store, not inside it; swapping
/// the backend never changes authorization behavior.
#[derive(Debug, Default)]
pub struct Session {
    /// The storage backend (in-memory or persistent).
    backend: StoreBackend,
    /// Declared collection schemas.
    schemas: SchemaRegistry,
    /// Connection-scoped session variables, stored without the sigil.
    variables: BTreeMap<String, Value>,
    /// The match predicate used by the read gate.
    matcher: BasicMatcher,
}

impl Session {
    /// Create a new empty session with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, TesseraError> {
        let log = RedbLog::open(path)?;
        Ok(Self {
            backend: StoreBackend::Persistent(log),
            ..Self::default()
        })
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StoreBackend::Persistent(_))
    }

    /// Get a reference to the schema registry.
    #[must_use]
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    // =========================================================================
    // SCHEMA AND VARIABLES
    // =========================================================================

    /// Declare or replace a collection schema.
    pub fn define_collection(&mut self, collection: impl Into<String>, schema: CollectionSchema) {
        self.schemas.define(collection, schema);
    }

    /// Bind a connection-scoped session variable (name without the `$`).
    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Drop every connection-scoped variable.
    pub fn clear_variables(&mut self) {
        self.variables.clear();
    }

    /// The current connection-scoped variable bindings.
    #[must_use]
    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    // =========================================================================
    // WRITE PATH
    // =========================================================================

    /// Insert a document into a collection under an external id.
    ///
    /// Returns the namespaced key the rows were stored under, and the
    /// rows themselves.
    pub fn insert(
        &mut self,
        collection: &str,
        id: &str,
        document: &Value,
    ) -> Result<(String, Vec<TripleRow>), TesseraError> {
        let key = namespaced_id(collection, id)?;
        let rows = match &mut self.backend {
            StoreBackend::InMemory(log) => {
                insert_document(log, &key, document, Some(collection))?
            }
            StoreBackend::Persistent(log) => {
                insert_document(log, &key, document, Some(collection))?
            }
        };
        Ok((key, rows))
    }

    /// Tombstone every live attribute of an entity.
    ///
    /// Returns the number of tombstone rows written (0 when the entity
    /// does not exist, which is not an error).
    pub fn retract(&mut self, collection: &str, id: &str) -> Result<usize, TesseraError> {
        let key = namespaced_id(collection, id)?;
        match &mut self.backend {
            StoreBackend::InMemory(log) => log.expire_entity(&key),
            StoreBackend::Persistent(log) => log.expire_entity(&key),
        }
    }

    // =========================================================================
    // READ PATH
    // =========================================================================

    /// Fetch one entity through the read-rule gate.
    ///
    /// Materializes the entity from its triples, then applies the
    /// collection's read rules under this session's variables merged
    /// with `query_vars` (query scope wins).
    pub fn fetch(
        &self,
        collection: &str,
        id: &str,
        query_vars: &BTreeMap<String, Value>,
    ) -> Result<ReadOutcome, TesseraError> {
        let key = namespaced_id(collection, id)?;
        let rows = match &self.backend {
            StoreBackend::InMemory(log) => log.entity_triples(&key)?,
            StoreBackend::Persistent(log) => log.entity_triples(&key)?,
        };
        let entity = entity_from_triples(&rows, Some(collection));
        apply_read_rules(
            entity,
            collection,
            &self.schemas,
            &self.matcher,
            &self.variables,
            query_vars,
        )
    }

    /// Fetch every visible entity of a collection, keyed by external id.
    ///
    /// Redacted entities are withheld, not reported; an unresolved
    /// variable in a read rule still fails the whole fetch.
    pub fn fetch_collection(
        &self,
        collection: &str,
        query_vars: &BTreeMap<String, Value>,
    ) -> Result<BTreeMap<String, Value>, TesseraError> {
        let mut visible = BTreeMap::new();
        for key in self.member_keys(collection)? {
            let id = strip_collection(&key)?;
            if let ReadOutcome::Visible(Some(entity)) = self.fetch(collection, &id, query_vars)? {
                visible.insert(id, entity);
            }
        }
        Ok(visible)
    }

    /// External ids of the live members of a collection.
    ///
    /// Membership is log data, not authorization: ids are listed even
    /// for entities the read rules would redact.
    pub fn collection_ids(&self, collection: &str) -> Result<Vec<String>, TesseraError> {
        self.member_keys(collection)?
            .iter()
            .map(|key| strip_collection(key))
            .collect()
    }

    fn member_keys(&self, collection: &str) -> Result<Vec<String>, TesseraError> {
        match &self.backend {
            StoreBackend::InMemory(log) => log.collection_members(collection),
            StoreBackend::Persistent(log) => log.collection_members(collection),
        }
    }

    // =========================================================================
    // METRICS
    // =========================================================================

    /// Total rows in the log, tombstones included.
    pub fn triple_count(&self) -> Result<usize, TesseraError> {
        match &self.backend {
            StoreBackend::InMemory(log) => log.triple_count(),
            StoreBackend::Persistent(log) => log.triple_count(),
        }
    }

    /// Distinct entities with at least one live row.
    pub fn entity_count(&self) -> Result<usize, TesseraError> {
        match &self.backend {
            StoreBackend::InMemory(log) => log.entity_count(),
            StoreBackend::Persistent(log) => log.entity_count(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
