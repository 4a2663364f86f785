//! # tessera-core
//!
//! The deterministic document-to-triple engine for Tessera - THE LOGIC.
//!
//! This crate implements the pure substrate: nested documents are
//! decomposed into attribute-path triple rows on an append-only log, and
//! reads gate materialized entities through schema-declared read rules
//! resolved against session variables.
//!
//! ## Architectural Constraints
//!
//! The core:
//! - Is deterministic: same inputs, same rows, same verdicts
//! - Keeps storage behind injected traits ([`log::TripleSink`],
//!   [`log::TripleStore`]); the redb backend is one implementation
//! - Keeps authorization behind injected traits ([`rules::SchemaSource`],
//!   [`rules::EntityMatcher`])
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod document;
pub mod filter;
pub mod flatten;
pub mod identity;
pub mod log;
pub mod matcher;
pub mod primitives;
pub mod rewrite;
pub mod rules;
pub mod session;
pub mod storage;
pub mod types;
pub mod variables;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Attribute, TesseraError, Timestamp, TripleRow, Value};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use document::{decompose, entity_from_triples, insert_document};
pub use filter::{Filter, FilterGroup, FilterStatement, Operator};
pub use identity::{namespaced_id, split_id, strip_collection, validate_external_id};
pub use log::{TripleLog, TripleSink, TripleStore};
pub use matcher::BasicMatcher;
pub use rewrite::rewrite_attribute_prefix;
pub use rules::{
    AttributeType, CollectionRules, CollectionSchema, EntityMatcher, ReadOutcome, ReadRule,
    SchemaSource, apply_read_rules,
};
pub use session::{SchemaRegistry, Session, StoreBackend};
pub use storage::RedbLog;
pub use variables::{VariableEnv, merge_and_resolve, resolve_filters};
