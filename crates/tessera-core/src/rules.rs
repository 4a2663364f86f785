//! # Rule Filter Evaluator
//!
//! The row-level read gate. A collection's declared read rules are
//! concatenated into one filter, resolved against the merged session
//! variable environment, and handed to the external match predicate to
//! admit or redact an entity.
//!
//! Redaction is a policy outcome, not an error: an entity failing its
//! read rules is withheld, and the read path carries on normally.

use crate::filter::Filter;
use crate::types::{TesseraError, Value};
use crate::variables::merge_and_resolve;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// SCHEMA MODEL
// =============================================================================

/// Declared type of a collection attribute.
///
/// Opaque to the rule evaluator itself; carried through to the match
/// predicate, which may use it for typed comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// UTF-8 string.
    String,
    /// 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// Boolean.
    Bool,
    /// Nested record with its own attribute map.
    Record(BTreeMap<String, AttributeType>),
}

/// A schema-declared read rule.
///
/// An entity must satisfy the rule's filter (a conjunction) to be
/// visible to the reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadRule {
    /// Optional human-readable label, for diagnostics only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The filter sequence an entity must match.
    pub filter: Vec<Filter>,
}

/// Access rules declared on a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CollectionRules {
    /// Read rules; all must pass (logical AND across rules).
    #[serde(default)]
    pub read: Vec<ReadRule>,
}

/// Schema of one collection: attribute types plus optional access rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Attribute name to declared type.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeType>,
    /// Declared access rules, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<CollectionRules>,
}

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// Schema collaborator: looks up a collection schema by name.
///
/// This lookup is the only suspension point of the read path; it is
/// modelled as a single blocking call with no partial results. Retries,
/// if any, belong to the implementation behind this trait.
pub trait SchemaSource {
    /// Fetch the schema for a collection, or `None` if undeclared.
    fn collection_schema(&self, collection: &str)
    -> Result<Option<CollectionSchema>, TesseraError>;
}

/// Match predicate collaborator: does an entity object satisfy a
/// resolved filter tree?
///
/// Must be pure and total over well-formed filter trees.
pub trait EntityMatcher {
    /// Evaluate `filters` (a conjunction) against `entity`.
    fn matches(
        &self,
        entity: &Value,
        filters: &[Filter],
        attributes: &BTreeMap<String, AttributeType>,
    ) -> bool;
}

// =============================================================================
// READ OUTCOME
// =============================================================================

/// Result of gating an entity through its collection's read rules.
///
/// Distinguished from the error states: absence of authorization is not
/// a failure of the read path.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// The entity is visible to the caller (`None` when there was no
    /// entity to filter in the first place).
    Visible(Option<Value>),
    /// The entity exists but the read rules withheld it.
    Redacted,
}

impl ReadOutcome {
    /// Check for the redaction outcome.
    #[must_use]
    pub fn is_redacted(&self) -> bool {
        matches!(self, Self::Redacted)
    }

    /// Unwrap into the visible entity, treating redaction as absence.
    #[must_use]
    pub fn into_entity(self) -> Option<Value> {
        match self {
            Self::Visible(entity) => entity,
            Self::Redacted => None,
        }
    }
}

// =============================================================================
// EVALUATION
// =============================================================================

/// Gate an entity through its collection's read rules.
///
/// 1. No entity — nothing to filter, passes through.
/// 2. Undeclared collection or no read rules — default-allow.
/// 3. Otherwise concatenate every rule's filter (AND across rules),
///    resolve variables against the merged environment (query scope
///    wins), and delegate to the match predicate.
///
/// This is the sole row-level security gate: it must run on every
/// external read before an entity reaches a caller inside the current
/// session's variable scope.
pub fn apply_read_rules<S, M>(
    entity: Option<Value>,
    collection: &str,
    schemas: &S,
    matcher: &M,
    connection_vars: &BTreeMap<String, Value>,
    query_vars: &BTreeMap<String, Value>,
) -> Result<ReadOutcome, TesseraError>
where
    S: SchemaSource + ?Sized,
    M: EntityMatcher + ?Sized,
{
    let Some(entity) = entity else {
        return Ok(ReadOutcome::Visible(None));
    };

    let Some(schema) = schemas.collection_schema(collection)? else {
        return Ok(ReadOutcome::Visible(Some(entity)));
    };

    let read_rules = schema.rules.as_ref().map_or(&[][..], |r| r.read.as_slice());
    if read_rules.is_empty() {
        return Ok(ReadOutcome::Visible(Some(entity)));
    }

    let combined: Vec<Filter> = read_rules
        .iter()
        .flat_map(|rule| rule.filter.iter().cloned())
        .collect();
    let resolved = merge_and_resolve(connection_vars, query_vars, &combined)?;

    if matcher.matches(&entity, &resolved, &schema.attributes) {
        Ok(ReadOutcome::Visible(Some(entity)))
    } else {
        Ok(ReadOutcome::Redacted)
    }
}

// =============================================================================
// TESTS
// =============================================================================
