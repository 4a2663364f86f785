//! # Variable Resolver
//!
//! Substitutes `$name` placeholders inside a filter tree against a merged
//! session variable environment.
//!
//! Resolution is pure copy-on-write: the input tree is never mutated, and
//! callers never observe aliasing. The walk is depth-first and
//! short-circuits on the first unresolved reference — no error
//! collection, no silent defaults.

use crate::filter::{Filter, FilterGroup, FilterStatement};
use crate::primitives::VARIABLE_SIGIL;
use crate::types::{TesseraError, Value};
use std::collections::BTreeMap;

// =============================================================================
// VARIABLE ENVIRONMENT
// =============================================================================

/// The merged variable environment a filter tree is resolved against.
///
/// Names are stored without the `$` sigil. Built by overlaying
/// query-scoped variables onto connection-scoped ones; the query-scoped
/// entry wins on key collision. The merge is an explicit two-map
/// operation so the precedence rule stays auditable on its own.
#[derive(Debug, Clone, Default)]
pub struct VariableEnv(BTreeMap<String, Value>);

impl VariableEnv {
    /// Build an environment from a single variable map.
    #[must_use]
    pub fn new(variables: BTreeMap<String, Value>) -> Self {
        Self(variables)
    }

    /// Merge connection-scoped and query-scoped variables.
    ///
    /// Query-scoped bindings shadow connection-scoped ones.
    #[must_use]
    pub fn merged(
        connection: &BTreeMap<String, Value>,
        query: &BTreeMap<String, Value>,
    ) -> Self {
        let mut merged = connection.clone();
        for (name, value) in query {
            merged.insert(name.clone(), value.clone());
        }
        Self(merged)
    }

    /// Look up a variable by name (without the sigil).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

/// Extract the variable name from a leaf value, if it is a reference.
///
/// Only strings beginning with the sigil are references; every other
/// value is a literal.
fn variable_name(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => s.strip_prefix(VARIABLE_SIGIL),
        _ => None,
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Resolve every variable reference in a filter sequence.
///
/// - Groups recurse into their children; node kind is preserved.
/// - A leaf whose value is not a `$`-prefixed string is returned
///   unchanged, so resolving an already-resolved tree is a no-op.
/// - A reference with no binding fails with
///   `TesseraError::SessionVariableNotFound`, carrying the original
///   `$name` form.
///
/// A bound value always resolves, even when it is falsy (`0`, `""`,
/// `false`, `null`): absence of a KEY is the only failure. Earlier
/// revisions conflated the two, which silently rejected legitimate
/// falsy session values.
pub fn resolve_filters(
    filters: &[Filter],
    environment: &VariableEnv,
) -> Result<Vec<Filter>, TesseraError> {
    filters
        .iter()
        .map(|filter| resolve_filter(filter, environment))
        .collect()
}

fn resolve_filter(filter: &Filter, environment: &VariableEnv) -> Result<Filter, TesseraError> {
    match filter {
        Filter::Group(group) => Ok(Filter::Group(FilterGroup {
            filters: resolve_filters(&group.filters, environment)?,
        })),
        Filter::Statement(statement) => {
            let Some(name) = variable_name(statement.value()) else {
                return Ok(filter.clone());
            };
            match environment.get(name) {
                Some(value) => Ok(Filter::Statement(FilterStatement(
                    statement.0.clone(),
                    statement.1,
                    value.clone(),
                ))),
                None => Err(TesseraError::SessionVariableNotFound(format!(
                    "{}{}",
                    VARIABLE_SIGIL, name
                ))),
            }
        }
    }
}

/// Merge two variable scopes and resolve a filter sequence against them.
///
/// Convenience composition used by the rule evaluator: query-scoped
/// variables win, then [`resolve_filters`] runs over the merged
/// environment.
pub fn merge_and_resolve(
    connection: &BTreeMap<String, Value>,
    query: &BTreeMap<String, Value>,
    filters: &[Filter],
) -> Result<Vec<Filter>, TesseraError> {
    resolve_filters(filters, &VariableEnv::merged(connection, query))
}

// =============================================================================
// TESTS
// =============================================================================
