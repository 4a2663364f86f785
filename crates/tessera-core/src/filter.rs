//! # Filter Trees
//!
//! The declarative filter structure used by read rules and queries.
//!
//! A filter is either a leaf comparison `[field, operator, value]` or a
//! group of nested filters; siblings are always a logical conjunction,
//! recursively. Leaf values may be literals or `$`-prefixed session
//! variable references, resolved by [`crate::variables`] before
//! evaluation.

use crate::types::Value;
use serde::{Deserialize, Serialize};

// =============================================================================
// OPERATORS
// =============================================================================

/// Comparison operator of a leaf filter statement.
///
/// Serialized as its symbol, so a statement reads naturally in JSON:
/// `["status", "=", "active"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// Equality.
    #[serde(rename = "=")]
    Eq,
    /// Inequality.
    #[serde(rename = "!=")]
    Neq,
    /// Strictly less than.
    #[serde(rename = "<")]
    Lt,
    /// Less than or equal.
    #[serde(rename = "<=")]
    Lte,
    /// Strictly greater than.
    #[serde(rename = ">")]
    Gt,
    /// Greater than or equal.
    #[serde(rename = ">=")]
    Gte,
}

// =============================================================================
// FILTER NODES
// =============================================================================

/// A leaf comparison: dot-separated field path, operator, value.
///
/// Serializes as a 3-element array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterStatement(pub String, pub Operator, pub Value);

impl FilterStatement {
    /// Create a leaf statement.
    #[must_use]
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self(field.into(), operator, value.into())
    }

    /// Dot-separated field path being compared.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.0
    }

    /// Comparison operator.
    #[must_use]
    pub fn operator(&self) -> Operator {
        self.1
    }

    /// Right-hand value (literal or unresolved variable reference).
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.2
    }
}

/// A group node holding a nested conjunction of filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    /// Child filters, ANDed together.
    pub filters: Vec<Filter>,
}

/// A node of a filter tree: leaf statement or nested group.
///
/// Tagged variant rather than structural type tests, so resolution and
/// matching dispatch on the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    /// Leaf comparison.
    Statement(FilterStatement),
    /// Nested conjunction.
    Group(FilterGroup),
}

impl Filter {
    /// Leaf statement helper.
    #[must_use]
    pub fn statement(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::Statement(FilterStatement::new(field, operator, value))
    }

    /// Group helper.
    #[must_use]
    pub fn group(filters: Vec<Filter>) -> Self {
        Self::Group(FilterGroup { filters })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn statement_serializes_as_triple_array() {
        let filter = Filter::statement("status", Operator::Eq, "active");
        let json = serde_json::to_string(&filter).expect("serialize");
        assert_eq!(json, r#"["status","=","active"]"#);
    }

    #[test]
    fn statement_deserializes_from_triple_array() {
        let filter: Filter = serde_json::from_str(r#"["age", ">=", 21]"#).expect("parse");
        match filter {
            Filter::Statement(statement) => {
                assert_eq!(statement.field(), "age");
                assert_eq!(statement.operator(), Operator::Gte);
                assert_eq!(statement.value(), &Value::Int(21));
            }
            Filter::Group(_) => panic!("expected a statement"),
        }
    }

    #[test]
    fn group_deserializes_from_filters_object() {
        let filter: Filter =
            serde_json::from_str(r#"{"filters": [["a", "=", 1], ["b", "!=", 2]]}"#).expect("parse");
        match filter {
            Filter::Group(group) => assert_eq!(group.filters.len(), 2),
            Filter::Statement(_) => panic!("expected a group"),
        }
    }

    #[test]
    fn nested_groups_round_trip() {
        let filter = Filter::group(vec![
            Filter::statement("a", Operator::Lt, 5),
            Filter::group(vec![Filter::statement("b", Operator::Eq, true)]),
        ]);
        let json = serde_json::to_string(&filter).expect("serialize");
        let back: Filter = serde_json::from_str(&json).expect("reparse");
        assert_eq!(filter, back);
    }
}
