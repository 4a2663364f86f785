//! # Basic Match Predicate
//!
//! Reference [`EntityMatcher`] implementation: untyped structural
//! comparison of entity fields against resolved filter statements.
//!
//! Deployments with richer query engines can substitute their own
//! predicate; the rule evaluator only depends on the trait.

use crate::filter::{Filter, FilterStatement, Operator};
use crate::rules::{AttributeType, EntityMatcher};
use crate::types::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Untyped entity matcher.
///
/// - Field paths are dot-separated and navigated structurally; a missing
///   field never matches, under any operator.
/// - `=` requires comparable, equal values; `!=` is its strict negation
///   (a type mismatch therefore satisfies `!=`).
/// - Ordering operators require comparable values: numbers compare
///   cross-type (`Int` against `Float`), strings lexicographically,
///   booleans with `false < true`.
/// - Declared attribute types are ignored here; comparison is structural.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicMatcher;

impl BasicMatcher {
    /// Create the matcher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn filter_matches(&self, entity: &Value, filter: &Filter) -> bool {
        match filter {
            Filter::Statement(statement) => Self::statement_matches(entity, statement),
            Filter::Group(group) => group
                .filters
                .iter()
                .all(|child| self.filter_matches(entity, child)),
        }
    }

    fn statement_matches(entity: &Value, statement: &FilterStatement) -> bool {
        let Some(actual) = entity.at_path(statement.field()) else {
            return false;
        };
        let expected = statement.value();
        let ordering = value_cmp(actual, expected);
        match statement.operator() {
            Operator::Eq => ordering == Some(Ordering::Equal),
            Operator::Neq => ordering != Some(Ordering::Equal),
            Operator::Lt => ordering == Some(Ordering::Less),
            Operator::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            Operator::Gt => ordering == Some(Ordering::Greater),
            Operator::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

impl EntityMatcher for BasicMatcher {
    fn matches(
        &self,
        entity: &Value,
        filters: &[Filter],
        _attributes: &BTreeMap<String, AttributeType>,
    ) -> bool {
        filters.iter().all(|filter| self.filter_matches(entity, filter))
    }
}

/// Compare two scalar values, `None` when incomparable.
fn value_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> Value {
        serde_json::from_str(
            r#"{"status": "active", "age": 32, "score": 1.5, "profile": {"city": "london"}}"#,
        )
        .expect("parse")
    }

    fn check(filters: &[Filter]) -> bool {
        BasicMatcher::new().matches(&entity(), filters, &BTreeMap::new())
    }

    #[test]
    fn equality_on_string_field() {
        assert!(check(&[Filter::statement("status", Operator::Eq, "active")]));
        assert!(!check(&[Filter::statement("status", Operator::Eq, "closed")]));
    }

    #[test]
    fn nested_field_navigation() {
        assert!(check(&[Filter::statement(
            "profile.city",
            Operator::Eq,
            "london"
        )]));
    }

    #[test]
    fn missing_field_never_matches() {
        assert!(!check(&[Filter::statement("absent", Operator::Eq, 1_i64)]));
        assert!(!check(&[Filter::statement("absent", Operator::Neq, 1_i64)]));
    }

    #[test]
    fn ordering_operators_on_numbers() {
        assert!(check(&[Filter::statement("age", Operator::Gte, 32_i64)]));
        assert!(check(&[Filter::statement("age", Operator::Lt, 100_i64)]));
        assert!(!check(&[Filter::statement("age", Operator::Gt, 32_i64)]));
    }

    #[test]
    fn cross_type_numeric_comparison() {
        assert!(check(&[Filter::statement(
            "score",
            Operator::Gt,
            Value::Int(1)
        )]));
        assert!(check(&[Filter::statement(
            "age",
            Operator::Lt,
            Value::Float(32.5)
        )]));
    }

    #[test]
    fn type_mismatch_fails_equality_but_satisfies_inequality() {
        assert!(!check(&[Filter::statement("age", Operator::Eq, "32")]));
        assert!(check(&[Filter::statement("age", Operator::Neq, "32")]));
        // But never an ordering
        assert!(!check(&[Filter::statement("age", Operator::Gt, "0")]));
    }

    #[test]
    fn conjunction_across_statements_and_groups() {
        assert!(check(&[
            Filter::statement("status", Operator::Eq, "active"),
            Filter::group(vec![Filter::statement("age", Operator::Gt, 18_i64)]),
        ]));
        assert!(!check(&[
            Filter::statement("status", Operator::Eq, "active"),
            Filter::group(vec![Filter::statement("age", Operator::Gt, 99_i64)]),
        ]));
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(check(&[]));
    }
}
