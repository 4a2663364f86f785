//! # Attribute Path Rewriter
//!
//! Rewrites the leading path segments of a batch of triples, used when
//! relocating or aliasing stored attribute paths.
//!
//! This is a pure, allocation-producing transform: input rows are never
//! mutated.

use crate::types::{Attribute, TripleRow};

/// Rewrite the attribute prefix of every matching triple in a batch.
///
/// A triple whose attribute begins with `old_prefix` (segment-for-segment
/// equality over the first `old_prefix.len()` segments) is copied with
/// those segments replaced by `new_prefix`; the remaining suffix and all
/// other fields are carried over verbatim. Non-matching triples pass
/// through unchanged.
///
/// The prefix match checks segment content, not just length: a triple
/// under a different prefix of the same length is left alone rather than
/// silently relocated.
#[must_use]
pub fn rewrite_attribute_prefix(
    triples: &[TripleRow],
    old_prefix: &[String],
    new_prefix: &[String],
) -> Vec<TripleRow> {
    triples
        .iter()
        .map(|triple| {
            if !triple.attribute.starts_with(old_prefix) {
                return triple.clone();
            }
            let suffix = &triple.attribute.segments()[old_prefix.len()..];
            let mut segments = Vec::with_capacity(new_prefix.len() + suffix.len());
            segments.extend_from_slice(new_prefix);
            segments.extend_from_slice(suffix);
            TripleRow {
                attribute: Attribute(segments),
                ..triple.clone()
            }
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
