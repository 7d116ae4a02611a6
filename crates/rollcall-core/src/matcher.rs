//! Nearest-neighbour classification of face descriptors.

use crate::gallery::ReferenceSet;
use crate::types::{Descriptor, Label, MatchResult};

/// Default Euclidean distance threshold for a positive match.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// Classify `query` against the reference set by Euclidean distance.
///
/// The result is the identity owning the globally closest reference
/// descriptor, provided its distance is `<= threshold`. On ties the first
/// identity in reference set order wins. Identities without descriptors
/// never match, and descriptors of a different dimension are skipped.
pub fn find_best(query: Descriptor, reference: &ReferenceSet, threshold: f32) -> MatchResult {
    let mut best_distance = f32::INFINITY;
    let mut best_name: Option<&str> = None;

    for entry in reference.iter() {
        for candidate in &entry.descriptors {
            let Some(distance) = query.euclidean_distance(candidate) else {
                tracing::trace!(
                    identity = %entry.name,
                    expected = query.dim(),
                    actual = candidate.dim(),
                    "skipping incomparable reference descriptor"
                );
                continue;
            };
            // Strict comparison keeps the earliest identity on ties.
            if distance < best_distance {
                best_distance = distance;
                best_name = Some(entry.name.as_str());
            }
        }
    }

    let label = match best_name {
        Some(name) if best_distance <= threshold => Label::Known(name.to_string()),
        _ => Label::Unknown,
    };

    MatchResult {
        descriptor: query,
        label,
        distance: best_distance,
    }
}
