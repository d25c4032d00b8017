//! Merge/prune pipeline
//!
//! Combines freshly synthesized resources with the previously applied
//! collection so that resources owned by someone else survive untouched.

use common::Named;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::brownfield::{Classifier, TargetMatcher};

/// Outcome of one merge, kept for logging and metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub managed: usize,
    pub preserved: usize,
}

/// Final authoritative collection for one resource kind
///
/// 1. Candidates plus `default`, deduplicated by name.
/// 2. Newly managed: candidates the classifier allows us to own.
/// 3. Existing unmanaged: previously applied entries the classifier does not
///    allow us to own, minus any name about to be rewritten.
/// 4. Union of both, newly managed winning on a name clash.
/// 5. `default` is always present.
/// 6. Sorted by name.
pub fn merge_managed<R, M>(
    default: R,
    candidates: Vec<R>,
    existing: &[R],
    classifier: &Classifier,
    matcher: &M,
) -> Vec<R>
where
    R: Named + Clone,
    M: TargetMatcher<R> + ?Sized,
{
    merge_with_stats(default, candidates, existing, classifier, matcher).0
}

/// [`merge_managed`] plus counts of managed and preserved entries
pub fn merge_with_stats<R, M>(
    default: R,
    candidates: Vec<R>,
    existing: &[R],
    classifier: &Classifier,
    matcher: &M,
) -> (Vec<R>, MergeStats)
where
    R: Named + Clone,
    M: TargetMatcher<R> + ?Sized,
{
    let default_name = default.name().to_string();

    let mut unique: BTreeMap<String, R> = BTreeMap::new();
    unique.insert(default_name.clone(), default.clone());
    for candidate in candidates {
        unique.insert(candidate.name().to_string(), candidate);
    }
    let candidates: Vec<R> = unique.into_values().collect();

    let newly_managed = classifier.managed(&candidates, matcher);
    let existing_unmanaged = prune_managed(existing, &newly_managed, classifier, matcher);

    let stats = MergeStats {
        managed: newly_managed.len(),
        preserved: existing_unmanaged.len(),
    };

    let mut merged: BTreeMap<String, R> = BTreeMap::new();
    for resource in existing_unmanaged.into_iter().chain(newly_managed) {
        merged.insert(resource.name().to_string(), resource);
    }
    merged.insert(default_name, default);

    debug!(
        managed = stats.managed,
        preserved = stats.preserved,
        total = merged.len(),
        "Merged resource collection"
    );

    (merged.into_values().collect(), stats)
}

/// Entries of `existing` that are neither ours to manage nor about to be
/// rewritten by `newly_managed`
pub fn prune_managed<R, M>(
    existing: &[R],
    newly_managed: &[R],
    classifier: &Classifier,
    matcher: &M,
) -> Vec<R>
where
    R: Named + Clone,
    M: TargetMatcher<R> + ?Sized,
{
    let rewritten: HashSet<&str> = newly_managed.iter().map(Named::name).collect();
    existing
        .iter()
        .filter(|r| !rewritten.contains(r.name()) && !classifier.is_managed(*r, matcher))
        .cloned()
        .collect()
}
