//! Ownership classifier
//!
//! Decides which resources the controller may create, overwrite or delete.
//!
//! Rules, in order:
//! 1. No prohibited and no managed Targets: everything is managed.
//! 2. Any prohibited Target: a resource is managed iff it matches none of
//!    them. The managed list is ignored.
//! 3. Otherwise a resource is managed iff it matches some managed Target.
//!
//! What "matches" means depends on the resource kind, see [`TargetMatcher`].

use common::{Named, Probe, Target};

use super::mapping::NameToTarget;
use super::targets::{TargetLists, TargetSpec};

/// Resource-kind specific comparison against a declared Target
pub trait TargetMatcher<R> {
    fn matches(&self, resource: &R, entry: &Target) -> bool;
}

/// Matches pools and HTTP settings through the name-to-Target table
///
/// Comparison is exact on host, port and path. A name missing from the table
/// matches nothing.
#[derive(Debug, Clone, Default)]
pub struct RouteTargets {
    targets: NameToTarget,
}

impl RouteTargets {
    pub fn new(targets: NameToTarget) -> Self {
        Self { targets }
    }

    pub fn target_of(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }
}

impl<R: Named> TargetMatcher<R> for RouteTargets {
    fn matches(&self, resource: &R, entry: &Target) -> bool {
        self.targets
            .get(resource.name())
            .is_some_and(|target| target == entry)
    }
}

/// Matches probes by their own host and path
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeTargets;

impl TargetMatcher<Probe> for ProbeTargets {
    fn matches(&self, probe: &Probe, entry: &Target) -> bool {
        entry.matches_probe(probe)
    }
}

/// Blacklist/whitelist ownership test
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    prohibited: Vec<Target>,
    managed: Vec<Target>,
}

impl Classifier {
    pub fn new(prohibited: Vec<Target>, managed: Vec<Target>) -> Self {
        Self {
            prohibited,
            managed,
        }
    }

    pub fn from_specs(prohibited: &[TargetSpec], managed: &[TargetSpec]) -> Self {
        Self::from(TargetLists::from_specs(prohibited, managed))
    }

    /// No declarations at all: the controller owns everything
    pub fn is_greenfield(&self) -> bool {
        self.prohibited.is_empty() && self.managed.is_empty()
    }

    pub fn is_managed<R, M>(&self, resource: &R, matcher: &M) -> bool
    where
        M: TargetMatcher<R> + ?Sized,
    {
        if self.is_greenfield() {
            return true;
        }
        if !self.prohibited.is_empty() {
            return !self
                .prohibited
                .iter()
                .any(|entry| matcher.matches(resource, entry));
        }
        self.managed
            .iter()
            .any(|entry| matcher.matches(resource, entry))
    }

    /// Managed subset of `resources`, in input order
    pub fn managed<R, M>(&self, resources: &[R], matcher: &M) -> Vec<R>
    where
        R: Clone,
        M: TargetMatcher<R> + ?Sized,
    {
        resources
            .iter()
            .filter(|r| self.is_managed(*r, matcher))
            .cloned()
            .collect()
    }
}

impl From<TargetLists> for Classifier {
    fn from(lists: TargetLists) -> Self {
        Self::new(lists.prohibited, lists.managed)
    }
}
