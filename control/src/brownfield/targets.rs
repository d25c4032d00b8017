//! Target-list builder
//!
//! Expands declared managed/prohibited target specs into flat [`Target`] lists.

use common::Target;
use serde::{Deserialize, Serialize};

/// Declared (host, port, paths) a user marks as managed or prohibited
///
/// An empty `paths` list stands for the entire `hostname:port`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct TargetSpec {
    pub hostname: String,
    pub port: i32,
    #[serde(default)]
    pub paths: Vec<String>,
}

impl TargetSpec {
    pub fn new(hostname: impl Into<String>, port: i32) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            paths: Vec::new(),
        }
    }

    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// One Target per declared path, or a single any-path Target
    pub fn targets(&self) -> Vec<Target> {
        if self.paths.is_empty() {
            return vec![Target::any_path(self.hostname.clone(), self.port)];
        }
        self.paths
            .iter()
            .map(|path| Target::with_path(self.hostname.clone(), self.port, path.clone()))
            .collect()
    }
}

/// Flatten declared specs into Targets, preserving declaration order
///
/// Duplicates are kept; the lists are only used for membership tests.
pub fn target_list<'a, I>(specs: I) -> Vec<Target>
where
    I: IntoIterator<Item = &'a TargetSpec>,
{
    specs.into_iter().flat_map(TargetSpec::targets).collect()
}

/// Blacklist and whitelist for one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetLists {
    pub prohibited: Vec<Target>,
    pub managed: Vec<Target>,
}

impl TargetLists {
    pub fn from_specs(prohibited: &[TargetSpec], managed: &[TargetSpec]) -> Self {
        Self {
            prohibited: target_list(prohibited),
            managed: target_list(managed),
        }
    }
}
