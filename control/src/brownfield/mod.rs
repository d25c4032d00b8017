//! Brownfield ownership
//!
//! Everything needed to tell resources this controller owns apart from
//! resources created by someone else on the same gateway.

pub mod classify;
pub mod mapping;
pub mod targets;

pub use classify::{Classifier, ProbeTargets, RouteTargets, TargetMatcher};
pub use mapping::{listener_port, ListenersByName, NameToTarget, RoutingView, UrlPathMapByName};
pub use targets::{target_list, TargetLists, TargetSpec};
