//! Ingress support
//!
//! Watches Ingresses and everything they depend on, and drives the gateway
//! configuration passes.

#[allow(clippy::module_inception)]
pub mod ingress;

pub use ingress::{ingresses_for_service, Caches, IngressReconciler, PassOutcome};
