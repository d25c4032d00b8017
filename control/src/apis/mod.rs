//! Kubernetes API integrations
//!
//! Declared target CRDs, Endpoints cache access, Event recording, the Ingress
//! controller and its metrics.

pub mod crd;
pub mod endpoints;
pub mod events;
pub mod ingress;
pub mod metrics;
