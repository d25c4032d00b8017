//! Endpoints cache access
//!
//! The reconciliation pass reads Endpoints through [`EndpointsLookup`], a
//! synchronous, read-only view. In the controller it is backed by a kube
//! reflector store; tests use a plain map.

use k8s_openapi::api::core::v1::{EndpointSubset, Endpoints};
use kube::runtime::reflector::{ObjectRef, Store};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::appgw::ServiceKey;
use crate::error::LookupError;

const PROTOCOL_TCP: &str = "TCP";

/// Read-only Endpoints lookup keyed by namespace/service-name
pub trait EndpointsLookup: Send + Sync {
    fn endpoints(&self, key: &ServiceKey) -> Result<Arc<Endpoints>, LookupError>;
}

impl EndpointsLookup for Store<Endpoints> {
    fn endpoints(&self, key: &ServiceKey) -> Result<Arc<Endpoints>, LookupError> {
        let object_ref = ObjectRef::<Endpoints>::new(&key.name).within(&key.namespace);
        self.get(&object_ref)
            .ok_or_else(|| LookupError::NotFound(key.clone()))
    }
}

impl EndpointsLookup for BTreeMap<ServiceKey, Endpoints> {
    fn endpoints(&self, key: &ServiceKey) -> Result<Arc<Endpoints>, LookupError> {
        self.get(key)
            .cloned()
            .map(Arc::new)
            .ok_or_else(|| LookupError::NotFound(key.clone()))
    }
}

/// Distinct TCP ports advertised by one subset
///
/// A port without a protocol is TCP, the Kubernetes default.
pub fn unique_tcp_ports(subset: &EndpointSubset) -> BTreeSet<i32> {
    subset
        .ports
        .iter()
        .flatten()
        .filter(|p| p.protocol.as_deref().unwrap_or(PROTOCOL_TCP) == PROTOCOL_TCP)
        .map(|p| p.port)
        .collect()
}

/// Resolve a named port through the ports the Endpoints advertise
pub fn named_port(endpoints: &Endpoints, name: &str) -> Option<i32> {
    endpoints
        .subsets
        .iter()
        .flatten()
        .flat_map(|subset| subset.ports.iter().flatten())
        .find(|p| p.name.as_deref() == Some(name))
        .map(|p| p.port)
}
