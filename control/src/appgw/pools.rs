//! Backend address pool synthesis
//!
//! Turns live Endpoints into deterministic pool definitions. A backend that
//! cannot produce a pool is reported on its Ingress and left to fall back to
//! the default pool.

use common::{BackendAddress, BackendAddressPool, NamePrefix};
use k8s_openapi::api::core::v1::EndpointSubset;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, warn};

use super::backends::{BackendId, ResolvedBackend};
use crate::apis::endpoints::{unique_tcp_ports, EndpointsLookup};
use crate::apis::events::{actions, reasons, EventRecorder};

/// Pools synthesized in one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesizedPools {
    /// Unique by name, sorted by name; the default pool is not included
    pub pools: Vec<BackendAddressPool>,
    /// Pool each backend resolved to; absent backends use the default pool
    pub by_backend: BTreeMap<BackendId, String>,
}

/// Builds pools for one pass
///
/// Owns the pass's name-to-pool table so a Service referenced from several
/// Ingresses yields a single pool.
pub struct PoolSynthesizer<'a> {
    prefix: &'a NamePrefix,
    lookup: &'a dyn EndpointsLookup,
    recorder: &'a dyn EventRecorder,
    pools: BTreeMap<String, BackendAddressPool>,
}

impl<'a> PoolSynthesizer<'a> {
    pub fn new(
        prefix: &'a NamePrefix,
        lookup: &'a dyn EndpointsLookup,
        recorder: &'a dyn EventRecorder,
    ) -> Self {
        Self {
            prefix,
            lookup,
            recorder,
            pools: BTreeMap::new(),
        }
    }

    /// Build (or reuse) the pool for every backend
    pub fn synthesize<'b, I>(mut self, backends: I) -> SynthesizedPools
    where
        I: IntoIterator<Item = &'b ResolvedBackend>,
    {
        let mut by_backend = BTreeMap::new();
        for backend in backends {
            if let Some(name) = self.pool_for(backend) {
                by_backend.insert(backend.id.clone(), name);
            }
        }
        SynthesizedPools {
            pools: self.pools.into_values().collect(),
            by_backend,
        }
    }

    /// Name of the pool serving `backend`, building it on first use
    pub fn pool_for(&mut self, backend: &ResolvedBackend) -> Option<String> {
        let id = &backend.id;
        let endpoints = match self.lookup.endpoints(&id.service) {
            Ok(endpoints) => endpoints,
            Err(e) => {
                let note = format!("Failed fetching endpoints for service: {}", id.service);
                error!(backend = %id, error = %e, "{}", note);
                self.recorder
                    .warning(&id.ingress, reasons::ENDPOINTS_EMPTY, actions::BUILD_POOL, note);
                return None;
            }
        };

        for subset in endpoints.subsets.iter().flatten() {
            if !unique_tcp_ports(subset).contains(&backend.target_port) {
                continue;
            }

            let name = self.prefix.pool(
                &id.service_full_name(),
                &id.port.to_string(),
                backend.target_port,
            );
            if self.pools.contains_key(&name) {
                debug!(backend = %id, pool = %name, "Reusing pool built earlier in this pass");
                return Some(name);
            }

            let pool = new_pool(&name, subset);
            debug!(
                backend = %id,
                pool = %name,
                addresses = pool.addresses.len(),
                "Built backend address pool"
            );
            self.pools.insert(name.clone(), pool);
            return Some(name);
        }

        let note = format!(
            "Backend target port {} does not have matching endpoint port",
            backend.target_port
        );
        warn!(backend = %id, "{}", note);
        self.recorder.warning(
            &id.ingress,
            reasons::TARGET_PORT_MISMATCH,
            actions::BUILD_POOL,
            note,
        );
        None
    }
}

fn new_pool(name: &str, subset: &EndpointSubset) -> BackendAddressPool {
    BackendAddressPool {
        name: name.to_string(),
        addresses: subset_addresses(subset),
    }
}

/// Unique addresses of a subset, IPs first then FQDNs, each group sorted
///
/// An address carrying an IP is always taken by IP; the hostname is used
/// only when the IP is empty.
pub fn subset_addresses(subset: &EndpointSubset) -> Vec<BackendAddress> {
    let mut ips = BTreeSet::new();
    let mut fqdns = BTreeSet::new();

    for address in subset.addresses.iter().flatten() {
        if !address.ip.is_empty() {
            ips.insert(address.ip.clone());
        } else if let Some(hostname) = address.hostname.as_ref().filter(|h| !h.is_empty()) {
            fqdns.insert(hostname.clone());
        }
    }

    ips.into_iter()
        .map(BackendAddress::Ip)
        .chain(fqdns.into_iter().map(BackendAddress::Fqdn))
        .collect()
}
