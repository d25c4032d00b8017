//! Health probe synthesis
//!
//! One probe per resolved backend. Host and path come from the Ingress rule;
//! timings come from configuration unless a pod behind the Service declares
//! an HTTP readiness probe on the backend's target port.

use common::{NamePrefix, Probe, ProbeProtocol};
use k8s_openapi::api::core::v1::Probe as PodProbe;
use std::collections::BTreeMap;
use tracing::debug;

use super::backends::{BackendId, ResolvedBackend};
use super::context::ReconcileContext;
use crate::config::ProbeConfig;

/// Probes synthesized in one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesizedProbes {
    /// Unique by name, sorted by name; the default probe is not included
    pub probes: Vec<Probe>,
    pub by_backend: BTreeMap<BackendId, String>,
}

/// The always-present probe used when nothing better is known
pub fn default_probe(prefix: &NamePrefix, config: &ProbeConfig) -> Probe {
    Probe {
        name: prefix.default_probe(),
        host: config.default_host.clone(),
        path: config.default_path.clone(),
        protocol: ProbeProtocol::Http,
        interval: config.interval_secs,
        timeout: config.timeout_secs,
        unhealthy_threshold: config.unhealthy_threshold,
        pick_host_name_from_backend_http_settings: None,
        min_servers: None,
    }
}

pub fn synthesize_probes<'b, I>(
    ctx: &ReconcileContext,
    backends: I,
    prefix: &NamePrefix,
    config: &ProbeConfig,
) -> SynthesizedProbes
where
    I: IntoIterator<Item = &'b ResolvedBackend>,
{
    let mut probes: BTreeMap<String, Probe> = BTreeMap::new();
    let mut by_backend = BTreeMap::new();

    for backend in backends {
        let probe = probe_for_backend(ctx, backend, prefix, config);
        by_backend.insert(backend.id.clone(), probe.name.clone());
        probes.entry(probe.name.clone()).or_insert(probe);
    }

    SynthesizedProbes {
        probes: probes.into_values().collect(),
        by_backend,
    }
}

fn probe_for_backend(
    ctx: &ReconcileContext,
    backend: &ResolvedBackend,
    prefix: &NamePrefix,
    config: &ProbeConfig,
) -> Probe {
    let id = &backend.id;
    let mut probe = default_probe(prefix, config);
    probe.name = prefix.probe(&id.service_full_name(), &id.port.to_string(), &id.ingress.name);

    if !id.host.is_empty() {
        probe.host = id.host.clone();
    }
    if let Some(path) = id.path.as_deref() {
        let trimmed = path.trim_end_matches('*');
        if !trimmed.is_empty() {
            probe.path = trimmed.to_string();
        }
    }

    if let Some(readiness) = readiness_probe(ctx, backend) {
        apply_readiness_probe(&mut probe, readiness);
        debug!(backend = %id, probe = %probe.name, "Probe overridden by pod readiness probe");
    }

    probe
}

/// HTTP readiness probe of a container exposing the backend's target port
fn readiness_probe<'a>(
    ctx: &'a ReconcileContext,
    backend: &ResolvedBackend,
) -> Option<&'a PodProbe> {
    let service = ctx.service(&backend.id.service)?;
    ctx.pods_for_service(service)
        .filter_map(|pod| pod.spec.as_ref())
        .flat_map(|spec| spec.containers.iter())
        .filter(|container| {
            container
                .ports
                .iter()
                .flatten()
                .any(|port| port.container_port == backend.target_port)
        })
        .filter_map(|container| container.readiness_probe.as_ref())
        .find(|probe| probe.http_get.is_some())
}

fn apply_readiness_probe(probe: &mut Probe, readiness: &PodProbe) {
    let Some(http_get) = &readiness.http_get else {
        return;
    };
    if let Some(host) = http_get.host.as_ref().filter(|h| !h.is_empty()) {
        probe.host = host.clone();
    }
    if let Some(path) = http_get.path.as_ref().filter(|p| !p.is_empty()) {
        probe.path = path.clone();
    }
    if http_get
        .scheme
        .as_deref()
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https"))
    {
        probe.protocol = ProbeProtocol::Https;
    }
    if let Some(period) = readiness.period_seconds.filter(|s| *s > 0) {
        probe.interval = period;
    }
    if let Some(timeout) = readiness.timeout_seconds.filter(|s| *s > 0) {
        probe.timeout = timeout;
    }
    if let Some(threshold) = readiness.failure_threshold.filter(|s| *s > 0) {
        probe.unhealthy_threshold = threshold;
    }
}
