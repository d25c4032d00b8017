//! Backend HTTP settings synthesis

use common::{BackendHttpSettings, NamePrefix, Protocol, HTTP_PORT};
use std::collections::BTreeMap;

use super::backends::{BackendId, ResolvedBackend};
use super::ids::GatewayIds;

/// Settings synthesized in one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesizedSettings {
    /// Unique by name, sorted by name; the default settings are not included
    pub settings: Vec<BackendHttpSettings>,
    pub by_backend: BTreeMap<BackendId, String>,
}

/// Settings used when a backend did not resolve
pub fn default_settings(
    prefix: &NamePrefix,
    ids: &GatewayIds,
    request_timeout: i32,
) -> BackendHttpSettings {
    BackendHttpSettings {
        name: prefix.default_settings(),
        port: HTTP_PORT,
        protocol: Protocol::Http,
        path: None,
        host_name: None,
        probe: Some(ids.probe(&prefix.default_probe())),
        request_timeout,
    }
}

/// One settings object per backend, pointing at that backend's probe
///
/// `probes_by_backend` comes from probe synthesis; a backend without a probe
/// uses the default probe.
pub fn synthesize_settings<'b, I>(
    backends: I,
    probes_by_backend: &BTreeMap<BackendId, String>,
    prefix: &NamePrefix,
    ids: &GatewayIds,
    request_timeout: i32,
) -> SynthesizedSettings
where
    I: IntoIterator<Item = &'b ResolvedBackend>,
{
    let default_probe = prefix.default_probe();
    let mut settings: BTreeMap<String, BackendHttpSettings> = BTreeMap::new();
    let mut by_backend = BTreeMap::new();

    for backend in backends {
        let id = &backend.id;
        let name = prefix.settings(
            &id.service_full_name(),
            &id.port.to_string(),
            backend.target_port,
            &id.ingress.name,
        );
        let probe = probes_by_backend
            .get(id)
            .map(String::as_str)
            .unwrap_or(default_probe.as_str());

        by_backend.insert(id.clone(), name.clone());
        settings
            .entry(name.clone())
            .or_insert_with(|| BackendHttpSettings {
                name,
                port: backend.target_port,
                protocol: Protocol::Http,
                path: None,
                host_name: None,
                probe: Some(ids.probe(probe)),
                request_timeout,
            });
    }

    SynthesizedSettings {
        settings: settings.into_values().collect(),
        by_backend,
    }
}
