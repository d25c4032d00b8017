//! Routing tables
//!
//! Minimal listener / URL path map / routing rule generation from Ingress
//! rules. One listener per (host, protocol), one routing rule per listener,
//! and a URL path map whenever the listener carries paths. Backends that did
//! not produce a pool or settings object are routed to the defaults.

use common::{
    HttpListener, NamePrefix, PathRule, Protocol, RequestRoutingRule, ResourceRef, RuleType,
    UrlPathMap, HTTPS_PORT, HTTP_PORT,
};
use k8s_openapi::api::networking::v1::Ingress;
use std::collections::BTreeMap;

use super::backends::{backend_refs, BackendId};
use super::ids::GatewayIds;

/// Listeners, rules and path maps for one pass, each sorted by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTables {
    pub listeners: Vec<HttpListener>,
    pub rules: Vec<RequestRoutingRule>,
    pub path_maps: Vec<UrlPathMap>,
}

/// Pool and settings names each backend resolved to
pub struct BackendResources<'a> {
    pub pools: &'a BTreeMap<BackendId, String>,
    pub settings: &'a BTreeMap<BackendId, String>,
    pub default_pool: String,
    pub default_settings: String,
}

impl BackendResources<'_> {
    fn pool(&self, id: &BackendId) -> &str {
        self.pools
            .get(id)
            .map(String::as_str)
            .unwrap_or(&self.default_pool)
    }

    fn settings(&self, id: &BackendId) -> &str {
        self.settings
            .get(id)
            .map(String::as_str)
            .unwrap_or(&self.default_settings)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ListenerKey {
    host: String,
    port: i32,
}

impl ListenerKey {
    fn protocol(&self) -> Protocol {
        if self.port == HTTPS_PORT {
            Protocol::Https
        } else {
            Protocol::Http
        }
    }
}

pub fn build_routing(
    ingresses: &[Ingress],
    resources: &BackendResources<'_>,
    prefix: &NamePrefix,
    ids: &GatewayIds,
) -> RoutingTables {
    let mut by_listener: BTreeMap<ListenerKey, Vec<BackendId>> = BTreeMap::new();
    for ingress in ingresses {
        for backend in backend_refs(ingress) {
            let key = ListenerKey {
                host: backend.id.host.clone(),
                port: if backend.https { HTTPS_PORT } else { HTTP_PORT },
            };
            by_listener.entry(key).or_default().push(backend.id);
        }
    }

    let mut tables = RoutingTables::default();

    for (key, backends) in by_listener {
        let listener_name = prefix.listener(&key.host, key.port);
        tables.listeners.push(HttpListener {
            name: listener_name.clone(),
            host_name: (!key.host.is_empty()).then(|| key.host.clone()),
            protocol: key.protocol(),
            frontend_port: key.port,
        });

        let (with_path, without_path): (Vec<&BackendId>, Vec<&BackendId>) =
            backends.iter().partition(|id| id.path.is_some());
        let fallback = without_path.first();

        let rule_name = prefix.rule(&listener_name);
        let listener_ref = ids.listener(&listener_name);

        if with_path.is_empty() {
            let (pool, settings) = match fallback {
                Some(id) => (resources.pool(id), resources.settings(id)),
                None => (
                    resources.default_pool.as_str(),
                    resources.default_settings.as_str(),
                ),
            };
            tables.rules.push(RequestRoutingRule {
                name: rule_name,
                rule_type: RuleType::Basic,
                http_listener: listener_ref,
                backend_address_pool: Some(ids.pool(pool)),
                backend_http_settings: Some(ids.settings(settings)),
                url_path_map: None,
            });
            continue;
        }

        let path_map_name = prefix.path_map(&listener_name);
        let (default_pool, default_settings) = match fallback {
            Some(id) => (resources.pool(id), resources.settings(id)),
            None => (
                resources.default_pool.as_str(),
                resources.default_settings.as_str(),
            ),
        };

        let path_rules = with_path
            .iter()
            .enumerate()
            .map(|(index, id)| PathRule {
                name: prefix.path_rule(&path_map_name, index),
                paths: id.path.iter().cloned().collect(),
                backend_address_pool: Some(ids.pool(resources.pool(id))),
                backend_http_settings: Some(ids.settings(resources.settings(id))),
            })
            .collect();

        tables.path_maps.push(UrlPathMap {
            name: path_map_name.clone(),
            default_backend_address_pool: Some(ids.pool(default_pool)),
            default_backend_http_settings: Some(ids.settings(default_settings)),
            path_rules,
        });
        tables.rules.push(RequestRoutingRule {
            name: rule_name,
            rule_type: RuleType::PathBasedRouting,
            http_listener: listener_ref,
            backend_address_pool: None,
            backend_http_settings: None,
            url_path_map: Some(ids.path_map(&path_map_name)),
        });
    }

    tables.listeners.sort_by(|a, b| a.name.cmp(&b.name));
    tables.rules.sort_by(|a, b| a.name.cmp(&b.name));
    tables.path_maps.sort_by(|a, b| a.name.cmp(&b.name));
    tables
}

/// Pool referenced by a rule, directly or through its path map's default
pub fn rule_default_pool<'a>(
    rule: &'a RequestRoutingRule,
    path_maps: &'a [UrlPathMap],
) -> Option<&'a ResourceRef> {
    match &rule.url_path_map {
        None => rule.backend_address_pool.as_ref(),
        Some(map_ref) => path_maps
            .iter()
            .find(|m| m.name == map_ref.name())
            .and_then(|m| m.default_backend_address_pool.as_ref()),
    }
}
