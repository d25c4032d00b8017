//! Resource-to-Target mapper
//!
//! Traces routing rules through listeners and URL path maps to find the
//! [`Target`] each backend pool and each backend HTTP settings object serves.

use common::{
    HttpListener, PathRule, Protocol, RequestRoutingRule, ResourceRef, Target, UrlPathMap,
    HTTPS_PORT, HTTP_PORT,
};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Resource name to the Target it serves (single-valued)
pub type NameToTarget = BTreeMap<String, Target>;

/// Listeners indexed by name
pub type ListenersByName<'a> = HashMap<&'a str, &'a HttpListener>;

/// URL path maps indexed by name
pub type UrlPathMapByName<'a> = HashMap<&'a str, &'a UrlPathMap>;

/// Which reference of a rule the table is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mapped {
    Pool,
    Settings,
}

impl Mapped {
    fn of_rule(self, rule: &RequestRoutingRule) -> Option<&ResourceRef> {
        match self {
            Mapped::Pool => rule.backend_address_pool.as_ref(),
            Mapped::Settings => rule.backend_http_settings.as_ref(),
        }
    }

    fn of_path_rule(self, path_rule: &PathRule) -> Option<&ResourceRef> {
        match self {
            Mapped::Pool => path_rule.backend_address_pool.as_ref(),
            Mapped::Settings => path_rule.backend_http_settings.as_ref(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Mapped::Pool => "backend pool",
            Mapped::Settings => "backend http settings",
        }
    }
}

/// Read-only view over already-built routing resources
pub struct RoutingView<'a> {
    rules: &'a [RequestRoutingRule],
    listeners: ListenersByName<'a>,
    path_maps: UrlPathMapByName<'a>,
}

impl<'a> RoutingView<'a> {
    pub fn new(
        rules: &'a [RequestRoutingRule],
        listeners: &'a [HttpListener],
        path_maps: &'a [UrlPathMap],
    ) -> Self {
        Self {
            rules,
            listeners: listeners.iter().map(|l| (l.name.as_str(), l)).collect(),
            path_maps: path_maps.iter().map(|m| (m.name.as_str(), m)).collect(),
        }
    }

    /// Backend pool name to Target
    pub fn pool_targets(&self) -> NameToTarget {
        self.targets(Mapped::Pool)
    }

    /// Backend HTTP settings name to Target
    pub fn settings_targets(&self) -> NameToTarget {
        self.targets(Mapped::Settings)
    }

    fn targets(&self, mapped: Mapped) -> NameToTarget {
        let mut table = NameToTarget::new();

        for rule in self.rules {
            let listener_name = rule.http_listener.name();
            let Some(listener) = self.listeners.get(listener_name) else {
                warn!(
                    rule = %rule.name,
                    listener = listener_name,
                    "Routing rule references unknown listener, skipping"
                );
                continue;
            };

            let host = listener.host_name.clone().unwrap_or_default();
            let port = listener_port(listener.protocol);

            let Some(path_map_ref) = &rule.url_path_map else {
                if let Some(resource) = mapped.of_rule(rule) {
                    insert(&mut table, mapped, resource.name(), Target::any_path(host, port));
                }
                continue;
            };

            let Some(path_map) = self.path_maps.get(path_map_ref.name()) else {
                warn!(
                    rule = %rule.name,
                    path_map = path_map_ref.name(),
                    "Routing rule references unknown URL path map, skipping"
                );
                continue;
            };

            for path_rule in &path_map.path_rules {
                let Some(resource) = mapped.of_path_rule(path_rule) else {
                    continue;
                };
                for path in &path_rule.paths {
                    insert(
                        &mut table,
                        mapped,
                        resource.name(),
                        Target::with_path(host.clone(), port, path.clone()),
                    );
                }
            }
        }

        table
    }
}

/// Frontend port implied by a listener protocol
pub fn listener_port(protocol: Protocol) -> i32 {
    match protocol {
        Protocol::Https => HTTPS_PORT,
        Protocol::Http => HTTP_PORT,
    }
}

// Last visited Target wins.
fn insert(table: &mut NameToTarget, mapped: Mapped, name: &str, target: Target) {
    if let Some(previous) = table.insert(name.to_string(), target.clone()) {
        if previous != target {
            warn!(
                kind = mapped.label(),
                name,
                previous = %previous,
                current = %target,
                "Resource is reachable through several targets, keeping the last one"
            );
        }
    }
}
