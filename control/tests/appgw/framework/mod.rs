//! Test harness around [`ConfigBuilder`]
//!
//! Runs a full pass over in-memory cluster state and an in-memory Endpoints
//! cache, capturing every recorded event.

pub mod fixtures;

use common::{BackendAddressPool, GatewayConfig, Named};
use control::apis::events::{IngressEvent, PendingEvents};
use control::appgw::{BuilderSettings, ConfigBuilder, ReconcileContext, ServiceKey};
use k8s_openapi::api::core::v1::Endpoints;
use kube::ResourceExt;
use std::collections::BTreeMap;

pub const PREFIX: &str = "k8s-ag-ingress-";
pub const DEFAULT_POOL: &str = "k8s-ag-ingress-defaultaddresspool";
pub const DEFAULT_PROBE: &str = "k8s-ag-ingress-defaultprobe";
pub const DEFAULT_SETTINGS: &str = "k8s-ag-ingress-defaulthttpsetting";
pub const GATEWAY_ID: &str = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/applicationGateways/gw";

/// Everything one pass needs besides the cluster objects
pub struct Harness {
    pub settings: BuilderSettings,
    pub endpoints: BTreeMap<ServiceKey, Endpoints>,
    pub existing: GatewayConfig,
}

/// Output of one pass
pub struct PassResult {
    pub config: GatewayConfig,
    pub events: Vec<IngressEvent>,
}

impl Harness {
    pub fn new() -> Self {
        let mut config = control::ControllerConfig::default();
        config.gateway_resource_id = GATEWAY_ID.to_string();
        Self {
            settings: BuilderSettings::from_config(&config),
            endpoints: BTreeMap::new(),
            existing: GatewayConfig::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Vec<Endpoints>) -> Self {
        for e in endpoints {
            let key = ServiceKey::new(e.namespace().unwrap_or_default(), e.name_any());
            self.endpoints.insert(key, e);
        }
        self
    }

    pub fn with_existing(mut self, existing: GatewayConfig) -> Self {
        self.existing = existing;
        self
    }

    pub fn run(&self, ctx: &ReconcileContext) -> PassResult {
        let events = PendingEvents::new();
        let config =
            ConfigBuilder::new(&self.settings, self.existing.clone(), &self.endpoints, &events)
                .build(ctx);
        PassResult {
            config,
            events: events.drain(),
        }
    }
}

impl PassResult {
    pub fn pool(&self, name: &str) -> Option<&BackendAddressPool> {
        self.config
            .backend_address_pools
            .iter()
            .find(|p| p.name == name)
    }

    pub fn pool_names(&self) -> Vec<&str> {
        names(&self.config.backend_address_pools)
    }

    pub fn probe_names(&self) -> Vec<&str> {
        names(&self.config.probes)
    }

    pub fn settings_names(&self) -> Vec<&str> {
        names(&self.config.backend_http_settings_collection)
    }

    pub fn events_with_reason(&self, reason: &str) -> Vec<&IngressEvent> {
        self.events.iter().filter(|e| e.reason == reason).collect()
    }
}

pub fn names<R: Named>(resources: &[R]) -> Vec<&str> {
    resources.iter().map(Named::name).collect()
}
