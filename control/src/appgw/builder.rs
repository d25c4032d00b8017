//! Gateway configuration builder
//!
//! One [`ConfigBuilder`] owns one reconciliation pass. It starts from the
//! previously applied configuration and replaces each managed collection with
//! the merge of what the cluster asks for and what belongs to someone else.
//!
//! Backends are resolved and synthesized exactly once per pass in
//! [`ConfigBuilder::desired`], so every warning is recorded once.

use common::{
    BackendAddressPool, BackendHttpSettings, GatewayConfig, NamePrefix, Named, Probe,
};
use std::collections::BTreeMap;
use tracing::info;

use super::backends::{resolve_backends, BackendId, ResolvedBackend};
use super::context::ReconcileContext;
use super::ids::GatewayIds;
use super::merge::{merge_with_stats, MergeStats};
use super::pools::{PoolSynthesizer, SynthesizedPools};
use super::probes::{default_probe, synthesize_probes, SynthesizedProbes};
use super::routing::{build_routing, BackendResources, RoutingTables};
use super::settings::{default_settings, synthesize_settings, SynthesizedSettings};
use crate::apis::endpoints::EndpointsLookup;
use crate::apis::events::EventRecorder;
use crate::brownfield::{Classifier, NameToTarget, ProbeTargets, RouteTargets, RoutingView};
use crate::config::{ControllerConfig, ProbeConfig};

/// Static inputs of every pass, derived from [`ControllerConfig`]
#[derive(Debug, Clone)]
pub struct BuilderSettings {
    pub prefix: NamePrefix,
    pub probe: ProbeConfig,
    pub request_timeout: i32,
    pub ids: GatewayIds,
}

impl BuilderSettings {
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            prefix: config.naming.name_prefix(),
            probe: config.probe.clone(),
            request_timeout: config.backend_request_timeout_secs,
            ids: GatewayIds::new(config.gateway_resource_id.clone()),
        }
    }
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self::from_config(&ControllerConfig::default())
    }
}

/// Everything the cluster asks for in one pass, before ownership filtering
#[derive(Debug, Clone)]
pub struct DesiredState {
    pub backends: BTreeMap<BackendId, ResolvedBackend>,
    pub pools: SynthesizedPools,
    pub probes: SynthesizedProbes,
    pub settings: SynthesizedSettings,
    pub routing: RoutingTables,
    pub classifier: Classifier,
    /// Pool name to Target, previously applied routing overlaid by this pass
    pub pool_targets: NameToTarget,
    /// HTTP settings name to Target, same layering as `pool_targets`
    pub settings_targets: NameToTarget,
}

/// Managed/preserved counts per resource kind for the last build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub pools: MergeStats,
    pub probes: MergeStats,
    pub settings: MergeStats,
}

pub struct ConfigBuilder<'a> {
    settings: &'a BuilderSettings,
    config: GatewayConfig,
    lookup: &'a dyn EndpointsLookup,
    recorder: &'a dyn EventRecorder,
    stats: BuildStats,
}

impl<'a> ConfigBuilder<'a> {
    /// `existing` is the previously applied configuration
    pub fn new(
        settings: &'a BuilderSettings,
        existing: GatewayConfig,
        lookup: &'a dyn EndpointsLookup,
        recorder: &'a dyn EventRecorder,
    ) -> Self {
        Self {
            settings,
            config: existing,
            lookup,
            recorder,
            stats: BuildStats::default(),
        }
    }

    /// Resolve, synthesize and route everything the context references
    pub fn desired(&self, ctx: &ReconcileContext) -> DesiredState {
        let s = self.settings;
        let backends = resolve_backends(ctx, self.lookup, self.recorder);

        let pools = PoolSynthesizer::new(&s.prefix, self.lookup, self.recorder)
            .synthesize(backends.values());
        let probes = synthesize_probes(ctx, backends.values(), &s.prefix, &s.probe);
        let settings = synthesize_settings(
            backends.values(),
            &probes.by_backend,
            &s.prefix,
            &s.ids,
            s.request_timeout,
        );

        let resources = BackendResources {
            pools: &pools.by_backend,
            settings: &settings.by_backend,
            default_pool: s.prefix.default_pool(),
            default_settings: s.prefix.default_settings(),
        };
        let routing = build_routing(&ctx.ingresses, &resources, &s.prefix, &s.ids);

        let applied = RoutingView::new(
            &self.config.request_routing_rules,
            &self.config.http_listeners,
            &self.config.url_path_maps,
        );
        let fresh = RoutingView::new(&routing.rules, &routing.listeners, &routing.path_maps);

        let mut pool_targets = applied.pool_targets();
        pool_targets.extend(fresh.pool_targets());
        let mut settings_targets = applied.settings_targets();
        settings_targets.extend(fresh.settings_targets());

        DesiredState {
            backends,
            pools,
            probes,
            settings,
            routing,
            classifier: ctx.classifier(),
            pool_targets,
            settings_targets,
        }
    }

    /// Replace the stored pools with the merged, sorted collection
    pub fn backend_address_pools(&mut self, desired: &DesiredState) -> &mut Self {
        let default = BackendAddressPool::empty(self.settings.prefix.default_pool());
        let matcher = RouteTargets::new(desired.pool_targets.clone());
        let (pools, stats) = merge_with_stats(
            default,
            desired.pools.pools.clone(),
            &self.config.backend_address_pools,
            &desired.classifier,
            &matcher,
        );
        self.config.backend_address_pools = pools;
        self.stats.pools = stats;
        self
    }

    /// Replace the stored probes with the merged, sorted collection
    pub fn health_probes(&mut self, desired: &DesiredState) -> &mut Self {
        let default: Probe = default_probe(&self.settings.prefix, &self.settings.probe);
        let (probes, stats) = merge_with_stats(
            default,
            desired.probes.probes.clone(),
            &self.config.probes,
            &desired.classifier,
            &ProbeTargets,
        );
        self.config.probes = probes;
        self.stats.probes = stats;
        self
    }

    /// Replace the stored HTTP settings with the merged, sorted collection
    pub fn backend_http_settings(&mut self, desired: &DesiredState) -> &mut Self {
        let s = self.settings;
        let default: BackendHttpSettings = default_settings(&s.prefix, &s.ids, s.request_timeout);
        let matcher = RouteTargets::new(desired.settings_targets.clone());
        let (settings, stats) = merge_with_stats(
            default,
            desired.settings.settings.clone(),
            &self.config.backend_http_settings_collection,
            &desired.classifier,
            &matcher,
        );
        self.config.backend_http_settings_collection = settings;
        self.stats.settings = stats;
        self
    }

    /// Install this pass's listeners, rules and path maps
    ///
    /// Previously applied entries carrying the controller's name prefix are
    /// replaced; any other entry is kept as is.
    pub fn routing(&mut self, desired: &DesiredState) -> &mut Self {
        let prefix = &self.settings.prefix;
        self.config.http_listeners = replace_owned(
            prefix,
            desired.routing.listeners.clone(),
            &self.config.http_listeners,
        );
        self.config.request_routing_rules = replace_owned(
            prefix,
            desired.routing.rules.clone(),
            &self.config.request_routing_rules,
        );
        self.config.url_path_maps = replace_owned(
            prefix,
            desired.routing.path_maps.clone(),
            &self.config.url_path_maps,
        );
        self
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Run a full pass and return the new configuration
    pub fn build(self, ctx: &ReconcileContext) -> GatewayConfig {
        self.build_with_stats(ctx).0
    }

    /// [`ConfigBuilder::build`] plus the per-kind merge counts
    pub fn build_with_stats(mut self, ctx: &ReconcileContext) -> (GatewayConfig, BuildStats) {
        let desired = self.desired(ctx);

        self.backend_address_pools(&desired)
            .health_probes(&desired)
            .backend_http_settings(&desired)
            .routing(&desired);

        info!(
            ingresses = ctx.ingresses.len(),
            backends = desired.backends.len(),
            pools = self.config.backend_address_pools.len(),
            probes = self.config.probes.len(),
            settings = self.config.backend_http_settings_collection.len(),
            preserved_pools = self.stats.pools.preserved,
            preserved_probes = self.stats.probes.preserved,
            "Built gateway configuration"
        );

        (self.config, self.stats)
    }
}

fn replace_owned<R: Named + Clone>(prefix: &NamePrefix, fresh: Vec<R>, existing: &[R]) -> Vec<R> {
    let mut merged: BTreeMap<String, R> = existing
        .iter()
        .filter(|r| !r.name().starts_with(prefix.as_str()))
        .map(|r| (r.name().to_string(), r.clone()))
        .collect();
    for resource in fresh {
        merged.insert(resource.name().to_string(), resource);
    }
    merged.into_values().collect()
}
