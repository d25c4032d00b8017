//! Application gateway configuration synthesis
//!
//! Pipeline of one pass:
//! - backends: Ingress backend references resolved against Services
//! - pools: live Endpoints turned into backend address pools
//! - probes / settings: one health probe and one HTTP settings object per backend
//! - routing: listeners, routing rules and URL path maps
//! - merge: ownership-aware merge with the previously applied state
//! - builder: the [`ConfigBuilder`] driving all of the above

pub mod backends;
pub mod builder;
pub mod context;
pub mod ids;
pub mod merge;
pub mod pools;
pub mod probes;
pub mod routing;
pub mod settings;
pub mod state;

pub use backends::{
    backend_refs, resolve_backends, BackendId, BackendRef, IngressKey, ResolvedBackend,
    ServiceKey, ServicePortSpec,
};
pub use builder::{BuildStats, BuilderSettings, ConfigBuilder, DesiredState};
pub use context::{is_ingress_class, ReconcileContext, INGRESS_CLASS_ANNOTATION};
pub use ids::GatewayIds;
pub use merge::{merge_managed, merge_with_stats, prune_managed, MergeStats};
pub use pools::{subset_addresses, PoolSynthesizer, SynthesizedPools};
pub use probes::{default_probe, synthesize_probes, SynthesizedProbes};
pub use routing::{build_routing, rule_default_pool, BackendResources, RoutingTables};
pub use settings::{default_settings, synthesize_settings, SynthesizedSettings};
pub use state::{load_snapshot, write_snapshot, GatewayState};
