//! Common types for the application gateway controller
//!
//! Value types shared by the reconciliation engine:
//! - [`Target`]: the (host, port, path) a resource serves
//! - the gateway resource model ([`BackendAddressPool`], [`Probe`], ...)
//! - deterministic resource naming ([`NamePrefix`])
//!
//! Everything here is pure data plus pure functions. Serde support is behind
//! the `serde` feature.

mod appgw;
mod names;
mod target;

pub use appgw::{
    last_path_segment, BackendAddress, BackendAddressPool, BackendHttpSettings, GatewayConfig,
    HttpListener, Named, PathRule, Probe, ProbeProtocol, Protocol, RequestRoutingRule,
    ResourceRef, RuleType, UrlPathMap,
};
pub use names::{
    fnv1a_hash, format_prop_name, NamePrefix, DEFAULT_POOL_SUFFIX, DEFAULT_PROBE_SUFFIX,
    DEFAULT_SETTINGS_SUFFIX, MAX_NAME_LEN,
};
pub use target::{normalize_path, Target, TargetPath, HTTPS_PORT, HTTP_PORT};
