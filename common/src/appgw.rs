//! Application gateway resource model
//!
//! Plain-data rendition of the load balancer sub-resources the controller
//! reads and writes. Cross references between resources are [`ResourceRef`]s
//! holding a full resource ID; lookups use the last path segment as the key.

use core::fmt;

/// Reference to another gateway sub-resource by resource ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceRef {
    pub id: String,
}

impl ResourceRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Name of the referenced resource (last `/`-separated segment of the ID)
    pub fn name(&self) -> &str {
        last_path_segment(&self.id)
    }
}

/// Last chunk of a slash-separated string
///
/// `"/subscriptions/x/.../backendAddressPools/pool-a"` yields `"pool-a"`;
/// a string without slashes is returned as is.
pub fn last_path_segment(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

/// Single member of a backend address pool
///
/// Ordering puts every IP entry before every FQDN entry, each group sorted
/// lexicographically. An IP and an FQDN with identical text are different
/// entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BackendAddress {
    #[cfg_attr(feature = "serde", serde(rename = "ipAddress"))]
    Ip(String),
    #[cfg_attr(feature = "serde", serde(rename = "fqdn"))]
    Fqdn(String),
}

impl BackendAddress {
    pub fn ip(ip: impl Into<String>) -> Self {
        BackendAddress::Ip(ip.into())
    }

    pub fn fqdn(fqdn: impl Into<String>) -> Self {
        BackendAddress::Fqdn(fqdn.into())
    }
}

impl fmt::Display for BackendAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendAddress::Ip(ip) => write!(f, "ip:{}", ip),
            BackendAddress::Fqdn(fqdn) => write!(f, "fqdn:{}", fqdn),
        }
    }
}

/// Named group of endpoints a routing rule forwards traffic to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BackendAddressPool {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default, rename = "backendAddresses"))]
    pub addresses: Vec<BackendAddress>,
}

impl BackendAddressPool {
    /// Pool with no addresses
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addresses: Vec::new(),
        }
    }
}

/// Protocol spoken by a probe, listener or backend HTTP settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProbeProtocol {
    #[default]
    Http,
    Https,
}

impl fmt::Display for ProbeProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeProtocol::Http => write!(f, "Http"),
            ProbeProtocol::Https => write!(f, "Https"),
        }
    }
}

/// Listener and settings protocol (same wire values as probes)
pub type Protocol = ProbeProtocol;

/// Health probe
///
/// Ownership of a probe is decided by `(host, path)`; the name plays no part.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Probe {
    pub name: String,
    pub host: String,
    pub path: String,
    pub protocol: ProbeProtocol,
    /// Seconds between probes
    pub interval: i32,
    /// Seconds before a probe attempt is considered failed
    pub timeout: i32,
    pub unhealthy_threshold: i32,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub pick_host_name_from_backend_http_settings: Option<bool>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub min_servers: Option<i32>,
}

/// How the gateway talks to the members of a backend pool
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BackendHttpSettings {
    pub name: String,
    pub port: i32,
    pub protocol: Protocol,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub path: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub host_name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub probe: Option<ResourceRef>,
    /// Seconds
    pub request_timeout: i32,
}

/// Frontend listener
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct HttpListener {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub host_name: Option<String>,
    pub protocol: Protocol,
    pub frontend_port: i32,
}

/// Kind of request routing rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RuleType {
    /// Every request on the listener goes to one pool
    #[default]
    Basic,
    /// Requests are dispatched through a URL path map
    PathBasedRouting,
}

/// Binds a listener to either a backend or a URL path map
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RequestRoutingRule {
    pub name: String,
    pub rule_type: RuleType,
    pub http_listener: ResourceRef,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub backend_address_pool: Option<ResourceRef>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub backend_http_settings: Option<ResourceRef>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub url_path_map: Option<ResourceRef>,
}

/// One entry of a URL path map
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PathRule {
    pub name: String,
    pub paths: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub backend_address_pool: Option<ResourceRef>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub backend_http_settings: Option<ResourceRef>,
}

/// Path based dispatch table referenced by a routing rule
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct UrlPathMap {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub default_backend_address_pool: Option<ResourceRef>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub default_backend_http_settings: Option<ResourceRef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub path_rules: Vec<PathRule>,
}

/// Full gateway configuration as the controller sees it
///
/// Every collection is sorted by name when produced by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct GatewayConfig {
    pub backend_address_pools: Vec<BackendAddressPool>,
    pub probes: Vec<Probe>,
    pub backend_http_settings_collection: Vec<BackendHttpSettings>,
    pub http_listeners: Vec<HttpListener>,
    pub request_routing_rules: Vec<RequestRoutingRule>,
    pub url_path_maps: Vec<UrlPathMap>,
}

/// Anything kept in a name-keyed gateway collection
pub trait Named {
    fn name(&self) -> &str;
}

macro_rules! impl_named {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Named for $ty {
                fn name(&self) -> &str {
                    &self.name
                }
            }
        )*
    };
}

impl_named!(
    BackendAddressPool,
    Probe,
    BackendHttpSettings,
    HttpListener,
    RequestRoutingRule,
    UrlPathMap,
);
