//! Deterministic resource names
//!
//! Every generated name is a pure function of its inputs plus the configured
//! [`NamePrefix`]. Regenerating from identical inputs must yield identical
//! names, otherwise each pass would produce a spurious diff.

use core::fmt;

/// Longest name the gateway accepts for a sub-resource
pub const MAX_NAME_LEN: usize = 80;

/// Suffix of the reserved default backend address pool
pub const DEFAULT_POOL_SUFFIX: &str = "defaultaddresspool";

/// Suffix of the reserved default health probe
pub const DEFAULT_PROBE_SUFFIX: &str = "defaultprobe";

/// Suffix of the reserved default backend HTTP settings
pub const DEFAULT_SETTINGS_SUFFIX: &str = "defaulthttpsetting";

/// Prefix stamped on every resource name the controller generates
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamePrefix(String);

impl NamePrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the always-present default pool
    pub fn default_pool(&self) -> String {
        format!("{}{}", self.0, DEFAULT_POOL_SUFFIX)
    }

    /// Name of the always-present default probe
    pub fn default_probe(&self) -> String {
        format!("{}{}", self.0, DEFAULT_PROBE_SUFFIX)
    }

    /// Name of the always-present default backend HTTP settings
    pub fn default_settings(&self) -> String {
        format!("{}{}", self.0, DEFAULT_SETTINGS_SUFFIX)
    }

    /// Backend address pool for one service port resolved to a target port
    pub fn pool(&self, service_full_name: &str, service_port: &str, target_port: i32) -> String {
        format_prop_name(&format!(
            "{}pool-{}-{}-bp-{}",
            self.0, service_full_name, service_port, target_port
        ))
    }

    /// Health probe for one service port as referenced by one Ingress
    pub fn probe(&self, service_full_name: &str, service_port: &str, ingress: &str) -> String {
        format_prop_name(&format!(
            "{}pb-{}-{}-{}",
            self.0, service_full_name, service_port, ingress
        ))
    }

    /// Backend HTTP settings for one service port as referenced by one Ingress
    pub fn settings(
        &self,
        service_full_name: &str,
        service_port: &str,
        target_port: i32,
        ingress: &str,
    ) -> String {
        format_prop_name(&format!(
            "{}bp-{}-{}-{}-{}",
            self.0, service_full_name, service_port, target_port, ingress
        ))
    }

    /// Frontend listener for a host (empty = any host) on a port
    pub fn listener(&self, host: &str, port: i32) -> String {
        let host = if host.is_empty() { "any" } else { host };
        format_prop_name(&format!("{}fl-{}-{}", self.0, host, port))
    }

    /// URL path map attached to a listener
    pub fn path_map(&self, listener: &str) -> String {
        format_prop_name(&format!("{}url-{}", self.0, strip(listener, &self.0)))
    }

    /// Request routing rule attached to a listener
    pub fn rule(&self, listener: &str) -> String {
        format_prop_name(&format!("{}rr-{}", self.0, strip(listener, &self.0)))
    }

    /// Path rule inside a URL path map
    pub fn path_rule(&self, backend: &str, index: usize) -> String {
        format_prop_name(&format!("{}pr-{}-{}", self.0, strip(backend, &self.0), index))
    }
}

impl fmt::Display for NamePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn strip<'a>(name: &'a str, prefix: &str) -> &'a str {
    name.strip_prefix(prefix).unwrap_or(name)
}

/// Fit a generated name into [`MAX_NAME_LEN`]
///
/// Short names pass through untouched. Long names keep a prefix and gain a
/// hex FNV-1a digest of the full name, so two long names that share their
/// first characters still differ.
pub fn format_prop_name(name: &str) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name.to_string();
    }
    let digest = format!("{:016x}", fnv1a_hash(name.as_bytes()));
    let mut keep = MAX_NAME_LEN - digest.len() - 1;
    while !name.is_char_boundary(keep) {
        keep -= 1;
    }
    format!("{}-{}", &name[..keep], digest)
}

/// FNV-1a hash (64-bit), stable across builds and platforms
pub const fn fnv1a_hash(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}
