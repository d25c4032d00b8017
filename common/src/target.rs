//! Targets: the externally visible (host, port, path) a resource serves
//!
//! Ownership decisions compare resources against declared Targets. Two
//! comparison flavours exist and both live here:
//!
//! - **Exact** (pools, HTTP settings): all three fields must be equal.
//!   [`TargetPath::Any`] only equals another [`TargetPath::Any`].
//! - **Probe** ([`Target::matches_probe`]): host must be equal, port is ignored,
//!   and [`TargetPath::Any`] acts as a host-level wildcard.

use core::fmt;

use crate::appgw::Probe;

/// Port a listener is reachable on when it speaks plain HTTP
pub const HTTP_PORT: i32 = 80;

/// Port a listener is reachable on when it speaks HTTPS
pub const HTTPS_PORT: i32 = 443;

/// Path component of a [`Target`]
///
/// `Any` means "no path constraint" and is distinct from `Exact("")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum TargetPath {
    /// Matches every path on the host:port
    #[default]
    Any,
    /// A single literal path
    Exact(String),
}

impl TargetPath {
    pub fn exact(path: impl Into<String>) -> Self {
        TargetPath::Exact(path.into())
    }

    /// Literal path, if any
    pub fn as_exact(&self) -> Option<&str> {
        match self {
            TargetPath::Any => None,
            TargetPath::Exact(path) => Some(path),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, TargetPath::Any)
    }
}

impl From<Option<String>> for TargetPath {
    fn from(path: Option<String>) -> Self {
        match path {
            Some(path) => TargetPath::Exact(path),
            None => TargetPath::Any,
        }
    }
}

/// Route identity: (host, port, optional path)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Target {
    pub host: String,
    pub port: i32,
    pub path: TargetPath,
}

impl Target {
    /// Target covering every path on `host:port`
    pub fn any_path(host: impl Into<String>, port: i32) -> Self {
        Self {
            host: host.into(),
            port,
            path: TargetPath::Any,
        }
    }

    /// Target for one literal path on `host:port`
    pub fn with_path(host: impl Into<String>, port: i32, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: TargetPath::Exact(path.into()),
        }
    }

    /// Whether a health probe falls under this Target
    ///
    /// Host must match exactly. Port is not compared: probes carry no port.
    /// A Target without a path claims every probe on the host; otherwise the
    /// normalized paths must be equal.
    pub fn matches_probe(&self, probe: &Probe) -> bool {
        if self.host != probe.host {
            return false;
        }
        match &self.path {
            TargetPath::Any => true,
            TargetPath::Exact(path) => normalize_path(path) == normalize_path(&probe.path),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            TargetPath::Any => write!(f, "{}:{}/*", self.host, self.port),
            TargetPath::Exact(path) => write!(f, "{}:{}{}", self.host, self.port, path),
        }
    }
}

/// Strip every trailing `*` and `/` from a path
///
/// `"/foo/*"`, `"/foo/**/*"` and `"/foo/"` all become `"/foo"`. Leading and
/// inner characters are left alone, so `"*//*hello/**/*//"` becomes
/// `"*//*hello"`. Idempotent.
pub fn normalize_path(path: &str) -> &str {
    path.trim_end_matches(['*', '/'])
}
