//! Configuration for the appgw controller
//!
//! Loaded from environment variables on top of serde defaults.

use common::NamePrefix;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::ControlError;

/// Controller configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Reporting component on published events
    #[serde(default = "default_controller_name")]
    pub controller_name: String,

    /// Ingress class this controller owns
    #[serde(default = "default_ingress_class")]
    pub ingress_class: String,

    /// Resource naming configuration
    #[serde(default)]
    pub naming: NamingConfig,

    /// Resource ID of the application gateway
    #[serde(default = "default_gateway_resource_id")]
    pub gateway_resource_id: String,

    /// Defaults for synthesized health probes
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Request timeout for synthesized backend HTTP settings, in seconds
    #[serde(default = "default_backend_request_timeout")]
    pub backend_request_timeout_secs: i32,

    /// Periodic resync interval in seconds
    #[serde(default = "default_resync")]
    pub resync_secs: u64,

    /// JSON snapshot of the previously applied gateway configuration
    #[serde(default)]
    pub initial_config_path: Option<PathBuf>,

    /// Where each changed configuration is written as JSON
    #[serde(default)]
    pub output_config_path: Option<PathBuf>,
}

/// Resource naming configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NamingConfig {
    /// Prefix of every generated resource name
    #[serde(default = "default_name_prefix")]
    pub prefix: String,
}

impl NamingConfig {
    pub fn name_prefix(&self) -> NamePrefix {
        NamePrefix::new(self.prefix.clone())
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            prefix: default_name_prefix(),
        }
    }
}

/// Health probe defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Probe interval in seconds (default: 30s)
    #[serde(default = "default_probe_interval")]
    pub interval_secs: i32,

    /// Probe timeout in seconds (default: 30s)
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: i32,

    /// Consecutive failures before marking unhealthy (default: 3)
    #[serde(default = "default_unhealthy_threshold")]
    pub unhealthy_threshold: i32,

    /// Host of the default probe
    #[serde(default = "default_probe_host")]
    pub default_host: String,

    /// Path of the default probe
    #[serde(default = "default_probe_path")]
    pub default_path: String,
}

fn default_controller_name() -> String {
    "appgw-ingress-controller".to_string()
}

fn default_ingress_class() -> String {
    "azure/application-gateway".to_string()
}

fn default_name_prefix() -> String {
    "k8s-ag-ingress-".to_string()
}

fn default_gateway_resource_id() -> String {
    "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/appgw/providers/Microsoft.Network/applicationGateways/appgw".to_string()
}

fn default_backend_request_timeout() -> i32 {
    30
}

fn default_resync() -> u64 {
    300
}

fn default_probe_interval() -> i32 {
    30
}

fn default_probe_timeout() -> i32 {
    30
}

fn default_unhealthy_threshold() -> i32 {
    3
}

fn default_probe_host() -> String {
    "localhost".to_string()
}

fn default_probe_path() -> String {
    "/".to_string()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_probe_interval(),
            timeout_secs: default_probe_timeout(),
            unhealthy_threshold: default_unhealthy_threshold(),
            default_host: default_probe_host(),
            default_path: default_probe_path(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            controller_name: default_controller_name(),
            ingress_class: default_ingress_class(),
            naming: NamingConfig::default(),
            gateway_resource_id: default_gateway_resource_id(),
            probe: ProbeConfig::default(),
            backend_request_timeout_secs: default_backend_request_timeout(),
            resync_secs: default_resync(),
            initial_config_path: None,
            output_config_path: None,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ControlError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControlError> {
        let mut config = Self::default();

        if let Some(val) = lookup("APPGW_CONTROLLER_NAME") {
            config.controller_name = val;
        }

        if let Some(val) = lookup("APPGW_INGRESS_CLASS") {
            config.ingress_class = val;
        }

        if let Some(val) = lookup("APPGW_NAME_PREFIX") {
            config.naming.prefix = val;
        }

        if let Some(val) = lookup("APPGW_RESOURCE_ID") {
            config.gateway_resource_id = val.trim_end_matches('/').to_string();
        }

        if let Some(val) = lookup("APPGW_RESYNC_SECS") {
            config.resync_secs = parse_number("APPGW_RESYNC_SECS", &val)?;
        }

        if let Some(val) = lookup("APPGW_BACKEND_REQUEST_TIMEOUT_SECS") {
            config.backend_request_timeout_secs =
                parse_number("APPGW_BACKEND_REQUEST_TIMEOUT_SECS", &val)?;
        }

        if let Some(val) = lookup("APPGW_PROBE_INTERVAL_SECS") {
            config.probe.interval_secs = parse_number("APPGW_PROBE_INTERVAL_SECS", &val)?;
        }

        if let Some(val) = lookup("APPGW_PROBE_TIMEOUT_SECS") {
            config.probe.timeout_secs = parse_number("APPGW_PROBE_TIMEOUT_SECS", &val)?;
        }

        if let Some(val) = lookup("APPGW_INITIAL_CONFIG") {
            config.initial_config_path = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("APPGW_OUTPUT_CONFIG") {
            config.output_config_path = Some(PathBuf::from(val));
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, val: &str) -> Result<T, ControlError>
where
    T::Err: std::fmt::Display,
{
    val.trim().parse().map_err(|e| {
        ControlError::Config(format!("{} must be a number, got '{}': {}", key, val, e))
    })
}
