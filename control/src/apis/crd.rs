//! Declared target Custom Resource Definitions
//!
//! `AzureIngressProhibitedTarget` marks a (host, port, paths) the controller
//! must never touch; `AzureIngressManagedTarget` limits the controller to the
//! listed targets. Both share one spec shape.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::brownfield::TargetSpec;

/// Target the controller must leave alone
#[derive(
    CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq,
)]
#[kube(
    group = "appgw.ingress.k8s.io",
    version = "v1",
    kind = "AzureIngressProhibitedTarget",
    plural = "azureingressprohibitedtargets",
    namespaced,
    printcolumn = r#"{"name":"Hostname","type":"string","jsonPath":".spec.hostname"}"#,
    printcolumn = r#"{"name":"Port","type":"integer","jsonPath":".spec.port"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AzureIngressProhibitedTargetSpec {
    /// Frontend IP; carried for existing objects, not used for matching
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,

    /// Host name; empty means the listener without a host
    #[serde(default)]
    pub hostname: String,

    /// Frontend port (80 or 443)
    #[serde(default = "default_port")]
    pub port: i32,

    /// URL paths; empty means every path on `hostname:port`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

/// Target the controller is allowed to manage
#[derive(
    CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq,
)]
#[kube(
    group = "appgw.ingress.k8s.io",
    version = "v1",
    kind = "AzureIngressManagedTarget",
    plural = "azureingressmanagedtargets",
    namespaced,
    printcolumn = r#"{"name":"Hostname","type":"string","jsonPath":".spec.hostname"}"#,
    printcolumn = r#"{"name":"Port","type":"integer","jsonPath":".spec.port"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AzureIngressManagedTargetSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,

    #[serde(default)]
    pub hostname: String,

    #[serde(default = "default_port")]
    pub port: i32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

fn default_port() -> i32 {
    common::HTTP_PORT
}

impl From<&AzureIngressProhibitedTargetSpec> for TargetSpec {
    fn from(spec: &AzureIngressProhibitedTargetSpec) -> Self {
        TargetSpec::new(spec.hostname.clone(), spec.port).with_paths(spec.paths.iter().cloned())
    }
}

impl From<&AzureIngressManagedTargetSpec> for TargetSpec {
    fn from(spec: &AzureIngressManagedTargetSpec) -> Self {
        TargetSpec::new(spec.hostname.clone(), spec.port).with_paths(spec.paths.iter().cloned())
    }
}

/// Declared specs of every prohibited target object
pub fn prohibited_specs<'a, I>(objects: I) -> Vec<TargetSpec>
where
    I: IntoIterator<Item = &'a AzureIngressProhibitedTarget>,
{
    objects.into_iter().map(|o| TargetSpec::from(&o.spec)).collect()
}

/// Declared specs of every managed target object
pub fn managed_specs<'a, I>(objects: I) -> Vec<TargetSpec>
where
    I: IntoIterator<Item = &'a AzureIngressManagedTarget>,
{
    objects.into_iter().map(|o| TargetSpec::from(&o.spec)).collect()
}
