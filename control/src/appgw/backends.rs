//! Backend identity and resolution
//!
//! Every Ingress path (and the Ingress default backend) that points at a
//! Service becomes a [`BackendId`]. Resolution looks the Service up and turns
//! the declared service port into the numeric port the pods listen on.

use k8s_openapi::api::core::v1::{ObjectReference, Service, ServicePort};
use k8s_openapi::api::networking::v1::{Ingress, IngressBackend};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use super::context::ReconcileContext;
use crate::apis::endpoints::{named_port, EndpointsLookup};
use crate::apis::events::{actions, reasons, EventRecorder};

/// Namespace/name of a Service (also the key of its Endpoints)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceKey {
    pub namespace: String,
    pub name: String,
}

impl ServiceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn from_service(service: &Service) -> Self {
        Self::new(
            service.namespace().unwrap_or_else(|| "default".to_string()),
            service.name_any(),
        )
    }

    /// `namespace-name`, the service part of generated resource names
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.namespace, self.name)
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Namespace/name of an Ingress
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IngressKey {
    pub namespace: String,
    pub name: String,
}

impl IngressKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn from_ingress(ingress: &Ingress) -> Self {
        Self::new(
            ingress.namespace().unwrap_or_else(|| "default".to_string()),
            ingress.name_any(),
        )
    }

    /// Reference Events are attached to
    pub fn object_reference(&self) -> ObjectReference {
        ObjectReference {
            api_version: Some("networking.k8s.io/v1".to_string()),
            kind: Some("Ingress".to_string()),
            namespace: Some(self.namespace.clone()),
            name: Some(self.name.clone()),
            ..Default::default()
        }
    }
}

impl fmt::Display for IngressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Service port as written in the Ingress backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServicePortSpec {
    Number(i32),
    Name(String),
}

impl ServicePortSpec {
    fn matches(&self, port: &ServicePort) -> bool {
        match self {
            ServicePortSpec::Number(number) => port.port == *number,
            ServicePortSpec::Name(name) => port.name.as_deref() == Some(name.as_str()),
        }
    }
}

impl fmt::Display for ServicePortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServicePortSpec::Number(number) => write!(f, "{}", number),
            ServicePortSpec::Name(name) => f.write_str(name),
        }
    }
}

/// One (Ingress, host, path, Service, service port) backend reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId {
    pub ingress: IngressKey,
    /// Rule host, empty for the default backend or a host-less rule
    pub host: String,
    /// Ingress path, `None` for the default backend or a path-less entry
    pub path: Option<String>,
    pub service: ServiceKey,
    pub port: ServicePortSpec,
}

impl BackendId {
    pub fn service_full_name(&self) -> String {
        self.service.full_name()
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}:{} ({}{})",
            self.ingress,
            self.service,
            self.port,
            self.host,
            self.path.as_deref().unwrap_or("")
        )
    }
}

/// A backend reference as it appears in an Ingress, before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRef {
    pub id: BackendId,
    /// Host is listed in the Ingress TLS section
    pub https: bool,
}

/// A backend whose Service port and target port are known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBackend {
    pub id: BackendId,
    pub service_port: i32,
    /// Port the pods actually listen on
    pub target_port: i32,
}

/// All Service backends referenced by an Ingress, in declaration order
///
/// Rule paths come first, the Ingress default backend last.
pub fn backend_refs(ingress: &Ingress) -> Vec<BackendRef> {
    let key = IngressKey::from_ingress(ingress);
    let Some(spec) = &ingress.spec else {
        return Vec::new();
    };

    let tls_hosts: Vec<&str> = spec
        .tls
        .iter()
        .flatten()
        .flat_map(|tls| tls.hosts.iter().flatten())
        .map(String::as_str)
        .collect();

    let mut refs = Vec::new();

    for rule in spec.rules.iter().flatten() {
        let host = rule.host.clone().unwrap_or_default();
        let https = !host.is_empty() && tls_hosts.contains(&host.as_str());
        for path in rule.http.iter().flat_map(|http| http.paths.iter()) {
            if let Some(id) = backend_id(&key, &host, path.path.clone(), &path.backend) {
                refs.push(BackendRef { id, https });
            }
        }
    }

    if let Some(backend) = &spec.default_backend {
        if let Some(id) = backend_id(&key, "", None, backend) {
            refs.push(BackendRef { id, https: false });
        }
    }

    refs
}

fn backend_id(
    ingress: &IngressKey,
    host: &str,
    path: Option<String>,
    backend: &IngressBackend,
) -> Option<BackendId> {
    let Some(service) = &backend.service else {
        debug!(ingress = %ingress, "Skipping non-Service backend");
        return None;
    };

    let port = match &service.port {
        Some(port) => match (port.number, &port.name) {
            (Some(number), _) => ServicePortSpec::Number(number),
            (None, Some(name)) => ServicePortSpec::Name(name.clone()),
            (None, None) => {
                warn!(
                    ingress = %ingress,
                    service = %service.name,
                    "Backend has an empty port, skipping"
                );
                return None;
            }
        },
        None => {
            warn!(ingress = %ingress, service = %service.name, "Backend has no port, skipping");
            return None;
        }
    };

    Some(BackendId {
        ingress: ingress.clone(),
        host: host.to_string(),
        path: path.filter(|p| !p.is_empty()),
        service: ServiceKey::new(ingress.namespace.clone(), service.name.clone()),
        port,
    })
}

/// Resolve every backend referenced by the context's Ingresses
///
/// Unresolvable backends are left out after recording a warning on their
/// Ingress; the routing rule that references them falls back to the default
/// resources.
pub fn resolve_backends(
    ctx: &ReconcileContext,
    lookup: &dyn EndpointsLookup,
    recorder: &dyn EventRecorder,
) -> BTreeMap<BackendId, ResolvedBackend> {
    let mut resolved = BTreeMap::new();

    for ingress in &ctx.ingresses {
        for backend in backend_refs(ingress) {
            if resolved.contains_key(&backend.id) {
                continue;
            }
            if let Some(r) = resolve(ctx, lookup, recorder, backend.id) {
                resolved.insert(r.id.clone(), r);
            }
        }
    }

    resolved
}

fn resolve(
    ctx: &ReconcileContext,
    lookup: &dyn EndpointsLookup,
    recorder: &dyn EventRecorder,
    id: BackendId,
) -> Option<ResolvedBackend> {
    let Some(service) = ctx.service(&id.service) else {
        let note = format!("Unable to get the service {}", id.service);
        warn!(backend = %id, "{}", note);
        recorder.warning(
            &id.ingress,
            reasons::SERVICE_NOT_FOUND,
            actions::RESOLVE_BACKEND,
            note,
        );
        return None;
    };

    let service_port = service
        .spec
        .iter()
        .flat_map(|spec| spec.ports.iter().flatten())
        .find(|p| id.port.matches(p));
    let Some(service_port) = service_port else {
        let note = format!("Service {} has no port {}", id.service, id.port);
        warn!(backend = %id, "{}", note);
        recorder.warning(
            &id.ingress,
            reasons::PORT_RESOLUTION_ERROR,
            actions::RESOLVE_BACKEND,
            note,
        );
        return None;
    };

    let target_port = match &service_port.target_port {
        None => service_port.port,
        Some(IntOrString::Int(port)) => *port,
        Some(IntOrString::String(name)) => {
            let endpoints = match lookup.endpoints(&id.service) {
                Ok(endpoints) => endpoints,
                Err(e) => {
                    let note = format!("Failed fetching endpoints for service: {}", id.service);
                    warn!(backend = %id, error = %e, "{}", note);
                    recorder.warning(
                        &id.ingress,
                        reasons::ENDPOINTS_EMPTY,
                        actions::BUILD_POOL,
                        note,
                    );
                    return None;
                }
            };
            match named_port(&endpoints, name) {
                Some(port) => port,
                None => {
                    let note = format!(
                        "Unable to resolve target port {} of service {}",
                        name, id.service
                    );
                    warn!(backend = %id, "{}", note);
                    recorder.warning(
                        &id.ingress,
                        reasons::PORT_RESOLUTION_ERROR,
                        actions::RESOLVE_BACKEND,
                        note,
                    );
                    return None;
                }
            }
        }
    };

    debug!(backend = %id, service_port = service_port.port, target_port, "Resolved backend");

    Some(ResolvedBackend {
        service_port: service_port.port,
        target_port,
        id,
    })
}
