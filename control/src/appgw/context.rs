//! Reconciliation context
//!
//! Read-only snapshot of the cluster state one pass works from.

use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;
use std::collections::BTreeMap;

use super::backends::{IngressKey, ServiceKey};
use crate::brownfield::{Classifier, TargetSpec};

/// Legacy annotation selecting the ingress class
pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

/// Cluster state plus declared managed/prohibited targets
#[derive(Debug, Clone, Default)]
pub struct ReconcileContext {
    /// Sorted by namespace/name
    pub ingresses: Vec<Ingress>,
    pub services: BTreeMap<ServiceKey, Service>,
    pub pods: Vec<Pod>,
    pub prohibited_targets: Vec<TargetSpec>,
    pub managed_targets: Vec<TargetSpec>,
}

impl ReconcileContext {
    pub fn new(
        ingresses: impl IntoIterator<Item = Ingress>,
        services: impl IntoIterator<Item = Service>,
        pods: impl IntoIterator<Item = Pod>,
    ) -> Self {
        let mut ingresses: Vec<Ingress> = ingresses.into_iter().collect();
        ingresses.sort_by_key(IngressKey::from_ingress);

        Self {
            ingresses,
            services: services
                .into_iter()
                .map(|s| (ServiceKey::from_service(&s), s))
                .collect(),
            pods: pods.into_iter().collect(),
            prohibited_targets: Vec::new(),
            managed_targets: Vec::new(),
        }
    }

    pub fn with_prohibited_targets(mut self, targets: Vec<TargetSpec>) -> Self {
        self.prohibited_targets = targets;
        self
    }

    pub fn with_managed_targets(mut self, targets: Vec<TargetSpec>) -> Self {
        self.managed_targets = targets;
        self
    }

    /// Drop Ingresses that belong to another ingress class
    pub fn with_ingress_class(mut self, class: &str) -> Self {
        self.ingresses.retain(|ingress| is_ingress_class(ingress, class));
        self
    }

    pub fn service(&self, key: &ServiceKey) -> Option<&Service> {
        self.services.get(key)
    }

    /// Pods in the Service's namespace matched by its selector
    ///
    /// A Service without a selector selects nothing.
    pub fn pods_for_service<'a>(
        &'a self,
        service: &'a Service,
    ) -> impl Iterator<Item = &'a Pod> + 'a {
        let namespace = service.namespace();
        let selector = service
            .spec
            .as_ref()
            .and_then(|spec| spec.selector.as_ref())
            .filter(|selector| !selector.is_empty());

        self.pods.iter().filter(move |pod| {
            let Some(selector) = selector else {
                return false;
            };
            if pod.namespace() != namespace {
                return false;
            }
            let labels = pod.labels();
            selector
                .iter()
                .all(|(key, value)| labels.get(key) == Some(value))
        })
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::from_specs(&self.prohibited_targets, &self.managed_targets)
    }
}

/// Whether an Ingress is owned by the given class
///
/// `spec.ingressClassName` wins over the legacy annotation.
pub fn is_ingress_class(ingress: &Ingress, class: &str) -> bool {
    if let Some(name) = ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.ingress_class_name.as_deref())
    {
        return name == class;
    }
    ingress
        .annotations()
        .get(INGRESS_CLASS_ANNOTATION)
        .is_some_and(|value| value == class)
}
