//! Kubernetes Event recording
//!
//! A reconciliation pass is synchronous and must never block on the API
//! server, so warnings are first buffered in an [`EventRecorder`] and only
//! published once the pass has produced its configuration.
//!
//! Publishing is fire-and-forget: failures are logged and never propagate.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use std::sync::Mutex;
use tracing::warn;

use crate::appgw::IngressKey;

/// Warning attached to an Ingress during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressEvent {
    pub ingress: IngressKey,
    pub reason: &'static str,
    pub action: &'static str,
    pub note: String,
}

/// Sink for warnings raised while building the gateway configuration
pub trait EventRecorder: Send + Sync {
    fn warning(
        &self,
        ingress: &IngressKey,
        reason: &'static str,
        action: &'static str,
        note: String,
    );
}

/// In-memory buffer of the events raised during one pass
#[derive(Debug, Default)]
pub struct PendingEvents {
    events: Mutex<Vec<IngressEvent>>,
}

impl PendingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<IngressEvent> {
        self.lock().clone()
    }

    /// Take everything recorded so far, leaving the buffer empty
    pub fn drain(&self) -> Vec<IngressEvent> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Events with the given reason
    pub fn with_reason(&self, reason: &str) -> Vec<IngressEvent> {
        self.lock()
            .iter()
            .filter(|e| e.reason == reason)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<IngressEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| {
            warn!("Event buffer mutex poisoned, recovering (data is still valid)");
            poisoned.into_inner()
        })
    }
}

impl EventRecorder for PendingEvents {
    fn warning(
        &self,
        ingress: &IngressKey,
        reason: &'static str,
        action: &'static str,
        note: String,
    ) {
        self.lock().push(IngressEvent {
            ingress: ingress.clone(),
            reason,
            action,
            note,
        });
    }
}

/// Publishes Kubernetes Events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// Publisher backed by `kube::runtime::events::Recorder`
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// The controller name is the reporting component of every Event.
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: None,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(
                reason,
                action,
                error = %e,
                "Failed to publish Kubernetes event"
            );
        }
    }
}

/// Publisher that drops everything
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        _type_: EventType,
        _reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
    }
}

/// Publish buffered warnings, one Event per entry
pub async fn publish_all(publisher: &dyn EventPublisher, events: Vec<IngressEvent>) {
    for event in events {
        publisher
            .publish(
                &event.ingress.object_reference(),
                EventType::Warning,
                event.reason,
                event.action,
                Some(event.note),
            )
            .await;
    }
}

/// Event reasons (REASON column of `kubectl get events`)
pub mod reasons {
    /// Endpoints of a referenced Service could not be found
    pub const ENDPOINTS_EMPTY: &str = "EndpointsEmpty";
    /// No endpoint subset exposes the backend's target port
    pub const TARGET_PORT_MISMATCH: &str = "TargetPortMismatch";
    /// A referenced Service does not exist
    pub const SERVICE_NOT_FOUND: &str = "ServiceNotFound";
    /// The backend's service port or named target port could not be resolved
    pub const PORT_RESOLUTION_ERROR: &str = "PortResolutionError";
}

/// Event actions (ACTION column of `kubectl get events`)
pub mod actions {
    /// Resolving an Ingress backend to a Service port
    pub const RESOLVE_BACKEND: &str = "ResolveBackend";
    /// Building a backend address pool
    pub const BUILD_POOL: &str = "BuildBackendPool";
}
