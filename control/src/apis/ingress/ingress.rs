//! Ingress reconciler
//!
//! Every trigger (an Ingress change, a change of an Endpoints or Service an
//! Ingress references, a declared target change, or the periodic resync) runs
//! one full gateway configuration pass over the reflector caches.
//!
//! Passes never overlap. Triggers that queue up behind a running pass are
//! coalesced into the next one.

use futures::StreamExt;
use k8s_openapi::api::core::v1::{Endpoints, Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::Api;
use kube::runtime::controller::{self, Action, Controller};
use kube::runtime::reflector::{self, ObjectRef, Store};
use kube::runtime::watcher::{self, Config as WatcherConfig};
use kube::runtime::WatchStreamExt;
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::apis::crd::{
    managed_specs, prohibited_specs, AzureIngressManagedTarget, AzureIngressProhibitedTarget,
};
use crate::apis::events::{publish_all, EventPublisher, KubeEventPublisher, PendingEvents};
use crate::apis::metrics::{record_build_stats, record_event, record_reconciliation};
use crate::appgw::{
    backend_refs, write_snapshot, BuilderSettings, ConfigBuilder, GatewayState, IngressKey,
    ReconcileContext, ServiceKey,
};
use crate::config::ControllerConfig;
use crate::error::ControlError;

/// Quiet period before an Ingress trigger starts a pass
const DEBOUNCE: Duration = Duration::from_secs(1);

/// Retry delay after a failed pass
const ERROR_REQUEUE: Duration = Duration::from_secs(60);

/// Reflector caches one pass reads from
#[derive(Clone)]
pub struct Caches {
    pub ingresses: Store<Ingress>,
    pub services: Store<Service>,
    pub pods: Store<Pod>,
    pub endpoints: Store<Endpoints>,
    pub prohibited: Store<AzureIngressProhibitedTarget>,
    pub managed: Store<AzureIngressManagedTarget>,
}

impl Caches {
    /// Snapshot of the caches, restricted to Ingresses of `ingress_class`
    pub fn context(&self, ingress_class: &str) -> ReconcileContext {
        let prohibited = self.prohibited.state();
        let managed = self.managed.state();

        ReconcileContext::new(
            self.ingresses.state().iter().map(|i| i.as_ref().clone()),
            self.services.state().iter().map(|s| s.as_ref().clone()),
            self.pods.state().iter().map(|p| p.as_ref().clone()),
        )
        .with_ingress_class(ingress_class)
        .with_prohibited_targets(prohibited_specs(prohibited.iter().map(AsRef::as_ref)))
        .with_managed_targets(managed_specs(managed.iter().map(AsRef::as_ref)))
    }

    /// Wait for every cache except the Ingress one, which the controller fills
    async fn wait_until_ready(&self) -> Result<(), ControlError> {
        let sync_error = |kind: &str, e: reflector::store::WriterDropped| {
            ControlError::CacheSync(format!("{} cache: {}", kind, e))
        };
        self.services
            .wait_until_ready()
            .await
            .map_err(|e| sync_error("Service", e))?;
        self.pods
            .wait_until_ready()
            .await
            .map_err(|e| sync_error("Pod", e))?;
        self.endpoints
            .wait_until_ready()
            .await
            .map_err(|e| sync_error("Endpoints", e))?;
        self.prohibited
            .wait_until_ready()
            .await
            .map_err(|e| sync_error("AzureIngressProhibitedTarget", e))?;
        self.managed
            .wait_until_ready()
            .await
            .map_err(|e| sync_error("AzureIngressManagedTarget", e))?;
        Ok(())
    }
}

/// Result of one trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The configuration changed and was stored
    Changed,
    /// The pass produced the stored configuration again
    Unchanged,
    /// A pass that started after this trigger already covered it
    Coalesced,
}

/// Ingress reconciler
pub struct IngressReconciler {
    config: ControllerConfig,
    settings: BuilderSettings,
    state: GatewayState,
    caches: Caches,
    publisher: Arc<dyn EventPublisher>,
    /// Trigger tickets handed out so far
    requested: AtomicU64,
    /// Highest ticket a started pass has covered; held for the whole pass
    served: Mutex<u64>,
}

impl IngressReconciler {
    pub fn new(
        config: ControllerConfig,
        state: GatewayState,
        caches: Caches,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            settings: BuilderSettings::from_config(&config),
            config,
            state,
            caches,
            publisher,
            requested: AtomicU64::new(0),
            served: Mutex::new(0),
        }
    }

    /// Run one gateway configuration pass, unless a newer one covers it
    pub async fn run_pass(&self) -> Result<PassOutcome, ControlError> {
        let ticket = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        let mut served = self.served.lock().await;
        if *served >= ticket {
            debug!(ticket, served = *served, "Pass coalesced into a newer one");
            return Ok(PassOutcome::Coalesced);
        }
        *served = self.requested.load(Ordering::SeqCst);

        let start = Instant::now();
        let result = self.pass().await;
        let elapsed = start.elapsed().as_secs_f64();
        let label = if result.is_ok() { "success" } else { "error" };
        record_reconciliation(elapsed, label);

        result
    }

    async fn pass(&self) -> Result<PassOutcome, ControlError> {
        let ctx = self.caches.context(&self.config.ingress_class);
        let events = PendingEvents::new();

        let previous = self.state.snapshot();
        let (config, stats) = ConfigBuilder::new(
            &self.settings,
            previous.clone(),
            &self.caches.endpoints,
            &events,
        )
        .build_with_stats(&ctx);
        record_build_stats(&stats);

        let pending = events.drain();
        for event in &pending {
            record_event(event.reason);
        }
        publish_all(self.publisher.as_ref(), pending).await;

        if config == previous {
            debug!("Gateway configuration unchanged");
            return Ok(PassOutcome::Unchanged);
        }

        // State only ever holds a configuration that reached the output.
        if let Some(path) = &self.config.output_config_path {
            write_snapshot(path, &config)?;
            info!(path = %path.display(), "Wrote gateway configuration");
        }
        self.state.replace(config.clone());
        info!(
            pools = config.backend_address_pools.len(),
            probes = config.probes.len(),
            rules = config.request_routing_rules.len(),
            "Gateway configuration updated"
        );
        Ok(PassOutcome::Changed)
    }

    /// Reconcile a single Ingress
    ///
    /// The pass covers every Ingress; the triggering one only names the cause.
    async fn reconcile(ingress: Arc<Ingress>, ctx: Arc<Self>) -> Result<Action, ControlError> {
        let key = IngressKey::from_ingress(&ingress);
        debug!(ingress = %key, "Ingress triggered a pass");
        ctx.run_pass().await?;
        Ok(Action::requeue(ctx.resync_period()))
    }

    fn error_policy(_obj: Arc<Ingress>, error: &ControlError, _ctx: Arc<Self>) -> Action {
        error!("Gateway configuration pass failed: {}", error);
        Action::requeue(ERROR_REQUEUE)
    }

    fn resync_period(&self) -> Duration {
        Duration::from_secs(self.config.resync_secs.max(1))
    }

    /// Periodic pass, also covering the case where no Ingress is left
    async fn resync(self: Arc<Self>) {
        if let Err(e) = self.caches.ingresses.wait_until_ready().await {
            warn!("Ingress cache never became ready, resync disabled: {}", e);
            return;
        }
        let period = self.resync_period();
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            debug!("Periodic resync");
            if let Err(e) = self.run_pass().await {
                error!("Resync pass failed: {}", e);
            }
        }
    }

    /// Start the Ingress controller
    pub async fn run(
        client: Client,
        config: ControllerConfig,
        state: GatewayState,
    ) -> Result<(), ControlError> {
        let ingress_api: Api<Ingress> = Api::all(client.clone());
        let controller = Controller::new(ingress_api, WatcherConfig::default())
            .with_config(controller::Config::default().debounce(DEBOUNCE));

        let caches = Caches {
            ingresses: controller.store(),
            services: spawn_reflector(Api::all(client.clone())),
            pods: spawn_reflector(Api::all(client.clone())),
            endpoints: spawn_reflector(Api::all(client.clone())),
            prohibited: spawn_reflector(Api::all(client.clone())),
            managed: spawn_reflector(Api::all(client.clone())),
        };

        info!("Waiting for caches to sync");
        caches.wait_until_ready().await?;

        let publisher = Arc::new(KubeEventPublisher::new(
            client.clone(),
            &config.controller_name,
        ));
        info!(
            ingress_class = %config.ingress_class,
            resync_secs = config.resync_secs,
            "Starting Ingress controller"
        );
        let reconciler = Arc::new(Self::new(config, state, caches, publisher));
        tokio::spawn(reconciler.clone().resync());

        let by_endpoints = reconciler.caches.ingresses.clone();
        let by_service = reconciler.caches.ingresses.clone();
        let by_prohibited = reconciler.caches.ingresses.clone();
        let by_managed = reconciler.caches.ingresses.clone();

        controller
            .watches(
                Api::<Endpoints>::all(client.clone()),
                WatcherConfig::default(),
                move |endpoints| ingresses_for_service(&by_endpoints, &service_key_of(&endpoints)),
            )
            .watches(
                Api::<Service>::all(client.clone()),
                WatcherConfig::default(),
                move |service| {
                    ingresses_for_service(&by_service, &ServiceKey::from_service(&service))
                },
            )
            .watches(
                Api::<AzureIngressProhibitedTarget>::all(client.clone()),
                WatcherConfig::default(),
                move |_| all_ingresses(&by_prohibited),
            )
            .watches(
                Api::<AzureIngressManagedTarget>::all(client),
                WatcherConfig::default(),
                move |_| all_ingresses(&by_managed),
            )
            .run(Self::reconcile, Self::error_policy, reconciler)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled Ingress: {:?}", o),
                    Err(e) => error!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

/// Reflector over every object of `api`, fed by a background task
fn spawn_reflector<K>(api: Api<K>) -> Store<K>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Default + Eq + Hash + Clone + Send + Sync,
{
    let (reader, writer) = reflector::store::<K>();
    let stream = reflector::reflector(
        writer,
        watcher::watcher(api, WatcherConfig::default()).default_backoff(),
    );
    tokio::spawn(stream.for_each(|event| async move {
        if let Err(e) = event {
            warn!("Watch stream error: {}", e);
        }
    }));
    reader
}

fn service_key_of(endpoints: &Endpoints) -> ServiceKey {
    ServiceKey::new(endpoints.namespace().unwrap_or_default(), endpoints.name_any())
}

/// Ingresses with a backend on `service`
pub fn ingresses_for_service(
    store: &Store<Ingress>,
    service: &ServiceKey,
) -> Vec<ObjectRef<Ingress>> {
    store
        .state()
        .iter()
        .filter(|ingress| {
            backend_refs(ingress)
                .iter()
                .any(|backend| &backend.id.service == service)
        })
        .map(|ingress| ObjectRef::from_obj(ingress.as_ref()))
        .collect()
}

fn all_ingresses(store: &Store<Ingress>) -> Vec<ObjectRef<Ingress>> {
    store
        .state()
        .iter()
        .map(|ingress| ObjectRef::from_obj(ingress.as_ref()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::apis::crd::AzureIngressProhibitedTargetSpec;
    use crate::apis::events::NoopEventPublisher;
    use common::GatewayConfig;
    use k8s_openapi::api::networking::v1::{
        HTTPIngressPath, HTTPIngressRuleValue, IngressBackend, IngressRule, IngressServiceBackend,
        IngressSpec, ServiceBackendPort,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn store_of<K>(objects: Vec<K>) -> Store<K>
    where
        K: Resource + Clone + Debug + Send + Sync + 'static,
        K::DynamicType: Default + Eq + Hash + Clone,
    {
        let (reader, mut writer) = reflector::store::<K>();
        for object in objects {
            writer.apply_watcher_event(&watcher::Event::Apply(object));
        }
        reader
    }

    fn ingress(name: &str, class: &str, service: &str) -> Ingress {
        Ingress {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec: Some(IngressSpec {
                ingress_class_name: Some(class.to_string()),
                rules: Some(vec![IngressRule {
                    host: Some("foo.baz".to_string()),
                    http: Some(HTTPIngressRuleValue {
                        paths: vec![HTTPIngressPath {
                            path: Some("/".to_string()),
                            path_type: "Prefix".to_string(),
                            backend: IngressBackend {
                                service: Some(IngressServiceBackend {
                                    name: service.to_string(),
                                    port: Some(ServiceBackendPort {
                                        number: Some(80),
                                        name: None,
                                    }),
                                }),
                                ..Default::default()
                            },
                        }],
                    }),
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn caches(ingresses: Vec<Ingress>, prohibited: Vec<AzureIngressProhibitedTarget>) -> Caches {
        Caches {
            ingresses: store_of(ingresses),
            services: store_of(vec![]),
            pods: store_of(vec![]),
            endpoints: store_of(vec![]),
            prohibited: store_of(prohibited),
            managed: store_of(vec![]),
        }
    }

    fn reconciler(caches: Caches) -> IngressReconciler {
        IngressReconciler::new(
            ControllerConfig::default(),
            GatewayState::default(),
            caches,
            Arc::new(NoopEventPublisher),
        )
    }

    #[test]
    fn test_context_filters_ingress_class_and_reads_targets() {
        let prohibited = AzureIngressProhibitedTarget::new(
            "legacy",
            AzureIngressProhibitedTargetSpec {
                hostname: "www.prohibited.com".to_string(),
                port: 80,
                ..Default::default()
            },
        );
        let caches = caches(
            vec![
                ingress("ours", "azure/application-gateway", "web"),
                ingress("theirs", "nginx", "web"),
            ],
            vec![prohibited],
        );

        let ctx = caches.context("azure/application-gateway");

        assert_eq!(ctx.ingresses.len(), 1, "Only our ingress class participates");
        assert_eq!(ctx.ingresses[0].name_any(), "ours");
        assert_eq!(ctx.prohibited_targets.len(), 1);
        assert!(ctx.managed_targets.is_empty());
    }

    #[test]
    fn test_ingresses_for_service() {
        let store = store_of(vec![
            ingress("a", "azure/application-gateway", "web"),
            ingress("b", "azure/application-gateway", "api"),
        ]);

        let refs = ingresses_for_service(&store, &ServiceKey::new("default", "api"));

        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "b");
        assert_eq!(all_ingresses(&store).len(), 2);
    }

    #[tokio::test]
    async fn test_pass_changes_then_settles() {
        let reconciler = reconciler(caches(
            vec![ingress("web", "azure/application-gateway", "missing")],
            vec![],
        ));

        let first = reconciler.run_pass().await.expect("Pass should succeed");
        let second = reconciler.run_pass().await.expect("Pass should succeed");

        assert_eq!(first, PassOutcome::Changed);
        assert_eq!(second, PassOutcome::Unchanged, "Same inputs rebuild the same config");
        let config = reconciler.state.snapshot();
        assert_eq!(config.backend_address_pools.len(), 1, "Only the default pool");
        assert_eq!(config.request_routing_rules.len(), 1);
    }

    #[tokio::test]
    async fn test_queued_trigger_is_coalesced() {
        let reconciler = Arc::new(reconciler(caches(vec![], vec![])));

        // Hold the pass lock so both triggers queue up behind it.
        let guard = reconciler.served.lock().await;
        let a = tokio::spawn({
            let r = reconciler.clone();
            async move { r.run_pass().await }
        });
        let b = tokio::spawn({
            let r = reconciler.clone();
            async move { r.run_pass().await }
        });
        while reconciler.requested.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        drop(guard);

        let mut outcomes = vec![
            a.await.expect("Task should join").expect("Pass should succeed"),
            b.await.expect("Task should join").expect("Pass should succeed"),
        ];
        outcomes.sort_by_key(|o| *o == PassOutcome::Coalesced);

        assert_eq!(outcomes, vec![PassOutcome::Changed, PassOutcome::Coalesced]);
    }

    #[tokio::test]
    async fn test_changed_config_written_to_output_path() {
        let path = std::env::temp_dir().join(format!("appgw-output-{}.json", std::process::id()));
        let config = ControllerConfig {
            output_config_path: Some(path.clone()),
            ..Default::default()
        };
        let reconciler = IngressReconciler::new(
            config,
            GatewayState::default(),
            caches(vec![], vec![]),
            Arc::new(NoopEventPublisher),
        );

        reconciler.run_pass().await.expect("Pass should succeed");
        let written = crate::appgw::load_snapshot(&path).expect("Output should be readable");
        let _ = std::fs::remove_file(&path);

        assert_eq!(written, reconciler.state.snapshot());
    }

    #[tokio::test]
    async fn test_failed_output_write_is_retried() {
        let dir = std::env::temp_dir().join(format!("appgw-retry-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("gateway.json");
        let config = ControllerConfig {
            output_config_path: Some(path.clone()),
            ..Default::default()
        };
        let reconciler = IngressReconciler::new(
            config,
            GatewayState::default(),
            caches(vec![], vec![]),
            Arc::new(NoopEventPublisher),
        );

        let first = reconciler.run_pass().await;
        assert!(first.is_err(), "Writing into a missing directory should fail");
        assert_eq!(
            reconciler.state.snapshot(),
            GatewayConfig::default(),
            "A config that was not written must not be stored"
        );

        std::fs::create_dir_all(&dir).expect("Should create output directory");
        let second = reconciler.run_pass().await.expect("Pass should succeed");
        let exists = path.exists();
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(second, PassOutcome::Changed);
        assert!(exists, "Retried pass should write the output file");
    }
}
