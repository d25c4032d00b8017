//! Per-backend failures: warning events plus fallback to the defaults

use crate::appgw::framework::fixtures::{
    endpoints, ingress, service, service_with_named_target, subset,
};
use crate::appgw::framework::{Harness, DEFAULT_POOL, DEFAULT_PROBE, DEFAULT_SETTINGS};
use control::apis::events::reasons;
use control::appgw::{rule_default_pool, IngressKey, ReconcileContext};

fn single_backend_context() -> ReconcileContext {
    ReconcileContext::new(
        vec![ingress("web", "foo.baz", &[("/", "web", 80)])],
        vec![service("web", &[(80, 8080)])],
        vec![],
    )
}

#[test]
fn test_no_subset_with_target_port_falls_back_to_default_pool() {
    let harness = Harness::new().with_endpoints(vec![endpoints(
        "web",
        vec![
            subset(&[("10.0.0.1", None)], &[(None, 9090)]),
            subset(&[("10.0.0.2", None)], &[(None, 9091)]),
        ],
    )]);

    let result = harness.run(&single_backend_context());

    let mismatches = result.events_with_reason(reasons::TARGET_PORT_MISMATCH);
    assert_eq!(mismatches.len(), 1, "One event per backend, not per subset");
    assert_eq!(mismatches[0].ingress, IngressKey::new("default", "web"));
    assert_eq!(result.pool_names(), vec![DEFAULT_POOL]);
    assert!(
        result
            .pool(DEFAULT_POOL)
            .expect("Default pool is always present")
            .addresses
            .is_empty(),
        "Default pool carries no addresses"
    );

    let path_rule = &result.config.url_path_maps[0].path_rules[0];
    assert_eq!(
        path_rule.backend_address_pool.as_ref().map(|p| p.name()),
        Some(DEFAULT_POOL),
        "Unresolved backend routes to the default pool"
    );
    assert_eq!(
        rule_default_pool(&result.config.request_routing_rules[0], &result.config.url_path_maps)
            .map(|p| p.name()),
        Some(DEFAULT_POOL)
    );
}

#[test]
fn test_missing_endpoints_recorded_as_endpoints_empty() {
    let result = Harness::new().run(&single_backend_context());

    assert_eq!(result.events.len(), 1);
    assert_eq!(result.events[0].reason, reasons::ENDPOINTS_EMPTY);
    assert!(result.events[0].note.contains("default/web"));
    assert_eq!(result.pool_names(), vec![DEFAULT_POOL]);
}

#[test]
fn test_missing_service_leaves_only_defaults() {
    let ctx = ReconcileContext::new(
        vec![ingress("web", "foo.baz", &[("/", "ghost", 80)])],
        vec![],
        vec![],
    );

    let result = Harness::new().run(&ctx);

    assert_eq!(result.events_with_reason(reasons::SERVICE_NOT_FOUND).len(), 1);
    assert_eq!(result.pool_names(), vec![DEFAULT_POOL]);
    assert_eq!(result.probe_names(), vec![DEFAULT_PROBE]);
    assert_eq!(result.settings_names(), vec![DEFAULT_SETTINGS]);
}

#[test]
fn test_unknown_service_port_is_port_resolution_error() {
    let ctx = ReconcileContext::new(
        vec![ingress("web", "foo.baz", &[("/", "web", 8443)])],
        vec![service("web", &[(80, 8080)])],
        vec![],
    );

    let result = Harness::new().run(&ctx);

    assert_eq!(
        result.events_with_reason(reasons::PORT_RESOLUTION_ERROR).len(),
        1
    );
    assert_eq!(result.pool_names(), vec![DEFAULT_POOL]);
}

#[test]
fn test_named_target_port_without_endpoints_is_endpoints_empty() {
    let ctx = ReconcileContext::new(
        vec![ingress("web", "foo.baz", &[("/", "web", 80)])],
        vec![service_with_named_target("web", 80, "http")],
        vec![],
    );

    let result = Harness::new().run(&ctx);

    let reasons_seen: Vec<&str> = result.events.iter().map(|e| e.reason).collect();
    assert_eq!(reasons_seen, vec![reasons::ENDPOINTS_EMPTY]);
    assert_eq!(result.pool_names(), vec![DEFAULT_POOL]);
}
