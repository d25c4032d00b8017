//! Backend address pool synthesis through a full pass

use crate::appgw::framework::fixtures::{
    endpoints, ingress, service, service_with_named_target, subset,
};
use crate::appgw::framework::{Harness, DEFAULT_POOL};
use common::BackendAddress;
use control::appgw::{rule_default_pool, ReconcileContext};

const WEB_POOL: &str = "k8s-ag-ingress-pool-default-web-80-bp-8080";

fn web_context() -> ReconcileContext {
    ReconcileContext::new(
        vec![
            ingress("first", "foo.baz", &[("/", "web", 80)]),
            ingress("second", "bar.baz", &[("/api", "web", 80)]),
        ],
        vec![service("web", &[(80, 8080)])],
        vec![],
    )
}

#[test]
fn test_shared_service_yields_one_sorted_deduplicated_pool() {
    let harness = Harness::new().with_endpoints(vec![endpoints(
        "web",
        vec![subset(
            &[
                ("10.0.0.3", None),
                ("", Some("pod-b.web")),
                ("10.0.0.1", None),
                ("10.0.0.3", None),
                ("", Some("pod-a.web")),
            ],
            &[(None, 8080)],
        )],
    )]);

    let result = harness.run(&web_context());

    assert_eq!(result.pool_names(), vec![DEFAULT_POOL, WEB_POOL]);
    let pool = result.pool(WEB_POOL).expect("Service pool should exist");
    assert_eq!(
        pool.addresses,
        vec![
            BackendAddress::ip("10.0.0.1"),
            BackendAddress::ip("10.0.0.3"),
            BackendAddress::fqdn("pod-a.web"),
            BackendAddress::fqdn("pod-b.web"),
        ],
        "IPs first, then FQDNs, each sorted and unique"
    );
    assert!(result.events.is_empty(), "Healthy backends raise no events");
}

#[test]
fn test_repeated_passes_are_identical() {
    let harness = Harness::new().with_endpoints(vec![endpoints(
        "web",
        vec![subset(&[("10.0.0.2", None), ("10.0.0.1", None)], &[(None, 8080)])],
    )]);
    let ctx = web_context();

    let first = harness.run(&ctx);
    let second = Harness {
        existing: first.config.clone(),
        ..harness
    }
    .run(&ctx);

    assert_eq!(first.config, second.config, "Same inputs must yield the same config");
}

#[test]
fn test_named_target_port_resolved_through_endpoints() {
    let harness = Harness::new().with_endpoints(vec![endpoints(
        "web",
        vec![subset(&[("10.0.0.1", None)], &[(Some("http"), 8080)])],
    )]);
    let ctx = ReconcileContext::new(
        vec![ingress("web", "foo.baz", &[("/", "web", 80)])],
        vec![service_with_named_target("web", 80, "http")],
        vec![],
    );

    let result = harness.run(&ctx);

    assert!(
        result.pool(WEB_POOL).is_some(),
        "Named target port should resolve to 8080: {:?}",
        result.pool_names()
    );
}

#[test]
fn test_rules_reference_the_synthesized_pool() {
    let harness = Harness::new().with_endpoints(vec![endpoints(
        "web",
        vec![subset(&[("10.0.0.1", None)], &[(None, 8080)])],
    )]);

    let result = harness.run(&web_context());

    let path_rule_pools: Vec<&str> = result
        .config
        .url_path_maps
        .iter()
        .flat_map(|m| m.path_rules.iter())
        .filter_map(|r| r.backend_address_pool.as_ref())
        .map(|p| p.name())
        .collect();
    assert_eq!(path_rule_pools, vec![WEB_POOL, WEB_POOL]);
    for rule in &result.config.request_routing_rules {
        assert_eq!(
            rule_default_pool(rule, &result.config.url_path_maps).map(|p| p.name()),
            Some(DEFAULT_POOL),
            "Listeners without a path-less backend default to the default pool"
        );
    }
}
