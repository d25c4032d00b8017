//! Coexistence with gateway resources the controller does not own

use crate::appgw::framework::fixtures::{endpoints, ingress, service, subset};
use crate::appgw::framework::{Harness, DEFAULT_POOL, DEFAULT_PROBE, GATEWAY_ID};
use common::{
    BackendAddress, BackendAddressPool, BackendHttpSettings, GatewayConfig, HttpListener, Probe,
    ProbeProtocol, Protocol, RequestRoutingRule, ResourceRef, RuleType,
};
use control::appgw::ReconcileContext;
use control::brownfield::TargetSpec;

const HI_POOL: &str = "k8s-ag-ingress-pool-default-web-80-bp-8080";

fn id(collection: &str, name: &str) -> ResourceRef {
    ResourceRef::new(format!("{}/{}/{}", GATEWAY_ID, collection, name))
}

fn manual_probe() -> Probe {
    Probe {
        name: "a-probe-for-a-prohibited-target".to_string(),
        host: "www.prohibited.com".to_string(),
        path: "/".to_string(),
        protocol: ProbeProtocol::Http,
        interval: 20,
        timeout: 10,
        unhealthy_threshold: 3,
        ..Probe::default()
    }
}

fn manual_pool(name: &str) -> BackendAddressPool {
    BackendAddressPool {
        name: name.to_string(),
        addresses: vec![BackendAddress::ip("192.168.1.10")],
    }
}

/// Hand-made listener, rule, pool and settings serving www.prohibited.com:80
fn prohibited_site() -> GatewayConfig {
    GatewayConfig {
        backend_address_pools: vec![manual_pool("prohibited-pool")],
        probes: vec![manual_probe()],
        backend_http_settings_collection: vec![BackendHttpSettings {
            name: "prohibited-settings".to_string(),
            port: 80,
            protocol: Protocol::Http,
            path: None,
            host_name: None,
            probe: Some(id("probes", "a-probe-for-a-prohibited-target")),
            request_timeout: 30,
        }],
        http_listeners: vec![HttpListener {
            name: "prohibited-listener".to_string(),
            host_name: Some("www.prohibited.com".to_string()),
            protocol: Protocol::Http,
            frontend_port: 80,
        }],
        request_routing_rules: vec![RequestRoutingRule {
            name: "prohibited-rule".to_string(),
            rule_type: RuleType::Basic,
            http_listener: id("httpListeners", "prohibited-listener"),
            backend_address_pool: Some(id("backendAddressPools", "prohibited-pool")),
            backend_http_settings: Some(id(
                "backendHttpSettingsCollection",
                "prohibited-settings",
            )),
            url_path_map: None,
        }],
        url_path_maps: vec![],
    }
}

#[test]
fn test_probe_for_prohibited_target_is_preserved() {
    let ctx = ReconcileContext::new(
        vec![ingress(
            "web",
            "foo.baz",
            &[("/hi", "web", 80), ("/bye", "web", 443)],
        )],
        vec![service("web", &[(80, 8080), (443, 8443)])],
        vec![],
    )
    .with_prohibited_targets(vec![TargetSpec::new("www.prohibited.com", 80)]);
    let harness = Harness::new().with_existing(GatewayConfig {
        probes: vec![manual_probe()],
        ..Default::default()
    });

    let result = harness.run(&ctx);

    assert_eq!(
        result.probe_names(),
        vec![
            "a-probe-for-a-prohibited-target",
            "k8s-ag-ingress-defaultprobe",
            "k8s-ag-ingress-pb-default-web-443-web",
            "k8s-ag-ingress-pb-default-web-80-web",
        ]
    );
    assert!(
        result.config.probes.contains(&manual_probe()),
        "Prohibited probe must survive unchanged"
    );
    let hi = result
        .config
        .probes
        .iter()
        .find(|p| p.name == "k8s-ag-ingress-pb-default-web-80-web")
        .expect("Probe for /hi");
    assert_eq!((hi.host.as_str(), hi.path.as_str()), ("foo.baz", "/hi"));
}

#[test]
fn test_prohibited_site_survives_and_stale_pool_is_pruned() {
    let mut existing = prohibited_site();
    existing
        .backend_address_pools
        .push(manual_pool("k8s-ag-ingress-pool-default-old-80-bp-80"));
    let ctx = ReconcileContext::new(
        vec![ingress("web", "foo.baz", &[("/hi", "web", 80)])],
        vec![service("web", &[(80, 8080)])],
        vec![],
    )
    .with_prohibited_targets(vec![TargetSpec::new("www.prohibited.com", 80)]);
    let harness = Harness::new()
        .with_existing(existing.clone())
        .with_endpoints(vec![endpoints(
            "web",
            vec![subset(&[("10.0.0.1", None)], &[(None, 8080)])],
        )]);

    let result = harness.run(&ctx);

    assert_eq!(result.pool_names(), vec![DEFAULT_POOL, HI_POOL, "prohibited-pool"]);
    assert!(result.settings_names().contains(&"prohibited-settings"));
    assert!(result
        .config
        .http_listeners
        .contains(&existing.http_listeners[0]));
    assert!(result
        .config
        .request_routing_rules
        .contains(&existing.request_routing_rules[0]));
}

#[test]
fn test_manual_pool_preserved_under_whitelist() {
    let ctx = ReconcileContext::new(
        vec![ingress("web", "foo.baz", &[("/hi", "web", 80)])],
        vec![service("web", &[(80, 8080)])],
        vec![],
    )
    .with_managed_targets(vec![TargetSpec::new("foo.baz", 80).with_paths(["/hi"])]);
    let harness = Harness::new()
        .with_existing(GatewayConfig {
            backend_address_pools: vec![manual_pool("manual-pool")],
            ..Default::default()
        })
        .with_endpoints(vec![endpoints(
            "web",
            vec![subset(&[("10.0.0.1", None)], &[(None, 8080)])],
        )]);

    let result = harness.run(&ctx);

    assert_eq!(result.pool_names(), vec![DEFAULT_POOL, HI_POOL, "manual-pool"]);
    assert_eq!(
        result.pool("manual-pool"),
        Some(&manual_pool("manual-pool")),
        "Foreign pool must survive byte for byte"
    );
}

#[test]
fn test_whitelist_excludes_unlisted_hosts_but_keeps_defaults() {
    let ctx = ReconcileContext::new(
        vec![ingress("web", "foo.baz", &[("/hi", "web", 80)])],
        vec![service("web", &[(80, 8080)])],
        vec![],
    )
    .with_managed_targets(vec![TargetSpec::new("other.baz", 80)]);
    let harness = Harness::new().with_endpoints(vec![endpoints(
        "web",
        vec![subset(&[("10.0.0.1", None)], &[(None, 8080)])],
    )]);

    let result = harness.run(&ctx);

    assert_eq!(result.pool_names(), vec![DEFAULT_POOL]);
    assert_eq!(result.probe_names(), vec![DEFAULT_PROBE]);
}
