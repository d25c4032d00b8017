//! Reusable Kubernetes object fixtures

use k8s_openapi::api::core::v1::{
    EndpointAddress, EndpointPort, EndpointSubset, Endpoints, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

pub const NAMESPACE: &str = "default";

fn meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(NAMESPACE.to_string()),
        ..Default::default()
    }
}

/// Service exposing `(port, target_port)` pairs
pub fn service(name: &str, ports: &[(i32, i32)]) -> Service {
    Service {
        metadata: meta(name),
        spec: Some(ServiceSpec {
            ports: Some(
                ports
                    .iter()
                    .map(|(port, target)| ServicePort {
                        port: *port,
                        target_port: Some(IntOrString::Int(*target)),
                        protocol: Some("TCP".to_string()),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Service whose single port targets a named container port
pub fn service_with_named_target(name: &str, port: i32, target: &str) -> Service {
    Service {
        metadata: meta(name),
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                port,
                target_port: Some(IntOrString::String(target.to_string())),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// One Endpoints subset: addresses as `(ip, hostname)` and `(name, port)` ports
pub fn subset(addresses: &[(&str, Option<&str>)], ports: &[(Option<&str>, i32)]) -> EndpointSubset {
    EndpointSubset {
        addresses: Some(
            addresses
                .iter()
                .map(|(ip, hostname)| EndpointAddress {
                    ip: ip.to_string(),
                    hostname: hostname.map(str::to_string),
                    ..Default::default()
                })
                .collect(),
        ),
        ports: Some(
            ports
                .iter()
                .map(|(name, port)| EndpointPort {
                    name: name.map(str::to_string),
                    port: *port,
                    protocol: Some("TCP".to_string()),
                    ..Default::default()
                })
                .collect(),
        ),
        ..Default::default()
    }
}

pub fn endpoints(name: &str, subsets: Vec<EndpointSubset>) -> Endpoints {
    Endpoints {
        metadata: meta(name),
        subsets: Some(subsets),
    }
}

/// Ingress with one rule on `host`, one path per `(path, service, port)`
pub fn ingress(name: &str, host: &str, paths: &[(&str, &str, i32)]) -> Ingress {
    Ingress {
        metadata: meta(name),
        spec: Some(IngressSpec {
            ingress_class_name: Some("azure/application-gateway".to_string()),
            rules: Some(vec![IngressRule {
                host: Some(host.to_string()),
                http: Some(HTTPIngressRuleValue {
                    paths: paths
                        .iter()
                        .map(|(path, service, port)| HTTPIngressPath {
                            path: Some(path.to_string()),
                            path_type: "Prefix".to_string(),
                            backend: IngressBackend {
                                service: Some(IngressServiceBackend {
                                    name: service.to_string(),
                                    port: Some(ServiceBackendPort {
                                        number: Some(*port),
                                        name: None,
                                    }),
                                }),
                                ..Default::default()
                            },
                        })
                        .collect(),
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
