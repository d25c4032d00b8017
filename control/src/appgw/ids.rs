//! Gateway sub-resource IDs

use common::ResourceRef;

/// Builds resource IDs under one application gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayIds {
    base: String,
}

impl GatewayIds {
    pub fn new(gateway_resource_id: impl Into<String>) -> Self {
        let mut base = gateway_resource_id.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self { base }
    }

    pub fn pool(&self, name: &str) -> ResourceRef {
        self.child("backendAddressPools", name)
    }

    pub fn probe(&self, name: &str) -> ResourceRef {
        self.child("probes", name)
    }

    pub fn settings(&self, name: &str) -> ResourceRef {
        self.child("backendHttpSettingsCollection", name)
    }

    pub fn listener(&self, name: &str) -> ResourceRef {
        self.child("httpListeners", name)
    }

    pub fn path_map(&self, name: &str) -> ResourceRef {
        self.child("urlPathMaps", name)
    }

    fn child(&self, collection: &str, name: &str) -> ResourceRef {
        ResourceRef::new(format!("{}/{}/{}", self.base, collection, name))
    }
}
