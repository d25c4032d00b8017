use thiserror::Error;

use crate::appgw::ServiceKey;

/// Controller errors
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Kubernetes error: {0}")]
    Kubernetes(#[from] kube::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gateway snapshot error: {0}")]
    Snapshot(String),

    #[error("Cache sync error: {0}")]
    CacheSync(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Cache lookup failures
///
/// Never fatal for a pass: the caller logs, records an event and falls back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no endpoints cached for service {0}")]
    NotFound(ServiceKey),
}
