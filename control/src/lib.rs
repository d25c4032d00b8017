//! Application gateway ingress controller library
//!
//! Brownfield-aware reconciliation of an application gateway's configuration
//! against Ingresses, Services and Endpoints. Exposes the reconciliation
//! engine for the binary and for tests.

pub mod apis;
pub mod appgw;
pub mod brownfield;
pub mod config;
pub mod error;

pub use appgw::{BuilderSettings, ConfigBuilder, GatewayState, ReconcileContext};
pub use config::ControllerConfig;
pub use error::{ControlError, LookupError};
