//! Gateway configuration pass tests
//!
//! Drive [`control::ConfigBuilder`] end to end over in-memory cluster state.
//! No cluster is needed.
//!
//! - **framework/**: pass harness and Kubernetes object fixtures
//! - **scenarios/**: pool synthesis, failure events, brownfield coexistence

#![allow(
    dead_code,
    clippy::expect_used,
    clippy::panic,
    clippy::unwrap_used,
    clippy::new_without_default
)]

pub mod framework;
pub mod scenarios;
