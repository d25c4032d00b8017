//! Previously applied gateway configuration
//!
//! The only information carried from one pass to the next. Seeded from an
//! optional JSON snapshot at startup and replaced after every pass.

use common::GatewayConfig;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

use crate::error::ControlError;

/// Shared handle to the last applied configuration
#[derive(Debug, Clone, Default)]
pub struct GatewayState {
    applied: Arc<RwLock<GatewayConfig>>,
}

impl GatewayState {
    pub fn new(initial: GatewayConfig) -> Self {
        Self {
            applied: Arc::new(RwLock::new(initial)),
        }
    }

    /// Copy of the last applied configuration
    pub fn snapshot(&self) -> GatewayConfig {
        safe_read(&self.applied).clone()
    }

    /// Store a new configuration; returns whether it differs from the old one
    pub fn replace(&self, config: GatewayConfig) -> bool {
        let mut applied = safe_write(&self.applied);
        if *applied == config {
            return false;
        }
        *applied = config;
        true
    }
}

/// Read a configuration snapshot written by [`write_snapshot`] (or by hand)
pub fn load_snapshot(path: &Path) -> Result<GatewayConfig, ControlError> {
    let raw = std::fs::read_to_string(path)?;
    let config: GatewayConfig = serde_json::from_str(&raw).map_err(|e| {
        ControlError::Snapshot(format!("invalid snapshot {}: {}", path.display(), e))
    })?;
    info!(
        path = %path.display(),
        pools = config.backend_address_pools.len(),
        probes = config.probes.len(),
        "Loaded previously applied gateway configuration"
    );
    Ok(config)
}

/// Write `config` as pretty-printed JSON
pub fn write_snapshot(path: &Path, config: &GatewayConfig) -> Result<(), ControlError> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Safe RwLock read helper that recovers from poisoning
#[inline]
fn safe_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn!("RwLock poisoned during read, recovering (data is still valid)");
        poisoned.into_inner()
    })
}

/// Safe RwLock write helper that recovers from poisoning
#[inline]
fn safe_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn!("RwLock poisoned during write, recovering (data is still valid)");
        poisoned.into_inner()
    })
}
