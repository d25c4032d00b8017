//! Controller metrics
//!
//! Pass latency and outcome, plus how many resources of each kind the last
//! pass wrote (managed) or left alone (preserved).

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

use crate::appgw::{BuildStats, MergeStats};

lazy_static! {
    /// Controller metrics registry
    pub static ref CONTROLLER_METRICS_REGISTRY: Registry = Registry::new();

    /// Reconciliation pass duration
    static ref RECONCILIATION_DURATION: Histogram = {
        let opts = HistogramOpts::new(
            "appgw_reconciliation_duration_seconds",
            "Gateway configuration pass duration in seconds",
        );
        let histogram = Histogram::with_opts(opts).expect("Failed to create histogram");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(histogram.clone()))
            .expect("Failed to register histogram");
        histogram
    };

    /// Reconciliation passes total
    static ref RECONCILIATIONS_TOTAL: IntCounterVec = {
        let opts = Opts::new(
            "appgw_reconciliations_total",
            "Total number of gateway configuration passes",
        );
        let counter = IntCounterVec::new(opts, &["result"]).expect("Failed to create counter");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(counter.clone()))
            .expect("Failed to register counter");
        counter
    };

    /// Resources in the last built configuration, by kind and ownership
    static ref GATEWAY_RESOURCES: IntGaugeVec = {
        let opts = Opts::new(
            "appgw_gateway_resources",
            "Resources in the last built gateway configuration",
        );
        let gauge = IntGaugeVec::new(opts, &["kind", "ownership"]).expect("Failed to create gauge");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(gauge.clone()))
            .expect("Failed to register gauge");
        gauge
    };

    /// Kubernetes events published
    static ref EVENTS_TOTAL: IntCounterVec = {
        let opts = Opts::new(
            "appgw_ingress_events_total",
            "Warning events recorded on Ingresses",
        );
        let counter = IntCounterVec::new(opts, &["reason"]).expect("Failed to create counter");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(counter.clone()))
            .expect("Failed to register counter");
        counter
    };
}

/// Record one reconciliation pass
pub fn record_reconciliation(duration_secs: f64, result: &str) {
    RECONCILIATION_DURATION.observe(duration_secs);
    RECONCILIATIONS_TOTAL.with_label_values(&[result]).inc();
}

/// Record the merge outcome of the last pass
pub fn record_build_stats(stats: &BuildStats) {
    set_kind("backend_address_pool", &stats.pools);
    set_kind("probe", &stats.probes);
    set_kind("backend_http_settings", &stats.settings);
}

fn set_kind(kind: &str, stats: &MergeStats) {
    GATEWAY_RESOURCES
        .with_label_values(&[kind, "managed"])
        .set(stats.managed as i64);
    GATEWAY_RESOURCES
        .with_label_values(&[kind, "preserved"])
        .set(stats.preserved as i64);
}

/// Record one warning event
pub fn record_event(reason: &str) {
    EVENTS_TOTAL.with_label_values(&[reason]).inc();
}

/// Gather controller metrics in the Prometheus text format
pub fn gather_controller_metrics() -> Result<String, String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = CONTROLLER_METRICS_REGISTRY.gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Failed to convert to UTF-8: {}", e))
}
