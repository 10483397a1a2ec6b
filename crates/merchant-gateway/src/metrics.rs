use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Gate decisions by route class and outcome
pub static REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "gateway_requests_total",
            "Requests seen by the gateway by route class and outcome",
        ),
        &["route_class", "outcome"],
    )
    .unwrap()
});

pub static REJECTIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("gateway_rejections_total", "Rejected requests by reason"),
        &["reason"],
    )
    .unwrap()
});

pub static AUDIT_WRITE_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "gateway_audit_write_failures_total",
        "Failed-attempt records that could not be persisted",
    )
    .unwrap()
});

pub static STORE_LOOKUP_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "gateway_store_lookup_seconds",
            "Latency of API key lookups against the tenant store",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
    )
    .unwrap()
});

/// Register all metrics with the registry
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(REQUESTS_TOTAL.clone()),
        Box::new(REJECTIONS_TOTAL.clone()),
        Box::new(AUDIT_WRITE_FAILURES.clone()),
        Box::new(STORE_LOOKUP_SECONDS.clone()),
    ];
    for collector in collectors {
        if let Err(e) = REGISTRY.register(collector) {
            tracing::warn!("Failed to register metric: {}", e);
        }
    }
}
