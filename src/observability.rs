//! Metric names and the optional Prometheus exporter.

use std::net::SocketAddr;

/// Counter: resolver decisions on single candidates. Labels: outcome.
pub const DECISIONS_TOTAL: &str = "gabay_decisions_total";

/// Counter: rejections caused by an overlapping existing interval.
pub const CONFLICTS_TOTAL: &str = "gabay_conflicts_total";

/// Counter: per-item outcomes of bulk operations. Labels: outcome.
pub const BULK_ITEMS_TOTAL: &str = "gabay_bulk_items_total";

/// Install the Prometheus metrics exporter on the given port. No-op if port
/// is None. Must run inside a tokio runtime.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
