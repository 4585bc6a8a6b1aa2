//! Standalone Prometheus exporter bootstrap. The teacher wires `metrics`
//! into an actix middleware (`middleware/metrics.rs`); with no HTTP
//! surface in this engine, the same crates are re-targeted into a small
//! exporter the binaries start at boot so an operator-facing Prometheus
//! can still scrape run counters and gauges.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub fn install(listen_addr: SocketAddr) {
    match PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .install()
    {
        Ok(()) => log::info!("prometheus exporter listening on {listen_addr}"),
        Err(e) => log::error!("failed to install prometheus exporter: {e}"),
    }
}
