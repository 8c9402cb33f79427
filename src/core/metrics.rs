// src/core/metrics.rs

//! Defines and registers Prometheus metrics for the request multiplexer.
//!
//! Metrics live in the process-wide default registry and are registered once,
//! the first time any of them is touched.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, TextEncoder, register_counter, register_counter_vec,
    register_gauge,
};

lazy_static! {
    // --- Requests ---
    /// Requests accepted by the transport.
    pub static ref REQUESTS_SUBMITTED_TOTAL: Counter =
        register_counter!("httpmux_requests_submitted_total", "Total number of requests handed to the transport.").unwrap();
    /// Requests refused before or by the transport (bad URL, disallowed host, transport refusal).
    pub static ref REQUESTS_REJECTED_TOTAL: Counter =
        register_counter!("httpmux_requests_rejected_total", "Total number of submits that were not accepted.").unwrap();
    /// Slots currently holding an in-flight request.
    pub static ref IN_FLIGHT_REQUESTS: Gauge =
        register_gauge!("httpmux_in_flight_requests", "Number of requests currently in flight.").unwrap();

    // --- Events ---
    /// Completion events, labeled `text`, `binary` or `error`.
    pub static ref COMPLETIONS_TOTAL: CounterVec =
        register_counter_vec!("httpmux_completions_total", "Total number of completion events, labeled by outcome.", &["outcome"]).unwrap();
    /// Streamed chunks routed to a slot, labeled `text_chunk` or `binary_chunk`.
    pub static ref CHUNKS_ROUTED_TOTAL: CounterVec =
        register_counter_vec!("httpmux_chunks_routed_total", "Total number of streamed chunks routed, labeled by kind.", &["kind"]).unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
