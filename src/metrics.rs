//! Routing metrics.
//!
//! When the `metrics` feature is disabled all functions become no-ops, so
//! callers keep the same API surface without the metrics dependency.

/// Record a request entering the router.
#[cfg(feature = "metrics")]
pub fn record_routed_request(op: &'static str) {
    metrics::counter!("shardline_group_router_requests_total", "op" => op).increment(1);
}

#[cfg(not(feature = "metrics"))]
pub fn record_routed_request(_op: &'static str) {}

/// Record a locally synthesized "not coordinator" reply.
#[cfg(feature = "metrics")]
pub fn record_not_coordinator(op: &'static str) {
    metrics::counter!("shardline_group_router_not_coordinator_total", "op" => op).increment(1);
}

#[cfg(not(feature = "metrics"))]
pub fn record_not_coordinator(_op: &'static str) {}
