//! Metrics collection.
//!
//! # Metrics
//! - `mrv_contract_calls_total` (counter): contract operations by `operation`, `outcome`
//! - `mrv_events_observed_total` (counter): decoded contract events by `kind`
//! - `mrv_plantation_index_size` (gauge): plantations held by the index
//! - `mrv_rpc_healthy` (gauge): 1=healthy, 0=unhealthy

/// Record the outcome of a contract service operation.
pub fn record_contract_call(operation: &'static str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    ::metrics::counter!("mrv_contract_calls_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}

/// Record a decoded contract event.
pub fn record_event(kind: &'static str) {
    ::metrics::counter!("mrv_events_observed_total", "kind" => kind).increment(1);
}

/// Record the number of plantations held by the index.
pub fn record_index_size(size: usize) {
    ::metrics::gauge!("mrv_plantation_index_size").set(size as f64);
}

/// Record RPC reachability.
pub fn record_rpc_health(healthy: bool) {
    ::metrics::gauge!("mrv_rpc_healthy").set(if healthy { 1.0 } else { 0.0 });
}
