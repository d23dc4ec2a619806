//! Metrics for the mediation runtime.
//!
//! Thin wrappers around the `metrics` macros, grouped by subsystem the way
//! the rest of this crate groups its series. This is ambient
//! instrumentation: it never gates or rejects a message, it only records.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Record one message mediated through a named sequence.
pub fn record_mediated(sequence: &str, success: bool) {
    counter!(
        "esb_messages_mediated_total",
        "sequence" => sequence.to_string(),
        "success" => success.to_string()
    )
    .increment(1);
}

/// Record end-to-end mediation latency for one sequence application.
pub fn record_mediation_latency(sequence: &str, duration: Duration) {
    histogram!(
        "esb_mediation_duration_seconds",
        "sequence" => sequence.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record one mediator's own duration, independent of the enclosing
/// sequence's total.
pub fn record_mediator_duration(mediator: &str, duration: Duration) {
    histogram!(
        "esb_mediator_duration_seconds",
        "mediator" => mediator.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Circuit breaker state as a gauge: 0=Closed, 1=HalfOpen, 2=Open, matching
/// the order of increasing unavailability.
pub fn set_circuit_state(endpoint: &str, state: crate::endpoint::CircuitState) {
    let value = match state {
        crate::endpoint::CircuitState::Closed => 0.0,
        crate::endpoint::CircuitState::HalfOpen => 1.0,
        crate::endpoint::CircuitState::Open => 2.0,
    };
    gauge!("esb_endpoint_circuit_state", "endpoint" => endpoint.to_string()).set(value);
}

/// Record a circuit breaker transition.
pub fn record_circuit_transition(endpoint: &str, from: &str, to: &str) {
    counter!(
        "esb_endpoint_circuit_transitions_total",
        "endpoint" => endpoint.to_string(),
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

/// Record a registry entry being replaced via hot reload.
pub fn record_registry_reload(store: &str, key: &str) {
    counter!(
        "esb_registry_reload_total",
        "store" => store.to_string(),
        "key" => key.to_string()
    )
    .increment(1);
}
