//! Prometheus metrics for the session service.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, CounterVec};

static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_tokens_issued_total",
        "Total number of tokens issued",
        &["token_type"]
    )
    .expect("Failed to register tokens_issued metric")
});

static REFRESH_ATTEMPTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_refresh_total",
        "Total number of refresh attempts by outcome",
        &["status"]
    )
    .expect("Failed to register refresh metric")
});

static SECURITY_EVENTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_security_events_total",
        "Total number of security events",
        &["event_type"]
    )
    .expect("Failed to register security_events metric")
});

static NOTIFICATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_notifications_total",
        "Total number of notification attempts by outcome",
        &["status"]
    )
    .expect("Failed to register notifications metric")
});

static STORE_OPERATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_store_operations_total",
        "Total number of fingerprint store operations",
        &["operation", "status"]
    )
    .expect("Failed to register store_operations metric")
});

/// Record a token issuance.
pub fn record_token_issued(token_type: &str) {
    TOKENS_ISSUED.with_label_values(&[token_type]).inc();
}

/// Record a refresh outcome.
pub fn record_refresh(status: &str) {
    REFRESH_ATTEMPTS.with_label_values(&[status]).inc();
}

/// Record a security event.
pub fn record_security_event(event_type: &str) {
    SECURITY_EVENTS.with_label_values(&[event_type]).inc();
}

/// Record a notification attempt.
pub fn record_notification(status: &str) {
    NOTIFICATIONS.with_label_values(&[status]).inc();
}

/// Record a store operation.
pub fn record_store_operation(operation: &str, status: &str) {
    STORE_OPERATIONS
        .with_label_values(&[operation, status])
        .inc();
}
