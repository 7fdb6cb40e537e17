//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Matching Metrics
    pub static ref CONNECTION_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("kindred_connection_requests_total", "Connection requests created or reviewed, by resulting status"),
        &["status"]
    ).expect("metric can be created");

    // Chat Metrics
    pub static ref MESSAGES_SENT_TOTAL: IntCounter = IntCounter::new(
        "kindred_messages_sent_total",
        "Total number of chat messages persisted"
    ).expect("metric can be created");
    pub static ref WS_CONNECTIONS_ACTIVE: IntGauge = IntGauge::new(
        "kindred_ws_connections_active",
        "Current number of open websocket connections"
    ).expect("metric can be created");
    pub static ref CHAT_ROOMS_ACTIVE: IntGauge = IntGauge::new(
        "kindred_chat_rooms_active",
        "Current number of live chat rooms (members or deliveries in flight)"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("kindred_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Safe to call more than once; later calls keep the first registration.
pub fn init_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(CONNECTION_REQUESTS_TOTAL.clone()),
        Box::new(MESSAGES_SENT_TOTAL.clone()),
        Box::new(WS_CONNECTIONS_ACTIVE.clone()),
        Box::new(CHAT_ROOMS_ACTIVE.clone()),
        Box::new(ERRORS_TOTAL.clone()),
    ];

    for collector in collectors {
        if let Err(error) = REGISTRY.register(collector) {
            tracing::debug!(%error, "Metric already registered");
        }
    }

    tracing::info!("Metrics registry initialized");
}
