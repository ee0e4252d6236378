//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the curator server:
//! - HTTP request metrics (latency, counts, errors)
//! - Relay authentication failures
//! - Catalog and ledger sizes (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;
use tracing::warn;

use curator_core::{CatalogStore, RatingLedger};

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "curator_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("curator_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "curator_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Relay authentication failures.
pub static RELAY_AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "curator_relay_auth_failures_total",
            "Total relay authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Catalog Metrics (collected dynamically)
// =============================================================================

/// Catalog entries currently stored.
pub static CATALOG_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("curator_catalog_entries", "Number of catalog entries").unwrap()
});

/// Ratings currently stored.
pub static RATINGS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("curator_ratings", "Number of stored ratings").unwrap()
});

/// Wizard sessions waiting for a reply.
pub static WIZARD_SESSIONS_WAITING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "curator_wizard_sessions_waiting",
        "Number of wizard steps waiting for a reply",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(RELAY_AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // Catalog
    registry
        .register(Box::new(CATALOG_ENTRIES.clone()))
        .unwrap();
    registry.register(Box::new(RATINGS.clone())).unwrap();
    registry
        .register(Box::new(WIZARD_SESSIONS_WAITING.clone()))
        .unwrap();

    // Core metrics (votes, wizard, mirror, commands)
    for metric in curator_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Update the gauges that mirror current application state.
pub fn collect_dynamic_metrics(state: &AppState) {
    let store = state.store();
    if let Ok(count) = store.entry_count() {
        CATALOG_ENTRIES.set(count as i64);
    }
    if let Ok(count) = store.rating_count() {
        RATINGS.set(count as i64);
    }
    WIZARD_SESSIONS_WAITING.set(state.cataloger().waiting_replies() as i64);
}

static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    // Run twice: adjacent numeric segments share the separating slash
    let once = NUMERIC_SEGMENT.replace_all(path, "/{id}$1");
    NUMERIC_SEGMENT.replace_all(&once, "/{id}$1").into_owned()
}
