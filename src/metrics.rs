//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{Counter, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("sitekeeper_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "sitekeeper_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Content Store Metrics
    pub static ref CONTENT_READS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("sitekeeper_content_reads_total", "Total number of site document reads"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref CONTENT_WRITES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("sitekeeper_content_writes_total", "Total number of site document writes"),
        &["outcome"]
    ).expect("metric can be created");

    // Upload Metrics
    pub static ref UPLOADS_TOTAL: IntCounter = IntCounter::new(
        "sitekeeper_uploads_total",
        "Total number of accepted uploads"
    ).expect("metric can be created");
    pub static ref UPLOAD_BYTES_TOTAL: Counter = Counter::new(
        "sitekeeper_upload_bytes_total",
        "Total bytes of uploads accepted"
    ).expect("metric can be created");

    // Outbound Metrics
    pub static ref CONTACT_RELAYS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("sitekeeper_contact_relays_total", "Total number of contact-form relay attempts"),
        &["status"]
    ).expect("metric can be created");
    pub static ref AI_PROXY_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("sitekeeper_ai_proxy_requests_total", "Total number of proxied AI requests"),
        &["status"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("sitekeeper_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(CONTENT_READS_TOTAL.clone()))
        .expect("CONTENT_READS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CONTENT_WRITES_TOTAL.clone()))
        .expect("CONTENT_WRITES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(UPLOADS_TOTAL.clone()))
        .expect("UPLOADS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(UPLOAD_BYTES_TOTAL.clone()))
        .expect("UPLOAD_BYTES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CONTACT_RELAYS_TOTAL.clone()))
        .expect("CONTACT_RELAYS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(AI_PROXY_REQUESTS_TOTAL.clone()))
        .expect("AI_PROXY_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
