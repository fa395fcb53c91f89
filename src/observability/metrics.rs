//! # Metrics
//!
//! Prometheus metrics for monitoring the launcher.
//!
//! ## Metrics Exposed
//!
//! - `oci_requests_total` - Launch attempts, labelled by `code` (HTTP status)
//!   or `message` (extracted reason or raw transport error)
//! - `oci_requests_delay` - Current inter-attempt delay in seconds
//! - `oci_launch_calls_total` - Launch calls made by the retry loop
//! - `oci_instances_launched_total` - Launch requests the provider accepted
//! - `oci_launch_request_duration_seconds` - Duration of single launch requests

use crate::backoff::{RequestLabels, RequestRecorder};
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("oci_requests_total", "Total number of OCI launch attempts"),
        &["code", "message"],
    )
    .expect("Failed to create REQUESTS_TOTAL metric - this should never happen")
});

static REQUESTS_DELAY: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "oci_requests_delay",
        "Current delay between OCI launch attempts in seconds",
    )
    .expect("Failed to create REQUESTS_DELAY metric - this should never happen")
});

static LAUNCH_CALLS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "oci_launch_calls_total",
        "Total number of launch calls made by the retry loop",
    )
    .expect("Failed to create LAUNCH_CALLS_TOTAL metric - this should never happen")
});

static INSTANCES_LAUNCHED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "oci_instances_launched_total",
        "Total number of launch requests accepted by OCI",
    )
    .expect("Failed to create INSTANCES_LAUNCHED_TOTAL metric - this should never happen")
});

static LAUNCH_REQUEST_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "oci_launch_request_duration_seconds",
            "Duration of single OCI launch requests in seconds",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create LAUNCH_REQUEST_DURATION metric - this should never happen")
});

/// Register all metrics with [`REGISTRY`].
///
/// Safe to call more than once; metrics that are already registered are
/// left as they are.
///
/// # Errors
/// Returns an error if a metric cannot be registered for any other reason.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
        Box::new(REQUESTS_TOTAL.clone()),
        Box::new(REQUESTS_DELAY.clone()),
        Box::new(LAUNCH_CALLS_TOTAL.clone()),
        Box::new(INSTANCES_LAUNCHED_TOTAL.clone()),
        Box::new(LAUNCH_REQUEST_DURATION.clone()),
    ];
    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Gather everything registered with [`REGISTRY`]
#[must_use]
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

/// Count one launch attempt.
///
/// A status increment carries an empty `message` label and a message
/// increment an empty `code` label.
pub fn record_request(labels: &RequestLabels) {
    match labels {
        RequestLabels::Status(status) => {
            REQUESTS_TOTAL
                .with_label_values(&[status.to_string().as_str(), ""])
                .inc();
        }
        RequestLabels::Message(message) => {
            REQUESTS_TOTAL
                .with_label_values(&["", message.as_str()])
                .inc();
        }
    }
}

pub fn set_request_delay(delay_secs: u64) {
    REQUESTS_DELAY.set(i64::try_from(delay_secs).unwrap_or(i64::MAX));
}

pub fn increment_launch_calls() {
    LAUNCH_CALLS_TOTAL.inc();
}

pub fn increment_instances_launched() {
    INSTANCES_LAUNCHED_TOTAL.inc();
}

pub fn observe_launch_request_duration(duration: f64) {
    LAUNCH_REQUEST_DURATION.observe(duration);
}

/// [`RequestRecorder`] backed by the process-wide Prometheus registry
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusRecorder;

impl RequestRecorder for PrometheusRecorder {
    fn record_request(&self, labels: &RequestLabels) {
        record_request(labels);
    }
}
