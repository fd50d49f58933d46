// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the dns-ingress operator.
//!
//! All metrics live under the prometheus-safe namespace `dns_ingress_io` and
//! are registered in a global registry exposed via the `/metrics` endpoint.
//!
//! # Example
//!
//! ```rust,no_run
//! use dns_ingress::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("Domain", std::time::Duration::from_millis(12));
//! ```

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

/// Namespace prefix for all operator metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "dns_ingress_io";

/// Global Prometheus metrics registry
///
/// All metrics are registered here and exposed via the `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (`Domain`, `Ingress`)
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by resource type and status",
    );
    let counter = CounterVec::new(opts, &["resource_type", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
///
/// Labels:
/// - `resource_type`: Kind of resource (`Domain`, `Ingress`)
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of provider API calls by operation and status
///
/// Labels:
/// - `operation`: Provider operation (`GetZone`, `GetByName`, `Get`,
///   `Create`, `Update`, `Delete`)
/// - `status`: Outcome (`success`, `error`)
pub static PROVIDER_API_CALLS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_provider_api_calls_total"),
        "Total number of DNS provider API calls by operation and status",
    );
    let counter = CounterVec::new(opts, &["operation", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of errors by resource type and error kind
///
/// Labels:
/// - `resource_type`: Kind of resource where the error occurred
/// - `error_type`: Category of error (e.g. `reconcile_error`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by resource type and error kind",
    );
    let counter = CounterVec::new(opts, &["resource_type", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Record a successful reconciliation and its duration.
///
/// # Arguments
///
/// * `resource_type` - Kind of resource reconciled (e.g., `Domain`)
/// * `duration` - Wall-clock duration of the reconcile call
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation and its duration.
///
/// # Arguments
///
/// * `resource_type` - Kind of resource reconciled (e.g., `Domain`)
/// * `duration` - Wall-clock duration of the reconcile call
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record one provider API call.
///
/// # Arguments
///
/// * `operation` - Provider operation name (e.g., `GetZone`, `Create`)
/// * `success` - Whether the call succeeded
pub fn record_provider_api_call(operation: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    PROVIDER_API_CALLS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}

/// Record an error occurrence.
///
/// # Arguments
///
/// * `resource_type` - Kind of resource where the error occurred
/// * `error_type` - Category of error (e.g., `reconcile_error`)
pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Gather all registered metrics in the Prometheus text exposition format.
///
/// # Returns
///
/// The full exposition text served by the `/metrics` endpoint.
///
/// # Errors
///
/// Returns an error when encoding fails or the buffer is not valid UTF-8.
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
