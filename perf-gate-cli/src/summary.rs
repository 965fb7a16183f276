// perf-gate-cli/src/summary.rs
// ============================================================================
// Module: Text Summary Writer
// Description: Renders a plain-text run summary for quick inspection.
// Purpose: Surface totals, latency spread, failures, and slowest endpoints.
// Dependencies: perf-gate-config, perf-gate-core, standard library formatting.
// ============================================================================

//! ## Overview
//! The text summary condenses the aggregate into a handful of lines: request
//! totals, latency spread, failure rate, optional threshold status, the test
//! duration, and the five slowest endpoints by p95. When thresholds are
//! configured, the slowest-endpoint list is filtered to breaching endpoints.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use perf_gate_config::Breach;
use perf_gate_core::MetricKind;
use perf_gate_core::Snapshot;
use perf_gate_core::is_global_metric;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of slowest endpoints listed in the summary.
const TOP_ENDPOINTS: usize = 5;

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Inputs for the threshold status line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdStatus<'a> {
    /// Status label, present only when thresholds were configured.
    pub label: Option<&'a str>,
    /// Breaches found during validation.
    pub breaches: &'a [Breach],
    /// Whether a threshold configuration was explicitly provided.
    pub configured: bool,
}

impl<'a> ThresholdStatus<'a> {
    /// Builds the status for a run with configured thresholds.
    #[must_use]
    pub fn configured(label: &'a str, breaches: &'a [Breach]) -> Self {
        Self {
            label: Some(label),
            breaches,
            configured: true,
        }
    }
}

/// Renders the plain-text run summary.
#[must_use]
pub fn render_summary(snapshot: &Snapshot, status: ThresholdStatus<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Performance Metrics (perf-gate)");

    let total_requests = metric_value(snapshot, "http_reqs", "count").unwrap_or(0.0);
    let avg = metric_value(snapshot, "http_req_duration", "avg").unwrap_or(0.0);
    let p95 = metric_value(snapshot, "http_req_duration", "p(95)").unwrap_or(0.0);
    let p99 = metric_value(snapshot, "http_req_duration", "p(99)").unwrap_or(0.0);
    let min = metric_value(snapshot, "http_req_duration", "min").unwrap_or(0.0);
    let max = metric_value(snapshot, "http_req_duration", "max").unwrap_or(0.0);
    let failures = metric_value(snapshot, "http_req_failed", "passes").unwrap_or(0.0);
    let failure_rate = if total_requests > 0.0 { failures / total_requests * 100.0 } else { 0.0 };

    let _ = writeln!(out, "- Total HTTP Requests: {total_requests:.0}");
    let _ = writeln!(out, "- Avg Response Time: {avg:.0} ms (P95: {p95:.0} ms, P99: {p99:.0} ms)");
    let _ = writeln!(out, "- Min/Max: {min:.0} ms / {max:.0} ms");
    let _ = writeln!(out, "- HTTP Failures: {failures:.0} ({failure_rate:.2}% failure rate)");

    if let Some(label) = status.label {
        let _ = writeln!(out, "- Threshold Status: {label}");
    }

    if let (Some(start), Some(end)) = (snapshot.start_time, snapshot.end_time) {
        let seconds = (end - start).num_milliseconds() as f64 / 1000.0;
        if seconds < 60.0 {
            let _ = writeln!(out, "- Test Duration: {seconds:.1} sec");
        } else {
            let _ = writeln!(out, "- Test Duration: {:.1} min", seconds / 60.0);
        }
    }

    let slowest = slowest_endpoints(snapshot, &status);
    if !slowest.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Top {TOP_ENDPOINTS} Slowest Endpoints:");
        for (rank, (name, p95)) in slowest.iter().enumerate() {
            let _ = writeln!(out, "  {}. {name}: {p95:.0} ms (P95)", rank + 1);
        }
    }

    out
}

/// Writes the text summary to a file.
///
/// # Errors
///
/// Returns the underlying I/O error when writing fails.
pub fn write_summary(
    snapshot: &Snapshot,
    status: ThresholdStatus<'_>,
    path: &Path,
) -> io::Result<()> {
    fs::write(path, render_summary(snapshot, status))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads one value from a named metric in the snapshot.
fn metric_value(snapshot: &Snapshot, metric: &str, key: &str) -> Option<f64> {
    snapshot.metrics.get(metric).and_then(|m| m.values.get(key))
}

/// Collects the slowest endpoints by p95, descending.
///
/// When thresholds are configured, only breaching endpoints are listed.
fn slowest_endpoints(snapshot: &Snapshot, status: &ThresholdStatus<'_>) -> Vec<(String, f64)> {
    let breaching: BTreeSet<&str> =
        status.breaches.iter().map(|breach| breach.endpoint.as_str()).collect();

    let mut endpoints: Vec<(String, f64)> = snapshot
        .metrics
        .iter()
        .filter(|(name, metric)| {
            metric.kind == MetricKind::Trend
                && !is_global_metric(name)
                && (!status.configured || breaching.contains(name.as_str()))
        })
        .filter_map(|(name, metric)| {
            metric.values.get("p(95)").filter(|p95| *p95 > 0.0).map(|p95| (name.clone(), p95))
        })
        .collect();

    endpoints.sort_by(|a, b| b.1.total_cmp(&a.1));
    endpoints.truncate(TOP_ENDPOINTS);
    endpoints
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use perf_gate_config::Breach;
    use perf_gate_config::Severity;
    use perf_gate_core::Metric;
    use perf_gate_core::MetricKind;
    use perf_gate_core::Snapshot;

    use super::ThresholdStatus;
    use super::render_summary;

    fn snapshot_with_endpoints() -> Snapshot {
        let mut snapshot = Snapshot::skeleton();
        snapshot.metrics.insert(
            "http_reqs".to_string(),
            Metric::with_values(MetricKind::Counter, [("count", 1000.0), ("rate", 50.0)]),
        );
        snapshot.metrics.insert(
            "http_req_duration".to_string(),
            Metric::with_values(
                MetricKind::Trend,
                [
                    ("count", 1000.0),
                    ("min", 10.0),
                    ("max", 900.0),
                    ("avg", 120.0),
                    ("p(95)", 450.0),
                    ("p(99)", 700.0),
                ],
            ),
        );
        snapshot.metrics.insert(
            "users_profile".to_string(),
            Metric::with_values(MetricKind::Trend, [("count", 500.0), ("p(95)", 480.0)]),
        );
        snapshot.metrics.insert(
            "orders_items".to_string(),
            Metric::with_values(MetricKind::Trend, [("count", 500.0), ("p(95)", 220.0)]),
        );
        snapshot
    }

    #[test]
    fn summary_reports_totals_and_spread() {
        let rendered = render_summary(&snapshot_with_endpoints(), ThresholdStatus::default());
        assert!(rendered.contains("- Total HTTP Requests: 1000"));
        assert!(rendered.contains("- Avg Response Time: 120 ms (P95: 450 ms, P99: 700 ms)"));
        assert!(rendered.contains("- Min/Max: 10 ms / 900 ms"));
    }

    #[test]
    fn slowest_endpoints_sort_descending_and_skip_globals() {
        let rendered = render_summary(&snapshot_with_endpoints(), ThresholdStatus::default());
        let users = rendered.find("users_profile").unwrap();
        let orders = rendered.find("orders_items").unwrap();
        assert!(users < orders);
        assert!(!rendered.contains("1. http_req_duration"));
    }

    #[test]
    fn configured_thresholds_filter_to_breaching_endpoints() {
        let breaches = vec![Breach {
            endpoint: "users_profile".to_string(),
            metric: "p(95)".to_string(),
            value: 480.0,
            threshold: 300.0,
            unit: "ms",
            severity: Severity::Error,
            sample_count: 500,
        }];
        let status = ThresholdStatus::configured("fail", &breaches);
        let rendered = render_summary(&snapshot_with_endpoints(), status);
        assert!(rendered.contains("- Threshold Status: fail"));
        assert!(rendered.contains("users_profile"));
        assert!(!rendered.contains("orders_items"));
    }
}
