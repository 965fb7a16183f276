// perf-gate-core/tests/collector.rs
// ============================================================================
// Module: In-Memory Collector Tests
// Description: Request recording, snapshot rendering, and the service seam.
// ============================================================================
//! ## Overview
//! Exercises the recording side of the pipeline: per-endpoint tallies,
//! single status-code increments per request, rate invariants, percentile
//! interpolation, and the statically-dispatched service-call seam.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::float_cmp,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;
use std::time::Duration;

use perf_gate_core::InMemoryCollector;
use perf_gate_core::MetricKind;
use perf_gate_core::MetricsSink;
use perf_gate_core::ServiceCallError;
use perf_gate_core::ServiceClient;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Records one successful endpoint request with the given duration.
fn record_ok(collector: &InMemoryCollector, ms: u64, endpoint: &str) {
    collector.record_endpoint_request(Duration::from_millis(ms), 200, "GET", endpoint, false);
}

// ============================================================================
// SECTION: Recording
// ============================================================================

#[test]
fn snapshot_carries_run_wide_and_endpoint_metrics() {
    let collector = InMemoryCollector::new();
    record_ok(&collector, 100, "users_profile");
    record_ok(&collector, 200, "users_profile");
    collector.record_endpoint_request(
        Duration::from_millis(300),
        500,
        "GET",
        "users_profile",
        false,
    );

    let snapshot = collector.snapshot();

    let reqs = &snapshot.metrics["http_reqs"];
    assert_eq!(reqs.kind, MetricKind::Counter);
    assert_eq!(reqs.values.get("count"), Some(3.0));

    let duration = &snapshot.metrics["http_req_duration"];
    assert_eq!(duration.values.get("min"), Some(100.0));
    assert_eq!(duration.values.get("max"), Some(300.0));
    assert_eq!(duration.values.get("avg"), Some(200.0));
    assert_eq!(duration.values.get("count"), Some(3.0));

    let endpoint = &snapshot.metrics["users_profile"];
    assert_eq!(endpoint.kind, MetricKind::Trend);
    assert_eq!(endpoint.values.get("count"), Some(3.0));

    let check = &snapshot.root_group.checks["users_profile"];
    assert_eq!(check.passes, 2);
    assert_eq!(check.fails, 1);
    assert_eq!(check.path, "::users_profile");
}

#[test]
fn status_codes_increment_exactly_once_per_request() {
    let collector = InMemoryCollector::new();
    record_ok(&collector, 10, "users_profile");
    record_ok(&collector, 10, "users_profile");
    collector.record_endpoint_request(
        Duration::from_millis(10),
        500,
        "GET",
        "users_profile",
        false,
    );

    let snapshot = collector.snapshot();

    assert_eq!(snapshot.metrics["http_req_status_200"].values.get("count"), Some(2.0));
    assert_eq!(snapshot.metrics["http_req_status_500"].values.get("count"), Some(1.0));
    assert_eq!(
        snapshot.metrics["http_req_status_users_profile_200"].values.get("count"),
        Some(2.0)
    );
    assert_eq!(
        snapshot.metrics["http_req_status_users_profile_500"].values.get("count"),
        Some(1.0)
    );
}

#[test]
fn failure_rates_stay_within_unit_bounds() {
    let collector = InMemoryCollector::new();
    record_ok(&collector, 10, "users_profile");
    collector.record_endpoint_request(Duration::from_millis(10), 502, "GET", "users_profile", false);
    collector.record_request(Duration::from_millis(10), 200, true);

    let snapshot = collector.snapshot();

    let failed = &snapshot.metrics["http_req_failed"];
    let value = failed.values.get("value").unwrap();
    assert!((0.0..=1.0).contains(&value));
    // Two failures out of three requests: the transport error and the 502.
    assert_eq!(failed.values.get("passes"), Some(2.0));
    assert_eq!(failed.values.get("fails"), Some(1.0));

    let checks = &snapshot.metrics["checks"];
    let checks_value = checks.values.get("value").unwrap();
    assert!((0.0..=1.0).contains(&checks_value));
}

#[test]
fn percentiles_interpolate_between_samples() {
    let collector = InMemoryCollector::new();
    for ms in [100, 200, 300, 400] {
        record_ok(&collector, ms, "users_profile");
    }

    let snapshot = collector.snapshot();
    let duration = &snapshot.metrics["http_req_duration"];

    assert_eq!(duration.values.get("p(50)"), Some(250.0));
    assert_eq!(duration.values.get("min"), Some(100.0));
    assert_eq!(duration.values.get("max"), Some(400.0));
}

#[test]
fn empty_collectors_render_bare_snapshots() {
    let collector = InMemoryCollector::new();
    let snapshot = collector.snapshot();

    assert!(snapshot.metrics.is_empty());
    assert!(snapshot.start_time.is_some());
    assert!(snapshot.end_time.is_some());
}

#[test]
fn reset_clears_all_tallies() {
    let collector = InMemoryCollector::new();
    record_ok(&collector, 10, "users_profile");
    collector.reset();

    let snapshot = collector.snapshot();
    assert!(snapshot.metrics.is_empty());
    assert!(snapshot.root_group.checks.is_empty());
}

#[test]
fn recorded_structure_lands_in_the_snapshot() {
    let collector = InMemoryCollector::new();
    let mut setup = BTreeMap::new();
    setup.insert("tenant".to_string(), "acme".to_string());
    collector.record_structure(BTreeMap::new(), setup);
    record_ok(&collector, 10, "users_profile");

    let snapshot = collector.snapshot();
    assert_eq!(snapshot.setup_data.get("tenant").map(String::as_str), Some("acme"));
}

// ============================================================================
// SECTION: Service-Call Seam
// ============================================================================

/// Stub backend with a single known operation.
struct StubClient;

impl ServiceClient for StubClient {
    fn call(
        &self,
        operation: &str,
        params: &BTreeMap<String, serde_json::Value>,
        _body: Option<&serde_json::Value>,
    ) -> Result<BTreeMap<String, serde_json::Value>, ServiceCallError> {
        match operation {
            "getUser" => {
                let mut result = BTreeMap::new();
                result.insert("status".to_string(), serde_json::json!(200));
                result.insert("id".to_string(), params["id"].clone());
                Ok(result)
            }
            other => Err(ServiceCallError::UnknownOperation(other.to_string())),
        }
    }
}

#[test]
fn service_calls_feed_the_metrics_sink() {
    let client = StubClient;
    let collector = InMemoryCollector::new();

    let mut params = BTreeMap::new();
    params.insert("id".to_string(), serde_json::json!("42"));
    let result = client.call("getUser", &params, None).unwrap();
    let status = u16::try_from(result["status"].as_u64().unwrap()).unwrap();
    collector.record_endpoint_request(
        Duration::from_millis(25),
        status,
        "GET",
        "users",
        false,
    );

    let snapshot = collector.snapshot();
    assert_eq!(snapshot.metrics["users"].values.get("count"), Some(1.0));

    let unknown = client.call("dropUser", &params, None);
    assert!(matches!(unknown, Err(ServiceCallError::UnknownOperation(_))));
}
