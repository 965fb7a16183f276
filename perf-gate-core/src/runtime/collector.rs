// perf-gate-core/src/runtime/collector.rs
// ============================================================================
// Module: Perf Gate In-Memory Collector
// Description: Records request observations and renders snapshots.
// Purpose: Provide the recording side of the aggregation pipeline.
// Dependencies: crate::{core, interfaces}, chrono
// ============================================================================

//! ## Overview
//! The collector accumulates per-request durations, status codes, and error
//! tallies, both run-wide and per endpoint, and renders them as a snapshot:
//! trend statistics with interpolated percentiles, counters with per-second
//! rates, pass/fail rates, and gauges. A request counts as failed when it
//! carries a transport error or a status of 400 or above. Each request
//! increments its status-code counter exactly once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;

use crate::core::hashing::content_id;
use crate::core::metric::Metric;
use crate::core::metric::MetricKind;
use crate::core::metric::PERCENTILE_KEYS;
use crate::core::metric::VALUE_AVG;
use crate::core::metric::VALUE_COUNT;
use crate::core::metric::VALUE_FAILS;
use crate::core::metric::VALUE_MAX;
use crate::core::metric::VALUE_MIN;
use crate::core::metric::VALUE_PASSES;
use crate::core::metric::VALUE_RATE;
use crate::core::metric::VALUE_VALUE;
use crate::core::snapshot::Snapshot;
use crate::core::snapshot::TestCheck;
use crate::core::snapshot::TestGroup;
use crate::interfaces::MetricsSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Estimated bytes sent per request, pending real transport accounting.
const ESTIMATED_BYTES_SENT: f64 = 1024.0;
/// Estimated bytes received per request, pending real transport accounting.
const ESTIMATED_BYTES_RECEIVED: f64 = 2048.0;
/// Status at or above which a response counts as failed.
const FAILURE_STATUS: u16 = 400;

// ============================================================================
// SECTION: State
// ============================================================================

/// Tallies tracked for one endpoint.
#[derive(Debug, Default, Clone)]
struct EndpointTallies {
    /// Request durations in milliseconds.
    samples: Vec<f64>,
    /// Responses per status code.
    status_codes: BTreeMap<u16, u64>,
    /// Failed request count.
    errors: u64,
    /// Total request count.
    total: u64,
}

/// Collector state behind the instance lock.
#[derive(Debug)]
struct CollectorState {
    /// Run-wide request durations in milliseconds.
    samples: Vec<f64>,
    /// Run-wide responses per status code.
    status_codes: BTreeMap<u16, u64>,
    /// Run-wide failed request count.
    errors: u64,
    /// Run-wide total request count.
    total: u64,
    /// Per-endpoint tallies keyed by `METHOD template`.
    endpoints: BTreeMap<String, EndpointTallies>,
    /// Recorded test groups.
    groups: BTreeMap<String, TestGroup>,
    /// Recorded setup data.
    setup_data: BTreeMap<String, String>,
    /// Start of the observation window.
    started_at: DateTime<Utc>,
}

impl CollectorState {
    /// Creates a fresh state starting now.
    fn new() -> Self {
        Self {
            samples: Vec::new(),
            status_codes: BTreeMap::new(),
            errors: 0,
            total: 0,
            endpoints: BTreeMap::new(),
            groups: BTreeMap::new(),
            setup_data: BTreeMap::new(),
            started_at: Utc::now(),
        }
    }

    /// Applies one request observation to the run-wide tallies.
    fn observe(&mut self, duration: Duration, status: u16, transport_error: bool) -> bool {
        let failed = transport_error || status >= FAILURE_STATUS;
        self.samples.push(duration_ms(duration));
        self.total += 1;
        if failed {
            self.errors += 1;
        }
        *self.status_codes.entry(status).or_insert(0) += 1;
        failed
    }
}

// ============================================================================
// SECTION: Collector
// ============================================================================

/// Thread-safe in-memory metrics collector.
#[derive(Debug)]
pub struct InMemoryCollector {
    /// All collected state behind one lock.
    state: Mutex<CollectorState>,
}

impl InMemoryCollector {
    /// Creates an empty collector whose window starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CollectorState::new()),
        }
    }

    /// Locks the state, recovering from poisoning.
    fn locked(&self) -> std::sync::MutexGuard<'_, CollectorState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for InMemoryCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for InMemoryCollector {
    fn record_request(&self, duration: Duration, status: u16, transport_error: bool) {
        let mut state = self.locked();
        state.observe(duration, status, transport_error);
    }

    fn record_endpoint_request(
        &self,
        duration: Duration,
        status: u16,
        method: &str,
        endpoint: &str,
        transport_error: bool,
    ) {
        let mut state = self.locked();
        let failed = state.observe(duration, status, transport_error);

        let key = format!("{method} {endpoint}");
        let tallies = state.endpoints.entry(key).or_default();
        tallies.samples.push(duration_ms(duration));
        tallies.total += 1;
        if failed {
            tallies.errors += 1;
        }
        *tallies.status_codes.entry(status).or_insert(0) += 1;
    }

    fn record_structure(
        &self,
        groups: BTreeMap<String, TestGroup>,
        setup_data: BTreeMap<String, String>,
    ) {
        let mut state = self.locked();
        state.groups = groups;
        state.setup_data = setup_data;
    }

    fn snapshot(&self) -> Snapshot {
        let state = self.locked();
        render_snapshot(&state, Utc::now())
    }

    fn reset(&self) {
        let mut state = self.locked();
        *state = CollectorState::new();
    }
}

// ============================================================================
// SECTION: Snapshot Rendering
// ============================================================================

/// Renders the collected state as a snapshot ending at `ended_at`.
fn render_snapshot(state: &CollectorState, ended_at: DateTime<Utc>) -> Snapshot {
    let mut snapshot = Snapshot::skeleton();
    snapshot.root_group.groups = state.groups.clone();
    snapshot.setup_data = state.setup_data.clone();
    snapshot.start_time = Some(state.started_at);
    snapshot.end_time = Some(ended_at);

    if state.total == 0 {
        return snapshot;
    }

    let window = window_seconds(state.started_at, ended_at);
    let total = count_f64(state.total);

    let mut duration_trend = trend_metric(&state.samples);
    duration_trend.values.set(VALUE_COUNT, total);
    duration_trend.values.set(VALUE_RATE, per_second(total, window));
    snapshot.metrics.insert("http_req_duration".to_string(), duration_trend);

    snapshot.metrics.insert(
        "http_reqs".to_string(),
        counter_metric(total, window),
    );
    snapshot.metrics.insert(
        "iterations".to_string(),
        counter_metric(total, window),
    );

    for (status, count) in &state.status_codes {
        snapshot.metrics.insert(
            format!("http_req_status_{status}"),
            Metric::with_values(MetricKind::Counter, [(VALUE_COUNT, count_f64(*count))]),
        );
    }

    let errors = count_f64(state.errors);
    snapshot
        .metrics
        .insert("http_req_failed".to_string(), failure_rate_metric(errors, total));
    snapshot.metrics.insert(
        "checks".to_string(),
        rate_metric(total - errors, errors),
    );

    snapshot.metrics.insert(
        "data_sent".to_string(),
        counter_metric(total * ESTIMATED_BYTES_SENT, window),
    );
    snapshot.metrics.insert(
        "data_received".to_string(),
        counter_metric(total * ESTIMATED_BYTES_RECEIVED, window),
    );

    snapshot.metrics.insert("vus".to_string(), unit_gauge());
    snapshot.metrics.insert("vus_max".to_string(), unit_gauge());

    render_endpoints(state, &mut snapshot, window);

    snapshot
}

/// Renders per-endpoint trend metrics, checks, and status counters.
fn render_endpoints(state: &CollectorState, snapshot: &mut Snapshot, window: f64) {
    for (key, tallies) in &state.endpoints {
        if tallies.samples.is_empty() {
            continue;
        }

        let template = key.split_once(' ').map_or(key.as_str(), |(_, template)| template);
        let endpoint_total = count_f64(tallies.total);
        let endpoint_errors = count_f64(tallies.errors);

        let mut trend = trend_metric(&tallies.samples);
        trend.values.set(VALUE_COUNT, endpoint_total);
        trend.values.set(VALUE_RATE, per_second(endpoint_total, window));
        snapshot.metrics.insert(template.to_string(), trend);

        let check_path = format!("::{template}");
        snapshot.root_group.checks.insert(
            template.to_string(),
            TestCheck {
                name: template.to_string(),
                path: check_path.clone(),
                id: content_id(&check_path),
                passes: tallies.total - tallies.errors,
                fails: tallies.errors,
            },
        );

        for (status, count) in &tallies.status_codes {
            snapshot.metrics.insert(
                format!("http_req_status_{template}_{status}"),
                Metric::with_values(MetricKind::Counter, [(VALUE_COUNT, count_f64(*count))]),
            );
        }

        if tallies.errors > 0 {
            snapshot.metrics.insert(
                format!("http_req_failed_{template}"),
                failure_rate_metric(endpoint_errors, endpoint_total),
            );
        }
    }
}

// ============================================================================
// SECTION: Metric Builders
// ============================================================================

/// Builds a trend metric from duration samples in milliseconds.
fn trend_metric(samples: &[f64]) -> Metric {
    let mut metric = Metric::new(MetricKind::Trend);
    if samples.is_empty() {
        return metric;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    metric.values.set(VALUE_MIN, sorted[0]);
    metric.values.set(VALUE_MAX, sorted[sorted.len() - 1]);
    #[allow(clippy::cast_precision_loss, reason = "sample counts are far below 2^52")]
    let average = sorted.iter().sum::<f64>() / sorted.len() as f64;
    metric.values.set(VALUE_AVG, average);

    for (key, quantile) in PERCENTILE_KEYS.into_iter().zip([50.0, 90.0, 95.0, 99.0]) {
        metric.values.set(key, percentile(&sorted, quantile));
    }

    metric
}

/// Builds a counter metric with a per-second rate over the window.
fn counter_metric(count: f64, window: f64) -> Metric {
    Metric::with_values(
        MetricKind::Counter,
        [(VALUE_COUNT, count), (VALUE_RATE, per_second(count, window))],
    )
}

/// Builds a pass/fail rate metric.
fn rate_metric(passes: f64, fails: f64) -> Metric {
    let total = passes + fails;
    let value = if total > 0.0 { passes / total } else { 0.0 };
    Metric::with_values(
        MetricKind::Rate,
        [(VALUE_PASSES, passes), (VALUE_FAILS, fails), (VALUE_VALUE, value)],
    )
}

/// Builds the failure-rate metric; failed requests are the passing
/// observations of this rate.
fn failure_rate_metric(errors: f64, total: f64) -> Metric {
    rate_metric(errors, total - errors)
}

/// Builds the constant single-user gauge.
fn unit_gauge() -> Metric {
    Metric::with_values(MetricKind::Gauge, [(VALUE_VALUE, 1.0), (VALUE_MIN, 1.0), (VALUE_MAX, 1.0)])
}

// ============================================================================
// SECTION: Numeric Helpers
// ============================================================================

/// Interpolated percentile over sorted samples.
fn percentile(sorted: &[f64], quantile: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss, reason = "sample counts are far below 2^52")]
    let index = quantile / 100.0 * (sorted.len() - 1) as f64;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "index is non-negative and bounded by the sample count"
    )]
    let lower = index.floor() as usize;
    let upper = lower.saturating_add(1).min(sorted.len() - 1);
    let weight = index - index.floor();

    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Converts a duration to milliseconds.
fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Observation window length in seconds.
fn window_seconds(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> f64 {
    let micros = ended_at.signed_duration_since(started_at).num_microseconds().unwrap_or(0);
    #[allow(clippy::cast_precision_loss, reason = "window lengths are far below 2^52")]
    let seconds = micros as f64 / 1_000_000.0;
    seconds
}

/// Per-second rate over the window, zero for degenerate windows.
fn per_second(count: f64, window: f64) -> f64 {
    if window <= 0.0 {
        return 0.0;
    }
    count / window
}

/// Converts a tally to a float value.
#[allow(clippy::cast_precision_loss, reason = "tallies are far below 2^52")]
fn count_f64(count: u64) -> f64 {
    count as f64
}
