// perf-gate-core/src/core/metric.rs
// ============================================================================
// Module: Perf Gate Metric Model
// Description: Metric kinds and the numeric value mapping.
// Purpose: Provide the tagged metric record used across the pipeline.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A metric is a kind tag (counter, gauge, rate, trend) plus a mapping from
//! value name to number. The mapping is open, with a small canonical set of
//! names per kind; non-numeric wire entries are dropped on read. Global
//! metrics are the fixed run-level set that bypasses cardinality control.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

// ============================================================================
// SECTION: Value Names
// ============================================================================

/// Canonical `count` value name (counters and trends).
pub const VALUE_COUNT: &str = "count";
/// Canonical `rate` value name (counters; derived per-second rate).
pub const VALUE_RATE: &str = "rate";
/// Canonical `value` value name (gauges and rates).
pub const VALUE_VALUE: &str = "value";
/// Canonical `min` value name (gauges and trends).
pub const VALUE_MIN: &str = "min";
/// Canonical `max` value name (gauges and trends).
pub const VALUE_MAX: &str = "max";
/// Canonical `avg` value name (trends).
pub const VALUE_AVG: &str = "avg";
/// Canonical `passes` value name (rates).
pub const VALUE_PASSES: &str = "passes";
/// Canonical `fails` value name (rates).
pub const VALUE_FAILS: &str = "fails";
/// Stored observation window in seconds, when a producer recorded one.
pub const VALUE_DURATION: &str = "duration";

/// Percentile value names carried by trend metrics, in ascending order.
pub const PERCENTILE_KEYS: [&str; 4] = ["p(50)", "p(90)", "p(95)", "p(99)"];

// ============================================================================
// SECTION: Metric Kind
// ============================================================================

/// Metric kinds supported by the aggregation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonic event count with a derived per-second rate.
    Counter,
    /// Point-in-time value with observed min/max.
    Gauge,
    /// Pass/fail ratio in `[0, 1]`.
    Rate,
    /// Distributional statistics over a sample of durations.
    Trend,
}

// ============================================================================
// SECTION: Metric Values
// ============================================================================

/// Numeric value mapping for a metric.
///
/// Deserialization keeps only numeric entries; producers occasionally attach
/// nested annotation objects that the numeric model has no use for.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricValues(BTreeMap<String, f64>);

impl MetricValues {
    /// Creates an empty value mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the value stored under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Returns the value stored under `name`, or `default` when absent.
    #[must_use]
    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    /// Stores `value` under `name`, replacing any previous value.
    pub fn set(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    /// Returns whether a value is stored under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for MetricValues {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut values = BTreeMap::new();
        for (name, value) in raw {
            if let Some(number) = value.as_f64() {
                values.insert(name, number);
            }
        }
        Ok(Self(values))
    }
}

impl FromIterator<(String, f64)> for MetricValues {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// SECTION: Metric
// ============================================================================

/// A tagged metric record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Metric kind tag.
    #[serde(rename = "type")]
    pub kind: MetricKind,
    /// Numeric values keyed by value name.
    pub values: MetricValues,
}

impl Metric {
    /// Creates a metric of the given kind with no values.
    #[must_use]
    pub const fn new(kind: MetricKind) -> Self {
        Self {
            kind,
            values: MetricValues::new(),
        }
    }

    /// Creates a metric of the given kind from `(name, value)` pairs.
    #[must_use]
    pub fn with_values<I>(kind: MetricKind, values: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, f64)>,
    {
        Self {
            kind,
            values: values.into_iter().map(|(name, value)| (name.to_string(), value)).collect(),
        }
    }
}

// ============================================================================
// SECTION: Global Metrics
// ============================================================================

/// Run-level metric names that bypass endpoint cardinality control.
pub const GLOBAL_METRICS: &[&str] = &[
    "checks",
    "data_received",
    "data_sent",
    "http_req_duration",
    "http_req_failed",
    "http_reqs",
    "iterations",
    "vus",
    "vus_max",
    "http_req_blocked",
    "http_req_connecting",
    "http_req_sending",
    "http_req_waiting",
    "http_req_receiving",
    "http_req_tls_handshaking",
];

/// Returns whether `name` is a global metric or a derivative of one.
///
/// A derivative is any name of the form `<global>_<suffix>`, such as the
/// per-endpoint `http_req_failed_users_profile`.
#[must_use]
pub fn is_global_metric(name: &str) -> bool {
    GLOBAL_METRICS.iter().any(|global| {
        name.strip_prefix(global).is_some_and(|rest| rest.is_empty() || rest.starts_with('_'))
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
