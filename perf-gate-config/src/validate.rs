// perf-gate-config/src/validate.rs
// ============================================================================
// Module: Perf Gate Threshold Validator
// Description: Applies resolved thresholds to an aggregate snapshot.
// Purpose: Produce breach records with severity for every violated threshold.
// Dependencies: crate::config, perf-gate-core, serde
// ============================================================================

//! ## Overview
//! The validator walks every endpoint metric in the aggregate, resolves its
//! effective thresholds, and compares observed values against the threshold
//! plus tolerance headroom. A breach within one-and-a-half times the
//! tolerance band is a warning; beyond it, an error. Endpoints with too few
//! samples are skipped entirely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use perf_gate_core::Snapshot;
use perf_gate_core::is_global_metric;
use perf_gate_core::metric::Metric;
use perf_gate_core::metric::VALUE_COUNT;
use perf_gate_core::metric::VALUE_FAILS;
use perf_gate_core::metric::VALUE_RATE;
use serde::Serialize;

use crate::config::DurationThreshold;
use crate::config::ThresholdConfig;
use crate::config::ThresholdValues;

// ============================================================================
// SECTION: Units
// ============================================================================

/// Unit label for duration breaches.
pub const UNIT_MILLISECONDS: &str = "ms";
/// Unit label for error-rate breaches.
pub const UNIT_PERCENT: &str = "%";
/// Unit label for throughput breaches.
pub const UNIT_REQUESTS_PER_SECOND: &str = "req/s";

/// Ratio of the tolerance band separating warnings from errors.
const WARNING_BAND_RATIO: f64 = 1.5;

/// Duration threshold keys checked per endpoint, in report order.
const DURATION_CHECKS: [&str; 6] = ["p(50)", "p(90)", "p(95)", "p(99)", "avg", "max"];

// ============================================================================
// SECTION: Breach Records
// ============================================================================

/// Breach severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Observed value is within the extended tolerance band.
    Warning,
    /// Observed value is beyond the extended tolerance band.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single threshold violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breach {
    /// Endpoint key the violated metric belongs to.
    pub endpoint: String,
    /// Violated metric value name.
    pub metric: String,
    /// Observed value.
    pub value: f64,
    /// Configured threshold value.
    pub threshold: f64,
    /// Unit shared by the observed and threshold values.
    pub unit: &'static str,
    /// Breach severity.
    pub severity: Severity,
    /// Sample count backing the observation.
    pub sample_count: u64,
}

/// Tallied breach counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BreachSummary {
    /// Total number of breaches.
    pub total: usize,
    /// Number of error-severity breaches.
    pub errors: usize,
    /// Number of warning-severity breaches.
    pub warnings: usize,
}

/// Tallies breaches by severity.
#[must_use]
pub fn breach_summary(breaches: &[Breach]) -> BreachSummary {
    let errors = breaches.iter().filter(|b| b.severity == Severity::Error).count();
    BreachSummary {
        total: breaches.len(),
        errors,
        warnings: breaches.len() - errors,
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

impl ThresholdConfig {
    /// Validates an aggregate snapshot and returns all breaches.
    ///
    /// Endpoint order is deterministic (metric-name order); global metrics
    /// are never validated.
    #[must_use]
    pub fn validate_snapshot(&self, snapshot: &Snapshot) -> Vec<Breach> {
        let mut breaches = Vec::new();

        for (name, metric) in &snapshot.metrics {
            if is_global_metric(name) {
                continue;
            }

            let thresholds = self.resolve(name);
            let sample_count = sample_count(metric);
            let min_samples = thresholds.min_samples.unwrap_or(self.options.min_samples);
            if sample_count < min_samples {
                continue;
            }

            self.check_durations(name, metric, &thresholds, sample_count, &mut breaches);
            self.check_rates(name, metric, &thresholds, sample_count, &mut breaches);
        }

        breaches
    }

    /// Checks the duration thresholds for one endpoint.
    fn check_durations(
        &self,
        endpoint: &str,
        metric: &Metric,
        thresholds: &ThresholdValues,
        sample_count: u64,
        breaches: &mut Vec<Breach>,
    ) {
        let configured: [(&str, Option<DurationThreshold>); 6] = [
            (DURATION_CHECKS[0], thresholds.p50),
            (DURATION_CHECKS[1], thresholds.p90),
            (DURATION_CHECKS[2], thresholds.p95),
            (DURATION_CHECKS[3], thresholds.p99),
            (DURATION_CHECKS[4], thresholds.avg),
            (DURATION_CHECKS[5], thresholds.max),
        ];

        for (key, threshold) in configured {
            let Some(threshold) = threshold else {
                continue;
            };
            let Some(observed) = metric.values.get(key) else {
                continue;
            };

            let threshold_ms = threshold.millis();
            let tolerance =
                threshold.tolerance_percent.unwrap_or(self.options.tolerance_percent);
            if let Some(severity) = judge(observed, threshold_ms, tolerance) {
                breaches.push(Breach {
                    endpoint: endpoint.to_string(),
                    metric: key.to_string(),
                    value: observed,
                    threshold: threshold_ms,
                    unit: UNIT_MILLISECONDS,
                    severity,
                    sample_count,
                });
            }
        }
    }

    /// Checks the error-rate and throughput thresholds for one endpoint.
    fn check_rates(
        &self,
        endpoint: &str,
        metric: &Metric,
        thresholds: &ThresholdValues,
        sample_count: u64,
        breaches: &mut Vec<Breach>,
    ) {
        if let Some(threshold) = thresholds.error_rate {
            let fails = metric.values.get_or(VALUE_FAILS, 0.0);
            let count = metric.values.get_or(VALUE_COUNT, 0.0);
            let observed = if count > 0.0 { fails / count } else { 0.0 };
            let tolerance =
                threshold.tolerance_percent.unwrap_or(self.options.tolerance_percent);
            if let Some(severity) = judge(observed, threshold.value, tolerance) {
                breaches.push(Breach {
                    endpoint: endpoint.to_string(),
                    metric: "error_rate".to_string(),
                    value: observed * 100.0,
                    threshold: threshold.value * 100.0,
                    unit: UNIT_PERCENT,
                    severity,
                    sample_count,
                });
            }
        }

        if let Some(threshold) = thresholds.rps {
            let Some(observed) = metric.values.get(VALUE_RATE) else {
                return;
            };
            let tolerance =
                threshold.tolerance_percent.unwrap_or(self.options.tolerance_percent);
            if let Some(severity) = judge(observed, threshold.value, tolerance) {
                breaches.push(Breach {
                    endpoint: endpoint.to_string(),
                    metric: "rps".to_string(),
                    value: observed,
                    threshold: threshold.value,
                    unit: UNIT_REQUESTS_PER_SECOND,
                    severity,
                    sample_count,
                });
            }
        }
    }
}

/// Compares an observation against a threshold with tolerance headroom.
///
/// Returns the breach severity, or `None` when the observation is within the
/// effective threshold.
fn judge(observed: f64, threshold: f64, tolerance_percent: f64) -> Option<Severity> {
    let effective = threshold * (1.0 + tolerance_percent / 100.0);
    if observed <= effective {
        return None;
    }

    let warning_bound = threshold * (1.0 + WARNING_BAND_RATIO * tolerance_percent / 100.0);
    if observed <= warning_bound {
        Some(Severity::Warning)
    } else {
        Some(Severity::Error)
    }
}

/// Extracts the sample count from a metric, floored to an integer.
fn sample_count(metric: &Metric) -> u64 {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "counts are non-negative and far below 2^52"
    )]
    let floored = metric.values.get_or(VALUE_COUNT, 0.0).max(0.0).floor() as u64;
    floored
}
