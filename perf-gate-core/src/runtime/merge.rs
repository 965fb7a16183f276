// perf-gate-core/src/runtime/merge.rs
// ============================================================================
// Module: Perf Gate Merge Kernel
// Description: Metric-kind-correct merging of snapshot metrics.
// Purpose: Combine two metrics into one, numerically order-independent.
// Dependencies: crate::core::metric, serde
// ============================================================================

//! ## Overview
//! The kernel dispatches on the target metric kind. Counters sum, gauges take
//! the maximum per value, rates recompute passes over total, and trends merge
//! with count-weighted statistics. A kind mismatch discards the source and is
//! reported to the caller for run-level accounting.
//!
//! A percentile present on only one side leaves the target untouched; the
//! merge is commutative up to that asymmetry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::metric::Metric;
use crate::core::metric::MetricKind;
use crate::core::metric::MetricValues;
use crate::core::metric::PERCENTILE_KEYS;
use crate::core::metric::VALUE_AVG;
use crate::core::metric::VALUE_COUNT;
use crate::core::metric::VALUE_DURATION;
use crate::core::metric::VALUE_FAILS;
use crate::core::metric::VALUE_MAX;
use crate::core::metric::VALUE_MIN;
use crate::core::metric::VALUE_PASSES;
use crate::core::metric::VALUE_RATE;
use crate::core::metric::VALUE_VALUE;

// ============================================================================
// SECTION: Merge Strategy
// ============================================================================

/// Percentile merge strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Count-weighted percentile merging.
    #[default]
    Weighted,
    /// Sketch-based merging; currently shares the weighted path.
    Sketch,
}

// ============================================================================
// SECTION: Merge Outcome
// ============================================================================

/// Outcome of a single metric merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The source was folded into the target.
    Merged,
    /// The kinds disagreed; the source was discarded.
    KindMismatch,
}

// ============================================================================
// SECTION: Merge Kernel
// ============================================================================

/// Merges `source` into `target` according to the target kind.
pub fn merge_metric(target: &mut Metric, source: &Metric, strategy: MergeStrategy) -> MergeOutcome {
    if target.kind != source.kind {
        return MergeOutcome::KindMismatch;
    }

    match target.kind {
        MetricKind::Trend => merge_trend(&mut target.values, &source.values, strategy),
        MetricKind::Counter => merge_counter(&mut target.values, &source.values),
        MetricKind::Rate => merge_rate(&mut target.values, &source.values),
        MetricKind::Gauge => merge_gauge(&mut target.values, &source.values),
    }

    MergeOutcome::Merged
}

/// Merges trend statistics with the selected strategy.
fn merge_trend(target: &mut MetricValues, source: &MetricValues, strategy: MergeStrategy) {
    match strategy {
        MergeStrategy::Weighted | MergeStrategy::Sketch => merge_trend_weighted(target, source),
    }
}

/// Count-weighted trend merge.
fn merge_trend_weighted(target: &mut MetricValues, source: &MetricValues) {
    let target_count = target.get_or(VALUE_COUNT, 0.0);
    let source_count = source.get_or(VALUE_COUNT, 0.0);
    let total = target_count + source_count;
    if total <= 0.0 {
        return;
    }

    target.set(VALUE_COUNT, total);
    merge_extremum(target, source, VALUE_MIN, f64::min);
    merge_extremum(target, source, VALUE_MAX, f64::max);

    let target_avg = target.get_or(VALUE_AVG, 0.0);
    let source_avg = source.get_or(VALUE_AVG, 0.0);
    target.set(VALUE_AVG, (target_avg * target_count + source_avg * source_count) / total);

    for key in PERCENTILE_KEYS {
        if let (Some(target_value), Some(source_value)) = (target.get(key), source.get(key)) {
            let weighted = (target_value * target_count + source_value * source_count) / total;
            target.set(key, weighted);
        }
    }

    if target.contains(VALUE_RATE) {
        let duration = target.get_or(VALUE_DURATION, 1.0);
        target.set(VALUE_RATE, total / duration);
    }
}

/// Takes the elementwise extremum of a value present on either side.
fn merge_extremum(
    target: &mut MetricValues,
    source: &MetricValues,
    key: &str,
    pick: fn(f64, f64) -> f64,
) {
    match (target.get(key), source.get(key)) {
        (Some(target_value), Some(source_value)) => {
            target.set(key, pick(target_value, source_value));
        }
        (None, Some(source_value)) => target.set(key, source_value),
        _ => {}
    }
}

/// Sums counter counts and recomputes the per-second rate.
fn merge_counter(target: &mut MetricValues, source: &MetricValues) {
    let total = target.get_or(VALUE_COUNT, 0.0) + source.get_or(VALUE_COUNT, 0.0);
    target.set(VALUE_COUNT, total);
    if total > 0.0 {
        let duration = target.get_or(VALUE_DURATION, 1.0);
        target.set(VALUE_RATE, total / duration);
    }
}

/// Sums rate tallies and recomputes the pass ratio.
fn merge_rate(target: &mut MetricValues, source: &MetricValues) {
    let passes = target.get_or(VALUE_PASSES, 0.0) + source.get_or(VALUE_PASSES, 0.0);
    let fails = target.get_or(VALUE_FAILS, 0.0) + source.get_or(VALUE_FAILS, 0.0);
    target.set(VALUE_PASSES, passes);
    target.set(VALUE_FAILS, fails);

    let total = passes + fails;
    if total > 0.0 {
        target.set(VALUE_VALUE, passes / total);
    }
}

/// Takes the per-value maximum, copying values absent on the target.
fn merge_gauge(target: &mut MetricValues, source: &MetricValues) {
    for (key, source_value) in source.iter() {
        match target.get(key) {
            Some(target_value) => target.set(key, target_value.max(source_value)),
            None => target.set(key, source_value),
        }
    }
}
