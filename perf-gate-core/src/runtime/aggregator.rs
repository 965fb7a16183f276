// perf-gate-core/src/runtime/aggregator.rs
// ============================================================================
// Module: Perf Gate Aggregation Orchestrator
// Description: Parallel snapshot ingest and deterministic merge reduction.
// Purpose: Fold per-run snapshot files into one aggregate snapshot.
// Dependencies: crate::{core, runtime}, serde, thiserror
// ============================================================================

//! ## Overview
//! The orchestrator spawns one worker per input file, collects results at a
//! bounded rendezvous channel, then reduces sequentially in sorted-path order
//! so runs are reproducible. Endpoint metrics are admitted through the
//! cardinality controller; global metrics merge into the aggregate directly.
//! Any ingest failure aborts the run naming the offending file; partial
//! aggregates are never written.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::core::cardinality::Admission;
use crate::core::cardinality::CardinalityController;
use crate::core::cardinality::OVERFLOW_BUCKET;
use crate::core::metric::Metric;
use crate::core::metric::is_global_metric;
use crate::core::snapshot::Snapshot;
use crate::runtime::merge::MergeOutcome;
use crate::runtime::merge::MergeStrategy;
use crate::runtime::merge::merge_metric;
use crate::runtime::reader::SnapshotReadError;
use crate::runtime::reader::read_snapshot;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default cardinality ceiling for the aggregator.
pub const DEFAULT_AGGREGATOR_MAX_ENDPOINTS: usize = 2000;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for an aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Cardinality ceiling for distinct endpoint keys.
    pub max_endpoints: usize,
    /// Drop overflow samples instead of bucketing them into `other`.
    pub no_bucket: bool,
    /// Percentile merge strategy.
    pub strategy: MergeStrategy,
    /// Optional per-file read deadline; a missed deadline is a read error.
    pub read_timeout: Option<Duration>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_endpoints: DEFAULT_AGGREGATOR_MAX_ENDPOINTS,
            no_bucket: false,
            strategy: MergeStrategy::Weighted,
            read_timeout: None,
        }
    }
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Cooperative cancellation signal shared with ingest workers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    /// Shared cancellation flag.
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Aggregation run failures.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// No input snapshots were supplied.
    #[error("no input snapshots to aggregate")]
    NoInput,
    /// Reading an input snapshot failed.
    #[error(transparent)]
    Read(#[from] SnapshotReadError),
    /// The run was cancelled before the aggregate was complete.
    #[error("aggregation cancelled")]
    Cancelled,
    /// Writing the aggregate artifact failed.
    #[error("failed to write aggregate output: {path}: {detail}")]
    Write {
        /// Output file path.
        path: String,
        /// Underlying failure description.
        detail: String,
    },
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Run-level aggregation statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    /// Number of snapshots folded into the aggregate.
    pub files_merged: usize,
    /// Number of distinct endpoint keys admitted.
    pub endpoint_count: usize,
    /// Number of samples routed to the overflow bucket.
    pub endpoints_bucketed: usize,
    /// Number of merges discarded because metric kinds disagreed.
    pub kind_mismatches: u64,
}

/// Aggregation result: the aggregate snapshot plus run statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    /// The merged aggregate snapshot.
    pub snapshot: Snapshot,
    /// Run-level statistics.
    pub stats: AggregateStats,
}

// ============================================================================
// SECTION: Worker Protocol
// ============================================================================

/// Message sent by one ingest worker to the rendezvous channel.
enum WorkerResult {
    /// Snapshot parsed successfully.
    Parsed(Snapshot),
    /// Reading or parsing failed.
    Failed(SnapshotReadError),
    /// The worker observed cancellation and abandoned its file.
    Abandoned,
}

// ============================================================================
// SECTION: File Aggregation
// ============================================================================

/// Reads all input files in parallel and folds them into one aggregate.
///
/// # Errors
///
/// Returns [`AggregateError::NoInput`] for an empty input set,
/// [`AggregateError::Read`] naming the first offending file in sorted order,
/// and [`AggregateError::Cancelled`] when the token fires mid-run.
pub fn aggregate_files(
    inputs: &[PathBuf],
    config: &AggregatorConfig,
    cancel: &CancelToken,
) -> Result<AggregateReport, AggregateError> {
    if inputs.is_empty() {
        return Err(AggregateError::NoInput);
    }

    let mut sorted: Vec<PathBuf> = inputs.to_vec();
    sorted.sort();

    let (sender, receiver) = mpsc::sync_channel::<(usize, WorkerResult)>(sorted.len());
    for (index, path) in sorted.iter().enumerate() {
        let sender = sender.clone();
        let cancel = cancel.clone();
        let path = path.clone();
        thread::spawn(move || {
            let result = if cancel.is_cancelled() {
                WorkerResult::Abandoned
            } else {
                match read_snapshot(&path) {
                    Ok(snapshot) => WorkerResult::Parsed(snapshot),
                    Err(err) => WorkerResult::Failed(err),
                }
            };
            // The receiver may already have given up; nothing to do then.
            let _ = sender.send((index, result));
        });
    }
    drop(sender);

    let results = collect_results(&receiver, &sorted, config.read_timeout, cancel)?;

    let mut snapshots = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Some(WorkerResult::Parsed(snapshot)) => snapshots.push(snapshot),
            Some(WorkerResult::Failed(err)) => return Err(AggregateError::Read(err)),
            Some(WorkerResult::Abandoned) | None => return Err(AggregateError::Cancelled),
        }
    }

    aggregate_snapshots(snapshots, config)
}

/// Drains the rendezvous channel, honoring the per-file deadline.
fn collect_results(
    receiver: &mpsc::Receiver<(usize, WorkerResult)>,
    sorted: &[PathBuf],
    read_timeout: Option<Duration>,
    cancel: &CancelToken,
) -> Result<Vec<Option<WorkerResult>>, AggregateError> {
    let mut results: Vec<Option<WorkerResult>> = Vec::new();
    results.resize_with(sorted.len(), || None);

    let mut received = 0_usize;
    while received < sorted.len() {
        if cancel.is_cancelled() {
            return Err(AggregateError::Cancelled);
        }

        let message = match read_timeout {
            Some(limit) => match receiver.recv_timeout(limit) {
                Ok(message) => message,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    cancel.cancel();
                    return Err(timed_out_file(&results, sorted));
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(AggregateError::Cancelled);
                }
            },
            None => match receiver.recv() {
                Ok(message) => message,
                // A vanished worker is indistinguishable from cancellation.
                Err(mpsc::RecvError) => return Err(AggregateError::Cancelled),
            },
        };

        let (index, result) = message;
        results[index] = Some(result);
        received += 1;
    }

    Ok(results)
}

/// Names the first still-outstanding file as a timed-out read.
fn timed_out_file(results: &[Option<WorkerResult>], sorted: &[PathBuf]) -> AggregateError {
    let index = results.iter().position(Option::is_none).unwrap_or(0);
    let path = sorted.get(index).map_or_else(String::new, |p| p.display().to_string());
    AggregateError::Read(SnapshotReadError::Io {
        path,
        detail: "read timed out".to_string(),
    })
}

// ============================================================================
// SECTION: Snapshot Aggregation
// ============================================================================

/// Folds parsed snapshots into one aggregate, in input order.
///
/// # Errors
///
/// Returns [`AggregateError::NoInput`] when `snapshots` is empty.
pub fn aggregate_snapshots(
    snapshots: Vec<Snapshot>,
    config: &AggregatorConfig,
) -> Result<AggregateReport, AggregateError> {
    if snapshots.is_empty() {
        return Err(AggregateError::NoInput);
    }

    let mut aggregate = Snapshot::skeleton();
    let controller = CardinalityController::new(config.max_endpoints, config.no_bucket);
    let mut globals: BTreeMap<String, Metric> = BTreeMap::new();
    let mut stats = AggregateStats {
        files_merged: snapshots.len(),
        ..AggregateStats::default()
    };

    for snapshot in &snapshots {
        widen_time_span(&mut aggregate, snapshot);
        merge_checks(&mut aggregate, snapshot);

        for (name, metric) in &snapshot.metrics {
            if is_global_metric(name) {
                fold_metric(&mut globals, name.clone(), metric, config.strategy, &mut stats);
                continue;
            }

            let key = match controller.admit(name, name) {
                Admission::Admitted(key) => key,
                Admission::Bucketed => OVERFLOW_BUCKET.to_string(),
                Admission::Dropped => continue,
            };
            fold_metric(&mut aggregate.metrics, key, metric, config.strategy, &mut stats);
        }
    }

    aggregate.metrics.extend(globals);

    let cardinality = controller.stats();
    stats.endpoint_count = cardinality.unique_endpoints;
    stats.endpoints_bucketed = cardinality.endpoints_bucketed;

    Ok(AggregateReport {
        snapshot: aggregate,
        stats,
    })
}

/// Merges a metric into the map, cloning on first insert.
fn fold_metric(
    metrics: &mut BTreeMap<String, Metric>,
    key: String,
    source: &Metric,
    strategy: MergeStrategy,
    stats: &mut AggregateStats,
) {
    match metrics.get_mut(&key) {
        Some(target) => {
            if merge_metric(target, source, strategy) == MergeOutcome::KindMismatch {
                stats.kind_mismatches += 1;
            }
        }
        None => {
            metrics.insert(key, source.clone());
        }
    }
}

/// Widens the aggregate observation window to cover a source snapshot.
fn widen_time_span(aggregate: &mut Snapshot, source: &Snapshot) {
    if let Some(start) = source.start_time {
        aggregate.start_time = Some(match aggregate.start_time {
            Some(current) => current.min(start),
            None => start,
        });
    }
    if let Some(end) = source.end_time {
        aggregate.end_time = Some(match aggregate.end_time {
            Some(current) => current.max(end),
            None => end,
        });
    }
}

/// Sums root-group check tallies into the aggregate.
fn merge_checks(aggregate: &mut Snapshot, source: &Snapshot) {
    for (name, check) in &source.root_group.checks {
        match aggregate.root_group.checks.get_mut(name) {
            Some(existing) => {
                existing.passes += check.passes;
                existing.fails += check.fails;
            }
            None => {
                aggregate.root_group.checks.insert(name.clone(), check.clone());
            }
        }
    }
}

// ============================================================================
// SECTION: Artifact Output
// ============================================================================

/// Writes the aggregate snapshot as two-space indented JSON.
///
/// # Errors
///
/// Returns [`AggregateError::Write`] naming the output path on failure.
pub fn write_snapshot(snapshot: &Snapshot, path: &Path) -> Result<(), AggregateError> {
    let rendered =
        serde_json::to_string_pretty(snapshot).map_err(|err| AggregateError::Write {
            path: path.display().to_string(),
            detail: err.to_string(),
        })?;
    fs::write(path, rendered).map_err(|err| AggregateError::Write {
        path: path.display().to_string(),
        detail: err.to_string(),
    })
}
