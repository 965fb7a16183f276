// perf-gate-cli/src/report.rs
// ============================================================================
// Module: Report Command
// Description: Aggregates snapshot files and runs threshold validation.
// Purpose: Implement the perf-gate report verb end to end.
// Dependencies: perf-gate-config, perf-gate-core, crate::{i18n, junit, summary}
// ============================================================================

//! ## Overview
//! The report command folds the input snapshot files into one aggregate,
//! writes the JSON artifact, optionally validates thresholds (explicit config
//! file, then `thresholds.yml` in the working directory, then the built-in
//! defaults), and emits the JUnit and text-summary reports. Breaches fail the
//! run only when hard fail is requested and the config does not opt into
//! soft fail.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use perf_gate_config::Breach;
use perf_gate_config::ThresholdConfig;
use perf_gate_config::breach_summary;
use perf_gate_core::AggregateReport;
use perf_gate_core::AggregatorConfig;
use perf_gate_core::CancelToken;
use perf_gate_core::MergeStrategy;
use perf_gate_core::aggregate_files;
use perf_gate_core::write_snapshot;
use thiserror::Error;

use crate::junit::write_junit_report;
use crate::summary::ThresholdStatus;
use crate::summary::write_summary;
use crate::t;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Threshold config file probed in the working directory when none is given.
const DEFAULT_THRESHOLDS_FILE: &str = "thresholds.yml";

// ============================================================================
// SECTION: Options
// ============================================================================

/// Resolved options for one report run.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Input snapshot files.
    pub inputs: Vec<PathBuf>,
    /// JSON artifact output path.
    pub output: PathBuf,
    /// Text summary output path.
    pub text_output: PathBuf,
    /// Skip the text summary and write only the JSON artifact.
    pub json_only: bool,
    /// Cardinality ceiling for distinct endpoint keys.
    pub max_endpoints: usize,
    /// Drop overflow endpoints instead of bucketing into `other`.
    pub no_bucket: bool,
    /// Percentile merge strategy.
    pub strategy: MergeStrategy,
    /// Validate the aggregate against threshold configuration.
    pub check_thresholds: bool,
    /// Explicit threshold configuration file.
    pub thresholds: Option<PathBuf>,
    /// JUnit XML output file for threshold breaches.
    pub junit: Option<PathBuf>,
    /// Exit with an error code on threshold breaches.
    pub fail_on_breaches: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Report command failure with a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ReportError {
    /// Localized failure message.
    pub message: String,
}

impl ReportError {
    /// Wraps a localized message.
    #[must_use]
    pub const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// Report result alias.
pub type ReportResult<T> = Result<T, ReportError>;

// ============================================================================
// SECTION: Command
// ============================================================================

/// Runs the report command.
///
/// # Errors
///
/// Returns [`ReportError`] when aggregation, output, or a hard-fail breach
/// policy fails the run.
pub fn run_report(options: &ReportOptions) -> ReportResult<ExitCode> {
    emit(&t!("report.processing", count = options.inputs.len()))?;

    let aggregator = AggregatorConfig {
        max_endpoints: options.max_endpoints,
        no_bucket: options.no_bucket,
        strategy: options.strategy,
        read_timeout: None,
    };
    let cancel = CancelToken::new();
    let report = aggregate_files(&options.inputs, &aggregator, &cancel)
        .map_err(|err| ReportError::new(t!("report.aggregate_failed", error = err)))?;

    emit(&t!("report.aggregated", count = report.stats.files_merged))?;
    emit(&t!(
        "report.totals",
        endpoints = report.snapshot.metrics.len(),
        checks = report.snapshot.root_group.checks.len()
    ))?;
    if report.stats.kind_mismatches > 0 {
        emit(&t!("report.kind_mismatches", count = report.stats.kind_mismatches))?;
    }

    write_snapshot(&report.snapshot, &options.output)
        .map_err(|err| ReportError::new(t!("report.json.write_failed", error = err)))?;
    emit(&t!("report.json.written", path = options.output.display()))?;

    let validation = if options.check_thresholds {
        Some(check_thresholds(options, &report)?)
    } else {
        None
    };

    if !options.json_only {
        let status = validation.as_ref().map_or_else(ThresholdStatus::default, |outcome| {
            if outcome.configured {
                ThresholdStatus::configured(&outcome.status, &outcome.breaches)
            } else {
                ThresholdStatus::default()
            }
        });
        write_summary(&report.snapshot, status, &options.text_output).map_err(|err| {
            ReportError::new(t!(
                "report.summary.write_failed",
                path = options.text_output.display(),
                error = err
            ))
        })?;
        emit(&t!("report.summary.written", path = options.text_output.display()))?;
    }

    if let Some(outcome) = validation {
        let summary = breach_summary(&outcome.breaches);
        if options.fail_on_breaches && !outcome.soft_fail && summary.total > 0 {
            return Err(ReportError::new(t!(
                "report.breaches.hard_fail",
                errors = summary.errors,
                warnings = summary.warnings
            )));
        }
    }

    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Threshold Checking
// ============================================================================

/// Outcome of threshold validation for one run.
struct ValidationOutcome {
    /// Breaches found during validation.
    breaches: Vec<Breach>,
    /// Whether a threshold configuration was explicitly provided.
    configured: bool,
    /// Whether the config opted into soft fail.
    soft_fail: bool,
    /// Status label for the summary line.
    status: String,
}

/// Loads threshold configuration and validates the aggregate.
fn check_thresholds(
    options: &ReportOptions,
    report: &AggregateReport,
) -> ReportResult<ValidationOutcome> {
    let (config, configured) = load_threshold_config(options)?;

    let breaches = config.validate_snapshot(&report.snapshot);
    let summary = breach_summary(&breaches);

    emit(&t!("report.thresholds.header"))?;
    emit(&t!(
        "report.thresholds.totals",
        total = summary.total,
        errors = summary.errors,
        warnings = summary.warnings
    ))?;

    let status = if summary.total == 0 {
        emit(&t!("report.thresholds.passed"))?;
        t!("report.status.pass")
    } else {
        for breach in &breaches {
            emit(&t!(
                "report.breach.line",
                severity = breach.severity,
                endpoint = breach.endpoint,
                metric = breach.metric,
                value = format!("{:.2}", breach.value),
                threshold = format!("{:.2}", breach.threshold),
                unit = breach.unit,
                samples = breach.sample_count
            ))?;
        }
        if summary.errors > 0 {
            t!("report.status.fail")
        } else {
            t!("report.status.warning")
        }
    };

    if let Some(junit) = &options.junit {
        if !breaches.is_empty() {
            write_junit_report(&breaches, junit).map_err(|err| {
                ReportError::new(t!(
                    "report.junit.write_failed",
                    path = junit.display(),
                    error = err
                ))
            })?;
            emit(&t!("report.junit.written", path = junit.display()))?;
        }
    }

    Ok(ValidationOutcome {
        soft_fail: config.options.soft_fail,
        breaches,
        configured,
        status,
    })
}

/// Resolves the threshold configuration: explicit file, then the working
/// directory probe, then the built-in defaults.
fn load_threshold_config(options: &ReportOptions) -> ReportResult<(ThresholdConfig, bool)> {
    if let Some(path) = &options.thresholds {
        let config = load_named_config(path)?;
        emit(&t!("report.thresholds.loaded", path = path.display()))?;
        return Ok((config, true));
    }

    let probe = Path::new(DEFAULT_THRESHOLDS_FILE);
    if probe.exists() {
        let config = load_named_config(probe)?;
        emit(&t!("report.thresholds.loaded", path = probe.display()))?;
        return Ok((config, true));
    }

    emit(&t!("report.thresholds.builtin"))?;
    Ok((ThresholdConfig::builtin(), false))
}

/// Loads a threshold configuration file, wrapping failures.
fn load_named_config(path: &Path) -> ReportResult<ThresholdConfig> {
    ThresholdConfig::load(path).map_err(|err| {
        ReportError::new(t!("report.thresholds.load_failed", path = path.display(), error = err))
    })
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes one progress line to stdout.
fn emit(line: &str) -> ReportResult<()> {
    writeln_stdout(line).map_err(|err| {
        ReportError::new(t!(
            "output.write_failed",
            stream = t!("output.stream.stdout"),
            error = err
        ))
    })
}

/// Writes a line to stdout without panicking on broken pipes.
fn writeln_stdout(line: &str) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{line}")
}
