// perf-gate-cli/src/main.rs
// ============================================================================
// Module: Perf Gate CLI Entry Point
// Description: Command dispatcher for aggregation and threshold reporting.
// Purpose: Provide the perf-gate binary over the report command.
// Dependencies: clap, perf-gate-cli, perf-gate-core
// ============================================================================

//! ## Overview
//! The perf-gate CLI aggregates per-run metric snapshots and validates the
//! result against threshold configuration. All user-facing strings are routed
//! through the i18n catalog to prepare for future localization.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use perf_gate_cli::report::ReportOptions;
use perf_gate_cli::report::run_report;
use perf_gate_cli::t;
use perf_gate_core::MergeStrategy;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "perf-gate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate metric snapshot files and generate reports.
    Report(ReportCommand),
}

/// Percentile merge strategies selectable from the command line.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum MergeStrategyArg {
    /// Count-weighted percentile merging.
    Weighted,
    /// Sketch-based merging; currently shares the weighted path.
    Sketch,
}

impl From<MergeStrategyArg> for MergeStrategy {
    fn from(value: MergeStrategyArg) -> Self {
        match value {
            MergeStrategyArg::Weighted => Self::Weighted,
            MergeStrategyArg::Sketch => Self::Sketch,
        }
    }
}

/// Arguments for the report command.
#[derive(Args, Debug)]
struct ReportCommand {
    /// Input metric snapshot files from parallel runs.
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<PathBuf>,
    /// JSON output file path.
    #[arg(long, short = 'o', value_name = "PATH", default_value = "aggregated_metrics.json")]
    output: PathBuf,
    /// Text summary output file path.
    #[arg(long, value_name = "PATH", default_value = "metrics_summary.txt")]
    text_output: PathBuf,
    /// Generate only the JSON output.
    #[arg(long, action = ArgAction::SetTrue)]
    json_only: bool,
    /// Maximum unique endpoints allowed.
    #[arg(long, value_name = "COUNT", default_value_t = 2000)]
    max_endpoints: usize,
    /// Drop overflow endpoints instead of bucketing into `other`.
    #[arg(long, action = ArgAction::SetTrue)]
    no_bucket: bool,
    /// Merge strategy for percentiles.
    #[arg(long, value_enum, value_name = "STRATEGY", default_value_t = MergeStrategyArg::Weighted)]
    merge_percentiles: MergeStrategyArg,
    /// Check metrics against threshold configuration.
    #[arg(long, action = ArgAction::SetTrue)]
    check_thresholds: bool,
    /// Threshold configuration file path.
    #[arg(long, value_name = "PATH")]
    thresholds: Option<PathBuf>,
    /// JUnit XML output file for threshold breaches.
    #[arg(long, value_name = "PATH")]
    junit: Option<PathBuf>,
    /// Exit with an error code on threshold breaches.
    #[arg(long, action = ArgAction::SetTrue)]
    fail_on_breaches: bool,
}

impl From<ReportCommand> for ReportOptions {
    fn from(command: ReportCommand) -> Self {
        Self {
            inputs: command.inputs,
            output: command.output,
            text_output: command.text_output,
            json_only: command.json_only,
            max_endpoints: command.max_endpoints,
            no_bucket: command.no_bucket,
            strategy: command.merge_percentiles.into(),
            check_thresholds: command.check_thresholds,
            thresholds: command.thresholds,
            junit: command.junit,
            fail_on_breaches: command.fail_on_breaches,
        }
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(message) => emit_error(&message),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> Result<ExitCode, String> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| output_error("stdout", &err))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Report(command) => {
            let options = ReportOptions::from(command);
            run_report(&options).map_err(|err| err.message)
        }
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> Result<(), String> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| output_error("stdout", &err))?;
    write_stdout_line("").map_err(|err| output_error("stdout", &err))?;
    Ok(())
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes an error to stderr and returns the failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let stderr = io::stderr();
    let mut handle = stderr.lock();
    let _ = writeln!(handle, "{message}");
    ExitCode::FAILURE
}

/// Writes one line to stdout.
fn write_stdout_line(line: &str) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{line}")
}

/// Formats an output-stream failure message.
fn output_error(stream: &str, err: &io::Error) -> String {
    let stream = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream, error = err)
}
