// perf-gate-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings for future localization support.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The perf-gate CLI stores user-facing strings in a small translation
//! catalog to enforce consistent messaging and to prepare for future locales.
//! All runtime output should be routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to the key itself to avoid panics.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static catalog entries loaded into the localized message bundle.
const CATALOG_ITEMS: &[(&str, &str)] = &[
    ("main.version", "perf-gate {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("report.processing", "Processing {count} metrics files..."),
    ("report.aggregated", "Successfully aggregated {count} files"),
    ("report.totals", "Total endpoints: {endpoints}, total checks: {checks}"),
    ("report.kind_mismatches", "Warning: {count} metric merges skipped on kind mismatch"),
    ("report.aggregate_failed", "Error aggregating metrics: {error}"),
    ("report.json.written", "JSON report generated: {path}"),
    ("report.json.write_failed", "Error writing JSON output: {error}"),
    ("report.summary.written", "Text summary generated: {path}"),
    ("report.summary.write_failed", "Error writing text summary to {path}: {error}"),
    ("report.thresholds.loaded", "Using threshold configuration from {path}"),
    ("report.thresholds.builtin", "Using built-in threshold configuration"),
    ("report.thresholds.load_failed", "Failed to load threshold config from {path}: {error}"),
    ("report.thresholds.header", "=== Threshold Validation Results ==="),
    ("report.thresholds.totals", "Total breaches: {total} ({errors} errors, {warnings} warnings)"),
    ("report.thresholds.passed", "All thresholds passed"),
    (
        "report.breach.line",
        "  {severity} [{endpoint}] {metric}: {value}{unit} (threshold: {threshold}{unit}, \
         samples: {samples})",
    ),
    ("report.junit.written", "JUnit XML report generated: {path}"),
    ("report.junit.write_failed", "Failed to write JUnit XML to {path}: {error}"),
    (
        "report.breaches.hard_fail",
        "threshold breaches detected: {errors} errors, {warnings} warnings",
    ),
    ("report.status.pass", "pass"),
    ("report.status.warning", "warning"),
    ("report.status.fail", "fail"),
];

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the English fallback catalog while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

/// Returns the static English catalog used by the CLI.
fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

    CATALOG.get_or_init(|| CATALOG_ITEMS.iter().copied().collect())
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
///
/// # Returns
///
/// A localized [`String`] with placeholders substituted.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
