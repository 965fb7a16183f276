// perf-gate-cli/src/junit.rs
// ============================================================================
// Module: JUnit Breach Report Writer
// Description: Renders threshold breaches as JUnit XML for CI systems.
// Purpose: Provide one testcase per breach with failures counted per severity.
// Dependencies: perf-gate-config, standard library formatting.
// ============================================================================

//! ## Overview
//! The breach report is a single `<testsuite>` whose `tests` attribute counts
//! all breaches and whose `failures` attribute counts error-severity breaches
//! only. Each breach renders as one `<testcase>` with a `<failure>` payload
//! carrying the observed value and threshold.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use perf_gate_config::Breach;
use perf_gate_config::Severity;

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Suite name emitted in the report.
const SUITE_NAME: &str = "perf-gate-thresholds";

/// Renders breaches as a JUnit XML document.
#[must_use]
pub fn render_junit(breaches: &[Breach]) -> String {
    let failures = breaches.iter().filter(|b| b.severity == Severity::Error).count();

    let mut doc = String::new();
    let _ = writeln!(doc, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        doc,
        r#"<testsuite name="{SUITE_NAME}" tests="{}" failures="{failures}" time="0">"#,
        breaches.len()
    );

    for breach in breaches {
        let case_name = xml_escape(&format!("{} - {}", breach.endpoint, breach.metric));
        let message = xml_escape(&format!(
            "Threshold violation: {:.2}{} exceeds {:.2}{} (samples: {})",
            breach.value, breach.unit, breach.threshold, breach.unit, breach.sample_count
        ));
        let _ = writeln!(doc, r#"  <testcase name="{case_name}" classname="thresholds">"#);
        let _ = writeln!(doc, r#"    <failure message="{message}" type="threshold">"#);
        let _ = writeln!(
            doc,
            "{}: {} - {} violation",
            breach.severity,
            xml_escape(&breach.endpoint),
            xml_escape(&breach.metric)
        );
        let _ = writeln!(doc, "Value: {:.2}{}", breach.value, breach.unit);
        let _ = writeln!(doc, "Threshold: {:.2}{}", breach.threshold, breach.unit);
        let _ = writeln!(doc, "Samples: {}", breach.sample_count);
        let _ = writeln!(doc, "    </failure>");
        let _ = writeln!(doc, "  </testcase>");
    }

    let _ = writeln!(doc, "</testsuite>");
    doc
}

/// Writes the JUnit XML report to a file.
///
/// # Errors
///
/// Returns the underlying I/O error when writing fails.
pub fn write_junit_report(breaches: &[Breach], path: &Path) -> io::Result<()> {
    fs::write(path, render_junit(breaches))
}

/// Escapes text for use in XML content and attribute values.
fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// ============================================================================
// SECTION: Tests
// ============================================================================
