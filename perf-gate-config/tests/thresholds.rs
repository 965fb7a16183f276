// perf-gate-config/tests/thresholds.rs
// ============================================================================
// Module: Threshold Configuration Tests
// Description: YAML forms, duration parsing, and three-tier resolution.
// ============================================================================
//! ## Overview
//! Covers both YAML threshold forms (bare scalar and value-with-tolerance
//! mapping), duration parsing, option defaults, and the resolution order:
//! defaults, first lexicographic group match, exact endpoint overlay.

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

use std::fs;
use std::time::Duration;

use perf_gate_config::ConfigError;
use perf_gate_config::ThresholdConfig;
use perf_gate_config::parse_duration;
use tempfile::TempDir;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Parses a YAML document into a threshold configuration.
fn parse(yaml: &str) -> ThresholdConfig {
    serde_yaml::from_str(yaml).unwrap()
}

// ============================================================================
// SECTION: YAML Forms
// ============================================================================

#[test]
fn scalar_and_mapping_threshold_forms_parse() {
    let config = parse(
        r#"
options:
  tolerance_percent: 5.0
  min_samples: 50
  soft_fail: true
defaults:
  p95: "500ms"
  avg: {value: "200ms", tolerance_percent: 20.0}
  error_rate: 0.01
  rps: {value: 100.0, tolerance_percent: 15.0}
groups:
  "auth/*":
    p95: "350ms"
endpoints:
  "GET /users":
    p95: "300ms"
"#,
    );

    assert_eq!(config.options.tolerance_percent, 5.0);
    assert_eq!(config.options.min_samples, 50);
    assert!(config.options.soft_fail);

    let p95 = config.defaults.p95.unwrap();
    assert_eq!(p95.value, Duration::from_millis(500));
    assert_eq!(p95.tolerance_percent, None);

    let avg = config.defaults.avg.unwrap();
    assert_eq!(avg.value, Duration::from_millis(200));
    assert_eq!(avg.tolerance_percent, Some(20.0));

    assert_eq!(config.defaults.error_rate.unwrap().value, 0.01);
    assert_eq!(config.defaults.rps.unwrap().tolerance_percent, Some(15.0));
}

#[test]
fn absent_options_take_documented_defaults() {
    let config = parse("defaults:\n  p95: \"1s\"\n");
    assert_eq!(config.options.tolerance_percent, 10.0);
    assert_eq!(config.options.min_samples, 100);
    assert!(!config.options.soft_fail);
}

#[test]
fn explicit_zero_options_are_preserved() {
    let config = parse("options:\n  tolerance_percent: 0.0\n  min_samples: 0\n");
    assert_eq!(config.options.tolerance_percent, 0.0);
    assert_eq!(config.options.min_samples, 0);
}

#[test]
fn min_samples_override_parses_per_tier() {
    let config = parse(
        r#"
endpoints:
  "users_profile":
    p95: "300ms"
    min_samples: 10
"#,
    );
    assert_eq!(config.endpoints["users_profile"].min_samples, Some(10));
}

// ============================================================================
// SECTION: Duration Parsing
// ============================================================================

#[test]
fn durations_parse_across_units() {
    assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
    assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
    assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
    assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
    assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    assert_eq!(parse_duration("250us").unwrap(), Duration::from_micros(250));
}

#[test]
fn malformed_durations_are_rejected() {
    assert!(parse_duration("").is_err());
    assert!(parse_duration("500").is_err());
    assert!(parse_duration("ms").is_err());
    assert!(parse_duration("12fortnights").is_err());
}

#[test]
fn malformed_durations_fail_config_parsing() {
    let result: Result<ThresholdConfig, _> = serde_yaml::from_str("defaults:\n  p95: \"500\"\n");
    assert!(result.is_err());
}

// ============================================================================
// SECTION: File Loading
// ============================================================================

#[test]
fn configs_load_from_yaml_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("thresholds.yml");
    fs::write(&path, "defaults:\n  p95: \"400ms\"\n").unwrap();

    let config = ThresholdConfig::load(&path).unwrap();
    assert_eq!(config.defaults.p95.unwrap().value, Duration::from_millis(400));
}

#[test]
fn missing_config_files_surface_as_io_errors() {
    let result = ThresholdConfig::load(std::path::Path::new("/nonexistent/thresholds.yml"));
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}

#[test]
fn builtin_config_matches_documented_defaults() {
    let config = ThresholdConfig::builtin();
    assert_eq!(config.defaults.p95.unwrap().value, Duration::from_millis(500));
    assert_eq!(config.defaults.p99.unwrap().value, Duration::from_millis(1000));
    assert_eq!(config.defaults.avg.unwrap().value, Duration::from_millis(200));
    assert_eq!(config.defaults.error_rate.unwrap().value, 0.01);
    assert_eq!(config.options.tolerance_percent, 10.0);
    assert_eq!(config.options.min_samples, 100);
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

#[test]
fn resolution_overlays_defaults_groups_and_endpoints() {
    let config = parse(
        r#"
defaults:
  p95: "500ms"
  avg: "200ms"
groups:
  "auth/*":
    p95: "350ms"
endpoints:
  "auth/login":
    avg: "100ms"
"#,
    );

    let resolved = config.resolve("auth/login");
    // Group overlays p95, endpoint overlays avg, defaults fill the rest.
    assert_eq!(resolved.p95.unwrap().value, Duration::from_millis(350));
    assert_eq!(resolved.avg.unwrap().value, Duration::from_millis(100));

    let fallback = config.resolve("catalog/items");
    assert_eq!(fallback.p95.unwrap().value, Duration::from_millis(500));
    assert_eq!(fallback.avg.unwrap().value, Duration::from_millis(200));
}

#[test]
fn first_lexicographic_group_match_wins() {
    let config = parse(
        r#"
groups:
  "auth/*":
    p95: "350ms"
  "a*":
    p95: "100ms"
"#,
    );

    // Both patterns match; "a*" sorts before "auth/*".
    let resolved = config.resolve("auth/login");
    assert_eq!(resolved.p95.unwrap().value, Duration::from_millis(100));
}

#[test]
fn wildcard_patterns_anchor_at_both_ends() {
    let config = parse(
        r#"
groups:
  "users*":
    p95: "100ms"
"#,
    );

    assert!(config.resolve("users_profile").p95.is_some());
    assert!(config.resolve("admin_users_profile").p95.is_none());
}

#[test]
fn unparsable_patterns_fall_back_to_exact_comparison() {
    let config = parse(
        r#"
groups:
  "auth/[":
    p95: "100ms"
"#,
    );

    assert!(config.resolve("auth/[").p95.is_some());
    assert!(config.resolve("auth/login").p95.is_none());
}
