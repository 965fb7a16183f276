// perf-gate-config/src/config.rs
// ============================================================================
// Module: Perf Gate Threshold Configuration
// Description: Threshold configuration loading and resolution.
// Purpose: Provide the three-tier SLA record and its effective resolution.
// Dependencies: perf-gate-core, regex, serde, serde_yaml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a YAML file with a hard size limit. Duration
//! thresholds accept a bare duration string or a mapping with a per-threshold
//! tolerance; rates accept a bare number or the same mapping form. Resolution
//! starts from the defaults, overlays the first matching group pattern in
//! lexicographic order, then overlays the exact endpoint entry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error as _;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default tolerance headroom applied to every threshold, in percent.
pub const DEFAULT_TOLERANCE_PERCENT: f64 = 10.0;
/// Default minimum sample count for reliable percentiles.
pub const DEFAULT_MIN_SAMPLES: u64 = 100;
/// Maximum threshold configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Threshold configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration file failed.
    #[error("failed to read threshold config: {path}: {detail}")]
    Io {
        /// Configuration file path.
        path: String,
        /// Underlying failure description.
        detail: String,
    },
    /// The configuration file exceeds the size limit.
    #[error("threshold config exceeds size limit: {path}")]
    TooLarge {
        /// Configuration file path.
        path: String,
    },
    /// Parsing the configuration file failed.
    #[error("failed to parse threshold config: {path}: {detail}")]
    Parse {
        /// Configuration file path.
        path: String,
        /// Underlying parse failure description.
        detail: String,
    },
}

// ============================================================================
// SECTION: Threshold Values
// ============================================================================

/// A duration threshold with an optional per-threshold tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationThreshold {
    /// Threshold value.
    pub value: Duration,
    /// Tolerance override in percent.
    pub tolerance_percent: Option<f64>,
}

impl DurationThreshold {
    /// Creates a threshold without a tolerance override.
    #[must_use]
    pub const fn new(value: Duration) -> Self {
        Self {
            value,
            tolerance_percent: None,
        }
    }

    /// Returns the threshold value in milliseconds.
    #[must_use]
    pub fn millis(&self) -> f64 {
        self.value.as_secs_f64() * 1000.0
    }
}

impl<'de> Deserialize<'de> for DurationThreshold {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Form {
            Scalar(String),
            Detailed {
                value: String,
                #[serde(default)]
                tolerance_percent: Option<f64>,
            },
        }

        let (raw, tolerance_percent) = match Form::deserialize(deserializer)? {
            Form::Scalar(raw) => (raw, None),
            Form::Detailed {
                value,
                tolerance_percent,
            } => (value, tolerance_percent),
        };
        let value = parse_duration(&raw).map_err(D::Error::custom)?;
        Ok(Self {
            value,
            tolerance_percent,
        })
    }
}

/// A rate threshold with an optional per-threshold tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateThreshold {
    /// Threshold value.
    pub value: f64,
    /// Tolerance override in percent.
    pub tolerance_percent: Option<f64>,
}

impl RateThreshold {
    /// Creates a threshold without a tolerance override.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self {
            value,
            tolerance_percent: None,
        }
    }
}

impl<'de> Deserialize<'de> for RateThreshold {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Form {
            Scalar(f64),
            Detailed {
                value: f64,
                #[serde(default)]
                tolerance_percent: Option<f64>,
            },
        }

        let (value, tolerance_percent) = match Form::deserialize(deserializer)? {
            Form::Scalar(value) => (value, None),
            Form::Detailed {
                value,
                tolerance_percent,
            } => (value, tolerance_percent),
        };
        Ok(Self {
            value,
            tolerance_percent,
        })
    }
}

/// Threshold values for one tier of the configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct ThresholdValues {
    /// Median latency threshold.
    #[serde(default)]
    pub p50: Option<DurationThreshold>,
    /// 90th percentile latency threshold.
    #[serde(default)]
    pub p90: Option<DurationThreshold>,
    /// 95th percentile latency threshold.
    #[serde(default)]
    pub p95: Option<DurationThreshold>,
    /// 99th percentile latency threshold.
    #[serde(default)]
    pub p99: Option<DurationThreshold>,
    /// Average latency threshold.
    #[serde(default)]
    pub avg: Option<DurationThreshold>,
    /// Maximum latency threshold.
    #[serde(default)]
    pub max: Option<DurationThreshold>,
    /// Error-rate threshold in `[0, 1]`.
    #[serde(default)]
    pub error_rate: Option<RateThreshold>,
    /// Requests-per-second threshold.
    #[serde(default)]
    pub rps: Option<RateThreshold>,
    /// Minimum sample-count override for this tier.
    #[serde(default)]
    pub min_samples: Option<u64>,
}

impl ThresholdValues {
    /// Overlays `other` onto `self`, field-wise replace-if-set.
    pub fn overlay(&mut self, other: &Self) {
        if other.p50.is_some() {
            self.p50 = other.p50;
        }
        if other.p90.is_some() {
            self.p90 = other.p90;
        }
        if other.p95.is_some() {
            self.p95 = other.p95;
        }
        if other.p99.is_some() {
            self.p99 = other.p99;
        }
        if other.avg.is_some() {
            self.avg = other.avg;
        }
        if other.max.is_some() {
            self.max = other.max;
        }
        if other.error_rate.is_some() {
            self.error_rate = other.error_rate;
        }
        if other.rps.is_some() {
            self.rps = other.rps;
        }
        if other.min_samples.is_some() {
            self.min_samples = other.min_samples;
        }
    }
}

// ============================================================================
// SECTION: Options
// ============================================================================

/// Global validation options.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ThresholdOptions {
    /// Tolerance headroom in percent applied to every threshold.
    #[serde(default = "default_tolerance_percent")]
    pub tolerance_percent: f64,
    /// Minimum sample count before an endpoint is validated.
    #[serde(default = "default_min_samples")]
    pub min_samples: u64,
    /// Report breaches without failing the run.
    #[serde(default)]
    pub soft_fail: bool,
}

impl Default for ThresholdOptions {
    fn default() -> Self {
        Self {
            tolerance_percent: DEFAULT_TOLERANCE_PERCENT,
            min_samples: DEFAULT_MIN_SAMPLES,
            soft_fail: false,
        }
    }
}

/// Serde default for the tolerance option.
const fn default_tolerance_percent() -> f64 {
    DEFAULT_TOLERANCE_PERCENT
}

/// Serde default for the minimum sample option.
const fn default_min_samples() -> u64 {
    DEFAULT_MIN_SAMPLES
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// The complete three-tier threshold configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThresholdConfig {
    /// Global validation options.
    #[serde(default)]
    pub options: ThresholdOptions,
    /// Baseline thresholds applied to every endpoint.
    #[serde(default)]
    pub defaults: ThresholdValues,
    /// Wildcard group patterns; the first lexicographic match wins.
    #[serde(default)]
    pub groups: BTreeMap<String, ThresholdValues>,
    /// Exact endpoint overrides; these win over groups and defaults.
    #[serde(default)]
    pub endpoints: BTreeMap<String, ThresholdValues>,
}

impl ThresholdConfig {
    /// Loads threshold configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when reading or parsing fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let bytes = fs::read(path).map_err(|err| ConfigError::Io {
            path: display.clone(),
            detail: err.to_string(),
        })?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge {
                path: display,
            });
        }
        serde_yaml::from_slice(&bytes).map_err(|err| ConfigError::Parse {
            path: display,
            detail: err.to_string(),
        })
    }

    /// Returns the built-in configuration used when no file is given.
    #[must_use]
    pub fn builtin() -> Self {
        let defaults = ThresholdValues {
            p95: Some(DurationThreshold::new(Duration::from_millis(500))),
            p99: Some(DurationThreshold::new(Duration::from_millis(1000))),
            avg: Some(DurationThreshold::new(Duration::from_millis(200))),
            error_rate: Some(RateThreshold::new(0.01)),
            ..ThresholdValues::default()
        };

        let mut groups = BTreeMap::new();
        groups.insert(
            "auth/*".to_string(),
            ThresholdValues {
                p95: Some(DurationThreshold::new(Duration::from_millis(350))),
                ..ThresholdValues::default()
            },
        );
        groups.insert(
            "catalog/*".to_string(),
            ThresholdValues {
                p95: Some(DurationThreshold::new(Duration::from_millis(450))),
                ..ThresholdValues::default()
            },
        );

        let mut endpoints = BTreeMap::new();
        endpoints.insert(
            "GET /users".to_string(),
            ThresholdValues {
                p95: Some(DurationThreshold::new(Duration::from_millis(300))),
                avg: Some(DurationThreshold::new(Duration::from_millis(150))),
                ..ThresholdValues::default()
            },
        );
        endpoints.insert(
            "POST /orders".to_string(),
            ThresholdValues {
                p95: Some(DurationThreshold::new(Duration::from_millis(800))),
                avg: Some(DurationThreshold::new(Duration::from_millis(400))),
                ..ThresholdValues::default()
            },
        );

        Self {
            options: ThresholdOptions::default(),
            defaults,
            groups,
            endpoints,
        }
    }

    /// Computes the effective threshold set for an endpoint.
    ///
    /// Priority: exact endpoint entry, then the first matching group pattern
    /// in lexicographic order, then the defaults.
    #[must_use]
    pub fn resolve(&self, endpoint: &str) -> ThresholdValues {
        let mut resolved = self.defaults;

        for (pattern, values) in &self.groups {
            if matches_pattern(endpoint, pattern) {
                resolved.overlay(values);
                break;
            }
        }

        if let Some(values) = self.endpoints.get(endpoint) {
            resolved.overlay(values);
        }

        resolved
    }
}

// ============================================================================
// SECTION: Pattern Matching
// ============================================================================

/// Matches an endpoint against a shell-style wildcard pattern.
///
/// An unparsable pattern falls back to exact string comparison.
fn matches_pattern(endpoint: &str, pattern: &str) -> bool {
    let anchored = format!("^{}$", pattern.replace('*', ".*"));
    match Regex::new(&anchored) {
        Ok(compiled) => compiled.is_match(endpoint),
        Err(_) => endpoint == pattern,
    }
}

// ============================================================================
// SECTION: Duration Parsing
// ============================================================================

/// Parses a duration string such as `500ms`, `1.5s`, or `2m`.
///
/// # Errors
///
/// Returns a description of the malformed input.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty duration".to_string());
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .ok_or_else(|| format!("missing unit in duration '{trimmed}'"))?;
    let (number, unit) = trimmed.split_at(split);
    let magnitude: f64 =
        number.parse().map_err(|_| format!("invalid duration value '{trimmed}'"))?;

    let seconds = match unit {
        "ns" => magnitude / 1_000_000_000.0,
        "us" | "\u{b5}s" => magnitude / 1_000_000.0,
        "ms" => magnitude / 1000.0,
        "s" => magnitude,
        "m" => magnitude * 60.0,
        "h" => magnitude * 3600.0,
        _ => return Err(format!("unknown duration unit '{unit}' in '{trimmed}'")),
    };

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("duration out of range '{trimmed}'"));
    }

    Ok(Duration::from_secs_f64(seconds))
}
