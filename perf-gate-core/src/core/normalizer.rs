// perf-gate-core/src/core/normalizer.rs
// ============================================================================
// Module: Perf Gate Path Normalizer
// Description: Dynamic path normalization into stable endpoint templates.
// Purpose: Collapse high-cardinality URL paths into bounded endpoint keys.
// Dependencies: crate::core::{cardinality, classifier}, regex
// ============================================================================

//! ## Overview
//! The normalizer turns a raw request path into a stable endpoint template:
//! query, fragment, and matrix suffixes are stripped, tokens are classified
//! and pruned, long templates are shaped to head-2 plus tail-1, and the
//! result is admitted through the cardinality controller. A bounded cache
//! keyed by the raw path short-circuits repeat lookups; when full it is
//! flushed whole. All state is per instance.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::env;
use std::sync::LazyLock;
use std::sync::RwLock;

use regex::Regex;

use crate::core::cardinality::Admission;
use crate::core::cardinality::CardinalityController;
use crate::core::cardinality::CardinalityStats;
use crate::core::cardinality::OVERFLOW_BUCKET;
use crate::core::classifier::TokenAction;
use crate::core::classifier::classify_token;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Template for empty and root-only paths.
pub const ROOT_TEMPLATE: &str = "root";
/// Template for GraphQL routes.
pub const GRAPHQL_TEMPLATE: &str = "graphql";
/// Environment variable overriding the normalizer cardinality ceiling.
pub const MAX_ENDPOINTS_ENV_VAR: &str = "PERF_GATE_MAX_ENDPOINTS";
/// Default normalizer cardinality ceiling.
pub const DEFAULT_MAX_ENDPOINTS: usize = 5000;
/// Default number of cached path-to-template entries.
pub const DEFAULT_CACHE_SIZE: usize = 8192;
/// Method used when a request carries none.
const DEFAULT_METHOD: &str = "GET";
/// Maximum template length in bytes.
const MAX_TEMPLATE_LEN: usize = 80;
/// Maximum distance of a trailing extension dot from the template end.
const EXTENSION_WINDOW: usize = 6;
/// Number of kept tokens joined verbatim before head/tail shaping applies.
const SHAPE_JOIN_LIMIT: usize = 3;

#[allow(clippy::expect_used, reason = "patterns are compile-time constants")]
/// Runs of consecutive underscores.
static UNDERSCORE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("_+").expect("valid pattern"));

#[allow(clippy::expect_used, reason = "patterns are compile-time constants")]
/// `operationName` extraction from a GraphQL JSON body.
static GRAPHQL_OPERATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""operationName"\s*:\s*"([^"]+)""#).expect("valid pattern"));

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for a [`PathNormalizer`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizerConfig {
    /// Cardinality ceiling for distinct endpoint templates.
    pub max_endpoints: usize,
    /// Number of cached path-to-template entries before a full flush.
    pub cache_size: usize,
}

impl NormalizerConfig {
    /// Builds the default configuration, honoring the environment override.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_endpoints: max_endpoints_from_env(),
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Reads the cardinality ceiling override from the environment.
fn max_endpoints_from_env() -> usize {
    if let Ok(raw) = env::var(MAX_ENDPOINTS_ENV_VAR) {
        if let Ok(value) = raw.parse::<usize>() {
            if value > 0 {
                return value;
            }
        }
    }
    DEFAULT_MAX_ENDPOINTS
}

// ============================================================================
// SECTION: Normalized Request
// ============================================================================

/// Outcome of normalizing a full request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
    /// Stable endpoint key of the form `METHOD_TEMPLATE`.
    pub key: String,
    /// GraphQL operation name, extracted for diagnostics only; it never
    /// shapes the key.
    pub operation: Option<String>,
}

// ============================================================================
// SECTION: Path Normalizer
// ============================================================================

/// Per-instance dynamic path normalizer.
#[derive(Debug)]
pub struct PathNormalizer {
    /// Raw path to admitted template, flushed whole when full.
    cache: RwLock<HashMap<String, String>>,
    /// Cardinality controller shared by all lookups on this instance.
    cardinality: CardinalityController,
    /// Cache capacity before a flush.
    cache_size: usize,
}

impl PathNormalizer {
    /// Creates a normalizer with the given configuration.
    #[must_use]
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            cardinality: CardinalityController::new(config.max_endpoints, false),
            cache_size: config.cache_size,
        }
    }

    /// Normalizes a raw path into an endpoint template.
    pub fn normalize(&self, path: &str) -> String {
        if let Some(cached) = self.cached(path) {
            return cached;
        }

        let prepared = prepare_path(path);
        let template = shape_template(&prepared);
        let admitted = match self.cardinality.admit(&template, &prepared) {
            Admission::Admitted(key) => key,
            Admission::Bucketed | Admission::Dropped => OVERFLOW_BUCKET.to_string(),
        };

        self.remember(path, &admitted);
        admitted
    }

    /// Normalizes a path and prefixes the upper-cased method.
    pub fn normalize_with_method(&self, path: &str, method: &str) -> String {
        format!("{}_{}", normalize_method(method), self.normalize(path))
    }

    /// Normalizes a full request, short-circuiting GraphQL routes.
    pub fn normalize_request(
        &self,
        path: &str,
        method: &str,
        content_type: &str,
        body: &[u8],
    ) -> NormalizedRequest {
        let prepared = prepare_path(path);
        if is_graphql_route(&prepared) {
            return NormalizedRequest {
                key: format!("{}_{GRAPHQL_TEMPLATE}", normalize_method(method)),
                operation: graphql_operation(content_type, body),
            };
        }

        NormalizedRequest {
            key: self.normalize_with_method(path, method),
            operation: None,
        }
    }

    /// Returns cardinality and cache statistics for this instance.
    pub fn stats(&self) -> NormalizerStats {
        let cache_entries = match self.cache.read() {
            Ok(cache) => cache.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        };
        NormalizerStats {
            cache_entries,
            cardinality: self.cardinality.stats(),
        }
    }

    /// Looks up a raw path in the cache.
    fn cached(&self, path: &str) -> Option<String> {
        let cache = match self.cache.read() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.get(path).cloned()
    }

    /// Stores an admitted template, flushing the cache whole when full.
    fn remember(&self, path: &str, admitted: &str) {
        let mut cache = match self.cache.write() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        if cache.len() >= self.cache_size {
            cache.clear();
        }
        cache.insert(path.to_string(), admitted.to_string());
    }
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::from_env())
    }
}

/// Point-in-time normalizer statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizerStats {
    /// Number of cached path-to-template entries.
    pub cache_entries: usize,
    /// Cardinality statistics of the underlying controller.
    pub cardinality: CardinalityStats,
}

// ============================================================================
// SECTION: Template Shaping
// ============================================================================

/// Lower-cases a path and strips query, fragment, matrix, and one trailing
/// slash.
fn prepare_path(path: &str) -> String {
    let mut prepared = path.to_lowercase();
    for separator in ['?', '#', ';'] {
        if let Some(index) = prepared.find(separator) {
            prepared.truncate(index);
        }
    }
    if let Some(stripped) = prepared.strip_suffix('/') {
        let len = stripped.len();
        prepared.truncate(len);
    }
    prepared
}

/// Shapes a prepared path into an endpoint template.
fn shape_template(prepared: &str) -> String {
    if prepared.is_empty() || prepared == "/" {
        return ROOT_TEMPLATE.to_string();
    }

    let tokens: Vec<&str> =
        prepared.split('/').map(str::trim).filter(|token| !token.is_empty()).collect();
    if tokens.is_empty() {
        return ROOT_TEMPLATE.to_string();
    }

    let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());
    for (position, token) in tokens.iter().copied().enumerate() {
        match classify_token(token, position) {
            TokenAction::Keep => kept.push(token),
            TokenAction::Drop | TokenAction::RewriteEmpty => {}
        }
    }

    let shaped = if kept.is_empty() {
        // A multi-segment path whose every token dropped has no template; a
        // single flat token is a re-entrant endpoint key and stays itself.
        if prepared.contains('/') {
            return ROOT_TEMPLATE.to_string();
        }
        prepared.to_string()
    } else if kept.len() <= SHAPE_JOIN_LIMIT {
        let joined = kept.join("_");
        trim_extension(&joined).to_string()
    } else {
        let joined = format!("{}_{}_{}", kept[0], kept[1], kept[kept.len() - 1]);
        trim_extension(&joined).to_string()
    };

    let collapsed = UNDERSCORE_RUNS.replace_all(&shaped, "_");
    let mut template = collapsed.trim_matches('_').to_string();
    truncate_template(&mut template);
    if template.is_empty() {
        return ROOT_TEMPLATE.to_string();
    }
    template
}

/// Trims a trailing file extension near the end of the template.
fn trim_extension(template: &str) -> &str {
    if let Some(index) = template.rfind('.') {
        if index > 0 && index + EXTENSION_WINDOW >= template.len() {
            return &template[..index];
        }
    }
    template
}

/// Truncates a template to the maximum length on a char boundary.
fn truncate_template(template: &mut String) {
    if template.len() <= MAX_TEMPLATE_LEN {
        return;
    }
    let mut end = MAX_TEMPLATE_LEN;
    while !template.is_char_boundary(end) {
        end -= 1;
    }
    template.truncate(end);
}

/// Upper-cases a method, defaulting to `GET` when empty.
fn normalize_method(method: &str) -> String {
    if method.is_empty() {
        return DEFAULT_METHOD.to_string();
    }
    method.to_uppercase()
}

/// Returns whether a prepared path targets a GraphQL route.
fn is_graphql_route(prepared: &str) -> bool {
    prepared.ends_with("/graphql") || prepared.ends_with("/gql")
}

// ============================================================================
// SECTION: GraphQL Operation
// ============================================================================

/// Extracts the GraphQL operation name from a JSON request body.
#[must_use]
pub fn graphql_operation(content_type: &str, body: &[u8]) -> Option<String> {
    if content_type != "application/json" || body.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(body);
    GRAPHQL_OPERATION
        .captures(&text)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().to_string())
}
