// perf-gate-core/src/core/classifier.rs
// ============================================================================
// Module: Perf Gate Token Classifier
// Description: Layered keep/drop classification of URL path tokens.
// Purpose: Decide which path segments survive into an endpoint template.
// Dependencies: regex
// ============================================================================

//! ## Overview
//! Each lower-cased path token is classified by a strict priority ladder:
//! template variables are removed, a keep-list pre-empts the drop rules so
//! meaningful suffixes like `status200` survive, then API prefixes, version
//! tokens, HTTP method tokens, and identifier shapes are dropped. Everything
//! else is kept verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;

// ============================================================================
// SECTION: Patterns
// ============================================================================

#[allow(clippy::expect_used, reason = "patterns are compile-time constants")]
fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("valid pattern")
}

/// Version tokens such as `v1`, `v2beta`, or `api-v2`.
static VERSION: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(api-)?v\d+([a-z0-9]+)?$"));
/// Date-style version tokens such as `2024-10-01`.
static DATE_VERSION: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\d{4}-\d{2}-\d{2}$"));
/// UUID versions 1 through 5.
static UUID: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
});
/// ULID in Crockford base 32.
static ULID: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[0-9A-HJKMNP-TV-Za-hjkmnp-tv-z]{26}$"));
/// KSUID, 27 alphanumeric characters.
static KSUID: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[0-9A-Za-z]{27}$"));
/// Mongo object identifier, 24 hex characters.
static MONGO_OID: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[0-9a-f]{24}$"));
/// Pure digit runs of at least six characters.
static PURE_DIGITS: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\d{6,}$"));
/// Unix timestamps in seconds or milliseconds.
static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\d{10}(\d{3})?$"));
/// Hex blobs of at least twelve characters.
static HEX_BLOB: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[0-9a-f]{12,}$"));
/// Resource keys such as `user123` or `order_456_def`.
static RESOURCE_KEY: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^[A-Za-z]+[-_]*\d+([A-Za-z0-9-_]+)?$"));
/// Template variables such as `{{.setup.tenant}}`.
static TEMPLATE_VAR: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\{\{\.[^}]*\}\}$"));

/// Keep-list of semantically significant tokens, checked before any drop rule.
static KEEP_LIST: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        pattern(r"^status\d{3}$"),
        pattern(r"^http2$"),
        pattern(r"^ipv6$"),
        pattern(
            r"^(\.well-known|openid-configuration|oauth2|healthz|readyz|livez|metrics|search|bulk|export|jwks)$",
        ),
        pattern(r"^(json|ndjson|csv|xml)$"),
        // Locales such as `en` or `en-us` (tokens are already lower-cased).
        pattern(r"^[a-z]{2}(-[a-z]{2})?$"),
    ]
});

/// Position ceiling under which API prefix tokens are dropped.
const API_PREFIX_MAX_POSITION: usize = 2;
/// Minimum token length before the digit heuristic applies.
const HEURISTIC_MIN_LEN: usize = 6;
/// Digit ratio at or above which a token is treated as an identifier.
const HEURISTIC_DIGIT_RATIO: f64 = 0.4;
/// Number of maximal digit runs at or above which a token is an identifier.
const HEURISTIC_DIGIT_RUNS: usize = 2;

// ============================================================================
// SECTION: Token Action
// ============================================================================

/// Classification outcome for a single path token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAction {
    /// Keep the token in the template.
    Keep,
    /// Drop the token from the template.
    Drop,
    /// Remove the token; it was a template variable.
    RewriteEmpty,
}

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Classifies a lower-cased token at zero-based `position` in the path.
#[must_use]
pub fn classify_token(token: &str, position: usize) -> TokenAction {
    if TEMPLATE_VAR.is_match(token) {
        return TokenAction::RewriteEmpty;
    }

    if KEEP_LIST.iter().any(|keep| keep.is_match(token)) {
        return TokenAction::Keep;
    }

    if matches!(token, "me" | "self" | "current") {
        return TokenAction::Keep;
    }

    if matches!(token, "api" | "rest" | "graphql") && position <= API_PREFIX_MAX_POSITION {
        return TokenAction::Drop;
    }

    if VERSION.is_match(token) || DATE_VERSION.is_match(token) {
        return TokenAction::Drop;
    }

    if is_http_method(token) {
        return TokenAction::Drop;
    }

    if is_id_like(token) {
        return TokenAction::Drop;
    }

    if looks_like_id(token) {
        return TokenAction::Drop;
    }

    TokenAction::Keep
}

/// Returns whether the token is an HTTP method name.
fn is_http_method(token: &str) -> bool {
    matches!(token, "get" | "post" | "put" | "patch" | "delete" | "head" | "options")
}

/// Returns whether the token matches a known identifier shape.
fn is_id_like(token: &str) -> bool {
    UUID.is_match(token)
        || ULID.is_match(token)
        || KSUID.is_match(token)
        || MONGO_OID.is_match(token)
        || PURE_DIGITS.is_match(token)
        || TIMESTAMP.is_match(token)
        || HEX_BLOB.is_match(token)
        || RESOURCE_KEY.is_match(token)
}

/// Heuristic identifier detection by digit density.
fn looks_like_id(token: &str) -> bool {
    if token.len() < HEURISTIC_MIN_LEN {
        return false;
    }

    let mut digit_count = 0_usize;
    let mut digit_runs = 0_usize;
    let mut in_digit_run = false;
    for byte in token.bytes() {
        if byte.is_ascii_digit() {
            digit_count += 1;
            if !in_digit_run {
                digit_runs += 1;
                in_digit_run = true;
            }
        } else {
            in_digit_run = false;
        }
    }

    #[allow(clippy::cast_precision_loss, reason = "token lengths are tiny")]
    let digit_ratio = digit_count as f64 / token.len() as f64;
    digit_ratio >= HEURISTIC_DIGIT_RATIO || digit_runs >= HEURISTIC_DIGIT_RUNS
}

// ============================================================================
// SECTION: Tests
// ============================================================================
