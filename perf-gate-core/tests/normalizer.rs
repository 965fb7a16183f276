// perf-gate-core/tests/normalizer.rs
// ============================================================================
// Module: Path Normalizer Tests
// Description: Template extraction, shaping, caching, and GraphQL routes.
// ============================================================================
//! ## Overview
//! Table-driven coverage of the normalization pipeline: token pruning, shape
//! rules, extension trimming, idempotence, and the GraphQL short-circuit.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use perf_gate_core::MAX_ENDPOINTS_ENV_VAR;
use perf_gate_core::NormalizerConfig;
use perf_gate_core::PathNormalizer;
use perf_gate_core::ROOT_TEMPLATE;
use perf_gate_core::graphql_operation;
use perf_gate_core::hashing::collision_suffix;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Fixed configuration independent of the environment.
fn test_config() -> NormalizerConfig {
    NormalizerConfig {
        max_endpoints: 5000,
        cache_size: 8192,
    }
}

/// Normalizes a path on a fresh instance.
fn normalize(path: &str) -> String {
    PathNormalizer::new(test_config()).normalize(path)
}

/// Normalizes a path and method on a fresh instance.
fn normalize_with_method(path: &str, method: &str) -> String {
    PathNormalizer::new(test_config()).normalize_with_method(path, method)
}

// ============================================================================
// SECTION: Template Extraction
// ============================================================================

#[test]
fn template_extraction_table() {
    let cases: &[(&str, &str, &str)] = &[
        // Core and hygiene.
        ("/", "root", "root path"),
        ("/health", "health", "simple health"),
        ("/healthz", "healthz", "k8s healthz"),
        ("/readyz", "readyz", "k8s readyz"),
        ("/livez", "livez", "k8s livez"),
        ("/status/200", "status_200", "keep short status value"),
        ("/metrics", "metrics", "metrics endpoint"),
        ("/double//slashes///here", "double_slashes_here", "collapse slashes"),
        ("/trailing/slash/", "trailing_slash", "trim trailing slash"),
        ("/path?query=1#frag", "path", "drop query and fragment"),
        // API prefixes and versions.
        ("/api/v1/users", "users", "drop api and v1"),
        ("/rest/v3/customers/cust123", "customers", "drop rest, v3, and id"),
        ("/graphql/v2/schema", "schema", "drop graphql prefix and v2"),
        ("/api-v2/payments/charge", "payments_charge", "api-v2 as version"),
        ("/v2024-08-01/charges/abc123", "charges", "date-style version dropped"),
        ("/svc/api/v1/orders/123456", "svc_orders", "prefix after mount point"),
        ("/api/v1beta/users", "users", "beta version dropped"),
        ("/api/v2alpha1/config", "config", "alpha version dropped"),
        ("/api/v1.0-rc1/users", "users", "rc version dropped by heuristic"),
        // Method tokens in the path.
        ("/get/delay/1", "delay_1", "drop leading method token"),
        ("/post/data", "data", "drop leading method token"),
        ("/put/users/123", "users_123", "drop leading method token"),
        // Identifier shapes.
        ("/users/550e8400-e29b-41d4-a716-446655440000/profile", "users_profile", "uuid"),
        ("/sessions/01ARZ3NDEKTSV4RRFFQ69G5FAV", "sessions", "ulid"),
        ("/obj/507f1f77bcf86cd799439011", "obj", "mongo oid"),
        ("/events/1699999999999", "events", "millisecond timestamp"),
        ("/tenants/12345678/billing", "tenants_billing", "long numeric id"),
        ("/users/user123/profile", "users_profile", "resource key dropped"),
        ("/orders/order_456/items/item789", "orders_items", "multiple resource keys"),
        ("/keys/ab12cd34ef56ab78", "keys", "hex blob"),
        ("/api/v1/users/user-123-abc/profile", "users_profile", "dashed resource key"),
        // Keep-list tokens.
        ("/status200/check", "status200_check", "keep-list status"),
        ("/http2/support", "http2_support", "keep-list http2"),
        ("/oauth2/authorize", "oauth2_authorize", "keep oauth2"),
        ("/api/v1/bulk/upload", "bulk_upload", "keep bulk"),
        ("/search/users", "search_users", "keep search"),
        // Identity keywords.
        ("/users/me/profile", "users_me_profile", "keep me"),
        ("/accounts/self/limits", "accounts_self_limits", "keep self"),
        ("/profiles/current", "profiles_current", "keep current"),
        // Locales and formats.
        ("/content/en/articles", "content_en_articles", "keep locale"),
        ("/content/en-US/articles", "content_en-us_articles", "locale lower-cased"),
        ("/export/csv", "export_csv", "keep format token"),
        ("/feed/recent.json", "feed_recent", "trim trailing extension"),
        ("/api/v1/data.json", "data", "trim extension after pruning"),
        ("/reports/export.csv", "reports_export", "trim csv extension"),
        ("/logs/events.ndjson", "logs_events.ndjson", "long extension stays"),
        ("/config/settings.xml", "config_settings", "trim xml extension"),
        // Well-known paths.
        (
            "/.well-known/openid-configuration",
            ".well-known_openid-configuration",
            "keep both well-known tokens",
        ),
        ("/.well-known/jwks.json", ".well-known_jwks", "trim extension on jwks"),
        // Deep paths shape to head-2 plus tail-1.
        (
            "/billing/tenant123/invoices/invoice456/items/item789",
            "billing_invoices_items",
            "deep path shaping",
        ),
        ("/api/v2/orders/order456/items/item789", "orders_items", "deep path shaping"),
        ("/a/b/c/d/e", "a_b_e", "generic deep path"),
        ("/users/123/orders/456/items/789", "users_123_789", "short ids kept in shape"),
        // Matrix parameters and oddities.
        ("/app;jsessionid=ABC123/home", "app", "drop matrix parameter"),
        ("/reports;region=us/2024/summary.pdf", "reports", "drop matrix and tail"),
        ("/users/123?expand=roles", "users_123", "drop query"),
        ("/reports/2024-10-01/summary.pdf", "reports_summary", "drop date, trim extension"),
        // Template variables.
        ("/data/{{.previousStep.value}}/view", "data_view", "strip template variable"),
        ("/data/{{.value}}/validate", "data_validate", "strip simple template variable"),
        ("/auth/view/{{.tenant_id}}/remove", "auth_view_remove", "strip mid-path variable"),
        ("/config/{{.previousStep.value.vaule2}}/create", "config_create", "nested variable"),
        // Edge cases.
        ("", "root", "empty path"),
        ("///", "root", "multiple slashes"),
        ("/API/V1/Users", "users", "mixed case normalized"),
        (
            "/path-with-dashes/and_underscores",
            "path-with-dashes_and_underscores",
            "dashes and underscores preserved",
        ),
        ("/123/456/789", "123_456_789", "short numerics kept"),
        (
            "/this/is/a/very/long/path/that/would/produce/a/name/longer/than/eighty/characters/once/normalized",
            "this_is_normalized",
            "deep path shaping keeps bounds",
        ),
    ];

    for (path, expected, note) in cases {
        let result = normalize(path);
        assert_eq!(&result, expected, "normalize({path:?}) ({note})");
    }
}

#[test]
fn drop_only_paths_normalize_to_root() {
    assert_eq!(normalize("/api/v1/"), ROOT_TEMPLATE);
    assert_eq!(normalize("/api/v1/1234567890"), ROOT_TEMPLATE);
    assert_eq!(normalize("/get/post"), ROOT_TEMPLATE);
}

#[test]
fn templates_are_idempotent_under_renormalization() {
    let paths = [
        "/api/v1/users/550e8400-e29b-41d4-a716-446655440000/profile",
        "/.well-known/jwks.json",
        "/status/200",
        "/users/123/orders/456/items/789",
        "/a/b/c/d/e",
        "/content/en-US/articles",
        "/",
        "/api/v1/",
    ];

    for path in paths {
        let once = normalize(path);
        let twice = normalize(&once);
        assert_eq!(once, twice, "renormalizing {path:?}");
    }
}

#[test]
fn templates_truncate_to_eighty_bytes() {
    let long_segment = "a".repeat(200);
    let result = normalize(&format!("/{long_segment}"));
    assert_eq!(result.len(), 80);
}

// ============================================================================
// SECTION: Method Prefixing
// ============================================================================

#[test]
fn method_prefix_upper_cases_and_defaults_to_get() {
    assert_eq!(
        normalize_with_method("/policy/{{.setup.tenant_locator}}/holds", "patch"),
        "PATCH_policy_holds"
    );
    assert_eq!(normalize_with_method("/a/b/c/d/e", ""), "GET_a_b_e");
    assert_eq!(normalize_with_method("/users", "delete"), "DELETE_users");
}

// ============================================================================
// SECTION: GraphQL Routes
// ============================================================================

#[test]
fn graphql_routes_short_circuit_to_a_fixed_template() {
    let normalizer = PathNormalizer::new(test_config());
    let body = br#"{"operationName":"GetUser","query":"query GetUser { user { id } }"}"#;

    let request = normalizer.normalize_request("/api/graphql", "post", "application/json", body);
    assert_eq!(request.key, "POST_graphql");
    assert_eq!(request.operation.as_deref(), Some("GetUser"));

    let bare = normalizer.normalize_request("/gql", "", "", &[]);
    assert_eq!(bare.key, "GET_graphql");
    assert_eq!(bare.operation, None);

    let plain = normalizer.normalize_request("/users", "get", "application/json", body);
    assert_eq!(plain.key, "GET_users");
    assert_eq!(plain.operation, None);
}

#[test]
fn graphql_operation_requires_json_content() {
    let body = br#"{"operationName":"ListOrders"}"#;
    assert_eq!(
        graphql_operation("application/json", body).as_deref(),
        Some("ListOrders")
    );
    assert_eq!(graphql_operation("text/plain", body), None);
    assert_eq!(graphql_operation("application/json", &[]), None);
}

// ============================================================================
// SECTION: Cache Behavior
// ============================================================================

#[test]
fn cache_returns_previous_results_for_raw_paths() {
    let normalizer = PathNormalizer::new(test_config());
    let first = normalizer.normalize("/Users/ME/profile");
    let second = normalizer.normalize("/Users/ME/profile");
    assert_eq!(first, second);
    assert_eq!(normalizer.stats().cache_entries, 1);
}

#[test]
fn full_cache_is_flushed_whole() {
    let normalizer = PathNormalizer::new(NormalizerConfig {
        max_endpoints: 5000,
        cache_size: 2,
    });
    normalizer.normalize("/alpha/one");
    normalizer.normalize("/beta/two");
    assert_eq!(normalizer.stats().cache_entries, 2);

    normalizer.normalize("/gamma/three");
    assert_eq!(normalizer.stats().cache_entries, 1);
}

// ============================================================================
// SECTION: Collision and Overflow
// ============================================================================

#[test]
fn colliding_templates_receive_a_stable_suffix() {
    let normalizer = PathNormalizer::new(test_config());
    let first = normalizer.normalize("/users/me");
    let second = normalizer.normalize("users/me");

    assert_eq!(first, "users_me");
    assert_eq!(second, format!("users_me_{}", collision_suffix("users/me")));
}

#[test]
fn overflow_routes_to_the_other_bucket() {
    let normalizer = PathNormalizer::new(NormalizerConfig {
        max_endpoints: 2,
        cache_size: 8192,
    });
    assert_eq!(normalizer.normalize("/alpha"), "alpha");
    assert_eq!(normalizer.normalize("/beta"), "beta");
    assert_eq!(normalizer.normalize("/gamma"), "other");

    let stats = normalizer.stats();
    assert_eq!(stats.cardinality.unique_endpoints, 2);
    assert_eq!(stats.cardinality.endpoints_bucketed, 1);
}

// ============================================================================
// SECTION: Environment Override
// ============================================================================

#[test]
fn environment_override_controls_the_default_ceiling() {
    std::env::set_var(MAX_ENDPOINTS_ENV_VAR, "7");
    assert_eq!(NormalizerConfig::from_env().max_endpoints, 7);

    std::env::set_var(MAX_ENDPOINTS_ENV_VAR, "not-a-number");
    assert_eq!(NormalizerConfig::from_env().max_endpoints, 5000);

    std::env::remove_var(MAX_ENDPOINTS_ENV_VAR);
    assert_eq!(NormalizerConfig::from_env().max_endpoints, 5000);
}
