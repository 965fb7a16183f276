// perf-gate-core/src/core/mod.rs
// ============================================================================
// Module: Perf Gate Core Types
// Description: Canonical metric, snapshot, and endpoint-template structures.
// Purpose: Provide stable, serializable types for the aggregation pipeline.
// Dependencies: chrono, regex, serde, sha2
// ============================================================================

//! ## Overview
//! Core types define the snapshot wire format, the metric value model, and
//! the endpoint-template machinery (token classification, path normalization,
//! and cardinality control). These types are the canonical source of truth
//! for every derived surface (aggregation, validation, reports).

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cardinality;
pub mod classifier;
pub mod hashing;
pub mod metric;
pub mod normalizer;
pub mod snapshot;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cardinality::Admission;
pub use cardinality::CardinalityController;
pub use cardinality::CardinalityStats;
pub use cardinality::OVERFLOW_BUCKET;
pub use classifier::TokenAction;
pub use classifier::classify_token;
pub use metric::GLOBAL_METRICS;
pub use metric::Metric;
pub use metric::MetricKind;
pub use metric::MetricValues;
pub use metric::PERCENTILE_KEYS;
pub use metric::is_global_metric;
pub use normalizer::MAX_ENDPOINTS_ENV_VAR;
pub use normalizer::NormalizedRequest;
pub use normalizer::NormalizerConfig;
pub use normalizer::NormalizerStats;
pub use normalizer::PathNormalizer;
pub use normalizer::ROOT_TEMPLATE;
pub use normalizer::graphql_operation;
pub use snapshot::Snapshot;
pub use snapshot::TestCheck;
pub use snapshot::TestGroup;
