// perf-gate-core/src/core/cardinality.rs
// ============================================================================
// Module: Perf Gate Cardinality Controller
// Description: Endpoint-key admission under a cardinality ceiling.
// Purpose: Bound distinct endpoint keys and resolve template collisions.
// Dependencies: crate::core::hashing
// ============================================================================

//! ## Overview
//! The controller admits normalized endpoint keys until a ceiling is reached;
//! overflow is routed to the `other` bucket or dropped when bucketing is
//! disabled. Two different origins normalizing to the same key receive a
//! stable hash suffix so their metrics stay separate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;

use crate::core::hashing::collision_suffix;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Bucket receiving samples admitted past the cardinality ceiling.
pub const OVERFLOW_BUCKET: &str = "other";

// ============================================================================
// SECTION: Admission
// ============================================================================

/// Outcome of admitting a normalized key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Key admitted, possibly with a collision suffix.
    Admitted(String),
    /// Ceiling reached; the sample belongs in [`OVERFLOW_BUCKET`].
    Bucketed,
    /// Ceiling reached with bucketing disabled; the sample is discarded.
    Dropped,
}

// ============================================================================
// SECTION: Statistics
// ============================================================================

/// Point-in-time cardinality statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardinalityStats {
    /// Number of distinct admitted keys, excluding the overflow bucket.
    pub unique_endpoints: usize,
    /// Configured cardinality ceiling.
    pub max_endpoints: usize,
    /// Number of samples routed to the overflow bucket.
    pub endpoints_bucketed: usize,
    /// Ratio of admitted keys to the ceiling.
    pub cardinality_ratio: f64,
}

// ============================================================================
// SECTION: Controller
// ============================================================================

/// Mutable admission state, guarded by the controller lock.
#[derive(Debug, Default)]
struct CardinalityState {
    /// Distinct admitted keys.
    endpoint_count: usize,
    /// Samples routed to the overflow bucket.
    endpoints_bucketed: usize,
    /// Admitted key to the origin that first produced it.
    key_to_origin: HashMap<String, String>,
}

/// Enforces the endpoint cardinality ceiling for one pipeline instance.
#[derive(Debug)]
pub struct CardinalityController {
    /// Admission state behind a single lock.
    state: Mutex<CardinalityState>,
    /// Maximum number of distinct keys admitted.
    max_endpoints: usize,
    /// Whether overflow samples are dropped instead of bucketed.
    no_bucket: bool,
}

impl CardinalityController {
    /// Creates a controller with the given ceiling and overflow policy.
    #[must_use]
    pub fn new(max_endpoints: usize, no_bucket: bool) -> Self {
        Self {
            state: Mutex::new(CardinalityState::default()),
            max_endpoints,
            no_bucket,
        }
    }

    /// Admits a normalized key produced from `origin`.
    ///
    /// Re-admitting a known `(key, origin)` pair is idempotent and does not
    /// consume ceiling capacity.
    pub fn admit(&self, normalized: &str, origin: &str) -> Admission {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(existing) = state.key_to_origin.get(normalized) {
            if existing == origin {
                return Admission::Admitted(normalized.to_string());
            }
            let suffixed = format!("{normalized}_{}", collision_suffix(origin));
            if !state.key_to_origin.contains_key(&suffixed) {
                if state.endpoint_count >= self.max_endpoints {
                    return self.overflow(&mut state);
                }
                state.key_to_origin.insert(suffixed.clone(), origin.to_string());
                state.endpoint_count += 1;
            }
            return Admission::Admitted(suffixed);
        }

        if state.endpoint_count >= self.max_endpoints {
            return self.overflow(&mut state);
        }

        state.key_to_origin.insert(normalized.to_string(), origin.to_string());
        state.endpoint_count += 1;
        Admission::Admitted(normalized.to_string())
    }

    /// Returns current admission statistics.
    pub fn stats(&self) -> CardinalityStats {
        let state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        #[allow(clippy::cast_precision_loss, reason = "counts are far below 2^52")]
        let cardinality_ratio = if self.max_endpoints == 0 {
            0.0
        } else {
            state.endpoint_count as f64 / self.max_endpoints as f64
        };
        CardinalityStats {
            unique_endpoints: state.endpoint_count,
            max_endpoints: self.max_endpoints,
            endpoints_bucketed: state.endpoints_bucketed,
            cardinality_ratio,
        }
    }

    /// Applies the configured overflow policy.
    fn overflow(&self, state: &mut CardinalityState) -> Admission {
        if self.no_bucket {
            return Admission::Dropped;
        }
        state.endpoints_bucketed += 1;
        Admission::Bucketed
    }
}
