// perf-gate-core/src/core/snapshot.rs
// ============================================================================
// Module: Perf Gate Snapshot Types
// Description: Per-run metric snapshot wire format.
// Purpose: Provide the JSON schema shared by producers and the aggregator.
// Dependencies: chrono, serde
// ============================================================================

//! ## Overview
//! A snapshot is the unit of exchange between a load-test run and the
//! aggregator: a root test group with checks, a metric map, optional setup
//! data, and the observation window. The aggregate emitted after a merge uses
//! the same schema.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

use crate::core::hashing::content_id;
use crate::core::metric::Metric;

// ============================================================================
// SECTION: Test Structure
// ============================================================================

/// A named assertion with pass/fail tallies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCheck {
    /// Check name.
    pub name: String,
    /// Hierarchical check path.
    pub path: String,
    /// Stable check identifier.
    pub id: String,
    /// Number of passing observations.
    pub passes: u64,
    /// Number of failing observations.
    pub fails: u64,
}

/// A test group holding nested groups and checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestGroup {
    /// Group name.
    pub name: String,
    /// Hierarchical group path.
    pub path: String,
    /// Stable group identifier.
    pub id: String,
    /// Nested groups keyed by name.
    #[serde(default, deserialize_with = "nullable_map")]
    pub groups: BTreeMap<String, TestGroup>,
    /// Checks keyed by name.
    #[serde(default, deserialize_with = "nullable_map")]
    pub checks: BTreeMap<String, TestCheck>,
}

impl TestGroup {
    /// Creates an empty root group.
    #[must_use]
    pub fn root() -> Self {
        Self {
            name: String::new(),
            path: String::new(),
            id: content_id(""),
            groups: BTreeMap::new(),
            checks: BTreeMap::new(),
        }
    }
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// A per-run metric snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Root test group.
    pub root_group: TestGroup,
    /// Metrics keyed by metric name.
    #[serde(default, deserialize_with = "nullable_map")]
    pub metrics: BTreeMap<String, Metric>,
    /// Setup data recorded by the run.
    #[serde(default, deserialize_with = "nullable_map", skip_serializing_if = "BTreeMap::is_empty")]
    pub setup_data: BTreeMap<String, String>,
    /// Start of the observation window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// End of the observation window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Creates an empty snapshot skeleton with a fresh root group.
    #[must_use]
    pub fn skeleton() -> Self {
        Self {
            root_group: TestGroup::root(),
            metrics: BTreeMap::new(),
            setup_data: BTreeMap::new(),
            start_time: None,
            end_time: None,
        }
    }
}

// ============================================================================
// SECTION: Deserialization Helpers
// ============================================================================

/// Deserializes a map field, accepting an explicit `null` as empty.
fn nullable_map<'de, D, V>(deserializer: D) -> Result<BTreeMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    Ok(Option::<BTreeMap<String, V>>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::Snapshot;

    #[test]
    fn null_maps_deserialize_as_empty() {
        let parsed: Snapshot = serde_json::from_str(
            r#"{
                "root_group": {"name": "", "path": "", "id": "x", "groups": null, "checks": null},
                "metrics": null
            }"#,
        )
        .unwrap();
        assert!(parsed.root_group.groups.is_empty());
        assert!(parsed.root_group.checks.is_empty());
        assert!(parsed.metrics.is_empty());
        assert!(parsed.start_time.is_none());
    }

    #[test]
    fn skeleton_has_stable_root_id() {
        let first = Snapshot::skeleton();
        let second = Snapshot::skeleton();
        assert_eq!(first.root_group.id, second.root_group.id);
        assert_eq!(first.root_group.id.len(), 32);
    }
}
