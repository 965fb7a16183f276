// perf-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Perf Gate Interfaces
// Description: Seams between the aggregation engine and its collaborators.
// Purpose: Define the contract surfaces for test runners and service calls.
// Dependencies: crate::core, serde_json
// ============================================================================

//! ## Overview
//! The engine integrates with the surrounding toolchain through two seams:
//! a metrics sink that a test runner records request observations into, and
//! a service-call client behind which per-backend adapters are implemented
//! statically. Neither seam leaks backend detail into the engine.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use crate::core::snapshot::Snapshot;
use crate::core::snapshot::TestGroup;

// ============================================================================
// SECTION: Metrics Sink
// ============================================================================

/// Sink for request observations produced by a test runner.
pub trait MetricsSink: Send + Sync {
    /// Records a request observation without endpoint attribution.
    fn record_request(&self, duration: Duration, status: u16, transport_error: bool);

    /// Records a request observation attributed to a normalized endpoint.
    fn record_endpoint_request(
        &self,
        duration: Duration,
        status: u16,
        method: &str,
        endpoint: &str,
        transport_error: bool,
    );

    /// Installs the recorded test structure and setup data.
    fn record_structure(
        &self,
        groups: BTreeMap<String, TestGroup>,
        setup_data: BTreeMap<String, String>,
    );

    /// Renders the collected state as a snapshot.
    fn snapshot(&self) -> Snapshot;

    /// Clears all collected state.
    fn reset(&self);
}

// ============================================================================
// SECTION: Service Client
// ============================================================================

/// Service-call errors.
#[derive(Debug, Error)]
pub enum ServiceCallError {
    /// The operation is not part of the backend contract.
    #[error("unknown service operation: {0}")]
    UnknownOperation(String),
    /// The backend reported a call failure.
    #[error("service call failed: {0}")]
    CallFailed(String),
}

/// Backend-agnostic service-call client.
///
/// Adapters resolve `operation` statically; there is no reflective dispatch.
pub trait ServiceClient {
    /// Invokes a named operation with parameters and an optional body.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceCallError`] when the operation is unknown or fails.
    fn call(
        &self,
        operation: &str,
        params: &BTreeMap<String, serde_json::Value>,
        body: Option<&serde_json::Value>,
    ) -> Result<BTreeMap<String, serde_json::Value>, ServiceCallError>;
}
