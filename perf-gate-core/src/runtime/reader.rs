// perf-gate-core/src/runtime/reader.rs
// ============================================================================
// Module: Perf Gate Snapshot Reader
// Description: Loads and validates per-run snapshot files.
// Purpose: Turn a snapshot file into a typed snapshot or a typed failure.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The reader parses a UTF-8 JSON snapshot file. Integer values survive the
//! int-versus-float divide exactly up to 2^53. Every failure mode carries the
//! source path so the orchestrator can name the offending file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::core::snapshot::Snapshot;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Snapshot read failures, annotated with the source file.
#[derive(Debug, Error)]
pub enum SnapshotReadError {
    /// The snapshot file does not exist.
    #[error("snapshot file not found: {path}")]
    NotFound {
        /// Source file path.
        path: String,
    },
    /// The snapshot file is not readable.
    #[error("snapshot file not readable: {path}")]
    Permission {
        /// Source file path.
        path: String,
    },
    /// Reading the snapshot file failed.
    #[error("failed to read snapshot file: {path}: {detail}")]
    Io {
        /// Source file path.
        path: String,
        /// Underlying failure description.
        detail: String,
    },
    /// The snapshot file is not valid JSON.
    #[error("snapshot file is not valid JSON: {path}: {detail}")]
    Corrupt {
        /// Source file path.
        path: String,
        /// Underlying parse failure description.
        detail: String,
    },
    /// The snapshot file has no root group.
    #[error("snapshot file is missing its root group: {path}")]
    MissingRootGroup {
        /// Source file path.
        path: String,
    },
}

impl SnapshotReadError {
    /// Returns the source file path the failure names.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::NotFound {
                path,
            }
            | Self::Permission {
                path,
            }
            | Self::Io {
                path, ..
            }
            | Self::Corrupt {
                path, ..
            }
            | Self::MissingRootGroup {
                path,
            } => path,
        }
    }
}

// ============================================================================
// SECTION: Reading
// ============================================================================

/// Reads and validates a snapshot file.
///
/// # Errors
///
/// Returns [`SnapshotReadError`] naming the file when reading, parsing, or
/// schema validation fails.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, SnapshotReadError> {
    let display = path.display().to_string();
    let bytes = fs::read(path).map_err(|err| classify_io(&display, &err))?;

    let value: Value = serde_json::from_slice(&bytes).map_err(|err| SnapshotReadError::Corrupt {
        path: display.clone(),
        detail: err.to_string(),
    })?;

    if value.get("root_group").is_none_or(Value::is_null) {
        return Err(SnapshotReadError::MissingRootGroup {
            path: display,
        });
    }

    serde_json::from_value(value).map_err(|err| SnapshotReadError::Corrupt {
        path: display,
        detail: err.to_string(),
    })
}

/// Maps an I/O failure to the matching read error.
fn classify_io(path: &str, err: &io::Error) -> SnapshotReadError {
    match err.kind() {
        io::ErrorKind::NotFound => SnapshotReadError::NotFound {
            path: path.to_string(),
        },
        io::ErrorKind::PermissionDenied => SnapshotReadError::Permission {
            path: path.to_string(),
        },
        _ => SnapshotReadError::Io {
            path: path.to_string(),
            detail: err.to_string(),
        },
    }
}
