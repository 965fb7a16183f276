// perf-gate-core/src/core/hashing.rs
// ============================================================================
// Module: Perf Gate Stable Hashing
// Description: Stable content identifiers and collision suffixes.
// Purpose: Provide deterministic identifiers for checks, groups, and keys.
// Dependencies: sha2
// ============================================================================

//! ## Overview
//! Check and group identifiers, as well as endpoint collision suffixes, are
//! derived from SHA-256 digests truncated to a fixed hex length. Identifiers
//! are opaque; only stability across runs is observable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Length of a content identifier in hex characters.
const CONTENT_ID_LEN: usize = 32;
/// Length of an endpoint collision suffix in hex characters.
const COLLISION_SUFFIX_LEN: usize = 8;

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Returns the stable content identifier for an input string.
#[must_use]
pub fn content_id(input: &str) -> String {
    truncated_digest(input, CONTENT_ID_LEN)
}

/// Returns the short suffix used to disambiguate colliding endpoint keys.
#[must_use]
pub fn collision_suffix(input: &str) -> String {
    truncated_digest(input, COLLISION_SUFFIX_LEN)
}

/// Hashes the input and returns the first `len` hex characters.
fn truncated_digest(input: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut encoded = hex_encode(&digest);
    encoded.truncate(len);
    encoded
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let hi = usize::from(byte >> 4);
        let lo = usize::from(byte & 0x0f);
        out.push(char::from(HEX[hi]));
        out.push(char::from(HEX[lo]));
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
