//! Snapshot wire encoding
//!
//! Renders snapshots to their persisted JSON form and parses them back.
//! Property values keep their secret wrapping and computed sentinels across
//! the round trip; the secrets-manager token passes through verbatim.

use crate::errors::{encode_error, Result};
use keel_core::model::snapshot::Snapshot;

/// Encode a snapshot to its persisted JSON bytes
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let json = serde_json::to_vec_pretty(snapshot).map_err(|e| encode_error("encode_snapshot", e))?;

    tracing::debug!(
        size_bytes = json.len(),
        resource_count = snapshot.resources.len(),
        pending_count = snapshot.pending_operations.len(),
        "Encoded snapshot"
    );

    Ok(json)
}

/// Decode a snapshot from its persisted JSON bytes
pub fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot> {
    serde_json::from_slice(bytes).map_err(|e| encode_error("decode_snapshot", e))
}
