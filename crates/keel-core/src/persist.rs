//! Persister capability contract
//!
//! The snapshot manager only knows that a persister can durably save a
//! completed snapshot; transport and durability semantics belong to the
//! implementation.

use crate::errors::Result;
use crate::model::snapshot::Snapshot;

/// Capability to durably save a snapshot
///
/// `save` is called at most once per completed mutation, plus once at
/// close. Errors are treated as fatal by the manager and surfaced to the
/// engine unchanged; no retry happens at this layer.
pub trait Persister {
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}
