//! Keel Engine - orchestration layer
//!
//! Provides the snapshot manager, the convergence point between step
//! execution and persisted state: it drives the begin/end mutation
//! protocol, records pending operations for crash recovery, merges
//! completed steps into the next snapshot, and invokes the persister.

pub mod manager;

pub use manager::{SnapshotManager, SnapshotMutation};
