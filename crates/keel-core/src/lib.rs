//! Keel Core - snapshot state kernel for the deployment engine
//!
//! This crate provides the foundational data structures and algorithms for
//! keel's snapshot layer, including:
//! - Resource state, snapshot, and pending-operation models
//! - The property-value tagged union with sentinel-preserving encoding
//! - The step model the engine drives mutations with
//! - Snapshot-wide integrity verification
//! - Meaningful-change classification for completed steps
//! - The merge engine folding completed steps into the base snapshot
//! - Integrity and checkpoint policies, and the persister contract

pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod merge;
pub mod model;
pub mod persist;
pub mod policy;
pub mod rules;

// Re-export commonly used types
pub use errors::{KeelError, KeelErrorKind, Result, SnapshotError};
pub use merge::MergeState;
pub use model::{
    Manifest, OperationKind, PendingOperation, PropertyMap, PropertyValue, ResourceState,
    Snapshot, Step, StepOp, Urn,
};
pub use persist::Persister;
pub use policy::{CheckpointPolicy, IntegrityPolicy};
pub use rules::{verify_snapshot, IntegrityError, IntegrityErrorKind};
