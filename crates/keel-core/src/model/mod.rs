//! Domain models for the snapshot layer
//!
//! Resource states, snapshots, pending operations, steps, and the
//! property-value union they all carry.

pub mod manifest;
pub mod operation;
pub mod property;
pub mod resource;
pub mod snapshot;
pub mod step;
pub mod urn;

pub use manifest::{Manifest, PluginInfo};
pub use operation::{OperationKind, PendingOperation};
pub use property::{Archive, ArchiveSource, Asset, AssetSource, PropertyMap, PropertyValue};
pub use resource::{CustomTimeouts, ResourceState};
pub use snapshot::{IntegrityErrorMetadata, Snapshot, SnapshotMetadata};
pub use step::{Step, StepOp};
pub use urn::{ProviderReference, Urn};
