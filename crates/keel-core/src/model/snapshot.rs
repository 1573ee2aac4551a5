use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::manifest::Manifest;
use super::operation::PendingOperation;
use super::resource::ResourceState;
use crate::errors::{Result, SnapshotError};
use crate::rules::integrity::{self, IntegrityError};

/// The persisted total state of a stack: resources, pending operations,
/// and deployment metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Deployment-time metadata (timestamp, tool version, plugins)
    pub manifest: Manifest,

    /// Opaque secrets-provider token, produced by a collaborator and stored
    /// verbatim; the snapshot layer never interprets it
    #[serde(rename = "secretsmanager", default)]
    pub secrets_manager: Value,

    /// Ordered resource list; dependency-before-dependent ordering is an
    /// integrity invariant
    #[serde(default)]
    pub resources: Vec<ResourceState>,

    /// In-flight operations at the time of the save
    #[serde(default)]
    pub pending_operations: Vec<PendingOperation>,

    /// Diagnostic metadata attached at save time
    #[serde(default)]
    pub metadata: SnapshotMetadata,
}

impl Snapshot {
    pub fn new(
        manifest: Manifest,
        secrets_manager: Value,
        resources: Vec<ResourceState>,
        pending_operations: Vec<PendingOperation>,
    ) -> Self {
        Self {
            manifest,
            secrets_manager,
            resources,
            pending_operations,
            metadata: SnapshotMetadata::default(),
        }
    }

    /// Run the integrity verifier over this snapshot
    ///
    /// Returns `VerificationFailed` carrying the full violation list when
    /// any invariant does not hold.
    pub fn verify_integrity(&self) -> Result<()> {
        let errors = integrity::verify_snapshot(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SnapshotError::VerificationFailed { errors })
        }
    }
}

/// Snapshot metadata block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SnapshotMetadata {
    /// Populated when a save was attempted with integrity errors, so that
    /// operators can inspect the bad state offline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity_error_metadata: Option<IntegrityErrorMetadata>,
}

/// Diagnostic payload recorded when a snapshot failed verification at save
/// time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityErrorMetadata {
    pub errors: Vec<IntegrityError>,
}
