//! Shared helpers for snapshot manager tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use keel_core::errors::Result;
use keel_core::model::manifest::Manifest;
use keel_core::model::property::PropertyMap;
use keel_core::model::resource::ResourceState;
use keel_core::model::snapshot::Snapshot;
use keel_core::model::urn::Urn;
use keel_core::persist::Persister;
use keel_core::policy::{CheckpointPolicy, IntegrityPolicy};
use keel_engine::SnapshotManager;

/// Persister that records every saved snapshot in memory
#[derive(Clone, Default)]
pub struct RecordingPersister {
    saved: Arc<Mutex<Vec<Snapshot>>>,
}

impl RecordingPersister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<Snapshot> {
        self.saved.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.save_count() == 0
    }

    /// The most recently saved snapshot
    ///
    /// # Panics
    ///
    /// Panics when nothing has been saved yet.
    pub fn last(&self) -> Snapshot {
        self.saved
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no snapshot has been saved")
    }
}

impl Persister for RecordingPersister {
    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        self.saved.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}

pub fn new_resource(urn: &str) -> ResourceState {
    ResourceState::new(urn, "test")
}

pub fn new_resource_with_deps(urn: &str, deps: &[&str]) -> ResourceState {
    let mut r = new_resource(urn);
    r.dependencies = deps.iter().map(|d| Urn::from(*d)).collect();
    r
}

pub fn new_resource_with_inputs(urn: &str, inputs: PropertyMap) -> ResourceState {
    let mut r = new_resource(urn);
    r.inputs = inputs;
    r
}

pub fn new_snapshot(resources: Vec<ResourceState>) -> Snapshot {
    Snapshot::new(
        Manifest::new("0.0.0-test", Vec::new()),
        serde_json::json!({"kind": "base64"}),
        resources,
        Vec::new(),
    )
}

/// Verify the base snapshot, then build a manager over it with default
/// policies and a recording persister
pub fn setup(base: &Snapshot) -> (SnapshotManager, RecordingPersister) {
    base.verify_integrity()
        .expect("base snapshot must satisfy integrity invariants");

    let persister = RecordingPersister::new();
    let manager = SnapshotManager::new(
        Box::new(persister.clone()),
        base.secrets_manager.clone(),
        base,
    );
    (manager, persister)
}

/// Like `setup`, with explicit policies
pub fn setup_with_policies(
    base: &Snapshot,
    integrity: IntegrityPolicy,
    checkpoints: CheckpointPolicy,
) -> (SnapshotManager, RecordingPersister) {
    base.verify_integrity()
        .expect("base snapshot must satisfy integrity invariants");

    let persister = RecordingPersister::new();
    let manager = SnapshotManager::with_policies(
        Box::new(persister.clone()),
        base.secrets_manager.clone(),
        base,
        integrity,
        checkpoints,
    );
    (manager, persister)
}
