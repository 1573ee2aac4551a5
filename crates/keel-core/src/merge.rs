//! Merge engine: folds completed steps into the base snapshot
//!
//! `MergeState` tracks, for one deployment, which base entries have been
//! superseded or deleted, which are pending deletion from a replace pair,
//! the states produced by completed steps (in completion order), and the
//! live pending-operation set. `snap` folds all of that into the next
//! snapshot's resource list:
//!
//! 1. completed-step results, in the order their steps ended, then
//! 2. the base walk in base order, skipping superseded entries and
//!    emitting pending-deletion entries as tombstoned clones.
//!
//! Steps arrive in a valid topological order of the dependency graph, so
//! completed results are dependency-ordered among themselves; base entries
//! that no step has visited keep their base positions, which preserves
//! ordering for resources the deployment will eventually delete but has
//! not yet (their dependents still reference them).
//!
//! Base entries are never mutated in place: a pending-deletion entry is
//! emitted as a shallow clone with the tombstone flag set, so concurrent
//! readers of the base snapshot stay safe.

use std::collections::HashMap;

use serde_json::Value;

use crate::model::manifest::Manifest;
use crate::model::operation::PendingOperation;
use crate::model::resource::ResourceState;
use crate::model::snapshot::Snapshot;
use crate::model::urn::Urn;

/// Mutable merge state for one deployment over an immutable base
#[derive(Debug, Clone)]
pub struct MergeState {
    /// Base snapshot resource list, in base order
    base: Vec<ResourceState>,
    /// Base positions superseded by a completed step (substituted or deleted)
    consumed: Vec<bool>,
    /// Base positions marked pending-deletion by a replace pair
    doomed: Vec<bool>,
    /// States produced by completed steps, in End order
    operated: Vec<ResourceState>,
    /// Position in `operated` per URN
    operated_index: HashMap<Urn, usize>,
    /// Live pending operations, in Begin order
    operations: Vec<PendingOperation>,
}

impl MergeState {
    /// Start merge tracking over a base snapshot
    pub fn new(base: &Snapshot) -> Self {
        let len = base.resources.len();
        Self {
            base: base.resources.clone(),
            consumed: vec![false; len],
            doomed: vec![false; len],
            operated: Vec::new(),
            operated_index: HashMap::new(),
            operations: Vec::new(),
        }
    }

    /// The tombstone flag a base entry would carry if emitted now
    fn effective_delete(&self, index: usize) -> bool {
        self.base[index].delete || self.doomed[index]
    }

    /// Find the first unconsumed base position for a URN with the given
    /// effective tombstone flag
    fn find_base_entry(&self, urn: &Urn, delete: bool) -> Option<usize> {
        (0..self.base.len()).find(|&i| {
            !self.consumed[i] && self.base[i].urn == *urn && self.effective_delete(i) == delete
        })
    }

    /// Record the state produced by a completed step
    ///
    /// If a completed state already exists for the URN it is replaced in
    /// place (output rewrites re-visit a URN); otherwise the state is
    /// appended in completion order.
    pub fn record_completed(&mut self, state: ResourceState) {
        match self.operated_index.get(&state.urn) {
            Some(&i) => self.operated[i] = state,
            None => {
                self.operated_index
                    .insert(state.urn.clone(), self.operated.len());
                self.operated.push(state);
            }
        }
    }

    /// Whether a completed state exists for the URN
    pub fn has_completed(&self, urn: &Urn) -> bool {
        self.operated_index.contains_key(urn)
    }

    /// Mark the prior state of a completed step as superseded
    ///
    /// Consumes the matching base entry when one exists; otherwise drops a
    /// state recorded earlier in this deployment (create-then-delete).
    pub fn mark_done(&mut self, old: &ResourceState) {
        if let Some(i) = self.find_base_entry(&old.urn, old.delete) {
            self.consumed[i] = true;
            return;
        }
        if let Some(i) = self.operated_index.remove(&old.urn) {
            self.operated.remove(i);
            self.reindex_operated();
        }
    }

    fn reindex_operated(&mut self) {
        self.operated_index = self
            .operated
            .iter()
            .enumerate()
            .map(|(i, r)| (r.urn.clone(), i))
            .collect();
    }

    /// Mark the live base entry for a replaced resource as pending deletion
    ///
    /// The entry stays at its base position and is emitted as a tombstoned
    /// clone. Idempotent per URN.
    pub fn mark_pending_deletion(&mut self, old: &ResourceState) {
        if let Some(i) = (0..self.base.len())
            .find(|&i| !self.consumed[i] && !self.base[i].delete && self.base[i].urn == old.urn)
        {
            self.doomed[i] = true;
        }
    }

    /// Record a pending operation at mutation Begin
    pub fn add_operation(&mut self, operation: PendingOperation) {
        self.operations.push(operation);
    }

    /// Remove the pending operation for a URN at mutation End
    pub fn remove_operation(&mut self, urn: &Urn) {
        self.operations.retain(|op| op.resource.urn != *urn);
    }

    /// The live pending operations
    pub fn operations(&self) -> &[PendingOperation] {
        &self.operations
    }

    /// Produce the next snapshot from the current merge state
    pub fn snap(&self, manifest: Manifest, secrets_manager: Value) -> Snapshot {
        let mut resources = self.operated.clone();
        for (i, resource) in self.base.iter().enumerate() {
            if self.consumed[i] {
                continue;
            }
            if self.doomed[i] && !resource.delete {
                resources.push(resource.as_deleted());
            } else {
                resources.push(resource.clone());
            }
        }
        Snapshot::new(manifest, secrets_manager, resources, self.operations.clone())
    }
}
