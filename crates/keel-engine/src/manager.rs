//! Snapshot manager orchestration.
//!
//! The manager is driven by the engine once per step:
//! 1. `begin_mutation` records a pending operation so a crash mid-step is
//!    recoverable, pre-writing the snapshot for non-elidable steps
//! 2. the step executes externally
//! 3. `SnapshotMutation::end` folds the result into the merge state,
//!    classifies the completed step, and saves when the change is
//!    meaningful (failures always save, so the pending operation leaves
//!    the disk)
//!
//! All mutation state lives behind a single mutex; merge, verification,
//! and the persister call run under the lock. Saves are therefore strictly
//! ordered and every saved snapshot sees a consistent pending-operation
//! cut.
//!
//! ## Logging Ownership
//!
//! The engine layer owns lifecycle logging for manager operations:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success, with the `saved` outcome
//! - `log_op_error!` on failure
//! - `log_checkpoint!` whenever a snapshot reaches the persister
//!
//! Lower layers (store, core) use only `tracing::debug!()` for internal
//! details.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Instant;

use serde_json::Value;

use keel_core::diff::step_requires_save;
use keel_core::errors::{Result, SnapshotError};
use keel_core::merge::MergeState;
use keel_core::model::manifest::Manifest;
use keel_core::model::operation::PendingOperation;
use keel_core::model::snapshot::{IntegrityErrorMetadata, Snapshot};
use keel_core::model::step::{Step, StepOp};
use keel_core::model::urn::Urn;
use keel_core::persist::Persister;
use keel_core::policy::{CheckpointPolicy, IntegrityPolicy};
use keel_core::rules::integrity::verify_snapshot;
use keel_core::{log_checkpoint, log_op_end, log_op_error, log_op_start};
use keel_core_types::Sensitive;

/// The authoritative snapshot state for one deployment
///
/// Construct with the base snapshot and a persister, drive it with
/// `begin_mutation`/`end` once per step, and `close` it on shutdown.
/// Mutations for distinct URNs may run concurrently; the engine serializes
/// operations on the same URN.
pub struct SnapshotManager {
    inner: Mutex<ManagerInner>,
    persister: Box<dyn Persister + Send + Sync>,
    secrets_manager: Sensitive<Value>,
    integrity: IntegrityPolicy,
    checkpoints: CheckpointPolicy,
}

struct ManagerInner {
    merge: MergeState,
    manifest: Manifest,
    in_flight: HashSet<Urn>,
    replaced: HashSet<Urn>,
    serial: u64,
    closed: bool,
    canceled: bool,
}

impl SnapshotManager {
    /// Create a manager over a base snapshot with default policies
    pub fn new(
        persister: Box<dyn Persister + Send + Sync>,
        secrets_manager: Value,
        base: &Snapshot,
    ) -> Self {
        Self::with_policies(
            persister,
            secrets_manager,
            base,
            IntegrityPolicy::default(),
            CheckpointPolicy::default(),
        )
    }

    /// Create a manager with explicit integrity and checkpoint policies
    pub fn with_policies(
        persister: Box<dyn Persister + Send + Sync>,
        secrets_manager: Value,
        base: &Snapshot,
        integrity: IntegrityPolicy,
        checkpoints: CheckpointPolicy,
    ) -> Self {
        Self {
            inner: Mutex::new(ManagerInner {
                merge: MergeState::new(base),
                manifest: base.manifest.clone(),
                in_flight: HashSet::new(),
                replaced: HashSet::new(),
                serial: 0,
                closed: false,
                canceled: false,
            }),
            persister,
            secrets_manager: Sensitive::new(secrets_manager),
            integrity,
            checkpoints,
        }
    }

    /// Begin a mutation for a step
    ///
    /// Records the pending operation for the step's kind and, for
    /// non-elidable kinds, immediately writes a snapshot containing it.
    /// Returns the handle the engine must `end` once the step has executed.
    ///
    /// # Errors
    ///
    /// - `InvariantViolation`: a mutation for the URN is already in flight,
    ///   the manager is closed, or the step kind cannot begin a mutation
    /// - `Canceled`: cooperative shutdown was requested
    /// - `VerificationFailed` / `Persister`: the pre-write failed
    pub fn begin_mutation(&self, step: &Step) -> Result<SnapshotMutation<'_>> {
        log_op_start!("begin_mutation", urn = step.urn(), step_op = %step.op());
        let start = Instant::now();

        let result = self.begin_mutation_impl(step).map_err(|e| {
            let duration_ms = start.elapsed().as_millis() as u64;
            log_op_error!("begin_mutation", e.clone(), duration_ms = duration_ms);
            e
        })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        log_op_end!(
            "begin_mutation",
            duration_ms = duration_ms,
            saved = result.pre_wrote()
        );
        Ok(result)
    }

    fn begin_mutation_impl(&self, step: &Step) -> Result<SnapshotMutation<'_>> {
        let mut inner = self.lock_inner();
        let urn = step.urn().clone();

        if inner.closed {
            return Err(SnapshotError::InvariantViolation {
                message: format!("begin_mutation for {} after close", urn),
            });
        }
        if inner.canceled {
            return Err(SnapshotError::Canceled);
        }
        if step.op() == StepOp::RegisterOutputs {
            return Err(SnapshotError::InvariantViolation {
                message: "register-outputs steps go through register_resource_outputs".to_string(),
            });
        }
        if inner.in_flight.contains(&urn) {
            return Err(SnapshotError::InvariantViolation {
                message: format!("a mutation for {} is already in flight", urn),
            });
        }
        // A Same after a Replace of the same URN within one deployment has
        // no defined merge semantics; reject it rather than guess.
        if step.op() == StepOp::Same && inner.replaced.contains(&urn) {
            return Err(SnapshotError::InvariantViolation {
                message: format!("same step for {} follows a replace in this deployment", urn),
            });
        }

        let mut requires_write = false;
        if let Some(kind) = step.operation_kind() {
            let resource = match step.pending_resource() {
                Some(r) => r.clone(),
                None => {
                    return Err(SnapshotError::InvariantViolation {
                        message: format!("{} step for {} carries no state", step.op(), urn),
                    })
                }
            };
            inner.merge.add_operation(PendingOperation::new(resource, kind));
            requires_write = true;
        }

        inner.in_flight.insert(urn.clone());
        inner.serial += 1;
        let serial = inner.serial;

        let mut pre_wrote = false;
        if requires_write && self.checkpoints.writes_intermediate() {
            self.save_locked(&mut inner)?;
            pre_wrote = true;
        }

        Ok(SnapshotMutation {
            manager: self,
            urn,
            serial,
            pre_wrote,
        })
    }

    /// Rewrite a resource's output properties (Same semantics)
    ///
    /// Saves iff the outputs changed between the step's old and new states.
    pub fn register_resource_outputs(&self, step: &Step) -> Result<()> {
        log_op_start!("register_resource_outputs", urn = step.urn());
        let start = Instant::now();

        match self.register_resource_outputs_impl(step) {
            Ok(saved) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                log_op_end!(
                    "register_resource_outputs",
                    duration_ms = duration_ms,
                    saved = saved
                );
                Ok(())
            }
            Err(e) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                log_op_error!("register_resource_outputs", e.clone(), duration_ms = duration_ms);
                Err(e)
            }
        }
    }

    fn register_resource_outputs_impl(&self, step: &Step) -> Result<bool> {
        let mut inner = self.lock_inner();
        let urn = step.urn().clone();

        if inner.closed {
            return Err(SnapshotError::InvariantViolation {
                message: format!("register_resource_outputs for {} after close", urn),
            });
        }

        let (old, new) = match (step.old(), step.new()) {
            (Some(old), Some(new)) => (old.clone(), new.clone()),
            _ => {
                return Err(SnapshotError::InvariantViolation {
                    message: format!(
                        "register_resource_outputs for {} requires old and new state",
                        urn
                    ),
                })
            }
        };

        let outputs_changed = old.outputs != new.outputs;

        if !inner.merge.has_completed(&urn) {
            inner.merge.mark_done(&old);
        }
        inner.merge.record_completed(new);

        let save = outputs_changed && !inner.canceled && self.checkpoints.writes_intermediate();
        if save {
            self.save_locked(&mut inner)?;
        }
        Ok(save)
    }

    /// Request cooperative shutdown
    ///
    /// In-flight mutations may still end (their merge bookkeeping happens),
    /// but intermediate saves are skipped and no new mutation may begin.
    /// `close` still performs the final write.
    pub fn cancel(&self) {
        let mut inner = self.lock_inner();
        inner.canceled = true;
    }

    /// Flush deferred state and write the final snapshot
    ///
    /// Always writes, regardless of checkpoint policy and of whether any
    /// meaningful change is outstanding. Idempotent; blocks until the save
    /// completes. After close, `begin_mutation` is rejected.
    pub fn close(&self) -> Result<()> {
        log_op_start!("close");
        let start = Instant::now();

        let result = self.close_impl().map_err(|e| {
            let duration_ms = start.elapsed().as_millis() as u64;
            log_op_error!("close", e.clone(), duration_ms = duration_ms);
            e
        });
        if result.is_ok() {
            let duration_ms = start.elapsed().as_millis() as u64;
            log_op_end!("close", duration_ms = duration_ms, saved = true);
        }
        result
    }

    fn close_impl(&self) -> Result<()> {
        let mut inner = self.lock_inner();
        inner.closed = true;
        self.save_locked(&mut inner)
    }

    /// Complete a mutation under the lock; returns whether a checkpoint
    /// was written
    fn end_mutation(
        &self,
        mutation: &SnapshotMutation<'_>,
        step: &Step,
        success: bool,
    ) -> Result<bool> {
        let mut inner = self.lock_inner();
        let urn = step.urn().clone();

        if urn != mutation.urn {
            return Err(SnapshotError::InvariantViolation {
                message: format!(
                    "end for {} does not match the begun mutation for {}",
                    urn, mutation.urn
                ),
            });
        }
        if !inner.in_flight.remove(&urn) {
            return Err(SnapshotError::InvariantViolation {
                message: format!("no mutation in flight for {}", urn),
            });
        }

        inner.merge.remove_operation(&urn);

        // Failures never touch the merge state, but they still save so the
        // pending operation disappears from disk.
        let requires_write = if success { step_requires_save(step) } else { true };

        if success {
            match step.op() {
                StepOp::Same | StepOp::Update => {
                    if let (Some(old), Some(new)) = (step.old(), step.new()) {
                        inner.merge.mark_done(old);
                        inner.merge.record_completed(new.clone());
                    }
                }
                StepOp::Create | StepOp::Read | StepOp::Import => {
                    if let Some(old) = step.old() {
                        inner.merge.mark_done(old);
                    }
                    if let Some(new) = step.new() {
                        inner.merge.record_completed(new.clone());
                    }
                }
                StepOp::Delete => {
                    if let Some(old) = step.old() {
                        inner.merge.mark_done(old);
                    }
                }
                StepOp::CreateReplacement => {
                    if let (Some(old), Some(new)) = (step.old(), step.new()) {
                        inner.merge.mark_pending_deletion(old);
                        inner.merge.record_completed(new.clone());
                    }
                    inner.replaced.insert(urn);
                }
                StepOp::Replace => {
                    // The pair's new state was recorded when the
                    // create-replacement ended; only re-mark the old side.
                    if let Some(old) = step.old() {
                        inner.merge.mark_pending_deletion(old);
                    }
                    inner.replaced.insert(urn);
                }
                StepOp::RegisterOutputs => {
                    return Err(SnapshotError::InvariantViolation {
                        message: "register-outputs steps have no mutation to end".to_string(),
                    });
                }
            }
        }

        let wrote = requires_write && !inner.canceled && self.checkpoints.writes_intermediate();
        if wrote {
            self.save_locked(&mut inner)?;
        }
        Ok(wrote)
    }

    /// Merge, verify, and persist under the lock
    ///
    /// On verification failure the attempted snapshot is still handed to
    /// the persister with its integrity metadata populated, so operators
    /// can inspect the bad state offline.
    fn save_locked(&self, inner: &mut ManagerInner) -> Result<()> {
        let manifest = inner.manifest.restamp();
        let mut snapshot = inner
            .merge
            .snap(manifest, self.secrets_manager.expose().clone());

        let errors = verify_snapshot(&snapshot);
        if errors.is_empty() {
            self.persister.save(&snapshot)?;
            log_checkpoint!(
                resource_count = snapshot.resources.len(),
                pending_count = snapshot.pending_operations.len()
            );
            return Ok(());
        }

        snapshot.metadata.integrity_error_metadata = Some(IntegrityErrorMetadata {
            errors: errors.clone(),
        });
        let persisted = self.persister.save(&snapshot);

        if self.integrity.is_enforcing() {
            // The verification failure dominates any persister error
            return Err(SnapshotError::VerificationFailed { errors });
        }

        tracing::warn!(
            error_count = errors.len(),
            "snapshot failed verification; integrity checking is downgraded to warnings"
        );
        persisted?;
        log_checkpoint!(
            resource_count = snapshot.resources.len(),
            pending_count = snapshot.pending_operations.len()
        );
        Ok(())
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, ManagerInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Handle for an in-flight mutation, returned by `begin_mutation`
///
/// Carries the original step's URN, a serial number, and whether a
/// pre-write happened at begin.
pub struct SnapshotMutation<'a> {
    manager: &'a SnapshotManager,
    urn: Urn,
    serial: u64,
    pre_wrote: bool,
}

impl std::fmt::Debug for SnapshotMutation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotMutation")
            .field("urn", &self.urn)
            .field("serial", &self.serial)
            .field("pre_wrote", &self.pre_wrote)
            .finish()
    }
}

impl SnapshotMutation<'_> {
    /// The mutation's serial number, in begin order
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Whether begin wrote a snapshot before the step executed
    pub fn pre_wrote(&self) -> bool {
        self.pre_wrote
    }

    /// Complete the mutation
    ///
    /// Removes the pending operation. On success, folds the step's result
    /// into the merge state and saves when the completed step is
    /// meaningful. On failure (`success == false`), the base state is left
    /// intact but a save still removes the pending operation from disk.
    pub fn end(self, step: &Step, success: bool) -> Result<()> {
        log_op_start!(
            "end_mutation",
            urn = step.urn(),
            step_op = %step.op(),
            success = success
        );
        let start = Instant::now();

        match self.manager.end_mutation(&self, step, success) {
            Ok(saved) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                log_op_end!("end_mutation", duration_ms = duration_ms, saved = saved);
                Ok(())
            }
            Err(e) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                log_op_error!("end_mutation", e.clone(), duration_ms = duration_ms);
                Err(e)
            }
        }
    }
}
