//! Step classification: meaningful vs. elidable changes
//!
//! A change is *meaningful* when omitting it from the persisted snapshot
//! would lose durable information; meaningful changes must be written
//! immediately, elidable ones may be batched until close.

use crate::model::resource::ResourceState;
use crate::model::step::{Step, StepOp};

/// Compare two states over the observable field set
///
/// `source_position` and the `created`/`modified` timestamps are excluded:
/// differences limited to them never make a Same step meaningful. Property
/// maps compare structurally, so key order and marshalling round trips of
/// empty containers do not register as changes.
pub fn same_states_equivalent(old: &ResourceState, new: &ResourceState) -> bool {
    old.type_ == new.type_
        && old.parent == new.parent
        && old.protect == new.protect
        && old.external == new.external
        && old.custom == new.custom
        && old.id == new.id
        && old.provider == new.provider
        && old.inputs == new.inputs
        && old.outputs == new.outputs
        && old.dependencies == new.dependencies
        && old.property_dependencies == new.property_dependencies
        && old.init_errors == new.init_errors
        && old.import_id == new.import_id
        && old.retain_on_delete == new.retain_on_delete
        && old.deleted_with == new.deleted_with
        && old.additional_secret_outputs == new.additional_secret_outputs
        && old.aliases == new.aliases
        && old.custom_timeouts == new.custom_timeouts
}

/// Decide whether a completed step requires an immediate save
///
/// Create, Read, Update, Delete, Import, Replace, and CreateReplacement are
/// always meaningful. A Same step is meaningful only when its states differ
/// in the observable field set. RegisterOutputs is meaningful only when the
/// outputs changed.
pub fn step_requires_save(step: &Step) -> bool {
    match step.op() {
        StepOp::Same => match (step.old(), step.new()) {
            (Some(old), Some(new)) => !same_states_equivalent(old, new),
            _ => true,
        },
        StepOp::RegisterOutputs => match (step.old(), step.new()) {
            (Some(old), Some(new)) => old.outputs != new.outputs,
            _ => true,
        },
        StepOp::Create
        | StepOp::Read
        | StepOp::Update
        | StepOp::Delete
        | StepOp::Replace
        | StepOp::CreateReplacement
        | StepOp::Import => true,
    }
}
