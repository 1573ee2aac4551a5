use serde::{Deserialize, Serialize};

use super::operation::OperationKind;
use super::resource::ResourceState;
use super::urn::Urn;

/// The closed set of step kinds the engine can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepOp {
    Create,
    Read,
    Update,
    Delete,
    Same,
    Replace,
    CreateReplacement,
    Import,
    RegisterOutputs,
}

impl StepOp {
    /// Stable lowercase label for logging
    pub fn label(&self) -> &'static str {
        match self {
            StepOp::Create => "create",
            StepOp::Read => "read",
            StepOp::Update => "update",
            StepOp::Delete => "delete",
            StepOp::Same => "same",
            StepOp::Replace => "replace",
            StepOp::CreateReplacement => "create-replacement",
            StepOp::Import => "import",
            StepOp::RegisterOutputs => "register-outputs",
        }
    }
}

impl std::fmt::Display for StepOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// An engine-issued record describing a transition for a single resource
///
/// Which of `old`/`new` is populated depends on the kind; the per-kind
/// constructors enforce the required shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    op: StepOp,
    old: Option<ResourceState>,
    new: Option<ResourceState>,
}

impl Step {
    /// A no-op transition in kind, possibly carrying metadata changes
    pub fn same(old: ResourceState, new: ResourceState) -> Self {
        Self {
            op: StepOp::Same,
            old: Some(old),
            new: Some(new),
        }
    }

    /// Creation of a resource with no prior state
    pub fn create(new: ResourceState) -> Self {
        Self {
            op: StepOp::Create,
            old: None,
            new: Some(new),
        }
    }

    /// Read of an external resource, with or without prior state
    pub fn read(old: Option<ResourceState>, new: ResourceState) -> Self {
        Self {
            op: StepOp::Read,
            old,
            new: Some(new),
        }
    }

    /// In-place update of an existing resource
    pub fn update(old: ResourceState, new: ResourceState) -> Self {
        Self {
            op: StepOp::Update,
            old: Some(old),
            new: Some(new),
        }
    }

    /// Deletion of an existing resource
    pub fn delete(old: ResourceState) -> Self {
        Self {
            op: StepOp::Delete,
            old: Some(old),
            new: None,
        }
    }

    /// The logical replace marker for a replace pair
    pub fn replace(old: ResourceState, new: ResourceState) -> Self {
        Self {
            op: StepOp::Replace,
            old: Some(old),
            new: Some(new),
        }
    }

    /// Creation of the replacement resource in a replace pair
    pub fn create_replacement(old: ResourceState, new: ResourceState) -> Self {
        Self {
            op: StepOp::CreateReplacement,
            old: Some(old),
            new: Some(new),
        }
    }

    /// Adoption of an externally created resource into the stack
    pub fn import(old: Option<ResourceState>, new: ResourceState) -> Self {
        Self {
            op: StepOp::Import,
            old,
            new: Some(new),
        }
    }

    /// Rewrite of a resource's output properties
    pub fn register_outputs(old: ResourceState, new: ResourceState) -> Self {
        Self {
            op: StepOp::RegisterOutputs,
            old: Some(old),
            new: Some(new),
        }
    }

    pub fn op(&self) -> StepOp {
        self.op
    }

    pub fn old(&self) -> Option<&ResourceState> {
        self.old.as_ref()
    }

    pub fn new(&self) -> Option<&ResourceState> {
        self.new.as_ref()
    }

    /// The URN this step operates on
    pub fn urn(&self) -> &Urn {
        // Every constructor populates at least one side
        self.new
            .as_ref()
            .map(|s| &s.urn)
            .or_else(|| self.old.as_ref().map(|s| &s.urn))
            .expect("step carries neither old nor new state")
    }

    /// The pending operation kind recorded for this step's mutation Begin
    ///
    /// Same and RegisterOutputs steps record no pending operation.
    pub fn operation_kind(&self) -> Option<OperationKind> {
        match self.op {
            StepOp::Create | StepOp::CreateReplacement => Some(OperationKind::Creating),
            StepOp::Update => Some(OperationKind::Updating),
            StepOp::Delete | StepOp::Replace => Some(OperationKind::Deleting),
            StepOp::Read => Some(OperationKind::Reading),
            StepOp::Import => Some(OperationKind::Importing),
            StepOp::Same | StepOp::RegisterOutputs => None,
        }
    }

    /// The state a pending operation for this step carries: the incoming
    /// state for constructive kinds, the outgoing state for destructive ones
    pub fn pending_resource(&self) -> Option<&ResourceState> {
        match self.op {
            StepOp::Create
            | StepOp::CreateReplacement
            | StepOp::Update
            | StepOp::Read
            | StepOp::Import => self.new.as_ref(),
            StepOp::Delete | StepOp::Replace => self.old.as_ref(),
            StepOp::Same | StepOp::RegisterOutputs => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res(urn: &str) -> ResourceState {
        ResourceState::new(urn, "test")
    }

    #[test]
    fn test_step_urn_prefers_new_state() {
        let step = Step::update(res("a"), res("a"));
        assert_eq!(step.urn().as_str(), "a");

        let delete = Step::delete(res("b"));
        assert_eq!(delete.urn().as_str(), "b");
    }

    #[test]
    fn test_operation_kinds_per_step() {
        assert_eq!(
            Step::create(res("a")).operation_kind(),
            Some(OperationKind::Creating)
        );
        assert_eq!(
            Step::create_replacement(res("a"), res("a")).operation_kind(),
            Some(OperationKind::Creating)
        );
        assert_eq!(
            Step::update(res("a"), res("a")).operation_kind(),
            Some(OperationKind::Updating)
        );
        assert_eq!(
            Step::delete(res("a")).operation_kind(),
            Some(OperationKind::Deleting)
        );
        assert_eq!(
            Step::replace(res("a"), res("a")).operation_kind(),
            Some(OperationKind::Deleting)
        );
        assert_eq!(
            Step::read(None, res("a")).operation_kind(),
            Some(OperationKind::Reading)
        );
        assert_eq!(
            Step::import(None, res("a")).operation_kind(),
            Some(OperationKind::Importing)
        );
        assert_eq!(Step::same(res("a"), res("a")).operation_kind(), None);
    }

    #[test]
    fn test_pending_resource_side() {
        let create = Step::create(res("a"));
        assert!(create.pending_resource().is_some());
        assert!(create.old().is_none());

        let delete = Step::delete(res("a"));
        assert_eq!(delete.pending_resource(), delete.old());
    }

    #[test]
    fn test_step_op_labels() {
        assert_eq!(StepOp::CreateReplacement.label(), "create-replacement");
        assert_eq!(StepOp::RegisterOutputs.label(), "register-outputs");
        assert_eq!(StepOp::Same.to_string(), "same");
    }
}
