use serde::{Deserialize, Serialize};

use super::resource::ResourceState;

/// The kind of in-flight work a pending operation records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Creating,
    Updating,
    Deleting,
    Reading,
    Importing,
}

impl OperationKind {
    /// Stable lowercase label, matching the persisted form
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Creating => "creating",
            OperationKind::Updating => "updating",
            OperationKind::Deleting => "deleting",
            OperationKind::Reading => "reading",
            OperationKind::Importing => "importing",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A pending operation: inserted at mutation Begin, removed at End
///
/// Pending operations make in-flight work recoverable: if the process dies
/// mid-step, the operation survives in the last saved snapshot and the next
/// run can interpret it. At most one pending operation exists per URN at a
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub resource: ResourceState,
    #[serde(rename = "type")]
    pub kind: OperationKind,
}

impl PendingOperation {
    pub fn new(resource: ResourceState, kind: OperationKind) -> Self {
        Self { resource, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_kind_labels() {
        assert_eq!(OperationKind::Creating.label(), "creating");
        assert_eq!(OperationKind::Updating.label(), "updating");
        assert_eq!(OperationKind::Deleting.label(), "deleting");
        assert_eq!(OperationKind::Reading.label(), "reading");
        assert_eq!(OperationKind::Importing.label(), "importing");
    }

    #[test]
    fn test_pending_operation_serde() {
        let op = PendingOperation::new(ResourceState::new("a", "t"), OperationKind::Creating);
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json.get("type").and_then(|v| v.as_str()), Some("creating"));

        let back: PendingOperation = serde_json::from_value(json).unwrap();
        assert_eq!(op, back);
    }
}
