use keel_core_types::{RequestId, TraceId};
use thiserror::Error;

use crate::rules::integrity::IntegrityError;

/// Result type alias using SnapshotError
pub type Result<T> = std::result::Result<T, SnapshotError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// This taxonomy provides a stable, structured classification of all errors
/// in the keel system. Each kind maps to a stable error code that can be
/// used for programmatic error handling, testing, and external API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeelErrorKind {
    // Snapshot integrity
    DuplicateUrn,
    MissingDependency,
    ParentNotFound,
    ProviderNotFound,
    VerificationFailed,

    // Mutation protocol
    InvariantViolation,
    Canceled,

    // Integration/IO
    Io,
    Serialization,
    Persistence,

    // Generic
    InvalidInput,
    NotFound,
    Concurrency,
    Internal,
}

impl KeelErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            KeelErrorKind::DuplicateUrn => "ERR_DUPLICATE_URN",
            KeelErrorKind::MissingDependency => "ERR_MISSING_DEPENDENCY",
            KeelErrorKind::ParentNotFound => "ERR_PARENT_NOT_FOUND",
            KeelErrorKind::ProviderNotFound => "ERR_PROVIDER_NOT_FOUND",
            KeelErrorKind::VerificationFailed => "ERR_VERIFICATION_FAILED",
            KeelErrorKind::InvariantViolation => "ERR_INVARIANT_VIOLATION",
            KeelErrorKind::Canceled => "ERR_CANCELED",
            KeelErrorKind::Io => "ERR_IO",
            KeelErrorKind::Serialization => "ERR_SERIALIZATION",
            KeelErrorKind::Persistence => "ERR_PERSISTENCE",
            KeelErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            KeelErrorKind::NotFound => "ERR_NOT_FOUND",
            KeelErrorKind::Concurrency => "ERR_CONCURRENCY",
            KeelErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// This error type provides a structured representation of errors with
/// classification fields for programmatic handling and rich context for
/// debugging.
#[derive(Debug, Clone)]
pub struct KeelError {
    kind: KeelErrorKind,
    op: Option<String>,
    urn: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<KeelError>>,
}

impl KeelError {
    /// Create a new error with the specified kind
    pub fn new(kind: KeelErrorKind) -> Self {
        Self {
            kind,
            op: None,
            urn: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add resource URN context
    pub fn with_urn(mut self, urn: impl Into<String>) -> Self {
        self.urn = Some(urn.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: KeelError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> KeelErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the URN context, if any
    pub fn urn(&self) -> Option<&str> {
        self.urn.as_deref()
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the trace ID context, if any
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&KeelError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for KeelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(urn) = &self.urn {
            write!(f, " (urn: {})", urn)?;
        }
        Ok(())
    }
}

impl std::error::Error for KeelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for snapshot manager operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    /// The candidate snapshot failed integrity verification
    #[error("failed to verify snapshot: {}", format_integrity_errors(.errors))]
    VerificationFailed { errors: Vec<IntegrityError> },

    /// The persister rejected or failed a save
    #[error("snapshot persistence failed: {message}")]
    Persister { message: String },

    /// The mutation protocol was violated (a bug in the caller or the manager)
    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },

    /// Cooperative shutdown was requested; the mutation skipped its save
    #[error("operation canceled")]
    Canceled,

    /// Serialization error (JSON encoding/decoding)
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

fn format_integrity_errors(errors: &[IntegrityError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Conversion from SnapshotError to KeelError
///
/// This allows code using SnapshotError to surface errors through the
/// canonical error facility (and its logging hooks) without losing the
/// structured kind.
impl From<SnapshotError> for KeelError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::VerificationFailed { errors } => {
                let mut e = KeelError::new(KeelErrorKind::VerificationFailed)
                    .with_op("save_snapshot")
                    .with_message(format!("{} integrity error(s)", errors.len()));
                if let Some(first) = errors.first() {
                    e = e.with_urn(first.urn.to_string());
                }
                e
            }

            SnapshotError::Persister { message } => KeelError::new(KeelErrorKind::Persistence)
                .with_op("save_snapshot")
                .with_message(message),

            SnapshotError::InvariantViolation { message } => {
                KeelError::new(KeelErrorKind::InvariantViolation).with_message(message)
            }

            SnapshotError::Canceled => {
                KeelError::new(KeelErrorKind::Canceled).with_message("operation canceled")
            }

            SnapshotError::Serialization { message } => {
                KeelError::new(KeelErrorKind::Serialization).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to SnapshotError
impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Serialization {
            message: err.to_string(),
        }
    }
}
