//! Error handling for keel-store
//!
//! Wraps keel-core KeelError with store-specific helpers

use keel_core::errors::{KeelError, KeelErrorKind};

/// Result type alias using KeelError
pub type Result<T> = std::result::Result<T, KeelError>;

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> KeelError {
    KeelError::new(KeelErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Create a snapshot encoding error
pub fn encode_error(operation: &str, err: serde_json::Error) -> KeelError {
    KeelError::new(KeelErrorKind::Serialization)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
