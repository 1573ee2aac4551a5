//! Mutation-protocol logging macros
//!
//! A deployment emits one begin/end pair per resource, so step lifecycle
//! events log at debug; the events an operator actually watches are
//! checkpoint writes (info) and failures (error, with the stable code).
//! Every end event reports whether the operation wrote a checkpoint.

/// Log the start of a mutation-protocol operation
///
/// Protocol operations are URN-scoped; manager-wide operations (close)
/// use the bare form.
///
/// # Example
///
/// ```
/// # use keel_core::log_op_start;
/// log_op_start!("begin_mutation", urn = "prod::web::::t::a");
/// log_op_start!("close");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr, urn = $urn:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            component = module_path!(),
            op = $op,
            event = keel_core_types::schema::EVENT_START,
            urn = %$urn,
            $($($field)*)?
        );
    };
    ($op:expr) => {
        tracing::debug!(
            component = module_path!(),
            op = $op,
            event = keel_core_types::schema::EVENT_START,
        );
    };
}

/// Log the successful end of a mutation-protocol operation
///
/// The `saved` flag records whether the operation wrote a checkpoint;
/// elided operations (identical sames, skip-checkpoints mode) end with
/// `saved = false`.
///
/// # Example
///
/// ```
/// # use keel_core::log_op_end;
/// log_op_end!("end_mutation", duration_ms = 42, saved = true);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr, saved = $saved:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            component = module_path!(),
            op = $op,
            event = keel_core_types::schema::EVENT_END,
            duration_ms = $duration,
            saved = $saved,
            $($($field)*)?
        );
    };
}

/// Log a mutation-protocol operation failure
///
/// Converts the error through the canonical facility so the event carries
/// the stable error code, kind, and (when the error names one) the URN.
///
/// # Example
///
/// ```
/// # use keel_core::{log_op_error, errors::SnapshotError};
/// log_op_error!("end_mutation", SnapshotError::Canceled, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        use $crate::errors::KeelError;
        let keel_err: KeelError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = keel_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?keel_err.kind(),
            err_code = keel_err.code(),
            urn = keel_err.urn().unwrap_or_default(),
        );
    }};
}

/// Log a checkpoint write (a snapshot handed to the persister)
///
/// # Example
///
/// ```
/// # use keel_core::log_checkpoint;
/// log_checkpoint!(resource_count = 3, pending_count = 1);
/// ```
#[macro_export]
macro_rules! log_checkpoint {
    (resource_count = $resources:expr, pending_count = $pending:expr) => {
        tracing::info!(
            component = module_path!(),
            op = "checkpoint",
            event = keel_core_types::schema::EVENT_CHECKPOINT,
            resource_count = $resources,
            pending_count = $pending,
        );
    };
}
