//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";
pub const FIELD_SPAN_ID: &str = "span_id";

// Entity identifiers
pub const FIELD_URN: &str = "urn";
pub const FIELD_STEP_OP: &str = "step_op";
pub const FIELD_OPERATION_KIND: &str = "operation_kind";

// Collection sizes
pub const FIELD_RESOURCE_COUNT: &str = "resource_count";
pub const FIELD_PENDING_COUNT: &str = "pending_count";

// Outcome fields
pub const FIELD_SAVED: &str = "saved";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_CHECKPOINT: &str = "checkpoint";
