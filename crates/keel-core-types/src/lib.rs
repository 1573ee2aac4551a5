//! Keel Core Types - foundational types shared across keel facilities
//!
//! This crate provides types used by both the error handling and logging
//! facilities:
//!
//! - **Correlation types**: RequestId, TraceId, SpanId, RequestContext
//! - **Sensitive data**: Sensitive<T> marker for automatic redaction
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::{RequestContext, RequestId, SpanId, TraceId};
pub use sensitive::Sensitive;
