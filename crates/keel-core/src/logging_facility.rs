//! Structured logging for the mutation protocol
//!
//! Provides lifecycle macros (step begin/end at debug, checkpoints at
//! info, failures at error with the stable code), best-effort subscriber
//! installation for engine binaries, and an in-memory capture mode for
//! asserting on emitted events in tests.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init_json, init_text};
