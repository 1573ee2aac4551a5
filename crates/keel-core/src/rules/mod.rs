//! Snapshot-wide invariants and their verification

pub mod integrity;

pub use integrity::{verify_snapshot, IntegrityError, IntegrityErrorKind};
