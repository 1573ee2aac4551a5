//! Change classification for completed steps

pub mod classifier;

pub use classifier::{same_states_equivalent, step_requires_save};
