//! CLI command implementations

pub mod counter;
pub mod public;
