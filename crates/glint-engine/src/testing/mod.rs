//! Test support: an in-memory backend and shared fixtures.
//!
//! Compiled for the crate's own tests and, through the `testing` feature, for
//! downstream crates' tests.

pub mod fixtures;
mod recording;

pub use recording::{Call, RecordedGeometry, RecordedProgram, RecordedStage, RecordingBackend};
