//! Construction-time wiring.
//!
//! Builds a `Drawable` (compiled + linked program and uploaded geometry) and
//! defines the `App` contract the window runtime calls into.

mod app;
mod drawable;
mod setup;

pub use app::App;
pub use drawable::Drawable;
pub use setup::{build_drawable, MeshData, SetupError};
