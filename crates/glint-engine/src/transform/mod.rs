//! Model/view/projection transform chain.
//!
//! A `TransformPipeline` is built once from `TransformParams` and updated
//! every frame with a `FrameTick`. The camera is either a fixed translation or
//! an orbit around the origin; the model angle is fixed or spinning.

mod error;
mod params;
mod pipeline;
mod viewport;

pub use error::TransformError;
pub use params::{AngleSource, CameraMode, ClipDepth, ModelRotation, Perspective, TransformParams};
pub use pipeline::{TransformPipeline, TransformState};
pub use viewport::Viewport;
