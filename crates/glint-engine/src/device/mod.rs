//! GPU device seam.
//!
//! This module is responsible for:
//! - the [`Backend`] trait the core drives (stages, programs, geometry, per-frame calls)
//! - the wgpu implementation: Instance/Adapter/Device/Queue, Surface, depth target
//! - device-level errors and surface error policy

mod backend;
mod context;
mod error;
mod init;
mod surface;
mod wgpu_backend;

pub use backend::{
    Backend, DrawCall, GeometryDescriptor, IndexFormat, ProgramLayout, StageDescriptor,
    UniformBinding, UniformLocation,
};
pub use context::{Gpu, GpuFrame};
pub use error::{DeviceError, DeviceOp, SurfaceErrorAction};
pub use init::GpuInit;
pub use wgpu_backend::{PolygonMode, WgpuBackend, WgpuGeometry, WgpuProgram, WgpuStage};
