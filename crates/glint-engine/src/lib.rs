//! Glint engine crate.
//!
//! A minimal real-time rasterization core: WGSL stages compiled and linked
//! into a program, a static mesh on the device, a model/view/projection chain
//! and a render loop issuing one draw per frame. The graphics API sits behind
//! the [`device::Backend`] trait; [`device::WgpuBackend`] is the real one.

pub mod core;
pub mod device;
pub mod geometry;
pub mod logging;
pub mod render;
pub mod shader;
pub mod time;
pub mod transform;
pub mod window;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
