//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, wires them to the wgpu backend and
//! drives the application's `RenderLoop` from redraw events.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
