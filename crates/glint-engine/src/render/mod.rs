//! Frame rendering and the render loop.
//!
//! - `FrameRenderer` issues the per-frame command sequence for one drawable
//! - `RenderLoop` polls the close signal, samples the tick, updates transforms,
//!   renders and presents, and tears the drawable down on close

mod color;
mod frame;
mod render_loop;

pub use color::ClearColor;
pub use frame::{FrameRenderer, MODEL, PROJECTION, VIEW};
pub use render_loop::{CloseSignal, LoopState, RenderLoop, TickSource};
