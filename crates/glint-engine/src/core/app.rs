use crate::device::Backend;
use crate::render::RenderLoop;

use super::SetupError;

/// Application contract implemented by higher layers.
///
/// `setup` runs once, after the device and surface exist, and builds the loop
/// the runtime drives. An error aborts the runtime before the first frame.
pub trait App {
    fn setup<B: Backend>(&mut self, backend: &mut B) -> Result<RenderLoop<B>, SetupError>;
}
