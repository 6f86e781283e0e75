use crate::device::Backend;
use crate::geometry::{GeometryError, GeometryHandle, LayoutMismatchError};
use crate::shader::LinkedProgram;

use super::SetupError;

/// A linked program paired with the geometry it draws.
///
/// Fields drop in declaration order: geometry first, then program, matching
/// the explicit teardown in [`Drawable::release`].
pub struct Drawable<B: Backend> {
    pub(crate) geometry: GeometryHandle<B>,
    pub(crate) program: LinkedProgram<B>,
}

impl<B: Backend> Drawable<B> {
    /// Pairs `program` with `geometry` and bakes the vertex state on the device.
    ///
    /// On failure both resources are released.
    pub fn new(
        backend: &mut B,
        program: LinkedProgram<B>,
        geometry: GeometryHandle<B>,
    ) -> Result<Self, SetupError> {
        let drawable = Self { geometry, program };

        let unbound = drawable
            .program
            .vertex_inputs()
            .iter()
            .copied()
            .find(|slot| !drawable.geometry.layout().provides_slot(*slot));
        if let Some(slot) = unbound {
            drawable.release(backend);
            return Err(GeometryError::from(LayoutMismatchError::UnboundSlot { slot }).into());
        }

        if let Err(err) = backend.prepare_draw(drawable.program.raw(), drawable.geometry.raw()) {
            drawable.release(backend);
            return Err(GeometryError::from(err).into());
        }

        Ok(drawable)
    }

    pub fn program(&self) -> &LinkedProgram<B> {
        &self.program
    }

    pub fn geometry(&self) -> &GeometryHandle<B> {
        &self.geometry
    }

    /// Frees the geometry, then the program.
    pub fn release(self, backend: &mut B) {
        let Self { geometry, program } = self;
        geometry.release(backend);
        program.release(backend);
    }
}
