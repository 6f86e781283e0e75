use thiserror::Error;

use crate::device::Backend;
use crate::geometry::{self, GeometryError, Indices, VertexLayout};
use crate::shader::{link, CompileError, LinkError, ShaderSource, StageCompiler};
use crate::transform::TransformError;

use super::Drawable;

/// Anything that can go wrong before the first frame.
///
/// Setup aborts on the first error; there is no fallback program.
#[derive(Debug, Clone, Error)]
pub enum SetupError {
    #[error("shader compilation failed")]
    Compile(#[from] CompileError),

    #[error("program link failed")]
    Link(#[from] LinkError),

    #[error("geometry setup failed")]
    Geometry(#[from] GeometryError),

    #[error("invalid transform parameters")]
    Transform(#[from] TransformError),
}

/// Raw mesh input: interleaved vertex bytes, optional indices and their layout.
#[derive(Debug, Copy, Clone)]
pub struct MeshData<'a> {
    pub vertices: &'a [u8],
    pub indices: Indices<'a>,
    pub layout: &'a VertexLayout,
}

/// Compiles and links the two stages, uploads the mesh and pairs them.
///
/// Every resource created before a failure is released before returning.
pub fn build_drawable<B: Backend>(
    backend: &mut B,
    vertex: ShaderSource,
    fragment: ShaderSource,
    mesh: MeshData<'_>,
) -> Result<Drawable<B>, SetupError> {
    let mut compiler = StageCompiler::new();

    let vs = compiler.compile(backend, vertex)?;
    let fs = match compiler.compile(backend, fragment) {
        Ok(fs) => fs,
        Err(err) => {
            vs.release(backend);
            return Err(err.into());
        }
    };

    let program = link(backend, vs, fs)?;

    let geometry = match geometry::build(backend, mesh.vertices, mesh.indices, mesh.layout) {
        Ok(geometry) => geometry,
        Err(err) => {
            program.release(backend);
            return Err(err.into());
        }
    };

    Drawable::new(backend, program, geometry)
}
