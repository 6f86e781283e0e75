use crate::geometry::VertexLayout;
use crate::render::ClearColor;
use crate::shader::StageKind;

use super::DeviceError;

/// Device-assigned location of a uniform value.
///
/// Under wgpu a uniform lives in its own buffer at `(group, binding)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
}

impl UniformLocation {
    #[inline]
    pub const fn new(group: u32, binding: u32) -> Self {
        Self { group, binding }
    }
}

/// A named uniform reflected from shader source.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UniformBinding {
    pub name: String,
    pub location: UniformLocation,
    /// Byte size of the uniform's type.
    pub size: u32,
}

/// Input handed to [`Backend::create_stage`] once the front-end accepted the source.
#[derive(Debug, Copy, Clone)]
pub struct StageDescriptor<'a> {
    pub kind: StageKind,
    pub source: &'a str,
    pub entry_point: &'a str,
    pub label: Option<&'a str>,
}

/// Resource interface of a program, merged from both stages at link time.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ProgramLayout {
    /// Uniforms sorted by location.
    pub uniforms: Vec<UniformBinding>,
    /// Vertex input slots expected by the vertex stage.
    pub vertex_inputs: Vec<u32>,
}

/// Width of one index element.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// Input handed to [`Backend::create_geometry`] once the layout has been validated.
#[derive(Debug, Copy, Clone)]
pub struct GeometryDescriptor<'a> {
    pub vertices: &'a [u8],
    pub indices: Option<(&'a [u8], IndexFormat)>,
    pub layout: &'a VertexLayout,
    pub label: Option<&'a str>,
}

/// A single draw command.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DrawCall {
    Indexed { count: u32, format: IndexFormat },
    Arrays { count: u32 },
}

/// Native graphics API seam.
///
/// The core never talks to the graphics API directly; it drives a `Backend`.
/// Handles are owned values: dropping one frees the device resource, and the
/// `release_*` methods exist so a backend can also purge its own bookkeeping.
///
/// Frame-scoped calls (`clear` .. `present`) must be issued in order; `clear`
/// opens a frame and `present` or `abandon_frame` closes it.
pub trait Backend {
    type Stage;
    type Program;
    type Geometry;

    /// Current drawable size in physical pixels.
    fn surface_size(&self) -> (u32, u32);

    fn create_stage(&mut self, desc: &StageDescriptor<'_>) -> Result<Self::Stage, DeviceError>;

    fn create_program(
        &mut self,
        vertex: &Self::Stage,
        fragment: &Self::Stage,
        layout: &ProgramLayout,
    ) -> Result<Self::Program, DeviceError>;

    /// Looks up the location of a uniform by name. `None` if the program does not use it.
    fn uniform_location(&mut self, program: &Self::Program, name: &str) -> Option<UniformLocation>;

    fn create_geometry(&mut self, desc: &GeometryDescriptor<'_>) -> Result<Self::Geometry, DeviceError>;

    /// Bakes the vertex state for drawing `geometry` with `program`.
    fn prepare_draw(&mut self, program: &Self::Program, geometry: &Self::Geometry) -> Result<(), DeviceError>;

    fn clear(&mut self, color: ClearColor) -> Result<(), DeviceError>;

    fn use_program(&mut self, program: &Self::Program) -> Result<(), DeviceError>;

    fn set_uniform_mat4(
        &mut self,
        program: &Self::Program,
        location: UniformLocation,
        value: &[f32; 16],
    ) -> Result<(), DeviceError>;

    fn bind_geometry(&mut self, geometry: &Self::Geometry) -> Result<(), DeviceError>;

    fn draw(&mut self, call: DrawCall) -> Result<(), DeviceError>;

    /// Submits the frame opened by `clear` and hands it to the surface.
    fn present(&mut self) -> Result<(), DeviceError>;

    /// Drops a partially recorded frame without presenting it.
    fn abandon_frame(&mut self) {}

    fn release_stage(&mut self, stage: Self::Stage) {
        drop(stage);
    }

    fn release_program(&mut self, program: Self::Program) {
        drop(program);
    }

    fn release_geometry(&mut self, geometry: Self::Geometry) {
        drop(geometry);
    }
}
