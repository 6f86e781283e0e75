use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::device::{
    Backend, DeviceError, DeviceOp, DrawCall, GeometryDescriptor, ProgramLayout, StageDescriptor,
    UniformLocation,
};
use crate::render::ClearColor;
use crate::shader::StageKind;

/// One successful device call, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateStage { id: u64, kind: StageKind },
    ReleaseStage { id: u64 },
    CreateProgram { id: u64, vertex: u64, fragment: u64 },
    ReleaseProgram { id: u64 },
    UniformLocation { program: u64, name: String },
    CreateGeometry { id: u64, vertex_bytes: usize, index_bytes: Option<usize> },
    ReleaseGeometry { id: u64 },
    PrepareDraw { program: u64, geometry: u64 },
    Clear(ClearColor),
    UseProgram { program: u64 },
    SetUniform { program: u64, location: UniformLocation, value: [f32; 16] },
    BindGeometry { geometry: u64 },
    Draw(DrawCall),
    Present,
    AbandonFrame,
}

impl Call {
    /// The fallible operation this call corresponds to, if any.
    pub fn op(&self) -> Option<DeviceOp> {
        Some(match self {
            Call::CreateStage { .. } => DeviceOp::CreateStage,
            Call::CreateProgram { .. } => DeviceOp::CreateProgram,
            Call::CreateGeometry { .. } => DeviceOp::CreateGeometry,
            Call::PrepareDraw { .. } => DeviceOp::PrepareDraw,
            Call::Clear(_) => DeviceOp::Clear,
            Call::UseProgram { .. } => DeviceOp::UseProgram,
            Call::SetUniform { .. } => DeviceOp::SetUniform,
            Call::BindGeometry { .. } => DeviceOp::BindGeometry,
            Call::Draw(_) => DeviceOp::Draw,
            Call::Present => DeviceOp::Present,
            Call::ReleaseStage { .. }
            | Call::ReleaseProgram { .. }
            | Call::UniformLocation { .. }
            | Call::ReleaseGeometry { .. }
            | Call::AbandonFrame => return None,
        })
    }
}

/// Decrements its counter when the owning handle is dropped.
#[derive(Debug)]
struct Live(Rc<Cell<usize>>);

impl Live {
    fn new(counter: &Rc<Cell<usize>>) -> Self {
        counter.set(counter.get() + 1);
        Self(Rc::clone(counter))
    }
}

impl Drop for Live {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

#[derive(Debug)]
pub struct RecordedStage {
    id: u64,
    kind: StageKind,
    _live: Live,
}

#[derive(Debug)]
pub struct RecordedProgram {
    id: u64,
    layout: ProgramLayout,
    _live: Live,
}

#[derive(Debug)]
pub struct RecordedGeometry {
    id: u64,
    _live: Live,
}

#[derive(Debug, Copy, Clone)]
struct Failure {
    fatal: bool,
    once: bool,
}

/// In-memory [`Backend`] that journals every call and fails on demand.
///
/// Frame-scoped calls are checked for order (`clear` must open the frame), so
/// tests catch sequencing mistakes that a real device would reject.
#[derive(Debug)]
pub struct RecordingBackend {
    calls: Vec<Call>,
    failures: HashMap<DeviceOp, Failure>,
    hidden_uniforms: HashSet<String>,
    surface_size: (u32, u32),
    in_frame: bool,
    active_program: Option<u64>,
    next_id: u64,
    live_stages: Rc<Cell<usize>>,
    live_programs: Rc<Cell<usize>>,
    live_geometries: Rc<Cell<usize>>,
    live_at_drop: Rc<Cell<Option<usize>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            failures: HashMap::new(),
            hidden_uniforms: HashSet::new(),
            surface_size: (800, 600),
            in_frame: false,
            active_program: None,
            next_id: 0,
            live_stages: Rc::default(),
            live_programs: Rc::default(),
            live_geometries: Rc::default(),
            live_at_drop: Rc::default(),
        }
    }

    pub fn with_surface_size(mut self, width: u32, height: u32) -> Self {
        self.surface_size = (width, height);
        self
    }

    // ── journal ─────────────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<Call> {
        self.calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn clear_journal(&mut self) {
        self.calls.clear();
    }

    pub fn live_stages(&self) -> usize {
        self.live_stages.get()
    }

    /// Programs plus geometries still alive when this backend was dropped.
    ///
    /// Reads `None` until the backend is dropped.
    pub fn live_at_drop(&self) -> Rc<Cell<Option<usize>>> {
        Rc::clone(&self.live_at_drop)
    }

    pub fn live_programs(&self) -> usize {
        self.live_programs.get()
    }

    pub fn live_geometries(&self) -> usize {
        self.live_geometries.get()
    }

    // ── failure injection ───────────────────────────────────────────────

    /// Fails every subsequent `op`.
    pub fn fail_on(&mut self, op: DeviceOp) {
        self.failures.insert(op, Failure { fatal: false, once: false });
    }

    /// Fails the next `op` only.
    pub fn fail_once(&mut self, op: DeviceOp) {
        self.failures.insert(op, Failure { fatal: false, once: true });
    }

    /// Fails the next `op` with an error flagged fatal.
    pub fn fail_fatal_once(&mut self, op: DeviceOp) {
        self.failures.insert(op, Failure { fatal: true, once: true });
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    /// Makes `uniform_location` report `name` as inactive.
    pub fn hide_uniform(&mut self, name: &str) {
        self.hidden_uniforms.insert(name.to_owned());
    }

    fn check(&mut self, op: DeviceOp) -> Result<(), DeviceError> {
        let Some(failure) = self.failures.get(&op).copied() else {
            return Ok(());
        };
        if failure.once {
            self.failures.remove(&op);
        }
        Err(if failure.fatal {
            DeviceError::fatal(op, "injected fatal failure")
        } else {
            DeviceError::new(op, "injected failure")
        })
    }

    fn check_in_frame(&mut self, op: DeviceOp) -> Result<(), DeviceError> {
        self.check(op)?;
        if self.in_frame {
            Ok(())
        } else {
            Err(DeviceError::new(op, "no frame in flight"))
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl Drop for RecordingBackend {
    fn drop(&mut self) {
        self.live_at_drop
            .set(Some(self.live_programs() + self.live_geometries()));
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for RecordingBackend {
    type Stage = RecordedStage;
    type Program = RecordedProgram;
    type Geometry = RecordedGeometry;

    fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    fn create_stage(&mut self, desc: &StageDescriptor<'_>) -> Result<Self::Stage, DeviceError> {
        self.check(DeviceOp::CreateStage)?;
        let id = self.next_id();
        self.calls.push(Call::CreateStage { id, kind: desc.kind });
        Ok(RecordedStage {
            id,
            kind: desc.kind,
            _live: Live::new(&self.live_stages),
        })
    }

    fn create_program(
        &mut self,
        vertex: &Self::Stage,
        fragment: &Self::Stage,
        layout: &ProgramLayout,
    ) -> Result<Self::Program, DeviceError> {
        self.check(DeviceOp::CreateProgram)?;
        if vertex.kind != StageKind::Vertex || fragment.kind != StageKind::Fragment {
            return Err(DeviceError::new(DeviceOp::CreateProgram, "stage kinds out of order"));
        }

        let id = self.next_id();
        self.calls.push(Call::CreateProgram {
            id,
            vertex: vertex.id,
            fragment: fragment.id,
        });
        Ok(RecordedProgram {
            id,
            layout: layout.clone(),
            _live: Live::new(&self.live_programs),
        })
    }

    fn uniform_location(&mut self, program: &Self::Program, name: &str) -> Option<UniformLocation> {
        self.calls.push(Call::UniformLocation {
            program: program.id,
            name: name.to_owned(),
        });
        if self.hidden_uniforms.contains(name) {
            return None;
        }
        program
            .layout
            .uniforms
            .iter()
            .find(|u| u.name == name)
            .map(|u| u.location)
    }

    fn create_geometry(&mut self, desc: &GeometryDescriptor<'_>) -> Result<Self::Geometry, DeviceError> {
        self.check(DeviceOp::CreateGeometry)?;
        let id = self.next_id();
        self.calls.push(Call::CreateGeometry {
            id,
            vertex_bytes: desc.vertices.len(),
            index_bytes: desc.indices.map(|(bytes, _)| bytes.len()),
        });
        Ok(RecordedGeometry {
            id,
            _live: Live::new(&self.live_geometries),
        })
    }

    fn prepare_draw(&mut self, program: &Self::Program, geometry: &Self::Geometry) -> Result<(), DeviceError> {
        self.check(DeviceOp::PrepareDraw)?;
        self.calls.push(Call::PrepareDraw {
            program: program.id,
            geometry: geometry.id,
        });
        Ok(())
    }

    fn clear(&mut self, color: ClearColor) -> Result<(), DeviceError> {
        self.check(DeviceOp::Clear)?;
        self.in_frame = true;
        self.active_program = None;
        self.calls.push(Call::Clear(color));
        Ok(())
    }

    fn use_program(&mut self, program: &Self::Program) -> Result<(), DeviceError> {
        self.check_in_frame(DeviceOp::UseProgram)?;
        self.active_program = Some(program.id);
        self.calls.push(Call::UseProgram { program: program.id });
        Ok(())
    }

    fn set_uniform_mat4(
        &mut self,
        program: &Self::Program,
        location: UniformLocation,
        value: &[f32; 16],
    ) -> Result<(), DeviceError> {
        self.check_in_frame(DeviceOp::SetUniform)?;
        if !program.layout.uniforms.iter().any(|u| u.location == location) {
            return Err(DeviceError::new(DeviceOp::SetUniform, "unknown uniform location"));
        }
        self.calls.push(Call::SetUniform {
            program: program.id,
            location,
            value: *value,
        });
        Ok(())
    }

    fn bind_geometry(&mut self, geometry: &Self::Geometry) -> Result<(), DeviceError> {
        self.check_in_frame(DeviceOp::BindGeometry)?;
        if self.active_program.is_none() {
            return Err(DeviceError::new(DeviceOp::BindGeometry, "no program in use"));
        }
        self.calls.push(Call::BindGeometry { geometry: geometry.id });
        Ok(())
    }

    fn draw(&mut self, call: DrawCall) -> Result<(), DeviceError> {
        self.check_in_frame(DeviceOp::Draw)?;
        self.calls.push(Call::Draw(call));
        Ok(())
    }

    fn present(&mut self) -> Result<(), DeviceError> {
        self.check_in_frame(DeviceOp::Present)?;
        self.in_frame = false;
        self.active_program = None;
        self.calls.push(Call::Present);
        Ok(())
    }

    fn abandon_frame(&mut self) {
        if self.in_frame {
            self.in_frame = false;
            self.active_program = None;
            self.calls.push(Call::AbandonFrame);
        }
    }

    fn release_stage(&mut self, stage: Self::Stage) {
        self.calls.push(Call::ReleaseStage { id: stage.id });
    }

    fn release_program(&mut self, program: Self::Program) {
        self.calls.push(Call::ReleaseProgram { id: program.id });
    }

    fn release_geometry(&mut self, geometry: Self::Geometry) {
        self.calls.push(Call::ReleaseGeometry { id: geometry.id });
    }
}
