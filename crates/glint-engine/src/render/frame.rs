use nalgebra::Matrix4;

use crate::device::{Backend, DeviceError};
use crate::geometry::GeometryHandle;
use crate::shader::LinkedProgram;
use crate::transform::TransformState;

use super::ClearColor;

/// Uniform names the renderer pushes every frame.
pub const MODEL: &str = "model";
pub const VIEW: &str = "view";
pub const PROJECTION: &str = "projection";

/// Issues the fixed per-frame command sequence for one drawable.
#[derive(Debug, Clone, Default)]
pub struct FrameRenderer {
    clear_color: ClearColor,
}

impl FrameRenderer {
    pub fn new(clear_color: ClearColor) -> Self {
        Self { clear_color }
    }

    pub fn clear_color(&self) -> ClearColor {
        self.clear_color
    }

    /// clear → use program → model/view/projection → bind geometry → draw.
    ///
    /// Stops at the first failing device call. Uniforms the program does not
    /// use are skipped.
    pub fn render_frame<B: Backend>(
        &self,
        backend: &mut B,
        program: &mut LinkedProgram<B>,
        geometry: &GeometryHandle<B>,
        transforms: &TransformState,
    ) -> Result<(), DeviceError> {
        backend.clear(self.clear_color)?;
        backend.use_program(program.raw())?;

        let uniforms = [
            (MODEL, &transforms.model),
            (VIEW, &transforms.view),
            (PROJECTION, &transforms.projection),
        ];
        for (name, matrix) in uniforms {
            let Some(location) = program.uniform_location(backend, name) else {
                continue;
            };
            backend.set_uniform_mat4(program.raw(), location, &column_major(matrix))?;
        }

        backend.bind_geometry(geometry.raw())?;
        backend.draw(geometry.draw_call())
    }
}

fn column_major(m: &Matrix4<f32>) -> [f32; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.as_slice());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceOp, DrawCall, IndexFormat, UniformLocation};
    use crate::geometry::{self, Indices};
    use crate::shader::{link, ShaderSource, StageCompiler};
    use crate::testing::{fixtures, Call, RecordingBackend};

    fn quad_setup(
        backend: &mut RecordingBackend,
        fragment: &str,
    ) -> (LinkedProgram<RecordingBackend>, GeometryHandle<RecordingBackend>) {
        let mut compiler = StageCompiler::new();
        let vs = compiler
            .compile(backend, ShaderSource::vertex(fixtures::MVP_VERTEX))
            .expect("vertex");
        let fs = compiler
            .compile(backend, ShaderSource::fragment(fragment))
            .expect("fragment");
        let program = link(backend, vs, fs).expect("link");

        let quad = fixtures::unit_quad();
        let geometry = geometry::build(
            backend,
            quad.vertex_bytes(),
            Indices::from_u16(&quad.indices),
            &quad.layout,
        )
        .expect("quad");
        (program, geometry)
    }

    #[test]
    fn quad_frame_issues_one_indexed_draw_of_six() {
        let mut backend = RecordingBackend::new();
        let (mut program, geometry) = quad_setup(&mut backend, fixtures::COLOR_FRAGMENT);
        backend.clear_journal();

        FrameRenderer::default()
            .render_frame(&mut backend, &mut program, &geometry, &TransformState::identity(1.0))
            .expect("frame");

        let draws: Vec<_> = backend
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Draw(draw) => Some(draw),
                _ => None,
            })
            .collect();
        assert_eq!(
            draws,
            vec![DrawCall::Indexed {
                count: 6,
                format: IndexFormat::U16
            }]
        );
    }

    #[test]
    fn frame_follows_the_fixed_sequence() {
        let mut backend = RecordingBackend::new();
        let (mut program, geometry) = quad_setup(&mut backend, fixtures::COLOR_FRAGMENT);
        backend.clear_journal();

        let state = TransformState::identity(1.0);
        FrameRenderer::new(ClearColor::BLACK)
            .render_frame(&mut backend, &mut program, &geometry, &state)
            .expect("frame");

        let ops: Vec<_> = backend.calls().iter().filter_map(Call::op).collect();
        assert_eq!(
            ops,
            vec![
                DeviceOp::Clear,
                DeviceOp::UseProgram,
                DeviceOp::SetUniform,
                DeviceOp::SetUniform,
                DeviceOp::SetUniform,
                DeviceOp::BindGeometry,
                DeviceOp::Draw,
            ]
        );

        let calls = backend.calls();
        assert!(calls.contains(&Call::Clear(ClearColor::BLACK)));
        let projection = calls.iter().find_map(|c| match c {
            Call::SetUniform { location, value, .. } if *location == UniformLocation::new(0, 2) => Some(*value),
            _ => None,
        });
        assert_eq!(projection, Some(column_major(&state.projection)));
    }

    #[test]
    fn unused_uniform_is_skipped() {
        let mut backend = RecordingBackend::new();
        let (mut program, geometry) = quad_setup(&mut backend, fixtures::COLOR_FRAGMENT);
        // Pretend the device optimized `view` away.
        backend.hide_uniform("view");
        backend.clear_journal();

        let renderer = FrameRenderer::default();
        let state = TransformState::identity(1.0);
        for _ in 0..2 {
            renderer
                .render_frame(&mut backend, &mut program, &geometry, &state)
                .expect("frame");
        }

        assert_eq!(backend.count(|c| matches!(c, Call::SetUniform { .. })), 4);
        assert_eq!(backend.count(|c| matches!(c, Call::UniformLocation { .. })), 3);
        assert_eq!(backend.count(|c| matches!(c, Call::Draw(_))), 2);
    }

    #[test]
    fn failing_call_stops_the_frame() {
        let mut backend = RecordingBackend::new();
        let (mut program, geometry) = quad_setup(&mut backend, fixtures::COLOR_FRAGMENT);
        backend.fail_once(DeviceOp::BindGeometry);
        backend.clear_journal();

        let err = FrameRenderer::default()
            .render_frame(&mut backend, &mut program, &geometry, &TransformState::identity(1.0))
            .expect_err("must fail");

        assert_eq!(err.op(), DeviceOp::BindGeometry);
        assert_eq!(backend.count(|c| matches!(c, Call::Draw(_))), 0);
    }

    #[test]
    fn matrices_are_uploaded_column_major() {
        let m = Matrix4::new_translation(&nalgebra::Vector3::new(1.0, 2.0, 3.0));
        let cols = column_major(&m);
        assert_eq!(&cols[12..15], &[1.0, 2.0, 3.0]);
    }
}
