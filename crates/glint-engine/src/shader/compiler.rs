use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::device::{Backend, StageDescriptor};

use super::reflect::{reflect_entry_point, StageInterface};
use super::{CompileError, ShaderSource, StageKind};

/// A stage accepted by the front-end and allocated on the device.
///
/// Existence of the value is the proof of successful compilation. It is moved
/// into [`link`](super::link), which releases the device stage.
pub struct CompiledStage<B: Backend> {
    pub(crate) raw: B::Stage,
    kind: StageKind,
    entry_point: String,
    interface: StageInterface,
}

impl<B: Backend> CompiledStage<B> {
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn interface(&self) -> &StageInterface {
        &self.interface
    }

    /// Frees the device stage without linking it.
    pub fn release(self, backend: &mut B) {
        backend.release_stage(self.raw);
    }
}

/// WGSL front-end: parse, validate, reflect, then hand the stage to the device.
pub struct StageCompiler {
    validator: Validator,
}

impl StageCompiler {
    pub fn new() -> Self {
        Self {
            validator: Validator::new(ValidationFlags::all(), Capabilities::default()),
        }
    }

    pub fn compile<B: Backend>(
        &mut self,
        backend: &mut B,
        source: ShaderSource,
    ) -> Result<CompiledStage<B>, CompileError> {
        let kind = source.kind();
        let text = source.text();

        if text.trim().is_empty() {
            return Err(CompileError::EmptySource { kind });
        }

        let module = naga::front::wgsl::parse_str(text).map_err(|e| CompileError::Syntax {
            kind,
            diagnostic: e.emit_to_string(text),
        })?;

        let info = self
            .validator
            .validate(&module)
            .map_err(|e| CompileError::Validation {
                kind,
                diagnostic: e.emit_to_string(text),
            })?;

        let index = module
            .entry_points
            .iter()
            .position(|ep| ep.stage == kind.to_naga() && ep.name == source.entry_point())
            .ok_or_else(|| CompileError::MissingEntryPoint {
                kind,
                entry_point: source.entry_point().to_owned(),
            })?;

        let interface = reflect_entry_point(&module, &info, index);

        let raw = backend
            .create_stage(&StageDescriptor {
                kind,
                source: text,
                entry_point: source.entry_point(),
                label: source.label(),
            })
            .map_err(|source| CompileError::Device { kind, source })?;

        log::debug!(
            "compiled {kind} stage `{}` ({} inputs, {} outputs, {} uniforms)",
            source.entry_point(),
            interface.inputs.len(),
            interface.outputs.len(),
            interface.uniforms.len()
        );

        Ok(CompiledStage {
            raw,
            kind,
            entry_point: source.entry_point().to_owned(),
            interface,
        })
    }
}

impl Default for StageCompiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceOp;
    use crate::testing::{fixtures, Call, RecordingBackend};

    #[test]
    fn compiles_fixture_stages() {
        let mut backend = RecordingBackend::new();
        let mut compiler = StageCompiler::new();

        let vs = compiler
            .compile(&mut backend, ShaderSource::vertex(fixtures::MVP_VERTEX))
            .expect("vertex");
        let fs = compiler
            .compile(&mut backend, ShaderSource::fragment(fixtures::COLOR_FRAGMENT))
            .expect("fragment");

        assert_eq!(vs.kind(), StageKind::Vertex);
        assert_eq!(vs.interface().inputs, vec![0, 1]);
        assert_eq!(vs.interface().outputs, vec![0]);
        let names: Vec<_> = vs.interface().uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["model", "view", "projection"]);

        assert_eq!(fs.interface().inputs, vec![0]);
        assert!(fs.interface().uniforms.is_empty());

        assert_eq!(backend.count(|c| matches!(c, Call::CreateStage { .. })), 2);
    }

    #[test]
    fn whitespace_only_source_is_empty() {
        let mut backend = RecordingBackend::new();
        let err = StageCompiler::new()
            .compile(&mut backend, ShaderSource::fragment("  \n\t "))
            .err()
            .expect("must fail");

        assert!(matches!(err, CompileError::EmptySource { kind: StageKind::Fragment }));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn syntax_error_carries_diagnostic() {
        let mut backend = RecordingBackend::new();
        let err = StageCompiler::new()
            .compile(&mut backend, ShaderSource::vertex("@vertex fn main( {"))
            .err()
            .expect("must fail");

        assert!(matches!(err, CompileError::Syntax { .. }));
        assert!(!err.diagnostic().unwrap_or_default().is_empty());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn validation_error_is_reported() {
        let mut backend = RecordingBackend::new();
        let src = r#"
@vertex fn main() -> @builtin(position) vec4<f32> {
    let x: f32 = 1.0;
    return vec4<f32>(x, x, x);
}
"#;
        let err = StageCompiler::new()
            .compile(&mut backend, ShaderSource::vertex(src))
            .err()
            .expect("must fail");

        // Constructor arity is caught either by the parser or the validator.
        assert!(matches!(
            err,
            CompileError::Syntax { .. } | CompileError::Validation { .. }
        ));
    }

    #[test]
    fn missing_main_is_rejected() {
        let mut backend = RecordingBackend::new();
        let err = StageCompiler::new()
            .compile(&mut backend, ShaderSource::vertex(fixtures::VERTEX_WITHOUT_MAIN))
            .err()
            .expect("must fail");

        match err {
            CompileError::MissingEntryPoint { kind, entry_point } => {
                assert_eq!(kind, StageKind::Vertex);
                assert_eq!(entry_point, "main");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn entry_point_must_match_stage() {
        let mut backend = RecordingBackend::new();
        // A fragment `main` does not satisfy a vertex request.
        let err = StageCompiler::new()
            .compile(&mut backend, ShaderSource::vertex(fixtures::COLOR_FRAGMENT))
            .err()
            .expect("must fail");
        assert!(matches!(err, CompileError::MissingEntryPoint { .. }));
    }

    #[test]
    fn device_rejection_maps_to_device_error() {
        let mut backend = RecordingBackend::new();
        backend.fail_on(DeviceOp::CreateStage);

        let err = StageCompiler::new()
            .compile(&mut backend, ShaderSource::vertex(fixtures::MVP_VERTEX))
            .err()
            .expect("must fail");
        assert!(matches!(err, CompileError::Device { kind: StageKind::Vertex, .. }));
    }
}
