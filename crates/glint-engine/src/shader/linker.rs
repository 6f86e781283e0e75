use std::collections::HashMap;

use crate::device::{Backend, ProgramLayout, UniformBinding, UniformLocation};

use super::{CompiledStage, LinkError, StageKind};

/// A linked vertex + fragment program.
///
/// Uniform locations are resolved on first use and cached, misses included.
pub struct LinkedProgram<B: Backend> {
    raw: B::Program,
    uniforms: Vec<UniformBinding>,
    vertex_inputs: Vec<u32>,
    locations: HashMap<String, Option<UniformLocation>>,
}

impl<B: Backend> LinkedProgram<B> {
    pub fn raw(&self) -> &B::Program {
        &self.raw
    }

    /// Uniforms merged from both stages, sorted by location.
    pub fn uniforms(&self) -> &[UniformBinding] {
        &self.uniforms
    }

    /// Vertex input slots the program reads.
    pub fn vertex_inputs(&self) -> &[u32] {
        &self.vertex_inputs
    }

    /// Resolves `name` against the backend once; later calls hit the cache.
    pub fn uniform_location(&mut self, backend: &mut B, name: &str) -> Option<UniformLocation> {
        if let Some(cached) = self.locations.get(name) {
            return *cached;
        }

        let location = backend.uniform_location(&self.raw, name);
        if location.is_none() {
            log::debug!("uniform `{name}` is not active in the program; skipping");
        }
        self.locations.insert(name.to_owned(), location);
        location
    }

    pub fn release(self, backend: &mut B) {
        backend.release_program(self.raw);
    }
}

/// Links two compiled stages into a program.
///
/// Both stages are consumed and their device resources released, whether or
/// not linking succeeds.
pub fn link<B: Backend>(
    backend: &mut B,
    vertex: CompiledStage<B>,
    fragment: CompiledStage<B>,
) -> Result<LinkedProgram<B>, LinkError> {
    let result = check_and_create(backend, &vertex, &fragment);

    backend.release_stage(vertex.raw);
    backend.release_stage(fragment.raw);

    result
}

fn check_and_create<B: Backend>(
    backend: &mut B,
    vertex: &CompiledStage<B>,
    fragment: &CompiledStage<B>,
) -> Result<LinkedProgram<B>, LinkError> {
    if vertex.kind() != StageKind::Vertex || fragment.kind() != StageKind::Fragment {
        return Err(LinkError::StageOrder {
            first: vertex.kind(),
            second: fragment.kind(),
        });
    }

    let produced = &vertex.interface().outputs;
    if let Some(&location) = fragment
        .interface()
        .inputs
        .iter()
        .find(|loc| !produced.contains(loc))
    {
        return Err(LinkError::UnmatchedVarying { location });
    }

    let uniforms = merge_uniforms(&vertex.interface().uniforms, &fragment.interface().uniforms)?;

    let layout = ProgramLayout {
        uniforms,
        vertex_inputs: vertex.interface().inputs.clone(),
    };

    let raw = backend
        .create_program(&vertex.raw, &fragment.raw, &layout)
        .map_err(LinkError::Device)?;

    log::debug!(
        "linked program ({} uniforms, vertex inputs {:?})",
        layout.uniforms.len(),
        layout.vertex_inputs
    );

    Ok(LinkedProgram {
        raw,
        uniforms: layout.uniforms,
        vertex_inputs: layout.vertex_inputs,
        locations: HashMap::new(),
    })
}

fn merge_uniforms(
    vertex: &[UniformBinding],
    fragment: &[UniformBinding],
) -> Result<Vec<UniformBinding>, LinkError> {
    let mut merged: Vec<UniformBinding> = Vec::with_capacity(vertex.len() + fragment.len());

    for u in vertex.iter().chain(fragment) {
        let by_name = merged.iter().find(|m| m.name == u.name);
        let by_location = merged.iter().find(|m| m.location == u.location);

        match (by_name, by_location) {
            (None, None) => merged.push(u.clone()),
            (Some(m), Some(_)) if m.location == u.location && m.size == u.size => {}
            (Some(m), _) => {
                return Err(LinkError::UniformConflict {
                    name: u.name.clone(),
                    other: m.name.clone(),
                    location: m.location,
                });
            }
            (None, Some(m)) => {
                return Err(LinkError::UniformConflict {
                    name: u.name.clone(),
                    other: m.name.clone(),
                    location: m.location,
                });
            }
        }
    }

    merged.sort_by_key(|u| u.location);
    Ok(merged)
}
