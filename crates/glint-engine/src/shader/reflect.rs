use naga::valid::ModuleInfo;
use naga::{AddressSpace, Binding, Module, TypeInner};

use crate::device::{UniformBinding, UniformLocation};

/// Resource interface of one entry point.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct StageInterface {
    /// Sorted `@location` inputs.
    pub inputs: Vec<u32>,
    /// Sorted `@location` outputs.
    pub outputs: Vec<u32>,
    /// `var<uniform>` globals the entry point reads, sorted by location.
    pub uniforms: Vec<UniformBinding>,
}

pub(crate) fn reflect_entry_point(module: &Module, info: &ModuleInfo, index: usize) -> StageInterface {
    let entry = &module.entry_points[index];
    let function = &entry.function;

    let mut inputs = Vec::new();
    for arg in &function.arguments {
        collect_locations(module, arg.binding.as_ref(), arg.ty, &mut inputs);
    }

    let mut outputs = Vec::new();
    if let Some(result) = &function.result {
        collect_locations(module, result.binding.as_ref(), result.ty, &mut outputs);
    }

    let usage = info.get_entry_point(index);
    let mut uniforms: Vec<UniformBinding> = module
        .global_variables
        .iter()
        .filter(|(handle, var)| var.space == AddressSpace::Uniform && !usage[*handle].is_empty())
        .filter_map(|(_, var)| {
            let binding = var.binding.as_ref()?;
            Some(UniformBinding {
                name: var.name.clone().unwrap_or_default(),
                location: UniformLocation::new(binding.group, binding.binding),
                size: module.types[var.ty].inner.size(module.to_ctx()),
            })
        })
        .collect();

    inputs.sort_unstable();
    outputs.sort_unstable();
    uniforms.sort_by_key(|u| u.location);

    StageInterface {
        inputs,
        outputs,
        uniforms,
    }
}

/// Pushes the location of a binding, or of each member when the value is an
/// unbound struct (the usual `VertexInput`/`VertexOutput` shape).
fn collect_locations(
    module: &Module,
    binding: Option<&Binding>,
    ty: naga::Handle<naga::Type>,
    out: &mut Vec<u32>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(*location),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    if let Some(Binding::Location { location, .. }) = &member.binding {
                        out.push(*location);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use naga::valid::{Capabilities, ValidationFlags, Validator};

    use super::*;

    fn reflect(src: &str, stage: naga::ShaderStage) -> StageInterface {
        let module = naga::front::wgsl::parse_str(src).expect("parse");
        let info = Validator::new(ValidationFlags::all(), Capabilities::default())
            .validate(&module)
            .expect("validate");
        let index = module
            .entry_points
            .iter()
            .position(|ep| ep.stage == stage)
            .expect("entry point");
        reflect_entry_point(&module, &info, index)
    }

    #[test]
    fn struct_members_are_flattened() {
        let iface = reflect(
            r#"
struct In { @location(1) color: vec3<f32>, @location(0) pos: vec3<f32> };
struct Out { @builtin(position) clip: vec4<f32>, @location(0) color: vec3<f32> };
@vertex fn main(v: In) -> Out {
    var o: Out;
    o.clip = vec4<f32>(v.pos, 1.0);
    o.color = v.color;
    return o;
}
"#,
            naga::ShaderStage::Vertex,
        );
        assert_eq!(iface.inputs, vec![0, 1]);
        assert_eq!(iface.outputs, vec![0]);
        assert!(iface.uniforms.is_empty());
    }

    #[test]
    fn only_used_uniforms_are_reported() {
        let iface = reflect(
            r#"
@group(0) @binding(1) var<uniform> used: mat4x4<f32>;
@group(0) @binding(0) var<uniform> unused: mat4x4<f32>;
@vertex fn main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
    return used * vec4<f32>(p, 1.0);
}
"#,
            naga::ShaderStage::Vertex,
        );
        assert_eq!(iface.inputs, vec![0]);
        assert!(iface.outputs.is_empty());
        assert_eq!(
            iface.uniforms,
            vec![UniformBinding {
                name: "used".into(),
                location: UniformLocation::new(0, 1),
                size: 64,
            }]
        );
    }
}
