use crate::core::MeshData;
use crate::geometry::{Indices, VertexAttribute, VertexLayout};

/// Position + color vertex stage with `model`/`view`/`projection` at group 0, bindings 0..=2.
pub const MVP_VERTEX: &str = r#"
@group(0) @binding(0) var<uniform> model: mat4x4<f32>;
@group(0) @binding(1) var<uniform> view: mat4x4<f32>;
@group(0) @binding(2) var<uniform> projection: mat4x4<f32>;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = projection * view * model * vec4<f32>(vertex.position, 1.0);
    out.color = vertex.color;
    return out;
}
"#;

/// Same interface as [`MVP_VERTEX`], but the entry point is not called `main`.
pub const VERTEX_WITHOUT_MAIN: &str = r#"
@group(0) @binding(0) var<uniform> model: mat4x4<f32>;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return model * vec4<f32>(position, 1.0);
}
"#;

pub const COLOR_FRAGMENT: &str = r#"
@fragment
fn main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0);
}
"#;

/// Interleaved `f32` mesh with `u16` indices.
#[derive(Debug, Clone)]
pub struct MeshFixture {
    pub vertices: Vec<f32>,
    pub indices: Vec<u16>,
    pub layout: VertexLayout,
}

impl MeshFixture {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

impl<'a> From<&'a MeshFixture> for MeshData<'a> {
    fn from(mesh: &'a MeshFixture) -> Self {
        MeshData {
            vertices: mesh.vertex_bytes(),
            indices: Indices::from_u16(&mesh.indices),
            layout: &mesh.layout,
        }
    }
}

/// Position (slot 0) + color (slot 1) layout, 24-byte stride.
pub fn position_color_layout() -> VertexLayout {
    VertexLayout::new([
        VertexAttribute::float32(0, 3, 24, 0),
        VertexAttribute::float32(1, 3, 24, 12),
    ])
}

/// Unit quad in the XY plane: 4 vertices, 6 indices.
pub fn unit_quad() -> MeshFixture {
    #[rustfmt::skip]
    let vertices = vec![
         0.5,  0.5, 0.0,   1.0, 0.0, 0.0,
         0.5, -0.5, 0.0,   0.0, 1.0, 0.0,
        -0.5, -0.5, 0.0,   0.0, 0.0, 1.0,
        -0.5,  0.5, 0.0,   1.0, 1.0, 0.0,
    ];

    MeshFixture {
        vertices,
        indices: vec![0, 1, 3, 1, 2, 3],
        layout: position_color_layout(),
    }
}
