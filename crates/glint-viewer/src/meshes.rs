use bytemuck::{Pod, Zeroable};

use glint_engine::core::MeshData;
use glint_engine::geometry::{Indices, VertexAttribute, VertexLayout};

/// Interleaved position + color vertex.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    const fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self { position, color }
    }

    pub fn layout() -> VertexLayout {
        VertexLayout::new([
            VertexAttribute::float32(0, 3, Self::STRIDE, 0),
            VertexAttribute::float32(1, 3, Self::STRIDE, 12),
        ])
    }
}

/// CPU-side mesh the viewer uploads once at setup.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Option<Vec<u16>>,
    layout: VertexLayout,
}

impl Mesh {
    fn new(vertices: Vec<Vertex>, indices: Option<Vec<u16>>) -> Self {
        Self {
            vertices,
            indices,
            layout: Vertex::layout(),
        }
    }

    pub fn data(&self) -> MeshData<'_> {
        MeshData {
            vertices: bytemuck::cast_slice(&self.vertices),
            indices: self
                .indices
                .as_deref()
                .map_or(Indices::None, Indices::from_u16),
            layout: &self.layout,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

/// Two triangles sharing an edge.
pub fn quad() -> Mesh {
    Mesh::new(
        vec![
            Vertex::new([0.5, 0.5, 0.0], [1.0, 0.0, 0.0]),
            Vertex::new([0.5, -0.5, 0.0], [0.0, 1.0, 0.0]),
            Vertex::new([-0.5, -0.5, 0.0], [0.0, 0.0, 1.0]),
            Vertex::new([-0.5, 0.5, 0.0], [1.0, 1.0, 0.0]),
        ],
        Some(vec![0, 1, 3, 1, 2, 3]),
    )
}

/// Single triangle drawn without indices.
pub fn triangle() -> Mesh {
    Mesh::new(
        vec![
            Vertex::new([-0.5, -0.5, 0.0], [1.0, 0.0, 0.0]),
            Vertex::new([0.5, -0.5, 0.0], [0.0, 1.0, 0.0]),
            Vertex::new([0.0, 0.5, 0.0], [0.0, 0.0, 1.0]),
        ],
        None,
    )
}

/// Unit cube centred on the origin, one color per corner.
pub fn cube() -> Mesh {
    let corners = [
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
    ];
    let vertices = corners
        .iter()
        .map(|&p: &[f32; 3]| Vertex::new(p, [p[0] + 0.5, p[1] + 0.5, p[2] + 0.5]))
        .collect();

    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1,  0, 3, 2, // back
        4, 5, 6,  4, 6, 7, // front
        0, 4, 7,  0, 7, 3, // left
        1, 2, 6,  1, 6, 5, // right
        3, 7, 6,  3, 6, 2, // top
        0, 1, 5,  0, 5, 4, // bottom
    ];

    Mesh::new(vertices, Some(indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_vertex_struct() {
        assert_eq!(Vertex::layout().validate(), Ok(24));
    }

    #[test]
    fn meshes_index_within_bounds() {
        for mesh in [quad(), triangle(), cube()] {
            let count = mesh.vertex_count();
            if let Some(indices) = &mesh.indices {
                assert_eq!(indices.len() % 3, 0);
                assert!(indices.iter().all(|&i| usize::from(i) < count));
            } else {
                assert_eq!(count % 3, 0);
            }
        }
    }

    #[test]
    fn data_exposes_raw_bytes() {
        let quad = quad();
        let data = quad.data();
        assert_eq!(data.vertices.len(), 4 * 24);
        assert!(matches!(data.indices, Indices::U16(bytes) if bytes.len() == 12));

        let triangle = triangle();
        assert_eq!(triangle.data().indices, Indices::None);
    }
}
