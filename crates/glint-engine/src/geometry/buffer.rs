use crate::device::{Backend, DrawCall, GeometryDescriptor, IndexFormat};

use super::{GeometryError, LayoutMismatchError, VertexLayout};

/// Index data accompanying a vertex buffer, as raw bytes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Indices<'a> {
    None,
    U16(&'a [u8]),
    U32(&'a [u8]),
}

impl<'a> Indices<'a> {
    pub fn from_u16(indices: &'a [u16]) -> Self {
        Indices::U16(bytemuck::cast_slice(indices))
    }

    pub fn from_u32(indices: &'a [u32]) -> Self {
        Indices::U32(bytemuck::cast_slice(indices))
    }

    /// Empty index data means array mode, same as `Indices::None`.
    fn bytes(self) -> Option<(&'a [u8], IndexFormat)> {
        match self {
            Indices::None => None,
            Indices::U16(bytes) | Indices::U32(bytes) if bytes.is_empty() => None,
            Indices::U16(bytes) => Some((bytes, IndexFormat::U16)),
            Indices::U32(bytes) => Some((bytes, IndexFormat::U32)),
        }
    }
}

/// Device-resident mesh: vertex buffer, optional index buffer and its layout.
///
/// Immutable after construction. The handle is the sole owner of the buffers.
pub struct GeometryHandle<B: Backend> {
    raw: B::Geometry,
    vertex_count: u32,
    draw: DrawCall,
    layout: VertexLayout,
}

impl<B: Backend> GeometryHandle<B> {
    pub fn raw(&self) -> &B::Geometry {
        &self.raw
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// The draw command this geometry is rendered with.
    pub fn draw_call(&self) -> DrawCall {
        self.draw
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self.draw, DrawCall::Indexed { .. })
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn release(self, backend: &mut B) {
        backend.release_geometry(self.raw);
    }
}

/// Validates `vertices`/`indices` against `layout` and uploads them.
pub fn build<B: Backend>(
    backend: &mut B,
    vertices: &[u8],
    indices: Indices<'_>,
    layout: &VertexLayout,
) -> Result<GeometryHandle<B>, GeometryError> {
    let stride = layout.validate()?;

    if vertices.is_empty() {
        return Err(LayoutMismatchError::EmptyVertices.into());
    }
    if vertices.len() % stride as usize != 0 {
        return Err(LayoutMismatchError::VertexBytes {
            len: vertices.len(),
            stride,
        }
        .into());
    }
    let vertex_count = u32::try_from(vertices.len() / stride as usize).map_err(|_| {
        LayoutMismatchError::VertexBytes {
            len: vertices.len(),
            stride,
        }
    })?;

    let indices = indices.bytes();
    let draw = match indices {
        Some((bytes, format)) => {
            let count = check_indices(bytes, format, vertex_count)?;
            DrawCall::Indexed { count, format }
        }
        None => DrawCall::Arrays {
            count: vertex_count,
        },
    };

    let raw = backend.create_geometry(&GeometryDescriptor {
        vertices,
        indices,
        layout,
        label: Some("glint mesh"),
    })?;

    log::debug!("built geometry: {vertex_count} vertices, stride {stride}, {draw:?}");

    Ok(GeometryHandle {
        raw,
        vertex_count,
        draw,
        layout: layout.clone(),
    })
}

/// Returns the index count once every index is known to address a vertex.
fn check_indices(bytes: &[u8], format: IndexFormat, vertex_count: u32) -> Result<u32, LayoutMismatchError> {
    let element = format.size();
    if bytes.len() % element != 0 {
        return Err(LayoutMismatchError::IndexBytes {
            len: bytes.len(),
            element,
        });
    }

    let out_of_range = |index: u32| LayoutMismatchError::IndexOutOfRange { index, vertex_count };
    match format {
        IndexFormat::U16 => {
            for chunk in bytes.chunks_exact(2) {
                let index = u32::from(u16::from_ne_bytes([chunk[0], chunk[1]]));
                if index >= vertex_count {
                    return Err(out_of_range(index));
                }
            }
        }
        IndexFormat::U32 => {
            for chunk in bytes.chunks_exact(4) {
                let index = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                if index >= vertex_count {
                    return Err(out_of_range(index));
                }
            }
        }
    }

    u32::try_from(bytes.len() / element).map_err(|_| LayoutMismatchError::IndexBytes {
        len: bytes.len(),
        element,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceOp;
    use crate::geometry::VertexAttribute;
    use crate::testing::{fixtures, Call, RecordingBackend};

    fn position_only() -> VertexLayout {
        VertexLayout::new([VertexAttribute::float32(0, 3, 12, 0)])
    }

    #[test]
    fn quad_is_indexed_with_six_indices() {
        let mut backend = RecordingBackend::new();
        let quad = fixtures::unit_quad();

        let geometry = build(
            &mut backend,
            quad.vertex_bytes(),
            Indices::from_u16(&quad.indices),
            &quad.layout,
        )
        .expect("quad");

        assert_eq!(geometry.vertex_count(), 4);
        assert_eq!(
            geometry.draw_call(),
            DrawCall::Indexed {
                count: 6,
                format: IndexFormat::U16
            }
        );
        assert_eq!(backend.live_geometries(), 1);
    }

    #[test]
    fn vertex_count_is_len_over_stride() {
        let mut backend = RecordingBackend::new();
        for vertices in 1..8usize {
            let data = vec![0.0f32; vertices * 3];
            let geometry = build(
                &mut backend,
                bytemuck::cast_slice(&data),
                Indices::None,
                &position_only(),
            )
            .expect("geometry");
            assert_eq!(geometry.vertex_count() as usize, vertices);
            assert_eq!(geometry.draw_call(), DrawCall::Arrays { count: vertices as u32 });
            assert!(!geometry.is_indexed());
        }
    }

    #[test]
    fn empty_indices_draw_as_arrays() {
        let mut backend = RecordingBackend::new();
        let data = [0.0f32; 9];

        for indices in [Indices::from_u16(&[]), Indices::from_u32(&[])] {
            let geometry = build(&mut backend, bytemuck::cast_slice(&data), indices, &position_only())
                .expect("geometry");
            assert_eq!(geometry.draw_call(), DrawCall::Arrays { count: 3 });
            assert!(!geometry.is_indexed());
        }
        assert_eq!(
            backend.count(|c| matches!(c, Call::CreateGeometry { index_bytes: None, .. })),
            2
        );
    }

    #[test]
    fn ragged_vertex_data_is_rejected() {
        let mut backend = RecordingBackend::new();
        let data = [0u8; 13];

        let err = build(&mut backend, &data, Indices::None, &position_only())
            .err()
            .expect("must fail");

        assert!(matches!(
            err,
            GeometryError::Layout(LayoutMismatchError::VertexBytes { len: 13, stride: 12 })
        ));
        assert_eq!(backend.count(|c| matches!(c, Call::CreateGeometry { .. })), 0);
    }

    #[test]
    fn empty_vertex_data_is_rejected() {
        let mut backend = RecordingBackend::new();
        let err = build(&mut backend, &[], Indices::None, &position_only())
            .err()
            .expect("must fail");
        assert!(matches!(err, GeometryError::Layout(LayoutMismatchError::EmptyVertices)));
    }

    #[test]
    fn invalid_layout_is_checked_before_data() {
        let mut backend = RecordingBackend::new();
        let err = build(&mut backend, &[0u8; 7], Indices::None, &VertexLayout::default())
            .err()
            .expect("must fail");
        assert!(matches!(err, GeometryError::Layout(LayoutMismatchError::EmptyLayout)));
    }

    #[test]
    fn index_bytes_must_be_whole_elements() {
        let mut backend = RecordingBackend::new();
        let data = [0.0f32; 9];
        let err = build(
            &mut backend,
            bytemuck::cast_slice(&data),
            Indices::U32(&[0u8; 6]),
            &position_only(),
        )
        .err()
        .expect("must fail");
        assert!(matches!(
            err,
            GeometryError::Layout(LayoutMismatchError::IndexBytes { len: 6, element: 4 })
        ));
    }

    #[test]
    fn indices_must_address_existing_vertices() {
        let mut backend = RecordingBackend::new();
        let data = [0.0f32; 9];
        let indices: [u32; 3] = [0, 1, 3];
        let err = build(
            &mut backend,
            bytemuck::cast_slice(&data),
            Indices::from_u32(&indices),
            &position_only(),
        )
        .err()
        .expect("must fail");
        assert!(matches!(
            err,
            GeometryError::Layout(LayoutMismatchError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            })
        ));
    }

    #[test]
    fn device_failure_is_surfaced() {
        let mut backend = RecordingBackend::new();
        backend.fail_on(DeviceOp::CreateGeometry);
        let data = [0.0f32; 9];
        let err = build(&mut backend, bytemuck::cast_slice(&data), Indices::None, &position_only())
            .err()
            .expect("must fail");
        assert!(matches!(err, GeometryError::Device(_)));
    }

    #[test]
    fn release_frees_the_buffers() {
        let mut backend = RecordingBackend::new();
        let data = [0.0f32; 9];
        let geometry = build(&mut backend, bytemuck::cast_slice(&data), Indices::None, &position_only())
            .expect("geometry");
        geometry.release(&mut backend);
        assert_eq!(backend.live_geometries(), 0);
        assert_eq!(backend.count(|c| matches!(c, Call::ReleaseGeometry { .. })), 1);
    }
}
