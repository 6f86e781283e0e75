use thiserror::Error;

use crate::device::DeviceError;

/// Disagreement between a [`VertexLayout`](super::VertexLayout) and the data or
/// program it is paired with.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum LayoutMismatchError {
    #[error("vertex layout has no attributes")]
    EmptyLayout,

    #[error("attribute at slot {slot} has stride {stride}, expected {expected}")]
    InconsistentStride { slot: u32, stride: u32, expected: u32 },

    #[error("stride {stride} is not a multiple of 4 bytes")]
    UnalignedStride { stride: u32 },

    #[error("slot {slot} is described twice")]
    DuplicateSlot { slot: u32 },

    #[error("attribute at slot {slot} has {components} components, expected 1..=4")]
    InvalidComponents { slot: u32, components: u8 },

    #[error("attribute at slot {slot} ends at byte {end}, past the stride of {stride}")]
    AttributeOverflow { slot: u32, end: u32, stride: u32 },

    #[error("vertex data is {len} bytes, not a multiple of the {stride}-byte stride")]
    VertexBytes { len: usize, stride: u32 },

    #[error("vertex data is empty")]
    EmptyVertices,

    #[error("index data is {len} bytes, not a multiple of {element} bytes")]
    IndexBytes { len: usize, element: usize },

    #[error("index {index} addresses past the last of {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: u32 },

    #[error("program reads vertex slot {slot}, which the layout does not provide")]
    UnboundSlot { slot: u32 },
}

/// Failure to build a [`GeometryHandle`](super::GeometryHandle).
#[derive(Debug, Clone, Error)]
pub enum GeometryError {
    #[error(transparent)]
    Layout(#[from] LayoutMismatchError),

    #[error("geometry rejected by the device")]
    Device(#[from] DeviceError),
}
