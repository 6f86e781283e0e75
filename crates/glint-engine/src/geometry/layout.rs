use std::collections::HashSet;

use super::LayoutMismatchError;

/// Scalar type of one attribute component.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ComponentType {
    Float32,
    Uint32,
    Sint32,
}

impl ComponentType {
    #[inline]
    pub const fn size(self) -> u32 {
        match self {
            ComponentType::Float32 | ComponentType::Uint32 | ComponentType::Sint32 => 4,
        }
    }
}

/// One vertex attribute as read by the vertex stage at `@location(slot)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexAttribute {
    pub slot: u32,
    pub components: u8,
    pub component: ComponentType,
    /// Bytes between consecutive vertices. Identical for every attribute of a layout.
    pub stride: u32,
    /// Byte offset of the attribute inside a vertex.
    pub offset: u32,
}

impl VertexAttribute {
    #[inline]
    pub const fn float32(slot: u32, components: u8, stride: u32, offset: u32) -> Self {
        Self {
            slot,
            components,
            component: ComponentType::Float32,
            stride,
            offset,
        }
    }

    #[inline]
    pub const fn byte_size(&self) -> u32 {
        self.components as u32 * self.component.size()
    }
}

/// Ordered attribute descriptors of an interleaved vertex buffer.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    pub fn new(attributes: impl Into<Vec<VertexAttribute>>) -> Self {
        Self {
            attributes: attributes.into(),
        }
    }

    pub fn with_attribute(mut self, attribute: VertexAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Stride of the first attribute; `None` for an empty layout.
    pub fn stride(&self) -> Option<u32> {
        self.attributes.first().map(|a| a.stride)
    }

    pub fn provides_slot(&self, slot: u32) -> bool {
        self.attributes.iter().any(|a| a.slot == slot)
    }

    /// Checks the layout invariants and returns the common stride.
    pub fn validate(&self) -> Result<u32, LayoutMismatchError> {
        let stride = self.stride().ok_or(LayoutMismatchError::EmptyLayout)?;
        if stride % 4 != 0 {
            return Err(LayoutMismatchError::UnalignedStride { stride });
        }

        let mut seen = HashSet::with_capacity(self.attributes.len());
        for attr in &self.attributes {
            if attr.stride != stride {
                return Err(LayoutMismatchError::InconsistentStride {
                    slot: attr.slot,
                    stride: attr.stride,
                    expected: stride,
                });
            }
            if !seen.insert(attr.slot) {
                return Err(LayoutMismatchError::DuplicateSlot { slot: attr.slot });
            }
            if !(1..=4).contains(&attr.components) {
                return Err(LayoutMismatchError::InvalidComponents {
                    slot: attr.slot,
                    components: attr.components,
                });
            }
            let end = attr.offset.saturating_add(attr.byte_size());
            if end > stride {
                return Err(LayoutMismatchError::AttributeOverflow {
                    slot: attr.slot,
                    end,
                    stride,
                });
            }
        }

        Ok(stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_color() -> VertexLayout {
        VertexLayout::new([
            VertexAttribute::float32(0, 3, 24, 0),
            VertexAttribute::float32(1, 3, 24, 12),
        ])
    }

    #[test]
    fn valid_layout_reports_stride() {
        assert_eq!(position_color().validate(), Ok(24));
        assert!(position_color().provides_slot(1));
        assert!(!position_color().provides_slot(2));
    }

    #[test]
    fn empty_layout_is_rejected() {
        assert_eq!(VertexLayout::default().validate(), Err(LayoutMismatchError::EmptyLayout));
    }

    #[test]
    fn stride_must_match_across_attributes() {
        let layout = VertexLayout::new([VertexAttribute::float32(0, 3, 24, 0)])
            .with_attribute(VertexAttribute::float32(1, 3, 28, 12));
        assert_eq!(
            layout.validate(),
            Err(LayoutMismatchError::InconsistentStride {
                slot: 1,
                stride: 28,
                expected: 24
            })
        );
    }

    #[test]
    fn slots_must_be_unique() {
        let layout = VertexLayout::new([
            VertexAttribute::float32(0, 3, 24, 0),
            VertexAttribute::float32(0, 3, 24, 12),
        ]);
        assert_eq!(layout.validate(), Err(LayoutMismatchError::DuplicateSlot { slot: 0 }));
    }

    #[test]
    fn component_count_is_bounded() {
        let layout = VertexLayout::new([VertexAttribute::float32(0, 5, 24, 0)]);
        assert_eq!(
            layout.validate(),
            Err(LayoutMismatchError::InvalidComponents { slot: 0, components: 5 })
        );

        let layout = VertexLayout::new([VertexAttribute::float32(0, 0, 24, 0)]);
        assert!(matches!(layout.validate(), Err(LayoutMismatchError::InvalidComponents { .. })));
    }

    #[test]
    fn attribute_must_fit_in_stride() {
        let layout = VertexLayout::new([
            VertexAttribute::float32(0, 3, 24, 0),
            VertexAttribute::float32(1, 4, 24, 12),
        ]);
        assert_eq!(
            layout.validate(),
            Err(LayoutMismatchError::AttributeOverflow {
                slot: 1,
                end: 28,
                stride: 24
            })
        );
    }

    #[test]
    fn stride_must_be_aligned() {
        let layout = VertexLayout::new([VertexAttribute::float32(0, 1, 6, 0)]);
        assert_eq!(layout.validate(), Err(LayoutMismatchError::UnalignedStride { stride: 6 }));
    }
}
