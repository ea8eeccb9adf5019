use super::component::{read_component, AccessorType, ComponentType, Element};
use super::{Accessor, BufferView, Err};

// small default-only arrays are accepted even next to tiny buffers
const MIN_COUNT_LIMIT: usize = 1 << 16;

/// Reads typed element arrays out of glTF accessors, honoring byte offsets,
/// strides, accessors without a buffer view and sparse overrides.
#[derive(Debug, Clone, Copy)]
pub struct AccessorReader<'a> {
    accessors: &'a [Accessor],
    buffer_views: &'a [BufferView],
    buffers: &'a [Vec<u8>],
}

impl<'a> AccessorReader<'a> {
    pub fn new(accessors: &'a [Accessor], buffer_views: &'a [BufferView], buffers: &'a [Vec<u8>]) -> Self {
        Self {
            accessors,
            buffer_views,
            buffers,
        }
    }

    /// The largest element count accepted for data that is not backed by
    /// buffer bytes: accessors without a buffer view and decoded record sets.
    pub fn count_limit(&self) -> usize {
        let bytes: usize = self.buffers.iter().map(Vec::len).sum();
        bytes.max(MIN_COUNT_LIMIT)
    }

    pub fn accessor(&self, idx: usize) -> Result<&'a Accessor, Err> {
        self.accessors.get(idx).ok_or(Err::AccessorOutOfRange {
            index: idx,
            len: self.accessors.len(),
        })
    }

    /// Reads all `count` elements of accessor `idx`.
    ///
    /// The accessor's shape must match `E`; its component type may differ and
    /// is converted.
    pub fn read_accessor<E: Element>(&self, idx: usize) -> Result<Vec<E>, Err> {
        let accessor = self.accessor(idx)?;
        let component_type = ComponentType::try_from(accessor.component_type)?;
        let shape: AccessorType = accessor.accessor_type.parse()?;
        if shape != E::ACCESSOR_TYPE {
            return Err(Err::ShapeMismatch {
                accessor: idx,
                expected: E::ACCESSOR_TYPE,
                found: shape,
            });
        }
        let element_size = shape.num_components() * component_type.size();

        let mut out = match accessor.buffer_view {
            Some(view_idx) => {
                let bytes = self.view_bytes(view_idx)?;
                let stride = self.buffer_views[view_idx]
                    .byte_stride
                    .filter(|&s| s >= element_size)
                    .unwrap_or(element_size);
                read_elements(
                    bytes,
                    view_idx,
                    accessor.byte_offset,
                    stride,
                    accessor.count,
                    component_type,
                )?
            }
            None => {
                let limit = self.count_limit();
                if accessor.count > limit {
                    return Err(Err::CountOutOfRange {
                        accessor: idx,
                        count: accessor.count,
                        limit,
                    });
                }
                vec![E::default_value(); accessor.count]
            }
        };

        if let Some(sparse) = &accessor.sparse {
            let indices = {
                let index_type = ComponentType::try_from(sparse.indices.component_type)?;
                if !matches!(
                    index_type,
                    ComponentType::UnsignedByte | ComponentType::UnsignedShort | ComponentType::UnsignedInt
                ) {
                    return Err(Err::UnsupportedComponentType(sparse.indices.component_type));
                }
                let bytes = self.view_bytes(sparse.indices.buffer_view)?;
                read_elements::<u32>(
                    bytes,
                    sparse.indices.buffer_view,
                    sparse.indices.byte_offset,
                    index_type.size(),
                    sparse.count,
                    index_type,
                )?
            };
            let values = {
                let bytes = self.view_bytes(sparse.values.buffer_view)?;
                read_elements::<E>(
                    bytes,
                    sparse.values.buffer_view,
                    sparse.values.byte_offset,
                    element_size,
                    sparse.count,
                    component_type,
                )?
            };
            for (index, value) in indices.into_iter().zip(values) {
                match out.get_mut(index as usize) {
                    Some(slot) => *slot = value,
                    None => log::debug!(
                        "Accessor {}: skipping sparse index {} beyond count {}",
                        idx,
                        index,
                        accessor.count
                    ),
                }
            }
        }

        Ok(out)
    }

    /// Like [`read_accessor`](Self::read_accessor), but an accessor holding a
    /// single default element stands for `count` default elements.
    pub fn resolve_accessor<E: Element>(&self, idx: usize, count: usize) -> Result<Vec<E>, Err> {
        let values = self.read_accessor::<E>(idx)?;
        match values.as_slice() {
            [single] if count > 1 && single.is_default() => Ok(vec![*single; count]),
            _ => Ok(values),
        }
    }

    fn view_bytes(&self, view_idx: usize) -> Result<&'a [u8], Err> {
        let view = self.buffer_views.get(view_idx).ok_or(Err::BufferViewOutOfRange {
            index: view_idx,
            len: self.buffer_views.len(),
        })?;
        let buffer = self.buffers.get(view.buffer).ok_or(Err::BufferOutOfRange {
            index: view.buffer,
            len: self.buffers.len(),
        })?;
        let start = view.byte_offset;
        let end = start.saturating_add(view.byte_length);
        buffer.get(start..end).ok_or(Err::ByteRangeOutOfBounds {
            buffer_view: view_idx,
            start,
            end,
            available: buffer.len(),
        })
    }
}

/// Reads `count` elements starting at `offset`, one every `stride` bytes.
fn read_elements<E: Element>(
    bytes: &[u8],
    view_idx: usize,
    offset: usize,
    stride: usize,
    count: usize,
    component_type: ComponentType,
) -> Result<Vec<E>, Err> {
    let num_components = E::ACCESSOR_TYPE.num_components();
    let component_size = component_type.size();
    let element_size = num_components * component_size;

    if count > 0 {
        let end = (count - 1)
            .checked_mul(stride)
            .and_then(|n| n.checked_add(offset))
            .and_then(|n| n.checked_add(element_size));
        match end {
            Some(end) if end <= bytes.len() => {}
            _ => {
                return Err(Err::ByteRangeOutOfBounds {
                    buffer_view: view_idx,
                    start: offset,
                    end: end.unwrap_or(usize::MAX),
                    available: bytes.len(),
                })
            }
        }
    }

    let mut components = Vec::with_capacity(num_components);
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let start = offset + i * stride;
        components.clear();
        for c in 0..num_components {
            let at = start + c * component_size;
            components.push(read_component(component_type, &bytes[at..at + component_size]));
        }
        out.push(E::from_components(&components));
    }
    Ok(out)
}
