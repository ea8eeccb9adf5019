pub mod component;
pub mod reader;

use serde::{Deserialize, Serialize};

pub use component::{AccessorType, Component, ComponentType, Element};
pub use reader::AccessorReader;

use component::pack;

/// glTF buffer view record. Views created by [`BufferArena`] always point at
/// buffer 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_stride: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
}

/// glTF accessor record. The component type and shape are kept as their raw
/// wire values so that a document with an unknown code still parses; they are
/// checked when the accessor is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<usize>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub byte_offset: usize,
    pub component_type: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub normalized: bool,
    pub count: usize,
    #[serde(rename = "type")]
    pub accessor_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse: Option<Sparse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sparse {
    /// Number of overridden elements.
    pub count: usize,
    pub indices: SparseIndices,
    pub values: SparseValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseIndices {
    pub buffer_view: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub byte_offset: usize,
    pub component_type: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseValues {
    pub buffer_view: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub byte_offset: usize,
}

fn is_zero(v: &usize) -> bool {
    *v == 0
}

/// Thresholds of the density-adaptive accessor chooser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparsePolicy {
    /// Arrays shorter than this are always written dense.
    pub min_len: usize,
    /// Arrays whose fraction of non-default elements is below this are written
    /// sparse.
    pub max_density: f32,
}

impl Default for SparsePolicy {
    fn default() -> Self {
        Self {
            min_len: 100,
            max_density: 0.3,
        }
    }
}

/// Marks the state of a [`BufferArena`] so that everything appended after it
/// can be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    buffer_len: usize,
    num_buffer_views: usize,
    num_accessors: usize,
}

/// Append-only store of glTF buffer 0 together with the buffer views and
/// accessors that describe it. One arena serves one document encode session;
/// every call mutates it, so meshes sharing an arena must be encoded one after
/// another.
#[derive(Debug, Clone, Default)]
pub struct BufferArena {
    buffer: Vec<u8>,
    buffer_views: Vec<BufferView>,
    accessors: Vec<Accessor>,
}

impl BufferArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn buffer_views(&self) -> &[BufferView] {
        &self.buffer_views
    }

    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    /// Returns the binary buffer, the buffer views and the accessors. The
    /// buffer is padded to a multiple of four bytes.
    pub fn into_parts(mut self) -> (Vec<u8>, Vec<BufferView>, Vec<Accessor>) {
        self.pad_buffer();
        (self.buffer, self.buffer_views, self.accessors)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            buffer_len: self.buffer.len(),
            num_buffer_views: self.buffer_views.len(),
            num_accessors: self.accessors.len(),
        }
    }

    /// Discards everything appended since `checkpoint` was taken.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.buffer.truncate(checkpoint.buffer_len);
        self.buffer_views.truncate(checkpoint.num_buffer_views);
        self.accessors.truncate(checkpoint.num_accessors);
    }

    /// Reader over the arena's own buffer, views and accessors.
    pub fn reader(&self) -> AccessorReader<'_> {
        AccessorReader::new(
            &self.accessors,
            &self.buffer_views,
            std::slice::from_ref(&self.buffer),
        )
    }

    /// Pad the buffer to a 4 byte boundary.
    fn pad_buffer(&mut self) {
        while self.buffer.len() % 4 != 0 {
            self.buffer.push(0);
        }
    }

    /// Appends `bytes` to buffer 0 at the next 4-byte aligned offset and
    /// returns the index of the new buffer view.
    pub fn create_buffer_view(&mut self, bytes: &[u8]) -> usize {
        self.pad_buffer();
        let byte_offset = self.buffer.len();
        self.buffer.extend_from_slice(bytes);
        self.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset,
            byte_length: bytes.len(),
            byte_stride: None,
            target: None,
        });
        self.buffer_views.len() - 1
    }

    /// Records an accessor over an existing buffer view and returns its index.
    pub fn create_accessor(
        &mut self,
        buffer_view: usize,
        component_type: ComponentType,
        count: usize,
        accessor_type: AccessorType,
        min: Option<Vec<serde_json::Value>>,
        max: Option<Vec<serde_json::Value>>,
    ) -> Result<usize, Err> {
        if buffer_view >= self.buffer_views.len() {
            return Err(Err::BufferViewOutOfRange {
                index: buffer_view,
                len: self.buffer_views.len(),
            });
        }
        Ok(self.push_accessor(Accessor {
            buffer_view: Some(buffer_view),
            byte_offset: 0,
            component_type: component_type.code(),
            normalized: false,
            count,
            accessor_type: accessor_type.as_str().to_owned(),
            min,
            max,
            sparse: None,
        }))
    }

    fn push_accessor(&mut self, accessor: Accessor) -> usize {
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    /// Writes `values` as a dense accessor carrying per-component bounds.
    pub fn create_dense_accessor<E: Element>(&mut self, values: &[E]) -> usize {
        let (min, max) = bounds(values);
        let buffer_view = self.create_buffer_view(&pack(values));
        self.push_accessor(Accessor {
            buffer_view: Some(buffer_view),
            byte_offset: 0,
            component_type: E::Component::COMPONENT_TYPE.code(),
            normalized: false,
            count: values.len(),
            accessor_type: E::ACCESSOR_TYPE.as_str().to_owned(),
            min,
            max,
            sparse: None,
        })
    }

    /// Writes `values` as default-fill plus an (index, value) override list.
    ///
    /// When every element is the default, a dense accessor holding a single
    /// default element is written instead; readers that know the expected
    /// length broadcast it (see [`AccessorReader::resolve_accessor`]).
    pub fn create_sparse_accessor<E: Element>(&mut self, values: &[E]) -> Result<usize, Err> {
        let mut indices = Vec::new();
        let mut overrides = Vec::new();
        for (i, value) in values.iter().enumerate() {
            if !value.is_default() {
                indices.push(wire_index(i)?);
                overrides.push(*value);
            }
        }

        if overrides.is_empty() {
            let buffer_view = self.create_buffer_view(&pack(&[E::default_value()]));
            return Ok(self.push_accessor(Accessor {
                buffer_view: Some(buffer_view),
                byte_offset: 0,
                component_type: E::Component::COMPONENT_TYPE.code(),
                normalized: false,
                count: 1,
                accessor_type: E::ACCESSOR_TYPE.as_str().to_owned(),
                min: None,
                max: None,
                sparse: None,
            }));
        }

        let indices_view = self.create_buffer_view(&pack(&indices));
        let values_view = self.create_buffer_view(&pack(&overrides));
        log::debug!(
            "Created sparse accessor with {}/{} non-default values",
            overrides.len(),
            values.len()
        );
        Ok(self.push_accessor(Accessor {
            buffer_view: None,
            byte_offset: 0,
            component_type: E::Component::COMPONENT_TYPE.code(),
            normalized: false,
            count: values.len(),
            accessor_type: E::ACCESSOR_TYPE.as_str().to_owned(),
            min: None,
            max: None,
            sparse: Some(Sparse {
                count: overrides.len(),
                indices: SparseIndices {
                    buffer_view: indices_view,
                    byte_offset: 0,
                    component_type: ComponentType::UnsignedInt.code(),
                },
                values: SparseValues {
                    buffer_view: values_view,
                    byte_offset: 0,
                },
            }),
        }))
    }

    /// Density-adaptive chooser: sparse when the array is long enough and
    /// mostly default, dense with bounds otherwise.
    pub fn create_optimized_accessor<E: Element>(&mut self, values: &[E], policy: &SparsePolicy) -> Result<usize, Err> {
        if values.len() >= policy.min_len {
            let non_default = values.iter().filter(|v| !v.is_default()).count();
            let density = non_default as f32 / values.len() as f32;
            if density < policy.max_density {
                return self.create_sparse_accessor(values);
            }
        }
        Ok(self.create_dense_accessor(values))
    }
}

/// Converts an element index to the uint32 form used by index accessors and
/// sparse indices.
pub fn wire_index(idx: usize) -> Result<u32, Err> {
    u32::try_from(idx).map_err(|_| Err::IndexOverflow(idx))
}

/// Per-component minimum and maximum, or `None` for an empty array.
fn bounds<E: Element>(values: &[E]) -> (Option<Vec<serde_json::Value>>, Option<Vec<serde_json::Value>>) {
    let Some(first) = values.first() else {
        return (None, None);
    };
    let mut min = first.components().to_vec();
    let mut max = min.clone();
    for value in &values[1..] {
        for (i, &c) in value.components().iter().enumerate() {
            if c < min[i] {
                min[i] = c;
            }
            if c > max[i] {
                max[i] = c;
            }
        }
    }
    (
        Some(min.into_iter().map(Component::to_json).collect()),
        Some(max.into_iter().map(Component::to_json).collect()),
    )
}

#[remain::sorted]
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Err {
    #[error("Accessor index {index} is out of range ({len} accessors)")]
    AccessorOutOfRange { index: usize, len: usize },
    #[error("Buffer index {index} is out of range ({len} buffers)")]
    BufferOutOfRange { index: usize, len: usize },
    #[error("Buffer view index {index} is out of range ({len} buffer views)")]
    BufferViewOutOfRange { index: usize, len: usize },
    #[error("Buffer view {buffer_view}: bytes {start}..{end} are outside the {available} available bytes")]
    ByteRangeOutOfBounds { buffer_view: usize, start: usize, end: usize, available: usize },
    #[error("Accessor {accessor} claims {count} elements, more than the limit of {limit}")]
    CountOutOfRange { accessor: usize, count: usize, limit: usize },
    #[error("Index {0} does not fit in an unsigned 32-bit component")]
    IndexOverflow(usize),
    #[error("Accessor {accessor} has type {found}, expected {expected}")]
    ShapeMismatch { accessor: usize, expected: AccessorType, found: AccessorType },
    #[error("Unsupported accessor type: {0}")]
    UnsupportedAccessorType(String),
    #[error("Unsupported component type: {0}")]
    UnsupportedComponentType(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_views_are_aligned() {
        let mut arena = BufferArena::new();
        let a = arena.create_buffer_view(&[1, 2, 3]);
        let b = arena.create_buffer_view(&[4, 5]);
        let c = arena.create_buffer_view(&[6]);
        assert_eq!((a, b, c), (0, 1, 2));

        let views = arena.buffer_views();
        assert_eq!((views[0].byte_offset, views[0].byte_length), (0, 3));
        assert_eq!((views[1].byte_offset, views[1].byte_length), (4, 2));
        assert_eq!((views[2].byte_offset, views[2].byte_length), (8, 1));
        assert_eq!(arena.buffer(), &[1, 2, 3, 0, 4, 5, 0, 0, 6]);
        assert!(views.iter().all(|v| v.buffer == 0));

        let (buffer, _, _) = arena.into_parts();
        assert_eq!(buffer.len(), 12);
    }

    #[test]
    fn create_accessor_checks_buffer_view() {
        let mut arena = BufferArena::new();
        let err = arena
            .create_accessor(0, ComponentType::Float, 1, AccessorType::Scalar, None, None)
            .unwrap_err();
        assert_eq!(err, Err::BufferViewOutOfRange { index: 0, len: 0 });

        let view = arena.create_buffer_view(&pack(&[[1.0f32, 2.0]]));
        let idx = arena
            .create_accessor(view, ComponentType::Float, 1, AccessorType::Vec2, None, None)
            .unwrap();
        assert_eq!(arena.accessors()[idx].accessor_type, "VEC2");
        assert_eq!(arena.accessors()[idx].component_type, 5126);
    }

    #[test]
    fn dense_accessor_has_bounds() {
        let mut arena = BufferArena::new();
        let idx = arena.create_dense_accessor(&[[1.0f32, -2.0, 3.0], [-1.0, 5.0, 0.5]]);
        let accessor = &arena.accessors()[idx];
        assert_eq!(accessor.count, 2);
        assert_eq!(accessor.accessor_type, "VEC3");
        assert_eq!(accessor.min, Some(vec![(-1.0).into(), (-2.0).into(), 0.5.into()]));
        assert_eq!(accessor.max, Some(vec![1.0.into(), 5.0.into(), 3.0.into()]));
    }

    #[test]
    fn sparse_accessor_layout() {
        let mut arena = BufferArena::new();
        let idx = arena.create_sparse_accessor(&[0u32, 7, 0, 0, 9]).unwrap();
        let accessor = arena.accessors()[idx].clone();
        assert_eq!(accessor.buffer_view, None);
        assert_eq!(accessor.count, 5);

        let sparse = accessor.sparse.unwrap();
        assert_eq!(sparse.count, 2);
        assert_eq!(sparse.indices.component_type, 5125);
        let views = arena.buffer_views();
        let indices = &views[sparse.indices.buffer_view];
        let values = &views[sparse.values.buffer_view];
        assert_eq!(
            &arena.buffer()[indices.byte_offset..indices.byte_offset + indices.byte_length],
            &pack(&[1u32, 4])[..]
        );
        assert_eq!(
            &arena.buffer()[values.byte_offset..values.byte_offset + values.byte_length],
            &pack(&[7u32, 9])[..]
        );
    }

    #[test]
    fn all_default_sparse_input_is_a_single_element() {
        let mut arena = BufferArena::new();
        let idx = arena.create_sparse_accessor(&[[0.0f32; 2]; 40]).unwrap();
        let accessor = &arena.accessors()[idx];
        assert_eq!(accessor.count, 1);
        assert!(accessor.sparse.is_none());
        assert_eq!(arena.buffer_views()[0].byte_length, 8);
    }

    #[test]
    fn optimized_accessor_picks_representation() {
        let policy = SparsePolicy::default();
        let mut arena = BufferArena::new();

        let mut mostly_zero = vec![0u32; 200];
        mostly_zero[10] = 3;
        let sparse = arena.create_optimized_accessor(&mostly_zero, &policy).unwrap();
        assert!(arena.accessors()[sparse].sparse.is_some());

        let dense_values: Vec<u32> = (0..200).collect();
        let dense = arena.create_optimized_accessor(&dense_values, &policy).unwrap();
        assert!(arena.accessors()[dense].sparse.is_none());
        assert!(arena.accessors()[dense].min.is_some());

        let short = arena.create_optimized_accessor(&[0u32; 99], &policy).unwrap();
        assert!(arena.accessors()[short].sparse.is_none());
        assert_eq!(arena.accessors()[short].count, 99);
    }

    #[test]
    fn wire_indices_are_32_bit() {
        assert_eq!(wire_index(7), Ok(7));
        assert_eq!(wire_index(u32::MAX as usize), Ok(u32::MAX));
        let too_large = u32::MAX as usize + 1;
        assert_eq!(wire_index(too_large), Err(Err::IndexOverflow(too_large)));
    }

    #[test]
    fn rollback_discards_appended_data() {
        let mut arena = BufferArena::new();
        arena.create_dense_accessor(&[1u32, 2, 3]);
        let checkpoint = arena.checkpoint();
        arena.create_dense_accessor(&[[1.0f32; 3]; 4]);
        arena.create_sparse_accessor(&[0u8, 1]).unwrap();
        arena.rollback(checkpoint);

        assert_eq!(arena.accessors().len(), 1);
        assert_eq!(arena.buffer_views().len(), 1);
        assert_eq!(arena.buffer().len(), 12);
    }

    #[test]
    fn accessor_json_shape() {
        let mut arena = BufferArena::new();
        let idx = arena.create_sparse_accessor(&[0u32, 2]).unwrap();
        let json = serde_json::to_value(&arena.accessors()[idx]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "componentType": 5125,
                "count": 2,
                "type": "SCALAR",
                "sparse": {
                    "count": 1,
                    "indices": { "bufferView": 0, "componentType": 5125 },
                    "values": { "bufferView": 1 }
                }
            })
        );
        let view = serde_json::to_value(&arena.buffer_views()[1]).unwrap();
        assert_eq!(view, serde_json::json!({ "buffer": 0, "byteOffset": 4, "byteLength": 4 }));
    }
}
